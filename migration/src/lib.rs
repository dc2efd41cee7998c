//! Database migrations for the marketplace service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_01_05_000001_create_media;
mod m2026_01_05_000002_create_tenants;
mod m2026_01_05_000003_create_users;
mod m2026_01_05_000004_create_catalog;
mod m2026_01_05_000005_create_orders_and_reviews;
mod m2026_01_05_000006_create_carts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_01_05_000001_create_media::Migration),
            Box::new(m2026_01_05_000002_create_tenants::Migration),
            Box::new(m2026_01_05_000003_create_users::Migration),
            Box::new(m2026_01_05_000004_create_catalog::Migration),
            Box::new(m2026_01_05_000005_create_orders_and_reviews::Migration),
            Box::new(m2026_01_05_000006_create_carts::Migration),
        ]
    }
}
