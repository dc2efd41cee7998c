//! # Data Models
//!
//! SeaORM entities for the marketplace schema plus small response types that
//! are shared across handlers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod cart;
pub mod category;
pub mod media;
pub mod order;
pub mod product;
pub mod product_tag;
pub mod review;
pub mod session;
pub mod tag;
pub mod tenant;
pub mod user;
pub mod user_tenant;

pub use category::Entity as Category;
pub use media::Entity as Media;
pub use order::Entity as Order;
pub use product::Entity as Product;
pub use review::Entity as Review;
pub use tag::Entity as Tag;
pub use tenant::Entity as Tenant;
pub use user::Entity as User;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "marketplace".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
