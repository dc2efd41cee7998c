//! # Cart Repository
//!
//! Persists [`CartState`] as JSON keyed by an opaque cart token.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};
use uuid::Uuid;

use crate::cart::CartState;
use crate::error::RepositoryError;
use crate::models::cart::{self, Entity as Cart};

pub struct CartRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> CartRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Load the cart for a token; unknown tokens have no cart
    pub async fn load(&self, token: &str) -> Result<Option<CartState>, RepositoryError> {
        let row = Cart::find()
            .filter(cart::Column::Token.eq(token))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        row.map(|row| {
            serde_json::from_value(row.tenant_carts).map_err(|e| {
                RepositoryError::validation_error(format!("Stored cart is malformed: {e}"))
            })
        })
        .transpose()
    }

    /// Insert or replace the cart stored under `token`
    pub async fn save(&self, token: &str, state: &CartState) -> Result<(), RepositoryError> {
        let tenant_carts = serde_json::to_value(state).map_err(|e| {
            RepositoryError::validation_error(format!("Cart cannot be serialized: {e}"))
        })?;
        let now = Utc::now();

        let existing = Cart::find()
            .filter(cart::Column::Token.eq(token))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let saved = match existing {
            Some(row) => {
                let mut active = row.into_active_model();
                active.tenant_carts = Set(tenant_carts);
                active.updated_at = Set(now.into());
                active.update(self.db).await
            }
            None => {
                cart::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    token: Set(token.to_string()),
                    tenant_carts: Set(tenant_carts),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                }
                .insert(self.db)
                .await
            }
        };
        saved.map_err(RepositoryError::database_error)?;

        Ok(())
    }

    /// Delete carts last written before `cutoff`, returning how many were removed
    pub async fn purge_stale(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = Cart::delete_many()
            .filter(cart::Column::UpdatedAt.lt(cutoff.fixed_offset()))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected)
    }
}
