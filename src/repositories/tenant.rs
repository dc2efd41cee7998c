//! # Tenant Repository
//!
//! Storefront lookups, memberships and payment-onboarding state.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    prelude::DateTimeWithTimeZone, sea_query::Expr,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::tenant::{self, Entity as Tenant};
use crate::models::user_tenant;

/// Repository for Tenant database operations
pub struct TenantRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> TenantRepository<'a> {
    /// Create a new TenantRepository with the given database connection
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<tenant::Model>, RepositoryError> {
        Tenant::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<tenant::Model>, RepositoryError> {
        Tenant::find()
            .filter(tenant::Column::Slug.eq(slug.to_lowercase()))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Load tenants keyed by ID
    pub async fn find_by_ids(
        &self,
        ids: impl IntoIterator<Item = Uuid>,
    ) -> Result<HashMap<Uuid, tenant::Model>, RepositoryError> {
        let ids: Vec<Uuid> = ids.into_iter().collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Tenant::find()
            .filter(tenant::Column::Id.is_in(ids))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(rows.into_iter().map(|row| (row.id, row)).collect())
    }

    /// The tenant a user joined first
    pub async fn first_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<tenant::Model>, RepositoryError> {
        let membership = user_tenant::Entity::find()
            .filter(user_tenant::Column::UserId.eq(user_id))
            .order_by_asc(user_tenant::Column::CreatedAt)
            .order_by_asc(user_tenant::Column::TenantId)
            .find_also_related(Tenant)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(membership.and_then(|(_, tenant)| tenant))
    }

    /// IDs of every tenant the user is a member of
    pub async fn tenant_ids_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>, RepositoryError> {
        user_tenant::Entity::find()
            .select_only()
            .column(user_tenant::Column::TenantId)
            .filter(user_tenant::Column::UserId.eq(user_id))
            .into_tuple::<Uuid>()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Record whether the connected account finished onboarding.
    ///
    /// Returns the number of tenants updated.
    pub async fn set_details_submitted(
        &self,
        stripe_account_id: &str,
        details_submitted: bool,
    ) -> Result<u64, RepositoryError> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let result = Tenant::update_many()
            .col_expr(
                tenant::Column::StripeDetailsSubmitted,
                Expr::value(details_submitted),
            )
            .col_expr(tenant::Column::UpdatedAt, Expr::value(now))
            .filter(tenant::Column::StripeAccountId.eq(stripe_account_id))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected)
    }
}
