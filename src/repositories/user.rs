//! # User Repository
//!
//! Account lookups and registration. Registering creates the seller's
//! storefront, the account and the membership linking them in one
//! transaction.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::error::{RepositoryError, is_unique_violation};
use crate::models::user::{self, Entity as User, Role, roles_to_json};
use crate::models::{tenant, user_tenant};

/// Everything needed to open a new seller account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
    /// Connected payment account for the new storefront
    pub stripe_account_id: String,
    pub stripe_details_submitted: bool,
}

/// Repository for User database operations
pub struct UserRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<user::Model>, RepositoryError> {
        User::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, RepositoryError> {
        User::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<user::Model>, RepositoryError> {
        User::find()
            .filter(user::Column::Username.eq(username.trim().to_lowercase()))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Create the tenant, the user and their membership atomically.
    ///
    /// The tenant takes the username as both name and slug.
    pub async fn register(
        &self,
        account: NewAccount,
    ) -> Result<(user::Model, tenant::Model), RepositoryError> {
        let now = Utc::now();
        let txn = self
            .db
            .begin()
            .await
            .map_err(RepositoryError::database_error)?;

        let tenant = tenant::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(account.username.clone()),
            slug: Set(account.username.clone()),
            image_id: Set(None),
            stripe_account_id: Set(account.stripe_account_id),
            stripe_details_submitted: Set(account.stripe_details_submitted),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(map_registration_error)?;

        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(account.email.trim().to_lowercase()),
            username: Set(account.username),
            password_hash: Set(account.password_hash),
            roles: Set(roles_to_json(&account.roles)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(map_registration_error)?;

        user_tenant::ActiveModel {
            user_id: Set(user.id),
            tenant_id: Set(tenant.id),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(RepositoryError::database_error)?;

        txn.commit()
            .await
            .map_err(RepositoryError::database_error)?;

        Ok((user, tenant))
    }
}

/// A concurrent registration can still race past the pre-checks
fn map_registration_error(error: sea_orm::DbErr) -> RepositoryError {
    if is_unique_violation(&error) {
        RepositoryError::validation_error("Username or email already taken")
    } else {
        RepositoryError::database_error(error)
    }
}
