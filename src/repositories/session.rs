//! # Session Repository
//!
//! Login sessions keyed by the SHA-256 hash of their bearer token. The raw
//! token is never stored.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    prelude::DateTimeWithTimeZone,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::session::{self, Entity as Session};
use crate::models::user;

pub struct SessionRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> SessionRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> Result<session::Model, RepositoryError> {
        session::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            token_hash: Set(token_hash),
            expires_at: Set(expires_at.into()),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    /// Resolve an unexpired session to its user
    pub async fn find_user_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<(session::Model, user::Model)>, RepositoryError> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let found = Session::find()
            .filter(session::Column::TokenHash.eq(token_hash))
            .filter(session::Column::ExpiresAt.gt(now))
            .find_also_related(user::Entity)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(found.and_then(|(session, user)| user.map(|user| (session, user))))
    }

    pub async fn delete_by_token_hash(&self, token_hash: &str) -> Result<u64, RepositoryError> {
        let result = Session::delete_many()
            .filter(session::Column::TokenHash.eq(token_hash))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected)
    }

    /// Drop a user's expired sessions
    pub async fn purge_expired_for_user(&self, user_id: Uuid) -> Result<u64, RepositoryError> {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let result = Session::delete_many()
            .filter(session::Column::UserId.eq(user_id))
            .filter(session::Column::ExpiresAt.lte(now))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(result.rows_affected)
    }
}
