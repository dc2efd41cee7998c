//! # Media Repository

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::media::{self, Entity as Media};

/// Repository for uploaded media records
pub struct MediaRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> MediaRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Register a media asset by URL
    pub async fn create(&self, url: String, alt: String) -> Result<media::Model, RepositoryError> {
        if url.trim().is_empty() {
            return Err(RepositoryError::validation_error("Media URL cannot be empty"));
        }

        media::ActiveModel {
            id: Set(Uuid::new_v4()),
            url: Set(url),
            alt: Set(alt),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<media::Model>, RepositoryError> {
        Media::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Load media rows keyed by ID; unknown IDs are skipped
    pub async fn find_by_ids(
        &self,
        ids: impl IntoIterator<Item = Uuid>,
    ) -> Result<HashMap<Uuid, media::Model>, RepositoryError> {
        let ids: Vec<Uuid> = ids.into_iter().collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = Media::find()
            .filter(media::Column::Id.is_in(ids))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(rows.into_iter().map(|row| (row.id, row)).collect())
    }
}
