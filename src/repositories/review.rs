//! # Review Repository

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::review::{self, Entity as Review};
use crate::ratings::is_valid_rating;

pub struct ReviewRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ReviewRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<review::Model>, RepositoryError> {
        Review::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_user_and_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<review::Model>, RepositoryError> {
        Review::find()
            .filter(review::Column::UserId.eq(user_id))
            .filter(review::Column::ProductId.eq(product_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        rating: i32,
        description: String,
    ) -> Result<review::Model, RepositoryError> {
        validate_review(rating, &description)?;

        let now = Utc::now();
        review::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            product_id: Set(product_id),
            rating: Set(rating),
            description: Set(description),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        review: review::Model,
        rating: i32,
        description: String,
    ) -> Result<review::Model, RepositoryError> {
        validate_review(rating, &description)?;

        let mut active = review.into_active_model();
        active.rating = Set(rating);
        active.description = Set(description);
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Every rating for the given products, grouped by product
    pub async fn ratings_for_products(
        &self,
        product_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<i32>>, RepositoryError> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid, i32)> = Review::find()
            .select_only()
            .column(review::Column::ProductId)
            .column(review::Column::Rating)
            .filter(review::Column::ProductId.is_in(product_ids.iter().copied()))
            .into_tuple()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let mut grouped: HashMap<Uuid, Vec<i32>> = HashMap::new();
        for (product_id, rating) in rows {
            grouped.entry(product_id).or_default().push(rating);
        }
        Ok(grouped)
    }
}

fn validate_review(rating: i32, description: &str) -> Result<(), RepositoryError> {
    if !is_valid_rating(rating) {
        return Err(RepositoryError::validation_error(
            "Rating must be between 1 and 5",
        ));
    }
    if description.trim().chars().count() < 3 {
        return Err(RepositoryError::validation_error(
            "Description must be at least 3 characters",
        ));
    }
    Ok(())
}
