//! # Tag Repository

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::cursor::PageRequest;
use crate::error::RepositoryError;
use crate::models::product_tag;
use crate::models::tag::{self, Entity as Tag};

pub struct TagRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> TagRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// One page of tags sorted by name, with the total count
    pub async fn list(&self, page: PageRequest) -> Result<(Vec<tag::Model>, u64), RepositoryError> {
        let paginator = Tag::find()
            .order_by_asc(tag::Column::Name)
            .order_by_asc(tag::Column::Id)
            .paginate(self.db, page.limit);

        let total = paginator
            .num_items()
            .await
            .map_err(RepositoryError::database_error)?;
        let tags = paginator
            .fetch_page(page.page_index())
            .await
            .map_err(RepositoryError::database_error)?;

        Ok((tags, total))
    }

    pub async fn create(&self, name: String) -> Result<tag::Model, RepositoryError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(RepositoryError::validation_error("Tag name cannot be empty"));
        }

        tag::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<tag::Model>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        Tag::find()
            .filter(tag::Column::Id.is_in(ids.iter().copied()))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Tag names per product, sorted by name
    pub async fn names_for_products(
        &self,
        product_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<String>>, RepositoryError> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let links = product_tag::Entity::find()
            .filter(product_tag::Column::ProductId.is_in(product_ids.iter().copied()))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let tag_ids: Vec<Uuid> = links.iter().map(|link| link.tag_id).collect();
        let names: HashMap<Uuid, String> = self
            .find_by_ids(&tag_ids)
            .await?
            .into_iter()
            .map(|tag| (tag.id, tag.name))
            .collect();

        let mut by_product: HashMap<Uuid, Vec<String>> = HashMap::new();
        for link in links {
            if let Some(name) = names.get(&link.tag_id) {
                by_product
                    .entry(link.product_id)
                    .or_default()
                    .push(name.clone());
            }
        }
        for tags in by_product.values_mut() {
            tags.sort();
        }

        Ok(by_product)
    }
}
