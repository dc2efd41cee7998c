//! # Category Repository
//!
//! Categories form a tree through `parent_id`. Listings show the top level
//! with its direct subcategories; product filters match a whole subtree.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::category::{self, Entity as Category};

/// Fields for a new category
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub color: Option<String>,
    pub parent_id: Option<Uuid>,
}

/// A top-level category with its direct children
#[derive(Debug, Clone)]
pub struct CategoryTree {
    pub category: category::Model,
    pub subcategories: Vec<category::Model>,
}

pub struct CategoryRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> CategoryRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Top-level categories sorted by name, each with subcategories sorted by name
    pub async fn list_tree(&self) -> Result<Vec<CategoryTree>, RepositoryError> {
        let all = Category::find()
            .order_by_asc(category::Column::Name)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let mut children: HashMap<Uuid, Vec<category::Model>> = HashMap::new();
        let mut roots = Vec::new();
        for row in all {
            match row.parent_id {
                Some(parent_id) => children.entry(parent_id).or_default().push(row),
                None => roots.push(row),
            }
        }

        Ok(roots
            .into_iter()
            .map(|category| CategoryTree {
                subcategories: children.remove(&category.id).unwrap_or_default(),
                category,
            })
            .collect())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<category::Model>, RepositoryError> {
        Category::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<category::Model>, RepositoryError> {
        Category::find()
            .filter(category::Column::Slug.eq(slug))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// The category itself plus every descendant
    pub async fn subtree_ids(&self, root_id: Uuid) -> Result<Vec<Uuid>, RepositoryError> {
        let all = Category::find()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let mut ids = vec![root_id];
        let mut seen: HashSet<Uuid> = HashSet::from([root_id]);
        let mut cursor = 0;
        while cursor < ids.len() {
            let parent = ids[cursor];
            for row in all.iter().filter(|row| row.parent_id == Some(parent)) {
                if seen.insert(row.id) {
                    ids.push(row.id);
                }
            }
            cursor += 1;
        }

        Ok(ids)
    }

    pub async fn create(&self, new: NewCategory) -> Result<category::Model, RepositoryError> {
        if new.name.trim().is_empty() || new.slug.trim().is_empty() {
            return Err(RepositoryError::validation_error(
                "Category name and slug are required",
            ));
        }
        if let Some(parent_id) = new.parent_id {
            Category::find_by_id(parent_id)
                .one(self.db)
                .await
                .map_err(RepositoryError::database_error)?
                .ok_or_else(|| RepositoryError::not_found("Parent category not found"))?;
        }

        category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new.name.trim().to_string()),
            slug: Set(new.slug.trim().to_lowercase()),
            color: Set(new.color),
            parent_id: Set(new.parent_id),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.db)
        .await
        .map_err(RepositoryError::database_error)
    }

    /// Return the category with this slug, creating it when missing
    pub async fn ensure(&self, new: NewCategory) -> Result<category::Model, RepositoryError> {
        match self.find_by_slug(&new.slug).await? {
            Some(existing) => Ok(existing),
            None => self.create(new).await,
        }
    }
}
