//! # Categories API Handlers

use axum::{extract::State, response::Json};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::category;
use crate::repositories::CategoryRepository;
use crate::server::AppState;

/// A category without its children
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubcategoryDto {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub color: Option<String>,
    pub parent_id: Option<Uuid>,
}

impl From<category::Model> for SubcategoryDto {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            color: model.color,
            parent_id: model.parent_id,
        }
    }
}

/// A top-level category with its subcategories
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
    #[serde(flatten)]
    pub category: SubcategoryDto,
    pub subcategories: Vec<SubcategoryDto>,
}

/// List top-level categories with their subcategories
#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "Category tree sorted by name", body = Vec<CategoryDto>)
    ),
    tag = "categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryDto>>, ApiError> {
    let tree = CategoryRepository::new(&state.db).list_tree().await?;

    Ok(Json(
        tree.into_iter()
            .map(|node| CategoryDto {
                category: node.category.into(),
                subcategories: node.subcategories.into_iter().map(Into::into).collect(),
            })
            .collect(),
    ))
}
