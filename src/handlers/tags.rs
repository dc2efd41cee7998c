//! # Tags API Handlers

use axum::{
    extract::{Query, State, rejection::QueryRejection},
    response::Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::types::{PageQuery, PaginatedResponse};
use crate::models::tag;
use crate::repositories::TagRepository;
use crate::server::AppState;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TagDto {
    pub id: Uuid,
    pub name: String,
}

impl From<tag::Model> for TagDto {
    fn from(model: tag::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

/// List tags sorted by name
#[utoipa::path(
    get,
    path = "/api/tags",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of tags", body = PaginatedResponse<TagDto>),
        (status = 400, description = "Invalid pagination values", body = ApiError)
    ),
    tag = "tags"
)]
pub async fn list_tags(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<TagDto>>, ApiError> {
    let Query(query) = query?;
    let page = query.page_request()?;

    let (tags, total) = TagRepository::new(&state.db).list(page).await?;

    Ok(Json(PaginatedResponse::new(
        tags.into_iter().map(TagDto::from).collect(),
        page,
        total,
    )))
}
