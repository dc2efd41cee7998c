//! # Reviews API Handlers
//!
//! Buyers rate products 1 to 5 stars. Each user may review a product once
//! and only the author may edit a review.

use axum::{
    extract::{Path, State, rejection::JsonRejection},
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, bad_request, not_found, unauthorized};
use crate::handlers::products::parse_id;
use crate::handlers::types::ReviewDto;
use crate::repositories::{ProductRepository, ReviewRepository};
use crate::server::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub product_id: Uuid,
    /// Stars, 1 to 5
    #[schema(minimum = 1, maximum = 5)]
    pub rating: i32,
    /// At least 3 characters
    pub description: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReviewRequest {
    #[schema(minimum = 1, maximum = 5)]
    pub rating: i32,
    pub description: String,
}

/// The caller's review of a product
#[utoipa::path(
    get,
    path = "/api/reviews/{id}",
    params(("id" = String, Path, description = "Product ID")),
    responses(
        (status = 200, description = "The caller's review, or null", body = Option<ReviewDto>),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "Product not found", body = ApiError)
    ),
    tag = "reviews"
)]
pub async fn get_review(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(product_id): Path<String>,
) -> Result<Json<Option<ReviewDto>>, ApiError> {
    let product_id = parse_id(&product_id, "Product not found")?;
    ProductRepository::new(&state.db)
        .find_by_id(product_id)
        .await?
        .ok_or_else(|| not_found("Product not found"))?;

    let review = ReviewRepository::new(&state.db)
        .find_by_user_and_product(user.id, product_id)
        .await?;

    Ok(Json(review.map(ReviewDto::from)))
}

/// Review a product
#[utoipa::path(
    post,
    path = "/api/reviews",
    request_body = CreateReviewRequest,
    responses(
        (status = 200, description = "Review created", body = ReviewDto),
        (status = 400, description = "Invalid review or already reviewed", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "Product not found", body = ApiError)
    ),
    tag = "reviews"
)]
pub async fn create_review(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> Result<Json<ReviewDto>, ApiError> {
    let Json(request) = payload?;

    let product = ProductRepository::new(&state.db)
        .find_by_id(request.product_id)
        .await?
        .ok_or_else(|| not_found("Product not found"))?;

    let reviews = ReviewRepository::new(&state.db);
    if reviews
        .find_by_user_and_product(user.id, product.id)
        .await?
        .is_some()
    {
        return Err(bad_request("You have already reviewed this product"));
    }

    let review = reviews
        .create(user.id, product.id, request.rating, request.description)
        .await?;

    tracing::info!(review_id = %review.id, product_id = %product.id, "Review created");
    Ok(Json(review.into()))
}

/// Edit one of the caller's reviews
#[utoipa::path(
    patch,
    path = "/api/reviews/{id}",
    params(("id" = String, Path, description = "Review ID")),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Review updated", body = ReviewDto),
        (status = 400, description = "Invalid review", body = ApiError),
        (status = 401, description = "Not authenticated, or not the author", body = ApiError),
        (status = 404, description = "Review not found", body = ApiError)
    ),
    tag = "reviews"
)]
pub async fn update_review(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(review_id): Path<String>,
    payload: Result<Json<UpdateReviewRequest>, JsonRejection>,
) -> Result<Json<ReviewDto>, ApiError> {
    let Json(request) = payload?;
    let review_id = parse_id(&review_id, "Review not found")?;

    let reviews = ReviewRepository::new(&state.db);
    let review = reviews
        .find_by_id(review_id)
        .await?
        .ok_or_else(|| not_found("Review not found"))?;

    if review.user_id != user.id {
        return Err(unauthorized(Some("You are not allowed to update this review")));
    }

    let updated = reviews
        .update(review, request.rating, request.description)
        .await?;
    Ok(Json(updated.into()))
}
