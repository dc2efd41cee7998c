//! # Library API Handlers
//!
//! A buyer's purchased products. Only the library reveals product content.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State, rejection::QueryRejection},
    response::Json,
};

use crate::auth::AuthUser;
use crate::error::{ApiError, not_found};
use crate::handlers::products::{parse_id, present_product, present_products};
use crate::handlers::types::{LibraryProductDto, PageQuery, PaginatedResponse, ProductDto};
use crate::repositories::{OrderRepository, ProductRepository};
use crate::server::AppState;

/// List the caller's purchased products, most recent purchase first
#[utoipa::path(
    get,
    path = "/api/library",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of purchased products", body = PaginatedResponse<ProductDto>),
        (status = 401, description = "Not authenticated", body = ApiError)
    ),
    tag = "library"
)]
pub async fn list_library(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<ProductDto>>, ApiError> {
    let Query(query) = query?;
    let page = query.page_request()?;

    let (orders, total) = OrderRepository::new(&state.db)
        .list_for_user(user.id, page)
        .await?;

    let mut product_ids = Vec::with_capacity(orders.len());
    for order in &orders {
        if !product_ids.contains(&order.product_id) {
            product_ids.push(order.product_id);
        }
    }

    let mut by_id: HashMap<_, _> = ProductRepository::new(&state.db)
        .find_by_ids(&product_ids)
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect();
    let products = product_ids
        .iter()
        .filter_map(|id| by_id.remove(id))
        .collect();

    let docs = present_products(&state.db, products).await?;
    Ok(Json(PaginatedResponse::new(docs, page, total)))
}

/// A purchased product with its content
#[utoipa::path(
    get,
    path = "/api/library/{product_id}",
    params(("product_id" = String, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Purchased product including content", body = LibraryProductDto),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "No order for this product, or product missing", body = ApiError)
    ),
    tag = "library"
)]
pub async fn get_library_product(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(product_id): Path<String>,
) -> Result<Json<LibraryProductDto>, ApiError> {
    let product_id = parse_id(&product_id, "Order not found")?;

    OrderRepository::new(&state.db)
        .find_for_user_and_product(user.id, product_id)
        .await?
        .ok_or_else(|| not_found("Order not found"))?;

    let product = ProductRepository::new(&state.db)
        .find_by_id(product_id)
        .await?
        .ok_or_else(|| not_found("Product not found"))?;

    let content = product.content.clone();
    Ok(Json(LibraryProductDto {
        product: present_product(&state.db, product).await?,
        content,
    }))
}
