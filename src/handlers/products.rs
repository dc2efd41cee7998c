//! # Products API Handlers
//!
//! Marketplace listing and product pages. The same code paths back the
//! tenant storefront routes under `/tenants/{slug}`.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State, rejection::QueryRejection},
    response::Json,
};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::MaybeUser;
use crate::error::{ApiError, not_found, validation_error};
use crate::handlers::types::{MediaDto, PaginatedResponse, ProductDetailDto, ProductDto, TenantDto};
use crate::models::{media, product, tenant};
use crate::money::{cents_to_decimal, max_bound_cents, min_bound_cents, parse_amount};
use crate::ratings::{ReviewSummary, rating_distribution};
use crate::repositories::product::{ProductFilter, ProductSort};
use crate::repositories::{
    CategoryRepository, MediaRepository, OrderRepository, ProductRepository, ReviewRepository,
    TagRepository, TenantRepository,
};
use crate::server::AppState;

const PRODUCT_NOT_FOUND: &str = "Product not found";

/// Query parameters for product listings
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ProductListQuery {
    /// Words that must all appear in the product name (case-insensitive)
    pub search: Option<String>,
    /// 1-based page number
    pub cursor: Option<u64>,
    /// Page size
    pub limit: Option<u64>,
    /// Category slug; subcategories match too
    pub category: Option<String>,
    /// Minimum price in USD
    pub min_price: Option<String>,
    /// Maximum price in USD
    pub max_price: Option<String>,
    /// Comma-separated tag names; products with any of them match
    pub tags: Option<String>,
    #[param(inline)]
    pub sort: Option<ProductSort>,
    /// Restrict to one storefront (includes its private products)
    pub tenant_slug: Option<String>,
}

/// Parse a path ID, answering malformed IDs like unknown ones
pub(crate) fn parse_id(raw: &str, not_found_message: &str) -> Result<Uuid, ApiError> {
    raw.trim()
        .parse::<Uuid>()
        .map_err(|_| not_found(not_found_message))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_price_bound(raw: Option<&str>, field: &str) -> Result<Option<Decimal>, ApiError> {
    match non_empty(raw) {
        None => Ok(None),
        Some(raw) => parse_amount(raw).map(Some).map_err(|e| {
            validation_error(
                &format!("Invalid {field}"),
                serde_json::json!({ field: e.to_string() }),
            )
        }),
    }
}

fn build_product_dto(
    product: product::Model,
    tenants: &HashMap<Uuid, tenant::Model>,
    media: &HashMap<Uuid, media::Model>,
    summary: ReviewSummary,
    tags: Vec<String>,
) -> ProductDto {
    let tenant = tenants.get(&product.tenant_id).map(|tenant| {
        let image = tenant.image_id.and_then(|id| media.get(&id)).cloned();
        TenantDto::new(tenant.clone(), image)
    });
    let image = product
        .image_id
        .and_then(|id| media.get(&id))
        .cloned()
        .map(MediaDto::from);

    ProductDto {
        id: product.id,
        name: product.name,
        description: product.description,
        price: cents_to_decimal(product.price_cents),
        refund_policy: product.refund_policy,
        category_id: product.category_id,
        tags,
        is_private: product.is_private,
        tenant,
        image,
        review_count: summary.review_count,
        review_rating: summary.review_rating,
        created_at: product.created_at,
        updated_at: product.updated_at,
    }
}

/// Load the relations every product response carries, preserving order
pub(crate) async fn present_products(
    db: &DatabaseConnection,
    products: Vec<product::Model>,
) -> Result<Vec<ProductDto>, ApiError> {
    if products.is_empty() {
        return Ok(Vec::new());
    }

    let product_ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let tenants = TenantRepository::new(db)
        .find_by_ids(products.iter().map(|p| p.tenant_id))
        .await?;

    let media_ids: Vec<Uuid> = products
        .iter()
        .filter_map(|p| p.image_id)
        .chain(tenants.values().filter_map(|t| t.image_id))
        .collect();
    let media = MediaRepository::new(db).find_by_ids(media_ids).await?;

    let mut ratings = ReviewRepository::new(db)
        .ratings_for_products(&product_ids)
        .await?;
    let mut tags = TagRepository::new(db)
        .names_for_products(&product_ids)
        .await?;

    Ok(products
        .into_iter()
        .map(|product| {
            let summary =
                ReviewSummary::from_ratings(&ratings.remove(&product.id).unwrap_or_default());
            let product_tags = tags.remove(&product.id).unwrap_or_default();
            build_product_dto(product, &tenants, &media, summary, product_tags)
        })
        .collect())
}

pub(crate) async fn present_product(
    db: &DatabaseConnection,
    product: product::Model,
) -> Result<ProductDto, ApiError> {
    present_products(db, vec![product])
        .await?
        .pop()
        .ok_or_else(|| not_found(PRODUCT_NOT_FOUND))
}

/// Run a listing; `storefront_slug` pins the tenant for storefront routes
pub(crate) async fn list_products_for(
    state: &AppState,
    query: ProductListQuery,
    storefront_slug: Option<&str>,
) -> Result<PaginatedResponse<ProductDto>, ApiError> {
    let page = crate::cursor::PageRequest::from_query(query.cursor, query.limit)?;

    let min_price = parse_price_bound(query.min_price.as_deref(), "minPrice")?;
    let max_price = parse_price_bound(query.max_price.as_deref(), "maxPrice")?;

    let category_ids = match non_empty(query.category.as_deref()) {
        Some(slug) => {
            let categories = CategoryRepository::new(&state.db);
            match categories.find_by_slug(slug).await? {
                Some(category) => Some(categories.subtree_ids(category.id).await?),
                None => None,
            }
        }
        None => None,
    };

    let tag_names = query
        .tags
        .as_deref()
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let tenant_slug = storefront_slug
        .or(non_empty(query.tenant_slug.as_deref()))
        .map(str::to_string);

    let filter = ProductFilter {
        search: non_empty(query.search.as_deref()).map(str::to_string),
        min_price_cents: min_price.map(min_bound_cents),
        max_price_cents: max_price.map(max_bound_cents),
        tenant_slug,
        category_ids,
        tag_names,
        sort: query.sort.unwrap_or_default(),
    };

    let result = ProductRepository::new(&state.db).list(&filter, page).await?;
    let docs = present_products(&state.db, result.products).await?;

    Ok(PaginatedResponse::new(docs, page, result.total))
}

/// Build a product page; `storefront_slug` rejects products of other tenants
pub(crate) async fn product_detail_for(
    state: &AppState,
    user: Option<&crate::models::user::Model>,
    raw_id: &str,
    storefront_slug: Option<&str>,
) -> Result<ProductDetailDto, ApiError> {
    let id = parse_id(raw_id, PRODUCT_NOT_FOUND)?;
    let product = ProductRepository::new(&state.db)
        .find_active(id)
        .await?
        .ok_or_else(|| not_found(PRODUCT_NOT_FOUND))?;

    if let Some(slug) = storefront_slug {
        let owner = TenantRepository::new(&state.db)
            .find_by_id(product.tenant_id)
            .await?;
        if owner.is_none_or(|tenant| !tenant.slug.eq_ignore_ascii_case(slug)) {
            return Err(not_found(PRODUCT_NOT_FOUND));
        }
    }

    let is_purchased = match user {
        Some(user) => {
            OrderRepository::new(&state.db)
                .has_purchased(user.id, product.id)
                .await?
        }
        None => false,
    };

    let ratings = ReviewRepository::new(&state.db)
        .ratings_for_products(&[product.id])
        .await?
        .remove(&product.id)
        .unwrap_or_default();

    Ok(ProductDetailDto {
        product: present_product(&state.db, product).await?,
        is_purchased,
        rating_distribution: rating_distribution(&ratings),
    })
}

/// List marketplace products
#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductListQuery),
    responses(
        (status = 200, description = "One page of products", body = PaginatedResponse<ProductDto>),
        (status = 400, description = "Invalid filter or pagination values", body = ApiError)
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    query: Result<Query<ProductListQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<ProductDto>>, ApiError> {
    let Query(query) = query?;
    Ok(Json(list_products_for(&state, query, None).await?))
}

/// Get a product page
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = String, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product with tenant, image and review stats", body = ProductDetailDto),
        (status = 404, description = "Product not found or archived", body = ApiError)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<ProductDetailDto>, ApiError> {
    Ok(Json(
        product_detail_for(&state, user.as_ref(), &id, None).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_price_bounds_are_ignored() {
        assert_eq!(parse_price_bound(None, "minPrice").unwrap(), None);
        assert_eq!(parse_price_bound(Some("  "), "minPrice").unwrap(), None);
        assert_eq!(
            parse_price_bound(Some("9.99"), "minPrice").unwrap(),
            Some(Decimal::new(999, 2))
        );
    }

    #[test]
    fn invalid_price_bounds_are_rejected() {
        let err = parse_price_bound(Some("cheap"), "maxPrice").unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
        assert!(err.details.unwrap().get("maxPrice").is_some());
    }

    #[test]
    fn malformed_ids_read_as_not_found() {
        let err = parse_id("not-a-uuid", PRODUCT_NOT_FOUND).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::NOT_FOUND);
        assert_eq!(&*err.message, PRODUCT_NOT_FOUND);
    }
}
