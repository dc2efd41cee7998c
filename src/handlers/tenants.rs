//! # Tenants API Handlers
//!
//! Public storefront lookups. The `/tenants/{slug}` routes are the targets
//! of the subdomain rewrite, so `acme.example.com/products` lands here.

use axum::{
    extract::{Path, Query, State, rejection::QueryRejection},
    response::Json,
};

use crate::auth::MaybeUser;
use crate::error::{ApiError, bad_request, not_found};
use crate::handlers::products::{ProductListQuery, list_products_for, product_detail_for};
use crate::handlers::types::{PaginatedResponse, ProductDetailDto, ProductDto, TenantDto};
use crate::repositories::{MediaRepository, TenantRepository};
use crate::server::AppState;

pub(crate) async fn load_tenant(state: &AppState, slug: &str) -> Result<TenantDto, ApiError> {
    let slug = slug.trim();
    if slug.is_empty() {
        return Err(bad_request("Tenant slug is required"));
    }

    let tenant = TenantRepository::new(&state.db)
        .find_by_slug(slug)
        .await?
        .ok_or_else(|| not_found(&format!("Tenant with slug '{}' not found", slug)))?;

    let image = match tenant.image_id {
        Some(image_id) => MediaRepository::new(&state.db).find_by_id(image_id).await?,
        None => None,
    };

    Ok(TenantDto::new(tenant, image))
}

/// Get a tenant by slug
#[utoipa::path(
    get,
    path = "/api/tenants/{slug}",
    params(("slug" = String, Path, description = "Tenant slug")),
    responses(
        (status = 200, description = "Tenant with image", body = TenantDto),
        (status = 400, description = "Empty slug", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError)
    ),
    tag = "tenants"
)]
pub async fn get_tenant(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<TenantDto>, ApiError> {
    Ok(Json(load_tenant(&state, &slug).await?))
}

/// Storefront home
#[utoipa::path(
    get,
    path = "/tenants/{slug}",
    params(("slug" = String, Path, description = "Tenant slug")),
    responses(
        (status = 200, description = "Tenant with image", body = TenantDto),
        (status = 404, description = "Tenant not found", body = ApiError)
    ),
    tag = "storefront"
)]
pub async fn storefront_home(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<TenantDto>, ApiError> {
    Ok(Json(load_tenant(&state, &slug).await?))
}

/// Storefront product listing, including the tenant's private products
#[utoipa::path(
    get,
    path = "/tenants/{slug}/products",
    params(("slug" = String, Path, description = "Tenant slug"), ProductListQuery),
    responses(
        (status = 200, description = "One page of the tenant's products", body = PaginatedResponse<ProductDto>),
        (status = 400, description = "Invalid filter or pagination values", body = ApiError),
        (status = 404, description = "Tenant not found", body = ApiError)
    ),
    tag = "storefront"
)]
pub async fn storefront_products(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    query: Result<Query<ProductListQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<ProductDto>>, ApiError> {
    let Query(query) = query?;
    let tenant = load_tenant(&state, &slug).await?;

    Ok(Json(
        list_products_for(&state, query, Some(&tenant.slug)).await?,
    ))
}

/// Storefront product page
#[utoipa::path(
    get,
    path = "/tenants/{slug}/products/{id}",
    params(
        ("slug" = String, Path, description = "Tenant slug"),
        ("id" = String, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product page", body = ProductDetailDto),
        (status = 404, description = "Tenant or product not found", body = ApiError)
    ),
    tag = "storefront"
)]
pub async fn storefront_product(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path((slug, id)): Path<(String, String)>,
) -> Result<Json<ProductDetailDto>, ApiError> {
    let tenant = load_tenant(&state, &slug).await?;

    Ok(Json(
        product_detail_for(&state, user.as_ref(), &id, Some(&tenant.slug)).await?,
    ))
}
