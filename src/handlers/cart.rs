//! # Cart API Handlers
//!
//! Server-side shopper carts, one per storefront. A cart is addressed by an
//! opaque token carried in the `{prefix}-cart` cookie or the `X-Cart-Token`
//! header; unknown or missing tokens start an empty cart.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, header::SET_COOKIE},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{build_cookie, generate_session_token, read_cookie};
use crate::cart::{CartState, TenantCart};
use crate::error::{ApiError, bad_request};
use crate::handlers::products::parse_id;
use crate::repositories::CartRepository;
use crate::server::AppState;

pub const CART_TOKEN_HEADER: &str = "x-cart-token";

/// Carts untouched for this long are purged along with their cookie
pub const CART_TTL_SECONDS: i64 = 60 * 60 * 24 * 30;
const MAX_CART_TOKEN_LENGTH: usize = 128;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Uuid,
}

/// Every cart of the shopper, keyed by tenant slug
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub token: String,
    pub tenant_carts: BTreeMap<String, TenantCart>,
}

fn is_well_formed_token(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_CART_TOKEN_LENGTH
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Cart token from the cookie, then the header
fn presented_token(state: &AppState, headers: &HeaderMap) -> Option<String> {
    read_cookie(headers, &state.config.cart_cookie_name())
        .or_else(|| {
            headers
                .get(CART_TOKEN_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.trim().to_string())
        })
        .filter(|token| is_well_formed_token(token))
}

fn normalize_slug(tenant_slug: &str) -> Result<String, ApiError> {
    let slug = tenant_slug.trim().to_lowercase();
    if slug.is_empty() {
        return Err(bad_request("Tenant slug is required"));
    }
    Ok(slug)
}

async fn load_cart(state: &AppState, headers: &HeaderMap) -> Result<(String, CartState), ApiError> {
    if let Some(token) = presented_token(state, headers) {
        if let Some(cart) = CartRepository::new(&state.db).load(&token).await? {
            return Ok((token, cart));
        }
        return Ok((token, CartState::new()));
    }
    Ok((generate_session_token(), CartState::new()))
}

async fn save_cart(
    state: &AppState,
    token: String,
    cart: CartState,
) -> Result<(HeaderMap, Json<CartResponse>), ApiError> {
    CartRepository::new(&state.db).save(&token, &cart).await?;
    cart_response(state, token, cart)
}

fn cart_response(
    state: &AppState,
    token: String,
    cart: CartState,
) -> Result<(HeaderMap, Json<CartResponse>), ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        build_cookie(
            &state.config,
            &state.config.cart_cookie_name(),
            &token,
            CART_TTL_SECONDS,
        )?,
    );

    Ok((
        headers,
        Json(CartResponse {
            token,
            tenant_carts: cart.tenant_carts().clone(),
        }),
    ))
}

/// Current carts
#[utoipa::path(
    get,
    path = "/api/cart",
    responses((status = 200, description = "All carts of the shopper", body = CartResponse)),
    tag = "cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<CartResponse>), ApiError> {
    let (token, cart) = load_cart(&state, &headers).await?;
    cart_response(&state, token, cart)
}

/// Add a product to a storefront cart
#[utoipa::path(
    post,
    path = "/api/cart/{tenant_slug}/items",
    params(("tenant_slug" = String, Path, description = "Tenant slug")),
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Updated carts", body = CartResponse),
        (status = 400, description = "Invalid request", body = ApiError)
    ),
    tag = "cart"
)]
pub async fn add_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(tenant_slug): Path<String>,
    payload: Result<Json<AddToCartRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<CartResponse>), ApiError> {
    let Json(request) = payload?;
    let slug = normalize_slug(&tenant_slug)?;

    let (token, mut cart) = load_cart(&state, &headers).await?;
    if !cart.is_product_in_cart(&slug, request.product_id) {
        cart.add_product(&slug, request.product_id);
    }
    save_cart(&state, token, cart).await
}

/// Add the product when absent, remove it otherwise
#[utoipa::path(
    post,
    path = "/api/cart/{tenant_slug}/items/{product_id}/toggle",
    params(
        ("tenant_slug" = String, Path, description = "Tenant slug"),
        ("product_id" = String, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Updated carts", body = CartResponse),
        (status = 404, description = "Malformed product ID", body = ApiError)
    ),
    tag = "cart"
)]
pub async fn toggle_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((tenant_slug, product_id)): Path<(String, String)>,
) -> Result<(HeaderMap, Json<CartResponse>), ApiError> {
    let slug = normalize_slug(&tenant_slug)?;
    let product_id = parse_id(&product_id, "Product not found")?;

    let (token, mut cart) = load_cart(&state, &headers).await?;
    cart.toggle_product(&slug, product_id);
    save_cart(&state, token, cart).await
}

/// Remove a product from a storefront cart
#[utoipa::path(
    delete,
    path = "/api/cart/{tenant_slug}/items/{product_id}",
    params(
        ("tenant_slug" = String, Path, description = "Tenant slug"),
        ("product_id" = String, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Updated carts", body = CartResponse),
        (status = 404, description = "Malformed product ID", body = ApiError)
    ),
    tag = "cart"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((tenant_slug, product_id)): Path<(String, String)>,
) -> Result<(HeaderMap, Json<CartResponse>), ApiError> {
    let slug = normalize_slug(&tenant_slug)?;
    let product_id = parse_id(&product_id, "Product not found")?;

    let (token, mut cart) = load_cart(&state, &headers).await?;
    cart.remove_product(&slug, product_id);
    save_cart(&state, token, cart).await
}

/// Empty one storefront cart
#[utoipa::path(
    delete,
    path = "/api/cart/{tenant_slug}",
    params(("tenant_slug" = String, Path, description = "Tenant slug")),
    responses((status = 200, description = "Updated carts", body = CartResponse)),
    tag = "cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(tenant_slug): Path<String>,
) -> Result<(HeaderMap, Json<CartResponse>), ApiError> {
    let slug = normalize_slug(&tenant_slug)?;

    let (token, mut cart) = load_cart(&state, &headers).await?;
    cart.clear_cart(&slug);
    save_cart(&state, token, cart).await
}

/// Empty every cart
#[utoipa::path(
    delete,
    path = "/api/cart",
    responses((status = 200, description = "Empty carts", body = CartResponse)),
    tag = "cart"
)]
pub async fn clear_all_carts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<CartResponse>), ApiError> {
    let (token, mut cart) = load_cart(&state, &headers).await?;
    cart.clear_all_carts();
    save_cart(&state, token, cart).await
}
