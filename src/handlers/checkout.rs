//! # Checkout API Handlers
//!
//! Seller onboarding links, buyer checkout sessions and the cart summary.
//! Checkout sessions are created on the seller's connected account, with the
//! platform fee taken as an application fee.

use axum::{
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::Json,
};
use metrics::{counter, histogram};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, bad_request, forbidden, internal, not_found, validation_error};
use crate::handlers::products::present_products;
use crate::handlers::types::{ProductDto, UrlResponse};
use crate::money::{cents_to_decimal, platform_fee_cents};
use crate::payments::{CheckoutLineItem, CheckoutSessionRequest, LineItemMetadata};
use crate::repositories::{ProductRepository, TenantRepository};
use crate::server::AppState;

const CURRENCY: &str = "usd";

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    /// Products to buy, all from the same storefront
    pub product_ids: Vec<Uuid>,
    pub tenant_slug: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CheckoutProductsQuery {
    /// Comma-separated product IDs
    pub ids: Option<String>,
}

/// Products in a cart with their combined price
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutProductsResponse {
    pub docs: Vec<ProductDto>,
    pub total_docs: u64,
    /// Sum of prices in USD
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total_price: Decimal,
}

/// Start payment onboarding for the caller's storefront
#[utoipa::path(
    post,
    path = "/api/checkout/verify",
    responses(
        (status = 200, description = "Onboarding link", body = UrlResponse),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 404, description = "Caller has no storefront", body = ApiError),
        (status = 502, description = "Payment provider error", body = ApiError)
    ),
    tag = "checkout"
)]
pub async fn verify(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<UrlResponse>, ApiError> {
    let tenant = TenantRepository::new(&state.db)
        .first_for_user(user.id)
        .await?
        .ok_or_else(|| not_found("Tenant not found"))?;

    let admin_url = format!("{}/admin", state.config.app_url.trim_end_matches('/'));
    let url = state
        .payments
        .create_account_link(&tenant.stripe_account_id, &admin_url, &admin_url)
        .await?;

    tracing::info!(tenant_id = %tenant.id, "Created payment onboarding link");
    Ok(Json(UrlResponse { url }))
}

/// Create a checkout session for products of one storefront
#[utoipa::path(
    post,
    path = "/api/checkout/purchase",
    request_body = PurchaseRequest,
    responses(
        (status = 200, description = "Hosted checkout URL", body = UrlResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 403, description = "Tenant cannot sell yet", body = ApiError),
        (status = 404, description = "Products or tenant not found", body = ApiError),
        (status = 500, description = "Checkout session has no URL", body = ApiError)
    ),
    tag = "checkout"
)]
pub async fn purchase(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<PurchaseRequest>, JsonRejection>,
) -> Result<Json<UrlResponse>, ApiError> {
    let Json(request) = payload?;

    let tenant_slug = request.tenant_slug.trim();
    if request.product_ids.is_empty() {
        return Err(validation_error(
            "Invalid purchase request",
            serde_json::json!({ "productIds": "At least one product is required" }),
        ));
    }
    if tenant_slug.is_empty() {
        return Err(validation_error(
            "Invalid purchase request",
            serde_json::json!({ "tenantSlug": "Tenant slug is required" }),
        ));
    }

    // A repeated id matches one row, so duplicates fail the count check
    let products = ProductRepository::new(&state.db)
        .find_active_by_ids(&request.product_ids, Some(tenant_slug))
        .await?;
    if products.len() != request.product_ids.len() {
        return Err(not_found("Products not found"));
    }

    let tenant = TenantRepository::new(&state.db)
        .find_by_slug(tenant_slug)
        .await?
        .ok_or_else(|| not_found("Tenant not found"))?;
    if tenant.stripe_account_id.trim().is_empty() {
        return Err(forbidden(Some("Tenant not allowed to sell products")));
    }

    let line_items: Vec<CheckoutLineItem> = products
        .iter()
        .map(|product| CheckoutLineItem {
            name: product.name.clone(),
            unit_amount_cents: product.price_cents,
            currency: CURRENCY.to_string(),
            metadata: LineItemMetadata {
                stripe_account_id: tenant.stripe_account_id.clone(),
                product_id: product.id,
                name: product.name.clone(),
                price: cents_to_decimal(product.price_cents).to_string(),
            },
        })
        .collect();

    let total_cents = products
        .iter()
        .try_fold(0i64, |total, product| total.checked_add(product.price_cents))
        .ok_or_else(|| bad_request("Order total is too large"))?;
    let application_fee_cents =
        platform_fee_cents(total_cents, state.config.stripe.platform_fee_percentage);

    let tenant_url = state.config.tenant_url(&tenant.slug);
    let session = state
        .payments
        .create_checkout_session(
            &tenant.stripe_account_id,
            &CheckoutSessionRequest {
                customer_email: user.email.clone(),
                success_url: format!("{tenant_url}/checkout?success=true"),
                cancel_url: format!("{tenant_url}/checkout?cancel=true"),
                user_id: user.id,
                line_items,
                application_fee_cents,
            },
        )
        .await?;

    tracing::info!(
        user_id = %user.id,
        tenant_id = %tenant.id,
        checkout_session_id = %session.id,
        total_cents,
        application_fee_cents,
        "Created checkout session"
    );
    counter!("checkout_sessions_created_total").increment(1);
    histogram!("checkout_total_cents").record(total_cents as f64);

    let url = session
        .url
        .ok_or_else(|| internal("Failed to create checkout session"))?;
    Ok(Json(UrlResponse { url }))
}

/// Load cart products and their total
#[utoipa::path(
    get,
    path = "/api/checkout/products",
    params(CheckoutProductsQuery),
    responses(
        (status = 200, description = "Products and total price", body = CheckoutProductsResponse),
        (status = 404, description = "A product is missing or archived", body = ApiError)
    ),
    tag = "checkout"
)]
pub async fn get_products(
    State(state): State<AppState>,
    query: Result<Query<CheckoutProductsQuery>, QueryRejection>,
) -> Result<Json<CheckoutProductsResponse>, ApiError> {
    let Query(query) = query?;

    let mut ids = Vec::new();
    for raw in query.ids.as_deref().unwrap_or_default().split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let id = raw
            .parse::<Uuid>()
            .map_err(|_| not_found("Product not found"))?;
        ids.push(id);
    }

    let products = ProductRepository::new(&state.db)
        .find_active_by_ids(&ids, None)
        .await?;
    if products.len() != ids.len() {
        return Err(not_found("Product not found"));
    }

    let total_price: Decimal = products
        .iter()
        .map(|product| cents_to_decimal(product.price_cents))
        .sum();
    let docs = present_products(&state.db, products).await?;

    Ok(Json(CheckoutProductsResponse {
        total_docs: docs.len() as u64,
        docs,
        total_price,
    }))
}
