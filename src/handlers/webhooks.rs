//! # Webhook Handlers
//!
//! Payment provider callbacks. Deliveries are authenticated by the
//! `Stripe-Signature` HMAC rather than a user session, so the raw body is
//! verified before it is decoded.

use anyhow::{Context, anyhow};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use metrics::counter;
use serde::Serialize;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::payments::webhook::{
    ACCOUNT_UPDATED, CHECKOUT_SESSION_COMPLETED, SIGNATURE_HEADER, StripeEvent, WebhookError,
    construct_event,
};
use crate::repositories::order::{CompletedCheckout, PurchasedProduct};
use crate::repositories::{OrderRepository, TenantRepository, UserRepository};
use crate::server::AppState;

/// Webhook acknowledgement or failure
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookResponse {
    fn received() -> (StatusCode, Json<Self>) {
        (
            StatusCode::OK,
            Json(Self {
                message: Some("Received".to_string()),
                error: None,
            }),
        )
    }

    fn failed(status: StatusCode, error: String) -> (StatusCode, Json<Self>) {
        (
            status,
            Json(Self {
                message: None,
                error: Some(error),
            }),
        )
    }
}

fn verify_delivery(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<StripeEvent, WebhookError> {
    let secret = state
        .config
        .stripe
        .webhook_secret
        .as_deref()
        .filter(|secret| !secret.is_empty())
        .ok_or(WebhookError::NotConfigured)?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;

    construct_event(
        body,
        signature,
        secret,
        state.config.stripe.webhook_tolerance_seconds,
    )
}

async fn handle_checkout_completed(state: &AppState, event: &StripeEvent) -> anyhow::Result<()> {
    let session = event
        .checkout_session()
        .context("Malformed checkout session object")?;

    let user_id = session
        .user_id()
        .ok_or_else(|| anyhow!("User ID is required"))?
        .parse::<Uuid>()
        .context("User ID is not a valid UUID")?;

    let user = UserRepository::new(&state.db)
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| anyhow!("User not found"))?;

    let line_items = state
        .payments
        .retrieve_line_items(&session.id, event.account.as_deref())
        .await?;
    if line_items.is_empty() {
        return Err(anyhow!("No line items found"));
    }

    let mut items = Vec::with_capacity(line_items.len());
    for line_item in line_items {
        let product_id = line_item
            .product_id
            .as_deref()
            .ok_or_else(|| anyhow!("Line item '{}' has no product ID", line_item.name))?
            .parse::<Uuid>()
            .with_context(|| format!("Line item '{}' has an invalid product ID", line_item.name))?;
        items.push(PurchasedProduct {
            name: line_item.name,
            product_id,
        });
    }

    let created = OrderRepository::new(&state.db)
        .record_checkout(CompletedCheckout {
            user_id: user.id,
            checkout_session_id: session.id.clone(),
            stripe_account_id: event.account.clone(),
            items,
        })
        .await?;

    info!(
        user_id = %user.id,
        checkout_session_id = %session.id,
        orders_created = created.len(),
        "Recorded completed checkout"
    );
    Ok(())
}

async fn handle_account_updated(state: &AppState, event: &StripeEvent) -> anyhow::Result<()> {
    let account = event.account().context("Malformed account object")?;

    let updated = TenantRepository::new(&state.db)
        .set_details_submitted(&account.id, account.details_submitted)
        .await?;

    info!(
        stripe_account_id = %account.id,
        details_submitted = account.details_submitted,
        tenants_updated = updated,
        "Updated connected account status"
    );
    Ok(())
}

/// Receive payment provider events
#[utoipa::path(
    post,
    path = "/api/stripe/webhooks",
    request_body(content = String, description = "Raw event JSON", content_type = "application/json"),
    params(("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hex HMAC-SHA256>")),
    responses(
        (status = 200, description = "Event received", body = WebhookResponse),
        (status = 400, description = "Signature verification failed", body = WebhookResponse),
        (status = 500, description = "Event processing failed", body = WebhookResponse)
    ),
    tag = "webhooks"
)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<WebhookResponse>) {
    let event = match verify_delivery(&state, &headers, &body) {
        Ok(event) => event,
        Err(error) => {
            warn!(%error, "Rejected webhook delivery");
            counter!("webhook_deliveries_rejected_total").increment(1);
            return WebhookResponse::failed(
                StatusCode::BAD_REQUEST,
                format!("Webhook error: {error}"),
            );
        }
    };

    info!(
        event_id = event.id.as_deref().unwrap_or_default(),
        event_type = %event.event_type,
        account = event.account.as_deref().unwrap_or_default(),
        "Received webhook event"
    );

    let outcome = match event.event_type.as_str() {
        CHECKOUT_SESSION_COMPLETED => handle_checkout_completed(&state, &event).await,
        ACCOUNT_UPDATED => handle_account_updated(&state, &event).await,
        _ => Ok(()),
    };

    let status = if outcome.is_ok() { "processed" } else { "failed" };
    counter!(
        "webhook_events_total",
        "event_type" => event.event_type.clone(),
        "status" => status
    )
    .increment(1);

    match outcome {
        Ok(()) => WebhookResponse::received(),
        Err(error) => {
            error!(
                error = %format!("{error:#}"),
                event_type = %event.event_type,
                "Webhook handler failed"
            );
            WebhookResponse::failed(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Webhook handler failed".to_string(),
            )
        }
    }
}
