//! Integration tests for the payment webhook endpoint.

use anyhow::Result;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use marketplace::{
    models::user::Role,
    payments::{
        PurchasedLineItem,
        webhook::{signature_header, unix_now},
    },
    repositories::{OrderRepository, TenantRepository},
};
use serde_json::{Value, json};

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{
    TestApp, TestResponse, WEBHOOK_SECRET, create_account, create_product, create_seller,
};

const WEBHOOK_PATH: &str = "/api/stripe/webhooks";

async fn deliver(app: &TestApp, event: &Value, signature: Option<String>) -> TestResponse {
    let payload = event.to_string();
    let mut builder = Request::builder()
        .method("POST")
        .uri(WEBHOOK_PATH)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header("Stripe-Signature", signature);
    }
    app.send(builder.body(Body::from(payload)).unwrap()).await
}

async fn deliver_signed(app: &TestApp, event: &Value) -> TestResponse {
    let signature =
        signature_header(event.to_string().as_bytes(), WEBHOOK_SECRET, unix_now()).unwrap();
    deliver(app, event, Some(signature)).await
}

fn checkout_completed(session_id: &str, user_id: Option<String>) -> Value {
    let metadata = match user_id {
        Some(user_id) => json!({ "userId": user_id }),
        None => json!({}),
    };
    json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "account": "acct_alice",
        "data": { "object": { "id": session_id, "metadata": metadata } }
    })
}

#[tokio::test]
async fn rejects_invalid_signatures() -> Result<()> {
    let app = TestApp::new().await?;
    let event = json!({ "type": "account.updated", "data": { "object": { "id": "acct_x" } } });

    let unsigned = deliver(&app, &event, None).await;
    assert_eq!(unsigned.status, StatusCode::BAD_REQUEST);
    assert!(
        unsigned.body["error"]
            .as_str()
            .unwrap()
            .starts_with("Webhook error:")
    );

    let forged = signature_header(event.to_string().as_bytes(), "whsec_other", unix_now())?;
    let forged = deliver(&app, &event, Some(forged)).await;
    assert_eq!(forged.status, StatusCode::BAD_REQUEST);
    assert!(
        forged.body["error"]
            .as_str()
            .unwrap()
            .starts_with("Webhook error:")
    );
    Ok(())
}

#[tokio::test]
async fn rejects_deliveries_when_secret_is_missing() -> Result<()> {
    let mut config = test_utils::test_config();
    config.stripe.webhook_secret = None;
    let app = TestApp::with_config(config).await?;
    let event = json!({ "type": "account.updated", "data": { "object": { "id": "acct_x" } } });

    let response = deliver_signed(&app, &event).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn completed_checkout_creates_orders_once() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;
    let buyer = create_seller(&app, "bob").await?;
    let icons = create_product(&app.db, seller.tenant.id, "Icons", 1250).await?;
    let fonts = create_product(&app.db, seller.tenant.id, "Fonts", 900).await?;

    app.payments.set_line_items(
        "cs_test_42",
        vec![
            PurchasedLineItem {
                name: "Icons".to_string(),
                product_id: Some(icons.id.to_string()),
            },
            PurchasedLineItem {
                name: "Fonts".to_string(),
                product_id: Some(fonts.id.to_string()),
            },
        ],
    );
    let event = checkout_completed("cs_test_42", Some(buyer.user.id.to_string()));

    let response = deliver_signed(&app, &event).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Received");

    let lookups = app.payments.line_item_lookups.lock().unwrap().clone();
    assert_eq!(
        lookups,
        vec![("cs_test_42".to_string(), Some("acct_alice".to_string()))]
    );

    let orders = OrderRepository::new(&app.db);
    assert!(orders.has_purchased(buyer.user.id, icons.id).await?);
    assert!(orders.has_purchased(buyer.user.id, fonts.id).await?);

    // Redelivery of the same event must not duplicate entitlements
    let again = deliver_signed(&app, &event).await;
    assert_eq!(again.status, StatusCode::OK);
    let order = orders
        .find_for_user_and_product(buyer.user.id, icons.id)
        .await?
        .unwrap();
    assert_eq!(order.stripe_checkout_session_id, "cs_test_42");
    assert_eq!(order.name, "Icons");

    let library = app.get("/api/library", Some(&buyer.token)).await;
    assert_eq!(library.body["totalDocs"], 2);
    Ok(())
}

#[tokio::test]
async fn completed_checkout_without_user_fails() -> Result<()> {
    let app = TestApp::new().await?;
    let event = checkout_completed("cs_test_1", None);

    let response = deliver_signed(&app, &event).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["error"], "Webhook handler failed");
    assert!(app.payments.line_item_lookups.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn completed_checkout_without_line_items_fails() -> Result<()> {
    let app = TestApp::new().await?;
    let buyer = create_seller(&app, "bob").await?;
    let event = checkout_completed("cs_test_empty", Some(buyer.user.id.to_string()));

    let response = deliver_signed(&app, &event).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    Ok(())
}

#[tokio::test]
async fn account_updated_marks_details_submitted() -> Result<()> {
    let app = TestApp::new().await?;
    create_account(&app.db, &app.config, "alice", vec![Role::User], false).await?;

    let event = json!({
        "id": "evt_2",
        "type": "account.updated",
        "data": { "object": { "id": "acct_alice", "details_submitted": true } }
    });
    let response = deliver_signed(&app, &event).await;
    assert_eq!(response.status, StatusCode::OK);

    let tenant = TenantRepository::new(&app.db)
        .find_by_slug("alice")
        .await?
        .unwrap();
    assert!(tenant.stripe_details_submitted);
    Ok(())
}

#[tokio::test]
async fn unknown_events_are_acknowledged() -> Result<()> {
    let app = TestApp::new().await?;
    let event = json!({
        "id": "evt_3",
        "type": "invoice.paid",
        "data": { "object": { "id": "in_1" } }
    });

    let response = deliver_signed(&app, &event).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Received");
    Ok(())
}
