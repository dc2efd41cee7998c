//! Integration tests for seller onboarding and buyer checkout.

use anyhow::Result;
use axum::http::StatusCode;
use marketplace::models::user::Role;
use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};
use serde_json::json;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{TestApp, create_account, create_product, create_seller};

#[tokio::test]
async fn verify_returns_onboarding_link_for_first_tenant() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;

    let response = app
        .post("/api/checkout/verify", Some(&seller.token), json!({}))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body["url"],
        "https://connect.stripe.test/setup/acct_alice"
    );
    let links = app.payments.account_links.lock().unwrap().clone();
    assert_eq!(
        links,
        vec![(
            "acct_alice".to_string(),
            "http://localhost:3000/admin".to_string(),
            "http://localhost:3000/admin".to_string(),
        )]
    );
    Ok(())
}

#[tokio::test]
async fn purchase_creates_session_with_fee_and_metadata() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;
    let buyer = create_seller(&app, "bob").await?;
    let icons = create_product(&app.db, seller.tenant.id, "Icons", 1250).await?;
    let fonts = create_product(&app.db, seller.tenant.id, "Fonts", 2005).await?;

    let response = app
        .post(
            "/api/checkout/purchase",
            Some(&buyer.token),
            json!({ "productIds": [icons.id, fonts.id], "tenantSlug": "alice" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body["url"],
        "https://checkout.stripe.test/pay/cs_test_1"
    );

    let requests = app.payments.checkout_requests();
    assert_eq!(requests.len(), 1);
    let (account, request) = &requests[0];
    assert_eq!(account, "acct_alice");
    assert_eq!(request.customer_email, "bob@example.com");
    assert_eq!(request.user_id, buyer.user.id);
    // 10% of 32.55 rounds half away from zero
    assert_eq!(request.application_fee_cents, 326);
    assert_eq!(
        request.success_url,
        "http://localhost:3000/tenants/alice/checkout?success=true"
    );
    assert_eq!(
        request.cancel_url,
        "http://localhost:3000/tenants/alice/checkout?cancel=true"
    );
    assert_eq!(request.line_items.len(), 2);

    let icon_item = request
        .line_items
        .iter()
        .find(|item| item.name == "Icons")
        .unwrap();
    assert_eq!(icon_item.unit_amount_cents, 1250);
    assert_eq!(icon_item.currency, "usd");
    assert_eq!(icon_item.metadata.product_id, icons.id);
    assert_eq!(icon_item.metadata.stripe_account_id, "acct_alice");
    assert_eq!(icon_item.metadata.price, "12.50");
    Ok(())
}

#[tokio::test]
async fn purchase_rejects_products_from_another_tenant() -> Result<()> {
    let app = TestApp::new().await?;
    let alice = create_seller(&app, "alice").await?;
    let bob = create_seller(&app, "bob").await?;
    let bobs = create_product(&app.db, bob.tenant.id, "Bob pack", 100).await?;

    let response = app
        .post(
            "/api/checkout/purchase",
            Some(&alice.token),
            json!({ "productIds": [bobs.id], "tenantSlug": "alice" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.message(), "Products not found");
    assert!(app.payments.checkout_requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn purchase_rejects_repeated_product_ids() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;
    let buyer = create_seller(&app, "bob").await?;
    let icons = create_product(&app.db, seller.tenant.id, "Icons", 1250).await?;

    let response = app
        .post(
            "/api/checkout/purchase",
            Some(&buyer.token),
            json!({ "productIds": [icons.id, icons.id], "tenantSlug": "alice" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.message(), "Products not found");
    assert!(app.payments.checkout_requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn purchase_requires_a_payment_account() -> Result<()> {
    let app = TestApp::new().await?;
    let buyer = create_seller(&app, "bob").await?;
    let seller = create_account(&app.db, &app.config, "alice", vec![Role::User], false).await?;
    let product = create_product(&app.db, seller.tenant.id, "Icons", 100).await?;

    let mut tenant = seller.tenant.into_active_model();
    tenant.stripe_account_id = Set(String::new());
    tenant.update(&app.db).await?;

    let response = app
        .post(
            "/api/checkout/purchase",
            Some(&buyer.token),
            json!({ "productIds": [product.id], "tenantSlug": "alice" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.message(), "Tenant not allowed to sell products");
    Ok(())
}

#[tokio::test]
async fn purchase_fails_when_session_has_no_url() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;
    let buyer = create_seller(&app, "bob").await?;
    let product = create_product(&app.db, seller.tenant.id, "Icons", 100).await?;
    *app.payments.omit_checkout_url.lock().unwrap() = true;

    let response = app
        .post(
            "/api/checkout/purchase",
            Some(&buyer.token),
            json!({ "productIds": [product.id], "tenantSlug": "alice" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.message(), "Failed to create checkout session");
    Ok(())
}

#[tokio::test]
async fn purchase_validates_input_and_auth() -> Result<()> {
    let app = TestApp::new().await?;
    let buyer = create_seller(&app, "bob").await?;

    let anonymous = app
        .post(
            "/api/checkout/purchase",
            None,
            json!({ "productIds": [uuid::Uuid::new_v4()], "tenantSlug": "alice" }),
        )
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let empty = app
        .post(
            "/api/checkout/purchase",
            Some(&buyer.token),
            json!({ "productIds": [], "tenantSlug": "alice" }),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn checkout_products_sum_prices() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;
    let icons = create_product(&app.db, seller.tenant.id, "Icons", 1250).await?;
    let fonts = create_product(&app.db, seller.tenant.id, "Fonts", 2005).await?;

    let response = app
        .get(
            &format!("/api/checkout/products?ids={},{}", icons.id, fonts.id),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["totalDocs"], 2);
    assert_eq!(response.body["totalPrice"], 32.55);

    let missing = app
        .get(
            &format!("/api/checkout/products?ids={},{}", icons.id, uuid::Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.message(), "Product not found");
    Ok(())
}

#[tokio::test]
async fn checkout_products_reject_repeated_ids() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;
    let icons = create_product(&app.db, seller.tenant.id, "Icons", 1250).await?;

    let response = app
        .get(
            &format!("/api/checkout/products?ids={},{}", icons.id, icons.id),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.message(), "Product not found");
    Ok(())
}
