//! Integration tests for seller and super-admin catalog writes.

use anyhow::Result;
use axum::http::StatusCode;
use marketplace::{
    models::user::Role,
    repositories::{
        OrderRepository,
        order::{CompletedCheckout, PurchasedProduct},
    },
};
use serde_json::json;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{
    TestApp, create_account, create_product, create_seller, create_super_admin, create_tag,
};

#[tokio::test]
async fn sellers_need_payment_details_to_create_products() -> Result<()> {
    let app = TestApp::new().await?;
    let pending = create_account(&app.db, &app.config, "alice", vec![Role::User], false).await?;

    let response = app
        .post(
            "/api/admin/products",
            Some(&pending.token),
            json!({ "name": "Icons", "price": 10 }),
        )
        .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        response.message(),
        "Submit your payment details before creating products"
    );
    Ok(())
}

#[tokio::test]
async fn products_are_created_in_the_first_tenant() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;
    let tag_id = create_tag(&app.db, "icons").await?;

    let media = app
        .post(
            "/api/admin/media",
            Some(&seller.token),
            json!({ "url": "https://cdn.example.com/cover.png", "alt": "Cover" }),
        )
        .await;
    assert_eq!(media.status, StatusCode::OK);

    let response = app
        .post(
            "/api/admin/products",
            Some(&seller.token),
            json!({
                "name": "Icons",
                "description": "Two hundred icons",
                "price": 12.5,
                "imageId": media.body["id"],
                "refundPolicy": "7-day",
                "content": "https://files.example.com/icons.zip",
                "tagIds": [tag_id],
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["price"], 12.5);
    assert_eq!(response.body["tenant"]["slug"], "alice");
    assert_eq!(response.body["tags"], json!(["icons"]));
    assert_eq!(
        response.body["image"]["url"],
        "https://cdn.example.com/cover.png"
    );
    assert!(response.body.get("content").is_none());
    Ok(())
}

#[tokio::test]
async fn product_writes_validate_input_and_references() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;

    let bad_price = app
        .post(
            "/api/admin/products",
            Some(&seller.token),
            json!({ "name": "Icons", "price": 1.234 }),
        )
        .await;
    assert_eq!(bad_price.status, StatusCode::BAD_REQUEST);
    assert!(bad_price.body["details"]["price"].is_string());

    let missing_category = app
        .post(
            "/api/admin/products",
            Some(&seller.token),
            json!({ "name": "Icons", "price": 1, "categoryId": uuid::Uuid::new_v4() }),
        )
        .await;
    assert_eq!(missing_category.status, StatusCode::NOT_FOUND);
    assert_eq!(missing_category.message(), "Category not found");

    let relative_media = app
        .post(
            "/api/admin/media",
            Some(&seller.token),
            json!({ "url": "/cover.png" }),
        )
        .await;
    assert_eq!(relative_media.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn only_members_update_their_products() -> Result<()> {
    let app = TestApp::new().await?;
    let alice = create_seller(&app, "alice").await?;
    let bob = create_seller(&app, "bob").await?;
    let admin = create_super_admin(&app, "root").await?;
    let product = create_product(&app.db, alice.tenant.id, "Icons", 500).await?;
    let path = format!("/api/admin/products/{}", product.id);

    let foreign = app
        .patch(&path, Some(&bob.token), json!({ "name": "Stolen" }))
        .await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);
    assert_eq!(foreign.message(), "You are not allowed to update this product");

    let own = app
        .patch(
            &path,
            Some(&alice.token),
            json!({ "name": "Icons v2", "price": 7.25 }),
        )
        .await;
    assert_eq!(own.status, StatusCode::OK);
    assert_eq!(own.body["name"], "Icons v2");
    assert_eq!(own.body["price"], 7.25);

    let archived = app
        .patch(&path, Some(&admin.token), json!({ "isArchived": true }))
        .await;
    assert_eq!(archived.status, StatusCode::OK);

    let listing = app.get("/api/products", None).await;
    assert_eq!(listing.body["totalDocs"], 0);
    Ok(())
}

#[tokio::test]
async fn categories_and_tags_are_super_admin_only() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;
    let admin = create_super_admin(&app, "root").await?;

    let denied = app
        .post(
            "/api/admin/categories",
            Some(&seller.token),
            json!({ "name": "Design", "slug": "design" }),
        )
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(denied.message(), "Only super-admins can perform this action");

    let parent = app
        .post(
            "/api/admin/categories",
            Some(&admin.token),
            json!({ "name": "Design", "slug": "design", "color": "#FFB347" }),
        )
        .await;
    assert_eq!(parent.status, StatusCode::OK);

    let child = app
        .post(
            "/api/admin/categories",
            Some(&admin.token),
            json!({ "name": "UI Kits", "slug": "ui-kits", "parentId": parent.body["id"] }),
        )
        .await;
    assert_eq!(child.status, StatusCode::OK);
    assert_eq!(child.body["parentId"], parent.body["id"]);

    let tag = app
        .post("/api/admin/tags", Some(&admin.token), json!({ "name": "svg" }))
        .await;
    assert_eq!(tag.status, StatusCode::OK);
    assert_eq!(tag.body["name"], "svg");

    let duplicate = app
        .post("/api/admin/tags", Some(&admin.token), json!({ "name": "svg" }))
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let seller_tag = app
        .post("/api/admin/tags", Some(&seller.token), json!({ "name": "png" }))
        .await;
    assert_eq!(seller_tag.status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn order_ledger_is_super_admin_only() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;
    let admin = create_super_admin(&app, "root").await?;
    let product = create_product(&app.db, seller.tenant.id, "Icons", 500).await?;

    OrderRepository::new(&app.db)
        .record_checkout(CompletedCheckout {
            user_id: seller.user.id,
            checkout_session_id: "cs_ledger".to_string(),
            stripe_account_id: Some("acct_alice".to_string()),
            items: vec![PurchasedProduct {
                name: "Icons".to_string(),
                product_id: product.id,
            }],
        })
        .await?;

    let denied = app.get("/api/admin/orders", Some(&seller.token)).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let ledger = app.get("/api/admin/orders", Some(&admin.token)).await;
    assert_eq!(ledger.status, StatusCode::OK);
    assert_eq!(ledger.body["totalDocs"], 1);
    assert_eq!(ledger.body["docs"][0]["stripeCheckoutSessionId"], "cs_ledger");
    assert_eq!(ledger.body["docs"][0]["productId"], product.id.to_string());
    Ok(())
}
