//! Integration tests for product reviews.

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{Value, json};

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{TestApp, create_product, create_seller};

#[tokio::test]
async fn review_lifecycle() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;
    let buyer = create_seller(&app, "bob").await?;
    let product = create_product(&app.db, seller.tenant.id, "Icons", 500).await?;
    let review_path = format!("/api/reviews/{}", product.id);

    let none = app.get(&review_path, Some(&buyer.token)).await;
    assert_eq!(none.status, StatusCode::OK);
    assert_eq!(none.body, Value::Null);

    let created = app
        .post(
            "/api/reviews",
            Some(&buyer.token),
            json!({ "productId": product.id, "rating": 4, "description": "Great icons" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::OK);
    assert_eq!(created.body["rating"], 4);
    assert_eq!(created.body["userId"], buyer.user.id.to_string());
    let review_id = created.body["id"].as_str().unwrap().to_string();

    let fetched = app.get(&review_path, Some(&buyer.token)).await;
    assert_eq!(fetched.body["id"], review_id.as_str());

    let duplicate = app
        .post(
            "/api/reviews",
            Some(&buyer.token),
            json!({ "productId": product.id, "rating": 5, "description": "Again" }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.message(), "You have already reviewed this product");

    let updated = app
        .patch(
            &format!("/api/reviews/{review_id}"),
            Some(&buyer.token),
            json!({ "rating": 2, "description": "Changed my mind" }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["rating"], 2);
    assert_eq!(updated.body["description"], "Changed my mind");

    let page = app.get(&format!("/api/products/{}", product.id), None).await;
    assert_eq!(page.body["reviewCount"], 1);
    assert_eq!(page.body["reviewRating"], 2.0);
    Ok(())
}

#[tokio::test]
async fn only_the_author_may_edit() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;
    let author = create_seller(&app, "bob").await?;
    let other = create_seller(&app, "carol").await?;
    let product = create_product(&app.db, seller.tenant.id, "Icons", 500).await?;

    let created = app
        .post(
            "/api/reviews",
            Some(&author.token),
            json!({ "productId": product.id, "rating": 5, "description": "Lovely" }),
        )
        .await;
    let review_id = created.body["id"].as_str().unwrap().to_string();

    let response = app
        .patch(
            &format!("/api/reviews/{review_id}"),
            Some(&other.token),
            json!({ "rating": 1, "description": "Vandalised" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.message(), "You are not allowed to update this review");

    let missing = app
        .patch(
            &format!("/api/reviews/{}", uuid::Uuid::new_v4()),
            Some(&other.token),
            json!({ "rating": 1, "description": "Nothing" }),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.message(), "Review not found");
    Ok(())
}

#[tokio::test]
async fn invalid_reviews_are_rejected() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;
    let buyer = create_seller(&app, "bob").await?;
    let product = create_product(&app.db, seller.tenant.id, "Icons", 500).await?;

    for body in [
        json!({ "productId": product.id, "rating": 6, "description": "Too many stars" }),
        json!({ "productId": product.id, "rating": 0, "description": "Too few stars" }),
        json!({ "productId": product.id, "rating": 3, "description": "ok" }),
    ] {
        let response = app.post("/api/reviews", Some(&buyer.token), body).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    let unknown = app
        .post(
            "/api/reviews",
            Some(&buyer.token),
            json!({ "productId": uuid::Uuid::new_v4(), "rating": 3, "description": "Who?" }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.message(), "Product not found");

    let anonymous = app
        .get(&format!("/api/reviews/{}", product.id), None)
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    Ok(())
}
