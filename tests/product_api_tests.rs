//! Integration tests for the marketplace listing, product pages and storefronts.

use anyhow::Result;
use axum::http::StatusCode;
use marketplace::repositories::{
    CategoryRepository, OrderRepository, ProductRepository, ReviewRepository,
    category::NewCategory,
    order::{CompletedCheckout, PurchasedProduct},
    product::ProductChanges,
};
use serde_json::Value;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{
    TestApp, create_product, create_seller, create_tag, doc_names, new_product,
    set_product_created_at,
};

#[tokio::test]
async fn listing_hides_archived_and_private_products() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;

    create_product(&app.db, seller.tenant.id, "Public pack", 1000).await?;
    let archived = create_product(&app.db, seller.tenant.id, "Old pack", 1000).await?;
    ProductRepository::new(&app.db)
        .update(
            archived,
            ProductChanges {
                is_archived: Some(true),
                ..Default::default()
            },
        )
        .await?;
    let mut private = new_product(seller.tenant.id, "Secret pack", 1000);
    private.is_private = true;
    ProductRepository::new(&app.db).create(private).await?;

    let marketplace = app.get("/api/products", None).await;
    assert_eq!(marketplace.status, StatusCode::OK);
    assert_eq!(doc_names(&marketplace.body), vec!["Public pack"]);
    assert_eq!(marketplace.body["totalDocs"], 1);

    let storefront = app.get("/tenants/alice/products", None).await;
    assert_eq!(storefront.status, StatusCode::OK);
    let mut names = doc_names(&storefront.body);
    names.sort();
    assert_eq!(names, vec!["Public pack", "Secret pack"]);
    Ok(())
}

#[tokio::test]
async fn search_requires_every_word() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;
    create_product(&app.db, seller.tenant.id, "Rust Icon Pack", 500).await?;
    create_product(&app.db, seller.tenant.id, "Rust Handbook", 500).await?;
    create_product(&app.db, seller.tenant.id, "100%_off", 500).await?;

    let response = app.get("/api/products?search=icon%20RUST", None).await;
    assert_eq!(doc_names(&response.body), vec!["Rust Icon Pack"]);

    // Wildcards in the search term match literally
    let response = app.get("/api/products?search=%25_", None).await;
    assert_eq!(doc_names(&response.body), vec!["100%_off"]);
    Ok(())
}

#[tokio::test]
async fn price_bounds_are_inclusive() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;
    for (name, cents) in [("Cheap", 500), ("Mid", 1250), ("Pricey", 5000)] {
        create_product(&app.db, seller.tenant.id, name, cents).await?;
    }

    let response = app
        .get("/api/products?minPrice=5&maxPrice=12.5&sort=hot_and_new", None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let mut names = doc_names(&response.body);
    names.sort();
    assert_eq!(names, vec!["Cheap", "Mid"]);

    let invalid = app.get("/api/products?minPrice=cheap", None).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn category_filter_includes_subcategories() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;
    let categories = CategoryRepository::new(&app.db);
    let design = categories
        .create(NewCategory {
            name: "Design".to_string(),
            slug: "design".to_string(),
            color: Some("#B5B9FF".to_string()),
            parent_id: None,
        })
        .await?;
    let typography = categories
        .create(NewCategory {
            name: "Typography".to_string(),
            slug: "typography".to_string(),
            color: None,
            parent_id: Some(design.id),
        })
        .await?;
    let music = categories
        .create(NewCategory {
            name: "Music".to_string(),
            slug: "music".to_string(),
            color: None,
            parent_id: None,
        })
        .await?;

    let products = ProductRepository::new(&app.db);
    for (name, category_id) in [
        ("Font", typography.id),
        ("Mockups", design.id),
        ("Beats", music.id),
    ] {
        let mut product = new_product(seller.tenant.id, name, 900);
        product.category_id = Some(category_id);
        products.create(product).await?;
    }

    let response = app.get("/api/products?category=design", None).await;
    let mut names = doc_names(&response.body);
    names.sort();
    assert_eq!(names, vec!["Font", "Mockups"]);

    let response = app.get("/api/products?category=typography", None).await;
    assert_eq!(doc_names(&response.body), vec!["Font"]);

    let categories = app.get("/api/categories", None).await;
    assert_eq!(categories.status, StatusCode::OK);
    let design_entry = categories
        .body
        .as_array()
        .unwrap()
        .iter()
        .find(|entry| entry["slug"] == "design")
        .cloned()
        .unwrap();
    assert_eq!(design_entry["subcategories"][0]["slug"], "typography");
    Ok(())
}

#[tokio::test]
async fn tag_filter_matches_any_tag() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;
    let icons = create_tag(&app.db, "icons").await?;
    let fonts = create_tag(&app.db, "fonts").await?;
    let audio = create_tag(&app.db, "audio").await?;

    let products = ProductRepository::new(&app.db);
    for (name, tags) in [
        ("Icon set", vec![icons]),
        ("Font set", vec![fonts]),
        ("Sound set", vec![audio]),
    ] {
        let mut product = new_product(seller.tenant.id, name, 900);
        product.tag_ids = tags;
        products.create(product).await?;
    }

    let response = app.get("/api/products?tags=icons,fonts", None).await;
    let mut names = doc_names(&response.body);
    names.sort();
    assert_eq!(names, vec!["Font set", "Icon set"]);

    let icon_doc = response.body["docs"]
        .as_array()
        .unwrap()
        .iter()
        .find(|doc| doc["name"] == "Icon set")
        .cloned()
        .unwrap();
    assert_eq!(icon_doc["tags"], serde_json::json!(["icons"]));

    let tags = app.get("/api/tags?limit=2", None).await;
    assert_eq!(tags.status, StatusCode::OK);
    assert_eq!(tags.body["docs"].as_array().unwrap().len(), 2);
    assert_eq!(tags.body["totalDocs"], 3);
    assert_eq!(tags.body["hasNextPage"], true);
    Ok(())
}

#[tokio::test]
async fn sort_orders_by_creation_time() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;
    let older = create_product(&app.db, seller.tenant.id, "Older", 100).await?;
    let newer = create_product(&app.db, seller.tenant.id, "Newer", 100).await?;
    set_product_created_at(&app.db, older, "2025-01-01T00:00:00Z").await?;
    set_product_created_at(&app.db, newer, "2025-06-01T00:00:00Z").await?;

    let curated = app.get("/api/products?sort=curated", None).await;
    assert_eq!(doc_names(&curated.body), vec!["Newer", "Older"]);

    let trending = app.get("/api/products?sort=trending", None).await;
    assert_eq!(doc_names(&trending.body), vec!["Newer", "Older"]);

    let hot = app.get("/api/products?sort=hot_and_new", None).await;
    assert_eq!(doc_names(&hot.body), vec!["Older", "Newer"]);

    let unknown = app.get("/api/products?sort=cheapest", None).await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn pagination_reports_page_metadata() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;
    for index in 0..5 {
        create_product(&app.db, seller.tenant.id, &format!("Pack {index}"), 100).await?;
    }

    let response = app.get("/api/products?cursor=2&limit=2", None).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = &response.body;
    assert_eq!(body["docs"].as_array().unwrap().len(), 2);
    assert_eq!(body["totalDocs"], 5);
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["page"], 2);
    assert_eq!(body["pagingCounter"], 3);
    assert_eq!(body["prevPage"], 1);
    assert_eq!(body["nextPage"], 3);

    let invalid = app.get("/api/products?limit=0", None).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn product_page_includes_reviews_and_purchase_state() -> Result<()> {
    let app = TestApp::new().await?;
    let seller = create_seller(&app, "alice").await?;
    let buyer = create_seller(&app, "bob").await?;
    let other = create_seller(&app, "carol").await?;
    let product = create_product(&app.db, seller.tenant.id, "Icon pack", 1250).await?;

    let reviews = ReviewRepository::new(&app.db);
    reviews
        .create(buyer.user.id, product.id, 5, "Great".to_string())
        .await?;
    reviews
        .create(other.user.id, product.id, 4, "Solid".to_string())
        .await?;

    let uri = format!("/api/products/{}", product.id);
    let anonymous = app.get(&uri, None).await;
    assert_eq!(anonymous.status, StatusCode::OK);
    let body: &Value = &anonymous.body;
    assert_eq!(body["name"], "Icon pack");
    assert_eq!(body["price"], 12.5);
    assert_eq!(body["isPurchased"], false);
    assert_eq!(body["reviewCount"], 2);
    assert_eq!(body["reviewRating"], 4.5);
    assert_eq!(body["ratingDistribution"]["5"], 50);
    assert_eq!(body["ratingDistribution"]["4"], 50);
    assert_eq!(body["ratingDistribution"]["1"], 0);
    assert_eq!(body["tenant"]["slug"], "alice");
    assert!(body.get("content").is_none());
    assert!(body["tenant"].get("stripeAccountId").is_none());

    OrderRepository::new(&app.db)
        .record_checkout(CompletedCheckout {
            user_id: buyer.user.id,
            checkout_session_id: "cs_test_1".to_string(),
            stripe_account_id: Some("acct_alice".to_string()),
            items: vec![PurchasedProduct {
                name: product.name.clone(),
                product_id: product.id,
            }],
        })
        .await?;

    let purchased = app.get(&uri, Some(&buyer.token)).await;
    assert_eq!(purchased.body["isPurchased"], true);
    Ok(())
}

#[tokio::test]
async fn missing_and_malformed_products_are_not_found() -> Result<()> {
    let app = TestApp::new().await?;

    let malformed = app.get("/api/products/not-a-uuid", None).await;
    assert_eq!(malformed.status, StatusCode::NOT_FOUND);
    assert_eq!(malformed.message(), "Product not found");

    let unknown = app
        .get(&format!("/api/products/{}", uuid::Uuid::new_v4()), None)
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn storefront_scopes_products_to_its_tenant() -> Result<()> {
    let app = TestApp::new().await?;
    let alice = create_seller(&app, "alice").await?;
    let bob = create_seller(&app, "bob").await?;
    create_product(&app.db, alice.tenant.id, "Alice pack", 100).await?;
    let bobs = create_product(&app.db, bob.tenant.id, "Bob pack", 100).await?;

    let listing = app.get("/tenants/alice/products", None).await;
    assert_eq!(doc_names(&listing.body), vec!["Alice pack"]);

    let foreign = app
        .get(&format!("/tenants/alice/products/{}", bobs.id), None)
        .await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);

    let own = app
        .get(&format!("/tenants/bob/products/{}", bobs.id), None)
        .await;
    assert_eq!(own.status, StatusCode::OK);
    assert_eq!(own.body["name"], "Bob pack");
    Ok(())
}
