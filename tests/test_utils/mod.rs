//! Test utilities for API integration tests.
//!
//! Provides an in-memory SQLite database with all migrations applied, a
//! recording fake payment gateway, and fixture helpers that go through the
//! repositories so rows look exactly like production ones.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use marketplace::{
    auth::{hash_password, start_session},
    config::AppConfig,
    models::{product, tenant, user, user::Role},
    payments::{
        CheckoutSession, CheckoutSessionRequest, PaymentError, PaymentGateway, PurchasedLineItem,
    },
    repositories::{
        ProductRepository, TagRepository, UserRepository, product::NewProduct, user::NewAccount,
    },
    server::{AppState, create_app},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, IntoActiveModel, Set};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Configuration used by every API test
pub fn test_config() -> AppConfig {
    let mut config = AppConfig {
        profile: "test".to_string(),
        app_url: "http://localhost:3000".to_string(),
        root_domain: "localhost:3000".to_string(),
        ..AppConfig::default()
    };
    config.stripe.webhook_secret = Some(WEBHOOK_SECRET.to_string());
    config
}

/// Payment gateway double that records calls and serves canned line items
#[derive(Default)]
pub struct FakePaymentGateway {
    pub account_links: Mutex<Vec<(String, String, String)>>,
    pub checkout_requests: Mutex<Vec<(String, CheckoutSessionRequest)>>,
    pub line_items: Mutex<HashMap<String, Vec<PurchasedLineItem>>>,
    pub line_item_lookups: Mutex<Vec<(String, Option<String>)>>,
    pub omit_checkout_url: Mutex<bool>,
    accounts_created: Mutex<u32>,
}

impl FakePaymentGateway {
    pub fn set_line_items(&self, session_id: &str, items: Vec<PurchasedLineItem>) {
        self.line_items
            .lock()
            .unwrap()
            .insert(session_id.to_string(), items);
    }

    pub fn checkout_requests(&self) -> Vec<(String, CheckoutSessionRequest)> {
        self.checkout_requests.lock().unwrap().clone()
    }

    pub fn accounts_created(&self) -> u32 {
        *self.accounts_created.lock().unwrap()
    }
}

#[async_trait]
impl PaymentGateway for FakePaymentGateway {
    async fn create_connected_account(&self) -> Result<String, PaymentError> {
        let mut created = self.accounts_created.lock().unwrap();
        *created += 1;
        Ok(format!("acct_fake_{created}"))
    }

    async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String, PaymentError> {
        self.account_links.lock().unwrap().push((
            account_id.to_string(),
            refresh_url.to_string(),
            return_url.to_string(),
        ));
        Ok(format!("https://connect.stripe.test/setup/{account_id}"))
    }

    async fn create_checkout_session(
        &self,
        account_id: &str,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut requests = self.checkout_requests.lock().unwrap();
        requests.push((account_id.to_string(), request.clone()));
        let id = format!("cs_test_{}", requests.len());

        let url = if *self.omit_checkout_url.lock().unwrap() {
            None
        } else {
            Some(format!("https://checkout.stripe.test/pay/{id}"))
        };
        Ok(CheckoutSession { id, url })
    }

    async fn retrieve_line_items(
        &self,
        session_id: &str,
        account_id: Option<&str>,
    ) -> Result<Vec<PurchasedLineItem>, PaymentError> {
        self.line_item_lookups
            .lock()
            .unwrap()
            .push((session_id.to_string(), account_id.map(str::to_string)));
        Ok(self
            .line_items
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// A router over a fresh database plus handles for assertions
pub struct TestApp {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub payments: Arc<FakePaymentGateway>,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AppConfig) -> Result<Self> {
        let db = setup_test_db().await?;
        let config = Arc::new(config);
        let payments = Arc::new(FakePaymentGateway::default());

        let router = create_app(AppState {
            db: db.clone(),
            config: Arc::clone(&config),
            payments: payments.clone(),
        });

        Ok(Self {
            db,
            config,
            payments,
            router,
        })
    }

    /// Send a request through the full middleware stack
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request("GET", uri, token, None)).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(request("POST", uri, token, Some(body))).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.send(request("PATCH", uri, token, Some(body))).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(request("DELETE", uri, token, None)).await
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }

    pub fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
    }
}

/// Build a JSON request, optionally authenticated with a bearer token
pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request"),
        None => builder.body(Body::empty()).expect("valid request"),
    }
}

/// A registered account with its storefront and a live session token
pub struct Seller {
    pub user: user::Model,
    pub tenant: tenant::Model,
    pub token: String,
}

pub async fn create_account(
    db: &DatabaseConnection,
    config: &AppConfig,
    username: &str,
    roles: Vec<Role>,
    details_submitted: bool,
) -> Result<Seller> {
    let (user, tenant) = UserRepository::new(db)
        .register(NewAccount {
            email: format!("{username}@example.com"),
            username: username.to_string(),
            password_hash: hash_password(TEST_PASSWORD)?,
            roles,
            stripe_account_id: format!("acct_{username}"),
            stripe_details_submitted: details_submitted,
        })
        .await?;
    let session = start_session(db, config, user.id).await?;

    Ok(Seller {
        user,
        tenant,
        token: session.token,
    })
}

pub async fn create_seller(app: &TestApp, username: &str) -> Result<Seller> {
    create_account(&app.db, &app.config, username, vec![Role::User], true).await
}

pub async fn create_super_admin(app: &TestApp, username: &str) -> Result<Seller> {
    create_account(&app.db, &app.config, username, vec![Role::SuperAdmin], true).await
}

pub fn new_product(tenant_id: Uuid, name: &str, price_cents: i64) -> NewProduct {
    NewProduct {
        tenant_id,
        name: name.to_string(),
        description: None,
        price_cents,
        category_id: None,
        image_id: None,
        refund_policy: Default::default(),
        content: Some(format!("Download link for {name}")),
        is_private: false,
        tag_ids: Vec::new(),
    }
}

pub async fn create_product(
    db: &DatabaseConnection,
    tenant_id: Uuid,
    name: &str,
    price_cents: i64,
) -> Result<product::Model> {
    Ok(ProductRepository::new(db)
        .create(new_product(tenant_id, name, price_cents))
        .await?)
}

/// Pin `created_at` so listing order is deterministic
pub async fn set_product_created_at(
    db: &DatabaseConnection,
    product: product::Model,
    rfc3339: &str,
) -> Result<product::Model> {
    let created_at = chrono::DateTime::parse_from_rfc3339(rfc3339)?;
    let mut active = product.into_active_model();
    active.created_at = Set(created_at);
    Ok(active.update(db).await?)
}

pub async fn create_tag(db: &DatabaseConnection, name: &str) -> Result<Uuid> {
    Ok(TagRepository::new(db).create(name.to_string()).await?.id)
}

/// Names of the products in a paginated response, in order
pub fn doc_names(body: &Value) -> Vec<String> {
    body["docs"]
        .as_array()
        .map(|docs| {
            docs.iter()
                .filter_map(|doc| doc["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
