//! # Server Configuration
//!
//! Router assembly, shared state and the OpenAPI document for the
//! marketplace API.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderName, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post},
};
use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::session_middleware;
use crate::config::AppConfig;
use crate::handlers::{
    self,
    cart::{CART_TOKEN_HEADER, CART_TTL_SECONDS},
};
use crate::payments::PaymentGateway;
use crate::repositories::CartRepository;
use crate::telemetry::{REQUEST_ID_HEADER, TRACE_ID_HEADER, trace_context_middleware};
use crate::tenant_routing::tenant_rewrite_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub payments: Arc<dyn PaymentGateway>,
}

fn cors_layer() -> CorsLayer {
    // Storefront subdomains call the API with the session cookie
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .expose_headers([
            TRACE_ID_HEADER,
            REQUEST_ID_HEADER,
            HeaderName::from_static(CART_TOKEN_HEADER),
        ])
}

fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        // Auth
        .route("/api/auth/session", get(handlers::auth::session))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        // Catalog
        .route("/api/categories", get(handlers::categories::list_categories))
        .route("/api/tags", get(handlers::tags::list_tags))
        .route("/api/products", get(handlers::products::list_products))
        .route("/api/products/{id}", get(handlers::products::get_product))
        .route("/api/tenants/{slug}", get(handlers::tenants::get_tenant))
        // Storefronts
        .route("/tenants/{slug}", get(handlers::tenants::storefront_home))
        .route(
            "/tenants/{slug}/products",
            get(handlers::tenants::storefront_products),
        )
        .route(
            "/tenants/{slug}/products/{id}",
            get(handlers::tenants::storefront_product),
        )
        // Checkout
        .route("/api/checkout/verify", post(handlers::checkout::verify))
        .route("/api/checkout/purchase", post(handlers::checkout::purchase))
        .route("/api/checkout/products", get(handlers::checkout::get_products))
        // Reviews
        .route("/api/reviews", post(handlers::reviews::create_review))
        .route(
            "/api/reviews/{id}",
            get(handlers::reviews::get_review).patch(handlers::reviews::update_review),
        )
        // Library
        .route("/api/library", get(handlers::library::list_library))
        .route(
            "/api/library/{product_id}",
            get(handlers::library::get_library_product),
        )
        // Cart
        .route(
            "/api/cart",
            get(handlers::cart::get_cart).delete(handlers::cart::clear_all_carts),
        )
        .route(
            "/api/cart/{tenant_slug}",
            delete(handlers::cart::clear_cart),
        )
        .route(
            "/api/cart/{tenant_slug}/items",
            post(handlers::cart::add_item),
        )
        .route(
            "/api/cart/{tenant_slug}/items/{product_id}",
            delete(handlers::cart::remove_item),
        )
        .route(
            "/api/cart/{tenant_slug}/items/{product_id}/toggle",
            post(handlers::cart::toggle_item),
        )
        // Webhooks
        .route(
            "/api/stripe/webhooks",
            post(handlers::webhooks::stripe_webhook),
        )
        // Seller and admin
        .route("/api/admin/media", post(handlers::admin::create_media))
        .route("/api/admin/products", post(handlers::admin::create_product))
        .route(
            "/api/admin/products/{id}",
            patch(handlers::admin::update_product),
        )
        .route(
            "/api/admin/categories",
            post(handlers::admin::create_category),
        )
        .route("/api/admin/tags", post(handlers::admin::create_tag))
        .route("/api/admin/orders", get(handlers::admin::list_orders))
        .layer(from_fn_with_state(state.clone(), session_middleware))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

/// Creates and configures the Axum application router.
///
/// The API router is mounted as the fallback of an outer router so the
/// subdomain rewrite changes the URI before any route is matched.
pub fn create_app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    Router::new()
        .fallback_service(api_router(state))
        .layer(from_fn_with_state(config, tenant_rewrite_middleware))
}

const CART_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Periodically delete carts that outlived their cookie
async fn purge_stale_carts(db: DatabaseConnection) {
    loop {
        tokio::time::sleep(CART_PURGE_INTERVAL).await;

        let cutoff = chrono::Utc::now() - chrono::Duration::seconds(CART_TTL_SECONDS);
        match CartRepository::new(&db).purge_stale(cutoff).await {
            Ok(0) => {}
            Ok(purged) => tracing::info!(purged, "Purged stale carts"),
            Err(error) => tracing::error!(error = ?error, "Cart purge failed"),
        }
    }
}

/// Starts the server with the given state
pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let addr = state
        .config
        .bind_addr()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {}", e))?;
    let profile = state.config.profile.clone();

    tokio::spawn(purge_stale_carts(state.db.clone()));

    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::auth::session,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::categories::list_categories,
        crate::handlers::tags::list_tags,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::tenants::get_tenant,
        crate::handlers::tenants::storefront_home,
        crate::handlers::tenants::storefront_products,
        crate::handlers::tenants::storefront_product,
        crate::handlers::checkout::verify,
        crate::handlers::checkout::purchase,
        crate::handlers::checkout::get_products,
        crate::handlers::reviews::get_review,
        crate::handlers::reviews::create_review,
        crate::handlers::reviews::update_review,
        crate::handlers::library::list_library,
        crate::handlers::library::get_library_product,
        crate::handlers::cart::get_cart,
        crate::handlers::cart::add_item,
        crate::handlers::cart::toggle_item,
        crate::handlers::cart::remove_item,
        crate::handlers::cart::clear_cart,
        crate::handlers::cart::clear_all_carts,
        crate::handlers::webhooks::stripe_webhook,
        crate::handlers::admin::create_media,
        crate::handlers::admin::create_product,
        crate::handlers::admin::update_product,
        crate::handlers::admin::create_category,
        crate::handlers::admin::create_tag,
        crate::handlers::admin::list_orders,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::HealthResponse,
            crate::error::ApiError,
            crate::error::ProviderError,
            crate::models::product::RefundPolicy,
            crate::repositories::product::ProductSort,
            crate::cart::TenantCart,
            crate::handlers::types::MediaDto,
            crate::handlers::types::TenantDto,
            crate::handlers::types::UserDto,
            crate::handlers::types::ReviewDto,
            crate::handlers::types::ProductDto,
            crate::handlers::types::ProductDetailDto,
            crate::handlers::types::LibraryProductDto,
            crate::handlers::types::UrlResponse,
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::AuthResponse,
            crate::handlers::auth::SessionResponse,
            crate::handlers::auth::LogoutResponse,
            crate::handlers::categories::CategoryDto,
            crate::handlers::categories::SubcategoryDto,
            crate::handlers::tags::TagDto,
            crate::handlers::checkout::PurchaseRequest,
            crate::handlers::checkout::CheckoutProductsResponse,
            crate::handlers::reviews::CreateReviewRequest,
            crate::handlers::reviews::UpdateReviewRequest,
            crate::handlers::cart::AddToCartRequest,
            crate::handlers::cart::CartResponse,
            crate::handlers::webhooks::WebhookResponse,
            crate::handlers::admin::CreateMediaRequest,
            crate::handlers::admin::CreateProductRequest,
            crate::handlers::admin::UpdateProductRequest,
            crate::handlers::admin::CreateCategoryRequest,
            crate::handlers::admin::CreateTagRequest,
            crate::handlers::admin::OrderDto,
        )
    ),
    tags(
        (name = "root", description = "Service info and health"),
        (name = "auth", description = "Accounts and sessions"),
        (name = "products", description = "Marketplace catalog"),
        (name = "categories", description = "Category tree"),
        (name = "tags", description = "Product tags"),
        (name = "tenants", description = "Tenant lookups"),
        (name = "storefront", description = "Tenant storefront pages served on subdomains"),
        (name = "checkout", description = "Seller onboarding and buyer checkout"),
        (name = "reviews", description = "Product reviews"),
        (name = "library", description = "Purchased products"),
        (name = "cart", description = "Shopper carts"),
        (name = "webhooks", description = "Payment provider callbacks"),
        (name = "admin", description = "Seller and super-admin catalog writes"),
    ),
    info(
        title = "Marketplace API",
        description = "Multi-tenant marketplace for digital products",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
