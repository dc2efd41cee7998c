//! # Seller and Admin API Handlers
//!
//! Catalog writes. Sellers manage the products of their own storefront once
//! payment onboarding is complete; super-admins manage everything, including
//! categories, tags and the order ledger.

use axum::{
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::Json,
};
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::access::{can_administer_catalog, can_create_product, can_manage_product};
use crate::auth::AuthUser;
use crate::error::{ApiError, forbidden, not_found, validation_error};
use crate::handlers::categories::SubcategoryDto;
use crate::handlers::products::{parse_id, present_product};
use crate::handlers::tags::TagDto;
use crate::handlers::types::{MediaDto, PageQuery, PaginatedResponse, ProductDto};
use crate::models::{order, user};
use crate::models::product::RefundPolicy;
use crate::money::decimal_to_cents;
use crate::repositories::category::NewCategory;
use crate::repositories::product::{NewProduct, ProductChanges};
use crate::repositories::{
    CategoryRepository, MediaRepository, OrderRepository, ProductRepository, TagRepository,
    TenantRepository,
};
use crate::server::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMediaRequest {
    #[schema(example = "https://cdn.example.com/cover.png")]
    pub url: String,
    #[serde(default)]
    pub alt: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    /// Price in USD, at most two decimal places
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 12.5)]
    pub price: Decimal,
    pub category_id: Option<Uuid>,
    pub image_id: Option<Uuid>,
    #[serde(default)]
    pub refund_policy: RefundPolicy,
    /// Revealed to buyers in their library
    pub content: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
}

/// Partial product update; omitted fields are left unchanged
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub image_id: Option<Uuid>,
    pub refund_policy: Option<RefundPolicy>,
    pub content: Option<String>,
    pub is_private: Option<bool>,
    pub is_archived: Option<bool>,
    pub tag_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: String,
    pub slug: String,
    #[schema(example = "#FFB347")]
    pub color: Option<String>,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTagRequest {
    pub name: String,
}

/// Order ledger entry
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    pub id: Uuid,
    pub name: String,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub stripe_checkout_session_id: String,
    pub stripe_account_id: Option<String>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<FixedOffset>,
}

impl From<order::Model> for OrderDto {
    fn from(model: order::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            user_id: model.user_id,
            product_id: model.product_id,
            stripe_checkout_session_id: model.stripe_checkout_session_id,
            stripe_account_id: model.stripe_account_id,
            created_at: model.created_at,
        }
    }
}

fn require_catalog_admin(user: &user::Model) -> Result<(), ApiError> {
    if can_administer_catalog(user) {
        Ok(())
    } else {
        Err(forbidden(Some("Only super-admins can perform this action")))
    }
}

fn price_to_cents(price: Decimal) -> Result<i64, ApiError> {
    decimal_to_cents(price).map_err(|e| {
        validation_error(
            "Invalid product",
            serde_json::json!({ "price": e.to_string() }),
        )
    })
}

/// Make sure the category, image and tags a product points at exist
async fn check_references(
    state: &AppState,
    category_id: Option<Uuid>,
    image_id: Option<Uuid>,
    tag_ids: Option<&[Uuid]>,
) -> Result<(), ApiError> {
    if let Some(category_id) = category_id {
        CategoryRepository::new(&state.db)
            .find_by_id(category_id)
            .await?
            .ok_or_else(|| not_found("Category not found"))?;
    }
    if let Some(image_id) = image_id {
        MediaRepository::new(&state.db)
            .find_by_id(image_id)
            .await?
            .ok_or_else(|| not_found("Image not found"))?;
    }
    if let Some(tag_ids) = tag_ids {
        let mut unique = tag_ids.to_vec();
        unique.sort();
        unique.dedup();
        let found = TagRepository::new(&state.db).find_by_ids(&unique).await?;
        if found.len() != unique.len() {
            return Err(not_found("Tag not found"));
        }
    }
    Ok(())
}

/// Register an uploaded media asset
#[utoipa::path(
    post,
    path = "/api/admin/media",
    request_body = CreateMediaRequest,
    responses(
        (status = 200, description = "Media created", body = MediaDto),
        (status = 400, description = "Invalid media", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn create_media(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateMediaRequest>, JsonRejection>,
) -> Result<Json<MediaDto>, ApiError> {
    let Json(request) = payload?;
    let url = request.url.trim();
    if url.is_empty() {
        return Err(validation_error(
            "Invalid media",
            serde_json::json!({ "url": "URL is required" }),
        ));
    }
    if url::Url::parse(url).is_err() {
        return Err(validation_error(
            "Invalid media",
            serde_json::json!({ "url": "URL must be absolute" }),
        ));
    }

    let media = MediaRepository::new(&state.db)
        .create(url.to_string(), request.alt)
        .await?;

    tracing::info!(media_id = %media.id, user_id = %user.id, "Media created");
    Ok(Json(media.into()))
}

/// Create a product in the caller's storefront
#[utoipa::path(
    post,
    path = "/api/admin/products",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Product created", body = ProductDto),
        (status = 400, description = "Invalid product", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 403, description = "Payment details not submitted", body = ApiError),
        (status = 404, description = "Caller has no storefront, or a reference is missing", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<Json<ProductDto>, ApiError> {
    let Json(request) = payload?;

    let tenant = TenantRepository::new(&state.db)
        .first_for_user(user.id)
        .await?
        .ok_or_else(|| not_found("Tenant not found"))?;

    if !can_create_product(&user, Some(&tenant)) {
        return Err(forbidden(Some(
            "Submit your payment details before creating products",
        )));
    }

    let price_cents = price_to_cents(request.price)?;
    check_references(
        &state,
        request.category_id,
        request.image_id,
        Some(&request.tag_ids),
    )
    .await?;

    let product = ProductRepository::new(&state.db)
        .create(NewProduct {
            tenant_id: tenant.id,
            name: request.name,
            description: request.description,
            price_cents,
            category_id: request.category_id,
            image_id: request.image_id,
            refund_policy: request.refund_policy,
            content: request.content,
            is_private: request.is_private,
            tag_ids: request.tag_ids,
        })
        .await?;

    tracing::info!(
        product_id = %product.id,
        tenant_id = %tenant.id,
        price_cents,
        "Product created"
    );
    Ok(Json(present_product(&state.db, product).await?))
}

/// Update a product
#[utoipa::path(
    patch,
    path = "/api/admin/products/{id}",
    params(("id" = String, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductDto),
        (status = 400, description = "Invalid product", body = ApiError),
        (status = 401, description = "Not authenticated", body = ApiError),
        (status = 403, description = "Caller cannot manage this product", body = ApiError),
        (status = 404, description = "Product or a reference not found", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<ProductDto>, ApiError> {
    let Json(request) = payload?;
    let id = parse_id(&id, "Product not found")?;

    let products = ProductRepository::new(&state.db);
    let product = products
        .find_by_id(id)
        .await?
        .ok_or_else(|| not_found("Product not found"))?;

    let member_tenant_ids = TenantRepository::new(&state.db)
        .tenant_ids_for_user(user.id)
        .await?;
    if !can_manage_product(&user, &member_tenant_ids, &product) {
        return Err(forbidden(Some("You are not allowed to update this product")));
    }

    let price_cents = request.price.map(price_to_cents).transpose()?;
    check_references(
        &state,
        request.category_id,
        request.image_id,
        request.tag_ids.as_deref(),
    )
    .await?;

    let updated = products
        .update(
            product,
            ProductChanges {
                name: request.name,
                description: request.description,
                price_cents,
                category_id: request.category_id,
                image_id: request.image_id,
                refund_policy: request.refund_policy,
                content: request.content,
                is_private: request.is_private,
                is_archived: request.is_archived,
                tag_ids: request.tag_ids,
            },
        )
        .await?;

    tracing::info!(product_id = %updated.id, user_id = %user.id, "Product updated");
    Ok(Json(present_product(&state.db, updated).await?))
}

/// Create a category (super-admin)
#[utoipa::path(
    post,
    path = "/api/admin/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 200, description = "Category created", body = SubcategoryDto),
        (status = 400, description = "Invalid category", body = ApiError),
        (status = 403, description = "Not a super-admin", body = ApiError),
        (status = 404, description = "Parent category not found", body = ApiError),
        (status = 409, description = "Slug already in use", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn create_category(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> Result<Json<SubcategoryDto>, ApiError> {
    require_catalog_admin(&user)?;
    let Json(request) = payload?;

    let category = CategoryRepository::new(&state.db)
        .create(NewCategory {
            name: request.name,
            slug: request.slug,
            color: request.color,
            parent_id: request.parent_id,
        })
        .await?;

    Ok(Json(category.into()))
}

/// Create a tag (super-admin)
#[utoipa::path(
    post,
    path = "/api/admin/tags",
    request_body = CreateTagRequest,
    responses(
        (status = 200, description = "Tag created", body = TagDto),
        (status = 400, description = "Invalid tag", body = ApiError),
        (status = 403, description = "Not a super-admin", body = ApiError),
        (status = 409, description = "Tag already exists", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn create_tag(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateTagRequest>, JsonRejection>,
) -> Result<Json<TagDto>, ApiError> {
    require_catalog_admin(&user)?;
    let Json(request) = payload?;

    let tag = TagRepository::new(&state.db).create(request.name).await?;
    Ok(Json(tag.into()))
}

/// List every order (super-admin)
#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of orders, newest first", body = PaginatedResponse<OrderDto>),
        (status = 403, description = "Not a super-admin", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<PaginatedResponse<OrderDto>>, ApiError> {
    require_catalog_admin(&user)?;
    let Query(query) = query?;
    let page = query.page_request()?;

    let (orders, total) = OrderRepository::new(&state.db).list_all(page).await?;
    let docs = orders.into_iter().map(OrderDto::from).collect();

    Ok(Json(PaginatedResponse::new(docs, page, total)))
}
