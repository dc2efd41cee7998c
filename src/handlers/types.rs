//! # Common API Types
//!
//! Response shapes shared across handlers: paginated listings and the
//! client-facing views of tenants, media, users and products.

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::cursor::{PageMeta, PageRequest};
use crate::error::ApiError;
use crate::models::product::RefundPolicy;
use crate::models::user::Role;
use crate::models::{media, review, tenant, user};
use crate::ratings::RatingDistribution;

/// Generic paginated response wrapper for list endpoints
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    /// Items on the current page
    pub docs: Vec<T>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(docs: Vec<T>, request: PageRequest, total_docs: u64) -> Self {
        Self {
            docs,
            meta: PageMeta::new(request, total_docs),
        }
    }
}

/// `cursor` / `limit` query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number (default 1)
    pub cursor: Option<u64>,
    /// Page size (default 8, max 100)
    pub limit: Option<u64>,
}

impl PageQuery {
    pub fn page_request(&self) -> Result<PageRequest, ApiError> {
        PageRequest::from_query(self.cursor, self.limit)
    }
}

/// Stored media asset
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MediaDto {
    pub id: Uuid,
    pub url: String,
    pub alt: String,
}

impl From<media::Model> for MediaDto {
    fn from(model: media::Model) -> Self {
        Self {
            id: model.id,
            url: model.url,
            alt: model.alt,
        }
    }
}

/// Public view of a storefront. The payment account ID is never exposed.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantDto {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub image: Option<MediaDto>,
    pub stripe_details_submitted: bool,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<FixedOffset>,
}

impl TenantDto {
    pub fn new(tenant: tenant::Model, image: Option<media::Model>) -> Self {
        Self {
            id: tenant.id,
            name: tenant.name,
            slug: tenant.slug,
            image: image.map(MediaDto::from),
            stripe_details_submitted: tenant.stripe_details_submitted,
            created_at: tenant.created_at,
        }
    }
}

/// Account view; never includes the password hash
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub roles: Vec<Role>,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<FixedOffset>,
}

impl From<user::Model> for UserDto {
    fn from(model: user::Model) -> Self {
        Self {
            roles: model.roles(),
            id: model.id,
            email: model.email,
            username: model.username,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDto {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub description: String,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<FixedOffset>,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime<FixedOffset>,
}

impl From<review::Model> for ReviewDto {
    fn from(model: review::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            user_id: model.user_id,
            rating: model.rating,
            description: model.description,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Product as shown in listings
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Price in USD
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 12.5)]
    pub price: Decimal,
    pub refund_policy: RefundPolicy,
    pub category_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub is_private: bool,
    pub tenant: Option<TenantDto>,
    pub image: Option<MediaDto>,
    pub review_count: u64,
    pub review_rating: f64,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<FixedOffset>,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTime<FixedOffset>,
}

/// Product page: listing fields plus purchase state and the rating histogram
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetailDto {
    #[serde(flatten)]
    pub product: ProductDto,
    pub is_purchased: bool,
    /// Percentage of reviews per star value
    #[schema(value_type = Object, example = json!({"5": 50, "4": 50, "3": 0, "2": 0, "1": 0}))]
    #[serde(serialize_with = "crate::ratings::serialize_descending")]
    pub rating_distribution: RatingDistribution,
}

/// Purchased product including its protected content
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LibraryProductDto {
    #[serde(flatten)]
    pub product: ProductDto,
    pub content: Option<String>,
}

/// Body of endpoints that only return a redirect URL
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UrlResponse {
    pub url: String,
}
