//! Product entity model
//!
//! Digital goods listed by a tenant. Prices are stored in cents; `content` is
//! only revealed to buyers through the library.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Return window offered on a product
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum RefundPolicy {
    #[sea_orm(string_value = "30-day")]
    #[serde(rename = "30-day")]
    ThirtyDay,
    #[sea_orm(string_value = "7-day")]
    #[serde(rename = "7-day")]
    SevenDay,
    #[sea_orm(string_value = "3-day")]
    #[serde(rename = "3-day")]
    ThreeDay,
    #[sea_orm(string_value = "1-day")]
    #[serde(rename = "1-day")]
    OneDay,
    #[default]
    #[sea_orm(string_value = "no-refund")]
    #[serde(rename = "no-refund")]
    NoRefund,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning storefront
    pub tenant_id: Uuid,

    pub name: String,

    /// Rich-text description, rendered by the client
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Price in USD cents
    pub price_cents: i64,

    pub category_id: Option<Uuid>,

    pub image_id: Option<Uuid>,

    pub refund_policy: RefundPolicy,

    /// Protected content, visible only after purchase
    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,

    /// Hidden from the public marketplace, still listed on the tenant storefront
    pub is_private: bool,

    /// Archived products cannot be viewed or bought
    pub is_archived: bool,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id"
    )]
    Tenant,
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::media::Entity",
        from = "Column::ImageId",
        to = "super::media::Column::Id"
    )]
    Image,
    #[sea_orm(has_many = "super::review::Entity")]
    Reviews,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::media::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Image.def()
    }
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::product_tag::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::product_tag::Relation::Product.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
