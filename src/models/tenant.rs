//! Tenant entity model
//!
//! A tenant is a seller storefront inside the marketplace. Each tenant owns a
//! connected payment account through which its sales settle.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Tenant entity representing a seller storefront
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    /// Unique identifier for the tenant (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display name of the store
    pub name: String,

    /// Unique URL label, also used as the storefront subdomain
    #[sea_orm(unique)]
    pub slug: String,

    /// Optional store image
    pub image_id: Option<Uuid>,

    /// Connected account on the payment platform
    pub stripe_account_id: String,

    /// Whether the seller finished payment onboarding; gates product creation
    pub stripe_details_submitted: bool,

    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::media::Entity",
        from = "Column::ImageId",
        to = "super::media::Column::Id"
    )]
    Image,
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
}

impl Related<super::media::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Image.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
