//! # Product Repository
//!
//! Catalog queries. Listing applies the storefront filters (search, price
//! bounds, tenant, category subtree, tags) in SQL and pages with the
//! SeaORM paginator.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Select, Set, TransactionTrait,
    sea_query::{Expr, Func, LikeExpr, Query},
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::cursor::PageRequest;
use crate::error::RepositoryError;
use crate::models::product::{self, Entity as Product, RefundPolicy};
use crate::models::{product_tag, tag, tenant};

/// Listing order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Curated,
    Trending,
    HotAndNew,
}

/// Filters for a product listing
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    /// Restrict to one storefront; private products are then included
    pub tenant_slug: Option<String>,
    /// Category and its descendants
    pub category_ids: Option<Vec<Uuid>>,
    /// Match products carrying any of these tag names
    pub tag_names: Vec<String>,
    pub sort: ProductSort,
}

/// One page of products plus the total match count
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub products: Vec<product::Model>,
    pub total: u64,
}

/// Fields for a new product
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub category_id: Option<Uuid>,
    pub image_id: Option<Uuid>,
    pub refund_policy: RefundPolicy,
    pub content: Option<String>,
    pub is_private: bool,
    pub tag_ids: Vec<Uuid>,
}

/// Partial product update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub category_id: Option<Uuid>,
    pub image_id: Option<Uuid>,
    pub refund_policy: Option<RefundPolicy>,
    pub content: Option<String>,
    pub is_private: Option<bool>,
    pub is_archived: Option<bool>,
    pub tag_ids: Option<Vec<Uuid>>,
}

pub struct ProductRepository<'a> {
    db: &'a DatabaseConnection,
}

/// Escape LIKE wildcards so user input only matches literally
fn like_pattern(word: &str) -> LikeExpr {
    let escaped = word
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    LikeExpr::new(format!("%{escaped}%")).escape('\\')
}

fn tenant_slug_subquery(slug: &str) -> sea_orm::sea_query::SelectStatement {
    Query::select()
        .column(tenant::Column::Id)
        .from(tenant::Entity)
        .and_where(Expr::col(tenant::Column::Slug).eq(slug.to_lowercase()))
        .to_owned()
}

fn tagged_products_subquery(tag_names: &[String]) -> sea_orm::sea_query::SelectStatement {
    Query::select()
        .column((product_tag::Entity, product_tag::Column::ProductId))
        .from(product_tag::Entity)
        .inner_join(
            tag::Entity,
            Expr::col((tag::Entity, tag::Column::Id))
                .equals((product_tag::Entity, product_tag::Column::TagId)),
        )
        .and_where(Expr::col((tag::Entity, tag::Column::Name)).is_in(tag_names.iter().cloned()))
        .to_owned()
}

/// Build the filtered, ordered listing query
pub fn listing_query(filter: &ProductFilter) -> Select<Product> {
    let mut query = Product::find().filter(product::Column::IsArchived.eq(false));

    match filter.tenant_slug.as_deref() {
        Some(slug) => {
            query = query.filter(product::Column::TenantId.in_subquery(tenant_slug_subquery(slug)));
        }
        None => {
            query = query.filter(product::Column::IsPrivate.eq(false));
        }
    }

    if let Some(min) = filter.min_price_cents {
        query = query.filter(product::Column::PriceCents.gte(min));
    }
    if let Some(max) = filter.max_price_cents {
        query = query.filter(product::Column::PriceCents.lte(max));
    }

    if let Some(category_ids) = &filter.category_ids {
        query = query.filter(product::Column::CategoryId.is_in(category_ids.iter().copied()));
    }

    if !filter.tag_names.is_empty() {
        query = query
            .filter(product::Column::Id.in_subquery(tagged_products_subquery(&filter.tag_names)));
    }

    if let Some(search) = filter.search.as_deref() {
        let mut condition = Condition::all();
        for word in search.split_whitespace() {
            condition = condition.add(
                Expr::expr(Func::lower(Expr::col((product::Entity, product::Column::Name))))
                    .like(like_pattern(word)),
            );
        }
        query = query.filter(condition);
    }

    match filter.sort {
        ProductSort::HotAndNew => query
            .order_by_asc(product::Column::CreatedAt)
            .order_by_asc(product::Column::Id),
        ProductSort::Curated | ProductSort::Trending => query
            .order_by_desc(product::Column::CreatedAt)
            .order_by_desc(product::Column::Id),
    }
}

impl<'a> ProductRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<ProductPage, RepositoryError> {
        let paginator = listing_query(filter).paginate(self.db, page.limit);

        let total = paginator
            .num_items()
            .await
            .map_err(RepositoryError::database_error)?;
        let products = paginator
            .fetch_page(page.page_index())
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(ProductPage { products, total })
    }

    /// Any product, archived or not
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<product::Model>, RepositoryError> {
        Product::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// A product that can still be viewed and bought
    pub async fn find_active(&self, id: Uuid) -> Result<Option<product::Model>, RepositoryError> {
        Product::find_by_id(id)
            .filter(product::Column::IsArchived.eq(false))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Active products with these IDs, optionally restricted to one storefront
    pub async fn find_active_by_ids(
        &self,
        ids: &[Uuid],
        tenant_slug: Option<&str>,
    ) -> Result<Vec<product::Model>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = Product::find()
            .filter(product::Column::Id.is_in(ids.iter().copied()))
            .filter(product::Column::IsArchived.eq(false));
        if let Some(slug) = tenant_slug {
            query = query.filter(product::Column::TenantId.in_subquery(tenant_slug_subquery(slug)));
        }

        query
            .order_by_asc(product::Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Products with these IDs regardless of state, in no particular order
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<product::Model>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        Product::find()
            .filter(product::Column::Id.is_in(ids.iter().copied()))
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn create(&self, new: NewProduct) -> Result<product::Model, RepositoryError> {
        validate_product_fields(Some(&new.name), Some(new.price_cents))?;

        let now = Utc::now();
        let txn = self
            .db
            .begin()
            .await
            .map_err(RepositoryError::database_error)?;

        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(new.tenant_id),
            name: Set(new.name.trim().to_string()),
            description: Set(new.description),
            price_cents: Set(new.price_cents),
            category_id: Set(new.category_id),
            image_id: Set(new.image_id),
            refund_policy: Set(new.refund_policy),
            content: Set(new.content),
            is_private: Set(new.is_private),
            is_archived: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await
        .map_err(RepositoryError::database_error)?;

        replace_tags(&txn, product.id, &new.tag_ids).await?;

        txn.commit()
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(product)
    }

    pub async fn update(
        &self,
        product: product::Model,
        changes: ProductChanges,
    ) -> Result<product::Model, RepositoryError> {
        validate_product_fields(changes.name.as_deref(), changes.price_cents)?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(RepositoryError::database_error)?;

        let product_id = product.id;
        let mut active = product.into_active_model();
        if let Some(name) = changes.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = changes.description {
            active.description = Set(Some(description));
        }
        if let Some(price_cents) = changes.price_cents {
            active.price_cents = Set(price_cents);
        }
        if let Some(category_id) = changes.category_id {
            active.category_id = Set(Some(category_id));
        }
        if let Some(image_id) = changes.image_id {
            active.image_id = Set(Some(image_id));
        }
        if let Some(refund_policy) = changes.refund_policy {
            active.refund_policy = Set(refund_policy);
        }
        if let Some(content) = changes.content {
            active.content = Set(Some(content));
        }
        if let Some(is_private) = changes.is_private {
            active.is_private = Set(is_private);
        }
        if let Some(is_archived) = changes.is_archived {
            active.is_archived = Set(is_archived);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active
            .update(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        if let Some(tag_ids) = changes.tag_ids {
            replace_tags(&txn, product_id, &tag_ids).await?;
        }

        txn.commit()
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(updated)
    }
}

fn validate_product_fields(
    name: Option<&str>,
    price_cents: Option<i64>,
) -> Result<(), RepositoryError> {
    if name.is_some_and(|name| name.trim().is_empty()) {
        return Err(RepositoryError::validation_error("Product name cannot be empty"));
    }
    if price_cents.is_some_and(|price| price < 0) {
        return Err(RepositoryError::validation_error("Price cannot be negative"));
    }
    Ok(())
}

async fn replace_tags<C>(db: &C, product_id: Uuid, tag_ids: &[Uuid]) -> Result<(), RepositoryError>
where
    C: sea_orm::ConnectionTrait,
{
    product_tag::Entity::delete_many()
        .filter(product_tag::Column::ProductId.eq(product_id))
        .exec(db)
        .await
        .map_err(RepositoryError::database_error)?;

    let mut unique = tag_ids.to_vec();
    unique.sort();
    unique.dedup();
    if unique.is_empty() {
        return Ok(());
    }

    product_tag::Entity::insert_many(unique.into_iter().map(|tag_id| product_tag::ActiveModel {
        product_id: Set(product_id),
        tag_id: Set(tag_id),
    }))
    .exec_without_returning(db)
    .await
    .map_err(RepositoryError::database_error)?;

    Ok(())
}
