//! # Order Repository
//!
//! An order for `(user, product)` is what entitles a buyer to a product.
//! Orders are only written by the checkout webhook.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::cursor::PageRequest;
use crate::error::RepositoryError;
use crate::models::order::{self, Entity as Order};
use crate::models::product;

/// A purchased line item of a completed checkout session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchasedProduct {
    pub name: String,
    pub product_id: Uuid,
}

/// Orders to record for one completed checkout session
#[derive(Debug, Clone)]
pub struct CompletedCheckout {
    pub user_id: Uuid,
    pub checkout_session_id: String,
    pub stripe_account_id: Option<String>,
    pub items: Vec<PurchasedProduct>,
}

pub struct OrderRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> OrderRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_for_user_and_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<order::Model>, RepositoryError> {
        Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .filter(order::Column::ProductId.eq(product_id))
            .order_by_asc(order::Column::CreatedAt)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn has_purchased(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool, RepositoryError> {
        let count = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .filter(order::Column::ProductId.eq(product_id))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(count > 0)
    }

    /// One page of a user's orders, newest first
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<order::Model>, u64), RepositoryError> {
        let paginator = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .paginate(self.db, page.limit);

        let total = paginator
            .num_items()
            .await
            .map_err(RepositoryError::database_error)?;
        let orders = paginator
            .fetch_page(page.page_index())
            .await
            .map_err(RepositoryError::database_error)?;

        Ok((orders, total))
    }

    /// One page of every order, newest first
    pub async fn list_all(
        &self,
        page: PageRequest,
    ) -> Result<(Vec<order::Model>, u64), RepositoryError> {
        let paginator = Order::find()
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .paginate(self.db, page.limit);

        let total = paginator
            .num_items()
            .await
            .map_err(RepositoryError::database_error)?;
        let orders = paginator
            .fetch_page(page.page_index())
            .await
            .map_err(RepositoryError::database_error)?;

        Ok((orders, total))
    }

    /// Record the orders of a completed checkout session.
    ///
    /// Runs in one transaction. Line items already recorded for the same
    /// session and product are skipped, so redelivered webhooks do not
    /// duplicate entitlements. Returns only the newly created orders.
    pub async fn record_checkout(
        &self,
        checkout: CompletedCheckout,
    ) -> Result<Vec<order::Model>, RepositoryError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(RepositoryError::database_error)?;

        let mut created = Vec::with_capacity(checkout.items.len());
        for item in checkout.items {
            let already_recorded = Order::find()
                .filter(order::Column::StripeCheckoutSessionId.eq(&checkout.checkout_session_id))
                .filter(order::Column::ProductId.eq(item.product_id))
                .count(&txn)
                .await
                .map_err(RepositoryError::database_error)?
                > 0;
            if already_recorded {
                continue;
            }

            product::Entity::find_by_id(item.product_id)
                .one(&txn)
                .await
                .map_err(RepositoryError::database_error)?
                .ok_or_else(|| {
                    RepositoryError::not_found(format!("Product {} not found", item.product_id))
                })?;

            let order = order::ActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set(item.name),
                user_id: Set(checkout.user_id),
                product_id: Set(item.product_id),
                stripe_checkout_session_id: Set(checkout.checkout_session_id.clone()),
                stripe_account_id: Set(checkout.stripe_account_id.clone()),
                created_at: Set(Utc::now().into()),
            }
            .insert(&txn)
            .await
            .map_err(RepositoryError::database_error)?;
            created.push(order);
        }

        txn.commit()
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(created)
    }
}
