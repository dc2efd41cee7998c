//! Shopper cart state.
//!
//! A shopper keeps one cart per storefront. The state maps a tenant slug to
//! the ordered list of product ids added from that storefront.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Cart contents for a single storefront
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantCart {
    pub product_ids: Vec<Uuid>,
}

/// Every cart of one shopper, keyed by tenant slug
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartState {
    tenant_carts: BTreeMap<String, TenantCart>,
}

impl CartState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tenant_carts(&self) -> &BTreeMap<String, TenantCart> {
        &self.tenant_carts
    }

    /// Append a product to the tenant's cart.
    pub fn add_product(&mut self, tenant_slug: &str, product_id: Uuid) {
        self.tenant_carts
            .entry(tenant_slug.to_string())
            .or_default()
            .product_ids
            .push(product_id);
    }

    /// Remove every occurrence of a product; creates the tenant cart if missing.
    pub fn remove_product(&mut self, tenant_slug: &str, product_id: Uuid) {
        self.tenant_carts
            .entry(tenant_slug.to_string())
            .or_default()
            .product_ids
            .retain(|id| *id != product_id);
    }

    /// Add the product when absent, remove it otherwise. Returns whether it is now in the cart.
    pub fn toggle_product(&mut self, tenant_slug: &str, product_id: Uuid) -> bool {
        if self.is_product_in_cart(tenant_slug, product_id) {
            self.remove_product(tenant_slug, product_id);
            false
        } else {
            self.add_product(tenant_slug, product_id);
            true
        }
    }

    pub fn is_product_in_cart(&self, tenant_slug: &str, product_id: Uuid) -> bool {
        self.tenant_carts
            .get(tenant_slug)
            .is_some_and(|cart| cart.product_ids.contains(&product_id))
    }

    pub fn clear_cart(&mut self, tenant_slug: &str) {
        self.tenant_carts
            .insert(tenant_slug.to_string(), TenantCart::default());
    }

    pub fn clear_all_carts(&mut self) {
        self.tenant_carts.clear();
    }

    pub fn product_ids(&self, tenant_slug: &str) -> &[Uuid] {
        self.tenant_carts
            .get(tenant_slug)
            .map(|cart| cart.product_ids.as_slice())
            .unwrap_or_default()
    }

    pub fn total_items(&self, tenant_slug: &str) -> usize {
        self.product_ids(tenant_slug).len()
    }
}
