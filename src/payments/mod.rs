//! Payment processing
//!
//! The marketplace never talks to the payment platform directly from
//! handlers. Everything goes through [`PaymentGateway`], whose production
//! implementation is the Stripe REST client in [`stripe`]. Incoming webhook
//! deliveries are authenticated and decoded by [`webhook`].

pub mod stripe;
pub mod webhook;

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

pub use stripe::StripeClient;

/// Errors returned by payment gateway calls
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Payment API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode payment API response: {0}")]
    Decode(String),

    #[error("Payment API response is missing `{0}`")]
    MissingField(&'static str),
}

/// Product metadata attached to every checkout line item.
///
/// The webhook reads `id` back to know which product was bought.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemMetadata {
    pub stripe_account_id: String,
    pub product_id: Uuid,
    pub name: String,
    /// Decimal price as shown to the buyer
    pub price: String,
}

impl LineItemMetadata {
    pub fn to_map(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("stripeAccountId", self.stripe_account_id.clone()),
            ("id", self.product_id.to_string()),
            ("name", self.name.clone()),
            ("price", self.price.clone()),
        ])
    }
}

/// One product in a checkout session, always bought with quantity 1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLineItem {
    pub name: String,
    pub unit_amount_cents: i64,
    pub currency: String,
    pub metadata: LineItemMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    pub user_id: Uuid,
    pub line_items: Vec<CheckoutLineItem>,
    /// Platform cut taken from the connected account, in cents
    pub application_fee_cents: i64,
}

/// Checkout session as returned by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted payment page; absent when the gateway could not create one
    pub url: Option<String>,
}

/// A line item read back from a completed checkout session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchasedLineItem {
    pub name: String,
    /// Marketplace product ID stored in the product metadata
    pub product_id: Option<String>,
}

/// Connected-account payment operations used by the marketplace.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a connected seller account and return its ID
    async fn create_connected_account(&self) -> Result<String, PaymentError>;

    /// Create an onboarding link for a connected account and return its URL
    async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String, PaymentError>;

    /// Create a payment-mode checkout session on the connected account
    async fn create_checkout_session(
        &self,
        account_id: &str,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Retrieve the line items of a checkout session with expanded products
    async fn retrieve_line_items(
        &self,
        session_id: &str,
        account_id: Option<&str>,
    ) -> Result<Vec<PurchasedLineItem>, PaymentError>;
}
