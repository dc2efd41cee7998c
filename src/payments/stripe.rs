//! Stripe REST client
//!
//! A thin form-encoded client for the handful of Connect endpoints the
//! marketplace needs. Requests made on behalf of a seller carry the
//! `Stripe-Account` header.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::{
    CheckoutSession, CheckoutSessionRequest, PaymentError, PaymentGateway, PurchasedLineItem,
};
use crate::config::StripeConfig;

const STRIPE_ACCOUNT_HEADER: &str = "Stripe-Account";
const LINE_ITEM_EXPANSION: &str = "line_items.data.price.product";

/// Stripe API client
#[derive(Debug, Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AccountLinkResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExpandedSessionResponse {
    line_items: Option<LineItemList>,
}

#[derive(Debug, Deserialize)]
struct LineItemList {
    data: Vec<LineItemResponse>,
}

#[derive(Debug, Deserialize)]
struct LineItemResponse {
    description: Option<String>,
    price: Option<PriceResponse>,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    product: Option<ProductResponse>,
}

#[derive(Debug, Deserialize)]
struct ProductResponse {
    name: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }

    pub fn from_config(config: &StripeConfig) -> Self {
        Self::new(
            config.secret_key.clone().unwrap_or_default(),
            config.api_base.clone(),
        )
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        account_id: Option<&str>,
        params: &[(String, String)],
    ) -> Result<T, PaymentError> {
        let mut request = self
            .http
            .post(self.endpoint(path))
            .bearer_auth(&self.secret_key)
            .form(params);
        if let Some(account_id) = account_id {
            request = request.header(STRIPE_ACCOUNT_HEADER, account_id);
        }

        debug!(path, "Sending Stripe request");
        decode_response(request.send().await?).await
    }
}

async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, PaymentError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .and_then(|envelope| envelope.error.message)
            .unwrap_or(body);
        warn!(status = status.as_u16(), %message, "Stripe request failed");
        return Err(PaymentError::Api {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| PaymentError::Decode(e.to_string()))
}

fn pair(key: impl Into<String>, value: impl Into<String>) -> (String, String) {
    (key.into(), value.into())
}

/// Flatten a checkout request into Stripe's bracketed form encoding.
fn checkout_session_params(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut params = vec![
        pair("mode", "payment"),
        pair("customer_email", request.customer_email.as_str()),
        pair("success_url", request.success_url.as_str()),
        pair("cancel_url", request.cancel_url.as_str()),
        pair("invoice_creation[enabled]", "true"),
        pair("metadata[userId]", request.user_id.to_string()),
        pair(
            "payment_intent_data[application_fee_amount]",
            request.application_fee_cents.to_string(),
        ),
    ];

    for (index, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{index}]");
        params.push(pair(format!("{prefix}[quantity]"), "1"));
        params.push(pair(
            format!("{prefix}[price_data][currency]"),
            item.currency.as_str(),
        ));
        params.push(pair(
            format!("{prefix}[price_data][unit_amount]"),
            item.unit_amount_cents.to_string(),
        ));
        params.push(pair(
            format!("{prefix}[price_data][product_data][name]"),
            item.name.as_str(),
        ));
        for (key, value) in item.metadata.to_map() {
            params.push(pair(
                format!("{prefix}[price_data][product_data][metadata][{key}]"),
                value,
            ));
        }
    }

    params
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_connected_account(&self) -> Result<String, PaymentError> {
        let account: IdResponse = self.post_form("/v1/accounts", None, &[]).await?;
        Ok(account.id)
    }

    async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<String, PaymentError> {
        let params = [
            pair("account", account_id),
            pair("refresh_url", refresh_url),
            pair("return_url", return_url),
            pair("type", "account_onboarding"),
        ];
        let link: AccountLinkResponse = self.post_form("/v1/account_links", None, &params).await?;
        Ok(link.url)
    }

    async fn create_checkout_session(
        &self,
        account_id: &str,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let params = checkout_session_params(request);
        let session: CheckoutSessionResponse = self
            .post_form("/v1/checkout/sessions", Some(account_id), &params)
            .await?;

        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
        })
    }

    async fn retrieve_line_items(
        &self,
        session_id: &str,
        account_id: Option<&str>,
    ) -> Result<Vec<PurchasedLineItem>, PaymentError> {
        let mut request = self
            .http
            .get(self.endpoint(&format!("/v1/checkout/sessions/{session_id}")))
            .bearer_auth(&self.secret_key)
            .query(&[("expand[]", LINE_ITEM_EXPANSION)]);
        if let Some(account_id) = account_id {
            request = request.header(STRIPE_ACCOUNT_HEADER, account_id);
        }

        let session: ExpandedSessionResponse = decode_response(request.send().await?).await?;
        let line_items = session
            .line_items
            .ok_or(PaymentError::MissingField("line_items"))?;

        line_items
            .data
            .into_iter()
            .map(|item| {
                let product = item
                    .price
                    .and_then(|price| price.product)
                    .ok_or(PaymentError::MissingField("price.product"))?;
                Ok(PurchasedLineItem {
                    name: if product.name.is_empty() {
                        item.description.unwrap_or_default()
                    } else {
                        product.name
                    },
                    product_id: product.metadata.get("id").cloned(),
                })
            })
            .collect()
    }
}
