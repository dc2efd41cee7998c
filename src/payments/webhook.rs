//! Stripe webhook verification and event decoding
//!
//! Stripe signs each delivery with a `Stripe-Signature` header of the form
//! `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`. The signature is HMAC-SHA256
//! over `"{t}.{raw body}"` keyed by the endpoint secret.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const ACCOUNT_UPDATED: &str = "account.updated";

/// Reasons a webhook delivery is rejected before processing
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing Stripe-Signature header")]
    MissingSignature,

    #[error("Invalid signature header: {0}")]
    InvalidSignatureFormat(String),

    #[error("Webhook secret is not configured")]
    NotConfigured,

    #[error("Timestamp too old: {seconds}s exceeds tolerance of {max_seconds}s")]
    TimestampTooOld { seconds: u64, max_seconds: u64 },

    #[error("Timestamp too far in future: {seconds}s exceeds tolerance of {max_seconds}s")]
    TimestampTooFuture { seconds: u64, max_seconds: u64 },

    #[error("No signatures found matching the expected signature for payload")]
    VerificationFailed,

    #[error("Invalid event payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// A decoded webhook event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Connected account the event originated from
    #[serde(default)]
    pub account: Option<String>,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// `data.object` of a `checkout.session.completed` event
#[derive(Debug, Clone, Deserialize)]
pub struct CompletedCheckoutSession {
    pub id: String,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl CompletedCheckoutSession {
    pub fn user_id(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get("userId"))
            .map(String::as_str)
    }
}

/// `data.object` of an `account.updated` event
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatedAccount {
    pub id: String,
    #[serde(default)]
    pub details_submitted: bool,
}

impl StripeEvent {
    pub fn checkout_session(&self) -> Result<CompletedCheckoutSession, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }

    pub fn account(&self) -> Result<UpdatedAccount, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

struct ParsedHeader<'a> {
    timestamp: u64,
    signatures: Vec<&'a str>,
}

fn parse_signature_header(header: &str) -> Result<ParsedHeader<'_>, WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(value.parse::<u64>().map_err(|_| {
                    WebhookError::InvalidSignatureFormat(
                        "timestamp must be a valid Unix timestamp".to_string(),
                    )
                })?);
            }
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        WebhookError::InvalidSignatureFormat("missing timestamp".to_string())
    })?;
    if signatures.is_empty() {
        return Err(WebhookError::InvalidSignatureFormat(
            "no v1 signatures found".to_string(),
        ));
    }

    Ok(ParsedHeader {
        timestamp,
        signatures,
    })
}

fn compute_signature(
    payload: &[u8],
    secret: &str,
    timestamp: u64,
) -> Result<Vec<u8>, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::VerificationFailed)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verify a signature header against `now` (Unix seconds).
pub fn verify_signature_at(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_seconds: u64,
    now: u64,
) -> Result<(), WebhookError> {
    if header.trim().is_empty() {
        return Err(WebhookError::MissingSignature);
    }
    if secret.is_empty() {
        return Err(WebhookError::NotConfigured);
    }

    let parsed = parse_signature_header(header)?;

    let time_diff = now.abs_diff(parsed.timestamp);
    if time_diff > tolerance_seconds {
        return Err(if now > parsed.timestamp {
            WebhookError::TimestampTooOld {
                seconds: time_diff,
                max_seconds: tolerance_seconds,
            }
        } else {
            WebhookError::TimestampTooFuture {
                seconds: time_diff,
                max_seconds: tolerance_seconds,
            }
        });
    }

    let expected = compute_signature(payload, secret, parsed.timestamp)?;
    let matched = parsed.signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|provided| subtle::ConstantTimeEq::ct_eq(&expected[..], &provided[..]).into())
            .unwrap_or(false)
    });

    if matched {
        debug!(
            body_size = payload.len(),
            "Stripe webhook signature verified"
        );
        Ok(())
    } else {
        Err(WebhookError::VerificationFailed)
    }
}

/// Verify a signature header against the current system time.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_seconds: u64,
) -> Result<(), WebhookError> {
    verify_signature_at(payload, header, secret, tolerance_seconds, unix_now())
}

/// Verify a delivery and decode its event envelope.
pub fn construct_event(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_seconds: u64,
) -> Result<StripeEvent, WebhookError> {
    verify_signature(payload, header, secret, tolerance_seconds)?;
    Ok(serde_json::from_slice(payload)?)
}

/// Build a valid `Stripe-Signature` header for `payload`.
///
/// Used to sign fixtures and local test deliveries.
pub fn signature_header(
    payload: &[u8],
    secret: &str,
    timestamp: u64,
) -> Result<String, WebhookError> {
    let signature = compute_signature(payload, secret, timestamp)?;
    Ok(format!("t={},v1={}", timestamp, hex::encode(signature)))
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
