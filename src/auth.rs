//! # Authentication
//!
//! Session-token authentication for shoppers and sellers. A login issues an
//! opaque random token; only its SHA-256 hash is stored. The token travels in
//! the `{prefix}-token` cookie or an `Authorization: Bearer` header.
//!
//! [`session_middleware`] resolves the token once per request and leaves the
//! result in the request extensions for the [`AuthUser`] and [`MaybeUser`]
//! extractors.

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{
        HeaderMap, HeaderValue,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
    middleware::Next,
    response::Response,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use regex::Regex;
use sea_orm::DatabaseConnection;
use serde_json::json;
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{ApiError, RepositoryError, unauthorized, validation_error};
use crate::models::user;
use crate::repositories::SessionRepository;
use crate::server::AppState;

const SESSION_TOKEN_BYTES: usize = 32;
const MIN_PASSWORD_LENGTH: usize = 8;
const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 63;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]*[a-z0-9]$").expect("Invalid regex"));

/// Errors from credential handling
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to hash password")]
    PasswordHash,
    #[error("Invalid credentials")]
    InvalidCredentials,
}

/// The user resolved from the request's session token, if any
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub user: Option<user::Model>,
    /// Hash of the presented token when it matched a live session
    pub token_hash: Option<String>,
}

/// Extractor for routes that require a signed-in user
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

/// Extractor for routes that behave differently for signed-in users
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<user::Model>);

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored PHC hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Generate a fresh URL-safe session token
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Storage form of a session token
pub fn hash_session_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Read a cookie value from every `Cookie` header
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Session token from the auth cookie, falling back to a bearer header
pub fn extract_session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    read_cookie(headers, cookie_name).or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    })
}

/// Build a `Set-Cookie` value.
///
/// Outside local and test profiles the cookie is shared across tenant
/// subdomains, which requires `SameSite=None; Secure`.
pub fn build_cookie(
    config: &AppConfig,
    name: &str,
    value: &str,
    max_age_seconds: i64,
) -> Result<HeaderValue, ApiError> {
    let mut cookie = format!(
        "{name}={value}; HttpOnly; Path=/; Max-Age={}",
        max_age_seconds.max(0)
    );
    if !config.is_development() {
        let domain = config
            .root_domain
            .split(':')
            .next()
            .unwrap_or(&config.root_domain);
        cookie.push_str(&format!("; SameSite=None; Domain={domain}; Secure"));
    }

    HeaderValue::from_str(&cookie).map_err(|e| {
        tracing::error!(error = %e, "Failed to build cookie header");
        ApiError::from(anyhow::anyhow!("invalid cookie value"))
    })
}

pub fn session_cookie(
    config: &AppConfig,
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<HeaderValue, ApiError> {
    let max_age = (expires_at - Utc::now()).num_seconds();
    build_cookie(config, &config.auth_cookie_name(), token, max_age)
}

pub fn expired_session_cookie(config: &AppConfig) -> Result<HeaderValue, ApiError> {
    build_cookie(config, &config.auth_cookie_name(), "", 0)
}

/// A newly issued session
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Create a session for `user_id` lasting `session_ttl_hours`
pub async fn start_session(
    db: &DatabaseConnection,
    config: &AppConfig,
    user_id: Uuid,
) -> Result<IssuedSession, RepositoryError> {
    let repo = SessionRepository::new(db);
    repo.purge_expired_for_user(user_id).await?;

    let token = generate_session_token();
    let expires_at = Utc::now() + Duration::hours(config.session_ttl_hours);
    repo.create(user_id, hash_session_token(&token), expires_at)
        .await?;

    Ok(IssuedSession { token, expires_at })
}

/// Resolve the session token of every request.
///
/// Lookup failures degrade to an anonymous request; protected routes then
/// reject it through [`AuthUser`].
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let mut session = CurrentSession {
        user: None,
        token_hash: None,
    };

    if let Some(token) =
        extract_session_token(request.headers(), &state.config.auth_cookie_name())
    {
        let token_hash = hash_session_token(&token);
        match SessionRepository::new(&state.db)
            .find_user_by_token_hash(&token_hash)
            .await
        {
            Ok(Some((_, user))) => {
                tracing::debug!(user_id = %user.id, "Resolved session");
                session.user = Some(user);
                session.token_hash = Some(token_hash);
            }
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(%error, "Session lookup failed; treating request as anonymous");
            }
        }
    }

    request.extensions_mut().insert(session);
    next.run(request).await
}

fn current_session(parts: &Parts) -> Option<&CurrentSession> {
    parts.extensions.get::<CurrentSession>()
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_session(parts)
            .and_then(|session| session.user.clone())
            .map(AuthUser)
            .ok_or_else(|| unauthorized(None))
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            current_session(parts).and_then(|session| session.user.clone()),
        ))
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(current_session(parts).cloned().unwrap_or(CurrentSession {
            user: None,
            token_hash: None,
        }))
    }
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Validate a username and return its canonical lowercase form
pub fn normalize_username(username: &str) -> Result<String, &'static str> {
    let username = username.trim().to_lowercase();
    let length = username.chars().count();

    if length < MIN_USERNAME_LENGTH {
        return Err("Username must be at least 3 characters");
    }
    if length > MAX_USERNAME_LENGTH {
        return Err("Username must be less than 64 characters");
    }
    if !USERNAME_RE.is_match(&username) {
        return Err(
            "Username can only contain lowercase letters, numbers and hyphens. It must start and end with a letter or number",
        );
    }
    if username.contains("--") {
        return Err("Username cannot contain consecutive hyphens");
    }

    Ok(username)
}

/// Normalized registration input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Check registration fields, collecting every field error
pub fn validate_registration(
    email: &str,
    password: &str,
    username: &str,
) -> Result<Registration, ApiError> {
    let mut errors = serde_json::Map::new();

    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        errors.insert("email".to_string(), json!("Invalid email address"));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.insert(
            "password".to_string(),
            json!(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )),
        );
    }
    let username = match normalize_username(username) {
        Ok(username) => username,
        Err(message) => {
            errors.insert("username".to_string(), json!(message));
            String::new()
        }
    };

    if !errors.is_empty() {
        return Err(validation_error(
            "Invalid registration",
            serde_json::Value::Object(errors),
        ));
    }

    Ok(Registration {
        email,
        username,
        password: password.to_string(),
    })
}
