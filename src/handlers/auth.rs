//! # Auth API Handlers
//!
//! Registration, login, logout and session introspection. Successful logins
//! set the session cookie and also return the token for bearer clients.

use axum::{
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, header::SET_COOKIE},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{
    CurrentSession, IssuedSession, expired_session_cookie, hash_password, session_cookie,
    start_session, validate_registration, verify_password,
};
use crate::error::{ApiError, bad_request, internal, unauthorized};
use crate::handlers::types::UserDto;
use crate::models::user::Role;
use crate::repositories::user::NewAccount;
use crate::repositories::{SessionRepository, UserRepository};
use crate::server::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "correct-horse")]
    pub password: String,
    /// Also becomes the storefront slug
    #[schema(example = "ada")]
    pub username: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Issued session
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserDto,
    /// Bearer token; also set as the session cookie
    pub token: String,
    /// Expiry of the session
    #[schema(value_type = String, format = DateTime)]
    pub exp: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub user: Option<UserDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

fn auth_response(
    state: &AppState,
    user: crate::models::user::Model,
    session: IssuedSession,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        session_cookie(&state.config, &session.token, session.expires_at)?,
    );

    Ok((
        headers,
        Json(AuthResponse {
            user: user.into(),
            token: session.token,
            exp: session.expires_at,
        }),
    ))
}

/// Current session
#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Signed-in user, or null", body = SessionResponse)
    ),
    tag = "auth"
)]
pub async fn session(session: CurrentSession) -> Json<SessionResponse> {
    Json(SessionResponse {
        user: session.user.map(UserDto::from),
    })
}

/// Register a seller account with its own storefront
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created and signed in", body = AuthResponse),
        (status = 400, description = "Invalid input, or username/email taken", body = ApiError),
        (status = 500, description = "Payment account could not be created", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let Json(request) = payload?;
    let registration =
        validate_registration(&request.email, &request.password, &request.username)?;

    let users = UserRepository::new(&state.db);
    if users
        .find_by_username(&registration.username)
        .await?
        .is_some()
    {
        return Err(bad_request("Username already taken"));
    }
    if users.find_by_email(&registration.email).await?.is_some() {
        return Err(bad_request("Email already registered"));
    }

    let stripe_account_id = state
        .payments
        .create_connected_account()
        .await
        .map_err(|error| {
            tracing::error!(%error, "Connected account creation failed");
            internal("Failed to create Stripe account")
        })?;

    let password_hash = hash_password(&registration.password).map_err(|error| {
        tracing::error!(%error, "Password hashing failed");
        internal("Failed to register user")
    })?;

    let (user, tenant) = users
        .register(NewAccount {
            email: registration.email,
            username: registration.username,
            password_hash,
            roles: vec![Role::User],
            stripe_account_id,
            stripe_details_submitted: false,
        })
        .await?;

    tracing::info!(
        user_id = %user.id,
        tenant_id = %tenant.id,
        tenant_slug = %tenant.slug,
        "Registered seller account"
    );

    let session = start_session(&state.db, &state.config, user.id).await?;
    auth_response(&state, user, session)
}

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ApiError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let Json(request) = payload?;

    let user = UserRepository::new(&state.db)
        .find_by_email(&request.email)
        .await?
        .ok_or_else(|| unauthorized(Some("Invalid credentials")))?;

    verify_password(&request.password, &user.password_hash)
        .map_err(|_| unauthorized(Some("Invalid credentials")))?;

    let session = start_session(&state.db, &state.config, user.id).await?;
    tracing::info!(user_id = %user.id, "User signed in");

    auth_response(&state, user, session)
}

/// End the current session
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session ended and cookie cleared", body = LogoutResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    session: CurrentSession,
) -> Result<(HeaderMap, Json<LogoutResponse>), ApiError> {
    if let Some(token_hash) = session.token_hash.as_deref() {
        SessionRepository::new(&state.db)
            .delete_by_token_hash(token_hash)
            .await?;
    }

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, expired_session_cookie(&state.config)?);

    Ok((
        headers,
        Json(LogoutResponse {
            message: "Logged out".to_string(),
        }),
    ))
}
