//! Authentication API endpoints.
//!
//! - POST `/signup` - Create an account, issue both session cookies
//! - POST `/login` - Verify credentials, issue both session cookies
//! - POST `/logout` - Revoke the refresh record and clear both cookies
//! - POST `/refresh-token` - Exchange the refresh cookie for a new access cookie
//! - GET `/profile` - Return the authenticated user's profile

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use super::error::{ApiError, ResultExt};
use crate::auth::{
    ACCESS_COOKIE_NAME, Auth, HasAuthBackend, REFRESH_COOKIE_NAME, clear_cookie, get_cookie,
    session_cookie,
};
use crate::db::{Database, User};
use crate::jwt::{TokenIssuer, TokenPair};
use crate::password::{hash_password, verify_password};

#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub jwt: Arc<TokenIssuer>,
    pub secure_cookies: bool,
}

impl HasAuthBackend for AuthState {
    fn jwt(&self) -> &TokenIssuer {
        &self.jwt
    }

    fn db(&self) -> &Database {
        &self.db
    }
}

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh-token", post(refresh_token))
        .route("/profile", get(profile))
        .with_state(state)
}

/// Public profile shape returned by signup, login, and the profile endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<&User> for Profile {
    fn from(user: &User) -> Self {
        Profile {
            id: user.uuid.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
        }
    }
}

/// Build the two Set-Cookie headers carrying a fresh token pair.
fn session_cookies(
    pair: &TokenPair,
    secure: bool,
) -> AppendHeaders<[(axum::http::HeaderName, String); 2]> {
    AppendHeaders([
        (
            SET_COOKIE,
            session_cookie(
                ACCESS_COOKIE_NAME,
                &pair.access.token,
                pair.access.duration,
                secure,
            ),
        ),
        (
            SET_COOKIE,
            session_cookie(
                REFRESH_COOKIE_NAME,
                &pair.refresh.token,
                pair.refresh.duration,
                secure,
            ),
        ),
    ])
}

/// Issue a token pair for a user and persist the refresh record.
async fn open_session(state: &AuthState, user: &User) -> Result<TokenPair, ApiError> {
    let pair = state.jwt.generate_token_pair(&user.uuid).map_err(|e| {
        error!("Failed to generate token pair: {}", e);
        ApiError::internal("Failed to generate tokens")
    })?;

    state
        .db
        .refresh_tokens()
        .put(&user.uuid, &pair.refresh.token)
        .await
        .db_err("Failed to store refresh token")?;

    Ok(pair)
}

#[derive(Deserialize)]
struct SignupRequest {
    name: String,
    email: String,
    password: String,
}

async fn signup(
    State(state): State<AuthState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = payload.name.trim();
    let email = payload.email.trim();

    if name.is_empty() {
        return Err(ApiError::bad_request("Name cannot be empty"));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if payload.password.len() < 6 {
        return Err(ApiError::bad_request(
            "Password must be at least 6 characters",
        ));
    }

    let existing = state
        .db
        .users()
        .get_by_email(email)
        .await
        .db_err("Failed to check email availability")?;
    if existing.is_some() {
        return Err(ApiError::bad_request("User already exists"));
    }

    let password_hash = hash_password(&payload.password).map_err(|e| {
        error!("Failed to hash password: {}", e);
        ApiError::internal("Failed to create account")
    })?;

    let uuid = uuid::Uuid::new_v4().to_string();
    state
        .db
        .users()
        .create(&uuid, name, email, &password_hash)
        .await
        .db_err("Failed to create user")?;

    let user = state
        .db
        .users()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| ApiError::internal("Failed to create account"))?;

    let pair = open_session(&state, &user).await?;

    Ok((
        StatusCode::CREATED,
        session_cookies(&pair, state.secure_cookies),
        Json(Profile::from(&user)),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_email(payload.email.trim())
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::bad_request("Invalid email or password"))?;

    let valid = verify_password(&user.password_hash, &payload.password).map_err(|e| {
        error!("Failed to verify password: {}", e);
        ApiError::internal("Failed to verify credentials")
    })?;
    if !valid {
        return Err(ApiError::bad_request("Invalid email or password"));
    }

    let pair = open_session(&state, &user).await?;

    Ok((
        StatusCode::OK,
        session_cookies(&pair, state.secure_cookies),
        Json(Profile::from(&user)),
    ))
}

/// Logout - revoke the refresh record (if the cookie still validates) and
/// clear both cookies either way.
async fn logout(
    State(state): State<AuthState>,
    request: axum::extract::Request,
) -> Result<impl IntoResponse, ApiError> {
    let (parts, _body) = request.into_parts();

    if let Some(refresh_token) = get_cookie(&parts.headers, REFRESH_COOKIE_NAME) {
        if let Ok(claims) = state.jwt.validate_refresh_token(refresh_token) {
            state
                .db
                .refresh_tokens()
                .delete(&claims.sub)
                .await
                .db_err("Failed to delete refresh token")?;
        }
    }

    let secure = state.secure_cookies;
    Ok((
        StatusCode::OK,
        AppendHeaders([
            (SET_COOKIE, clear_cookie(ACCESS_COOKIE_NAME, secure)),
            (SET_COOKIE, clear_cookie(REFRESH_COOKIE_NAME, secure)),
        ]),
        Json(serde_json::json!({ "message": "Logged out successfully" })),
    ))
}

/// Exchange a valid refresh cookie for a new access cookie. The presented
/// token must equal the single stored record for its subject; the refresh
/// token itself is not rotated.
async fn refresh_token(
    State(state): State<AuthState>,
    request: axum::extract::Request,
) -> Result<impl IntoResponse, ApiError> {
    let (parts, _body) = request.into_parts();

    let refresh_token = get_cookie(&parts.headers, REFRESH_COOKIE_NAME)
        .ok_or_else(|| ApiError::unauthorized("No refresh token provided"))?;

    let claims = state
        .jwt
        .validate_refresh_token(refresh_token)
        .map_err(|_| ApiError::unauthorized("Invalid or expired refresh token"))?;

    let stored = state
        .db
        .refresh_tokens()
        .get(&claims.sub)
        .await
        .db_err("Failed to check refresh token")?;

    // Exact match against the one stored record. A newer login or a logout
    // leaves the presented token orphaned, which counts as revoked.
    if stored.as_deref() != Some(refresh_token) {
        return Err(ApiError::unauthorized(
            "Refresh token is invalid or has been revoked",
        ));
    }

    let access = state.jwt.generate_access_token(&claims.sub).map_err(|e| {
        error!("Failed to generate access token: {}", e);
        ApiError::internal("Failed to generate token")
    })?;

    let access_cookie = session_cookie(
        ACCESS_COOKIE_NAME,
        &access.token,
        access.duration,
        state.secure_cookies,
    );

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, access_cookie)],
        Json(serde_json::json!({ "message": "Token refreshed successfully" })),
    ))
}

async fn profile(Auth(auth): Auth) -> impl IntoResponse {
    Json(Profile::from(&auth.user))
}
