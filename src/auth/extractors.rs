//! Axum extractors guarding protected endpoints.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::cookie::{ACCESS_COOKIE_NAME, get_cookie};
use super::errors::AuthError;
use super::state::HasAuthBackend;
use super::types::AuthenticatedUser;
use crate::db::UserRole;
use crate::jwt::TokenError;

/// Core guard logic: validate the access cookie and resolve its subject to
/// an account. Each failure maps to a distinct 401 reason; the guard never
/// consults the refresh token, renewal is the client's job via
/// `POST /auth/refresh-token`.
async fn authenticate_request<S>(parts: &Parts, state: &S) -> Result<AuthenticatedUser, AuthError>
where
    S: HasAuthBackend + Send + Sync,
{
    let access_token =
        get_cookie(&parts.headers, ACCESS_COOKIE_NAME).ok_or(AuthError::MissingToken)?;

    let claims = state
        .jwt()
        .validate_access_token(access_token)
        .map_err(|e| match e {
            TokenError::Expired => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;

    let user = state
        .db()
        .users()
        .get_by_uuid(&claims.sub)
        .await
        .map_err(|e| {
            tracing::error!("Failed to look up user: {}", e);
            AuthError::Database
        })?
        .ok_or(AuthError::UserNotFound)?;

    Ok(AuthenticatedUser { user })
}

/// Extractor for endpoints that require a valid access token.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state).await.map(Auth)
    }
}

/// Extractor for endpoints restricted to admin accounts.
pub struct AdminOnly(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for AdminOnly
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if user.user.role != UserRole::Admin {
            return Err(AuthError::InsufficientRole);
        }

        Ok(AdminOnly(user))
    }
}
