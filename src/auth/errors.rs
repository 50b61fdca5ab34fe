//! Authentication error types.
//!
//! Guard failures never clear cookies: a 401 with an expired access token
//! must leave the refresh cookie intact so the client can renew the session.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Errors returned by the access guard.
#[derive(Debug)]
pub enum AuthError {
    /// No access token cookie on the request
    MissingToken,
    /// Access token signature is valid but the token has expired
    TokenExpired,
    /// Malformed token or bad signature
    InvalidToken,
    /// Token subject does not resolve to an existing account
    UserNotFound,
    /// Authenticated but lacking the required role
    InsufficientRole,
    /// Database lookup failed
    Database,
}

impl AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken
            | AuthError::TokenExpired
            | AuthError::InvalidToken
            | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientRole => StatusCode::FORBIDDEN,
            AuthError::Database => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Unauthorized - no access token provided",
            AuthError::TokenExpired => "Unauthorized - access token expired",
            AuthError::InvalidToken => "Unauthorized - invalid access token",
            AuthError::UserNotFound => "User not found",
            AuthError::InsufficientRole => "Access denied: admin only",
            AuthError::Database => "Internal server error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        use axum::Json;
        use serde::Serialize;

        #[derive(Serialize)]
        struct ErrorResponse {
            message: &'static str,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                message: self.message(),
            }),
        )
            .into_response()
    }
}
