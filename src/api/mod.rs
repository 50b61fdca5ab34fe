mod auth;
mod error;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::TokenIssuer;

pub use auth::{AuthState, Profile};
pub use error::ApiError;

/// Create the API router.
pub fn create_api_router(db: Database, jwt: Arc<TokenIssuer>, secure_cookies: bool) -> Router {
    let auth_state = auth::AuthState {
        db,
        jwt,
        secure_cookies,
    };

    Router::new().nest("/auth", auth::router(auth_state))
}
