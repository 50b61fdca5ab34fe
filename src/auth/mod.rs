//! Cookie-based JWT authentication.
//!
//! Dual-token system: short-lived access tokens (15 min, stateless) and
//! long-lived refresh tokens (7 days, one revocable record per identity).
//! Expired access tokens are never renewed server-side by the guard; the
//! client renews them through the refresh endpoint.

mod cookie;
mod errors;
mod extractors;
mod state;
mod types;

pub use cookie::{
    ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, clear_cookie, get_cookie, session_cookie,
};
pub use errors::AuthError;
pub use extractors::{AdminOnly, Auth};
pub use state::HasAuthBackend;
pub use types::AuthenticatedUser;
