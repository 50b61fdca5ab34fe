//! Authentication user types.

use crate::db::User;

/// The account resolved by the access guard.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
}
