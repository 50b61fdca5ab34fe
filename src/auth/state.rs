//! Authentication state trait.

use crate::db::Database;
use crate::jwt::TokenIssuer;

/// Trait for router state types that provide database and token access
/// for the auth extractors.
pub trait HasAuthBackend {
    fn jwt(&self) -> &TokenIssuer;
    fn db(&self) -> &Database;
}
