use sqlx::sqlite::SqlitePool;

use crate::jwt::REFRESH_TOKEN_DURATION_SECS;

/// Store for refresh credentials. Each identity has at most one record,
/// keyed `refresh_token:<identity>`; `put` overwrites wholesale, so issuing
/// a new refresh token silently revokes the previous one.
#[derive(Clone)]
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

fn storage_key(identity: &str) -> String {
    format!("refresh_token:{}", identity)
}

impl RefreshTokenStore {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store the refresh token for an identity, replacing any existing
    /// record. The record expires after the refresh token lifetime.
    pub async fn put(&self, identity: &str, token: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT OR REPLACE INTO refresh_tokens (key, token, expires_at)
             VALUES (?, ?, strftime('%s', 'now') + ?)",
        )
        .bind(storage_key(identity))
        .bind(token)
        .bind(REFRESH_TOKEN_DURATION_SECS as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetch the stored refresh token for an identity. Expired records are
    /// treated as absent even before the eviction sweep removes them.
    pub async fn get(&self, identity: &str) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT token FROM refresh_tokens
             WHERE key = ? AND expires_at > strftime('%s', 'now')",
        )
        .bind(storage_key(identity))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    /// Remove the record for an identity (logout). Removing a missing
    /// record is not an error.
    pub async fn delete(&self, identity: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM refresh_tokens WHERE key = ?")
            .bind(storage_key(identity))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove all expired records. Returns the number removed.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= strftime('%s', 'now')")
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
