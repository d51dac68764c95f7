use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RevokedTokenRow {
    pub jti: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: DateTime<Utc>,
}

pub struct RevokedTokenRepo;

impl RevokedTokenRepo {
    /// Record a token id as revoked until `expires_at`. Revoking twice is a
    /// no-op; returns `false` when the id was already on the list.
    pub async fn revoke(
        pool: &PgPool,
        jti: &str,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO revoked_tokens (jti, user_id, expires_at) VALUES ($1, $2, $3) ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(user_id)
        .bind(expires_at)
        .execute(pool)
        .await
        .context("Failed to revoke token")?;
        Ok(result.rows_affected() > 0)
    }

    /// The revocation entry for `jti`, if the token was revoked.
    pub async fn get(pool: &PgPool, jti: &str) -> Result<Option<RevokedTokenRow>> {
        let row = sqlx::query_as::<_, RevokedTokenRow>(
            "SELECT jti, user_id, expires_at, revoked_at FROM revoked_tokens WHERE jti = $1",
        )
        .bind(jti)
        .fetch_optional(pool)
        .await
        .context("Failed to get revoked token")?;
        Ok(row)
    }

    /// Drop entries for tokens that would be rejected as expired anyway.
    pub async fn purge_expired(pool: &PgPool, before: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < $1")
            .bind(before)
            .execute(pool)
            .await
            .context("Failed to purge expired revoked tokens")?;
        Ok(result.rows_affected())
    }
}
