//! Database operations for `scan_cache`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CacheRow {
    pub fingerprint: String,
    pub payload: serde_json::Value,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Returns the entry for `fingerprint` only if it has not expired.
///
/// Expired rows are treated as absent even before the purge sweep removes them.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_cache_entry(pool: &PgPool, fingerprint: &str) -> Result<Option<CacheRow>, DbError> {
    let row = sqlx::query_as::<_, CacheRow>(
        "SELECT fingerprint, payload, expires_at, created_at, updated_at \
         FROM scan_cache \
         WHERE fingerprint = $1 AND expires_at > NOW()",
    )
    .bind(fingerprint)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts or wholesale replaces the entry for `fingerprint`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_cache_entry(
    pool: &PgPool,
    fingerprint: &str,
    payload: &serde_json::Value,
    expires_at: DateTime<Utc>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO scan_cache (fingerprint, payload, expires_at) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (fingerprint) DO UPDATE \
         SET payload = EXCLUDED.payload, \
             expires_at = EXCLUDED.expires_at, \
             updated_at = NOW()",
    )
    .bind(fingerprint)
    .bind(payload)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Deletes expired rows. Returns the number removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn purge_expired_cache(pool: &PgPool) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM scan_cache WHERE expires_at <= NOW()")
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
