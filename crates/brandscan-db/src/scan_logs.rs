//! Per-source collection outcomes, kept for diagnostics only.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScanLogRow {
    pub id: i64,
    pub job_id: Uuid,
    pub source: String,
    /// One of `success`, `failed`, `blocked`, `timeout`.
    pub outcome: String,
    pub duration_ms: i64,
    pub data_size: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewScanLog<'a> {
    pub job_id: Uuid,
    pub source: &'a str,
    pub outcome: &'a str,
    pub duration_ms: i64,
    pub data_size: Option<i64>,
    pub error_message: Option<&'a str>,
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_scan_log(pool: &PgPool, log: &NewScanLog<'_>) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO scan_logs \
             (job_id, source, outcome, duration_ms, data_size, error_message) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(log.job_id)
    .bind(log.source)
    .bind(log.outcome)
    .bind(log.duration_ms)
    .bind(log.data_size)
    .bind(log.error_message)
    .execute(pool)
    .await?;

    Ok(())
}

/// Lists the log rows for a job in insertion order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_scan_logs(pool: &PgPool, job_id: Uuid) -> Result<Vec<ScanLogRow>, DbError> {
    let rows = sqlx::query_as::<_, ScanLogRow>(
        "SELECT id, job_id, source, outcome, duration_ms, data_size, error_message, created_at \
         FROM scan_logs \
         WHERE job_id = $1 \
         ORDER BY id ASC",
    )
    .bind(job_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
