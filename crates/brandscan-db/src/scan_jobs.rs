//! Database operations for `scan_jobs`.
//!
//! Every status change is a single conditional `UPDATE` guarded on the
//! expected current status. A `false` return means the row had already moved
//! on (or does not exist) and nothing was written.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const SCAN_JOB_COLUMNS: &str = "id, brand_name, website_url, fingerprint, request, callback_url, \
     status, thread_id, run_id, pillars, result, pillar_scores, overall_score, error_message, \
     cached, created_at, updated_at, completed_at";

/// A row from the `scan_jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScanJobRow {
    pub id: Uuid,
    pub brand_name: String,
    pub website_url: String,
    pub fingerprint: String,
    /// The accepted request, serialized as submitted.
    pub request: serde_json::Value,
    pub callback_url: Option<String>,
    pub status: String,
    pub thread_id: Option<String>,
    pub run_id: Option<String>,
    pub pillars: Option<serde_json::Value>,
    pub result: Option<serde_json::Value>,
    pub pillar_scores: Option<serde_json::Value>,
    pub overall_score: Option<i16>,
    pub error_message: Option<String>,
    pub cached: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Insert payload for a freshly accepted scan.
#[derive(Debug, Clone)]
pub struct NewScanJob<'a> {
    pub id: Uuid,
    pub brand_name: &'a str,
    pub website_url: &'a str,
    pub fingerprint: &'a str,
    pub request: &'a serde_json::Value,
    pub callback_url: Option<&'a str>,
}

/// Fields written together when a job completes.
#[derive(Debug, Clone)]
pub struct CompletedScan<'a> {
    pub result: &'a serde_json::Value,
    pub pillar_scores: &'a serde_json::Value,
    pub overall_score: i16,
    /// Replaces the stored bundle when `Some` (cache hits carry their own).
    pub pillars: Option<&'a serde_json::Value>,
    pub cached: bool,
}

/// Inserts a new job in `processing` status and returns the row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_scan_job(pool: &PgPool, job: &NewScanJob<'_>) -> Result<ScanJobRow, DbError> {
    let sql = format!(
        "INSERT INTO scan_jobs \
             (id, brand_name, website_url, fingerprint, request, callback_url, status) \
         VALUES ($1, $2, $3, $4, $5, $6, 'processing') \
         RETURNING {SCAN_JOB_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ScanJobRow>(&sql)
        .bind(job.id)
        .bind(job.brand_name)
        .bind(job.website_url)
        .bind(job.fingerprint)
        .bind(job.request)
        .bind(job.callback_url)
        .fetch_one(pool)
        .await?;

    Ok(row)
}

/// Fetches a job by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if the
/// query fails.
pub async fn get_scan_job(pool: &PgPool, id: Uuid) -> Result<ScanJobRow, DbError> {
    let sql = format!("SELECT {SCAN_JOB_COLUMNS} FROM scan_jobs WHERE id = $1");
    sqlx::query_as::<_, ScanJobRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Stores the aggregated pillar bundle while the job is still `processing`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn record_scan_pillars(
    pool: &PgPool,
    id: Uuid,
    pillars: &serde_json::Value,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE scan_jobs \
         SET pillars = $2, updated_at = NOW() \
         WHERE id = $1 AND status = 'processing'",
    )
    .bind(id)
    .bind(pillars)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Moves `processing -> analyzing` and persists the remote run handle.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_scan_job_analyzing(
    pool: &PgPool,
    id: Uuid,
    thread_id: &str,
    run_id: &str,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE scan_jobs \
         SET status = 'analyzing', thread_id = $2, run_id = $3, updated_at = NOW() \
         WHERE id = $1 AND status = 'processing'",
    )
    .bind(id)
    .bind(thread_id)
    .bind(run_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Moves a non-terminal job to `completed`, writing every result field at once.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn complete_scan_job(
    pool: &PgPool,
    id: Uuid,
    completed: &CompletedScan<'_>,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE scan_jobs \
         SET status = 'completed', result = $2, pillar_scores = $3, overall_score = $4, \
             pillars = COALESCE($5, pillars), cached = $6, error_message = NULL, \
             completed_at = NOW(), updated_at = NOW() \
         WHERE id = $1 AND status IN ('processing', 'analyzing')",
    )
    .bind(id)
    .bind(completed.result)
    .bind(completed.pillar_scores)
    .bind(completed.overall_score)
    .bind(completed.pillars)
    .bind(completed.cached)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Moves a non-terminal job to `failed` with a message.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn fail_scan_job(pool: &PgPool, id: Uuid, error_message: &str) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE scan_jobs \
         SET status = 'failed', error_message = $2, completed_at = NOW(), updated_at = NOW() \
         WHERE id = $1 AND status IN ('processing', 'analyzing')",
    )
    .bind(id)
    .bind(error_message)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Returns up to `limit` jobs waiting on the analysis service, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_analyzing_jobs(pool: &PgPool, limit: i64) -> Result<Vec<ScanJobRow>, DbError> {
    let sql = format!(
        "SELECT {SCAN_JOB_COLUMNS} FROM scan_jobs \
         WHERE status = 'analyzing' \
         ORDER BY updated_at ASC \
         LIMIT $1"
    );
    let rows = sqlx::query_as::<_, ScanJobRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Returns jobs that have sat in `processing` since before `older_than`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_stale_processing_jobs(
    pool: &PgPool,
    older_than: DateTime<Utc>,
) -> Result<Vec<ScanJobRow>, DbError> {
    let sql = format!(
        "SELECT {SCAN_JOB_COLUMNS} FROM scan_jobs \
         WHERE status = 'processing' AND updated_at < $1 \
         ORDER BY updated_at ASC"
    );
    let rows = sqlx::query_as::<_, ScanJobRow>(&sql)
        .bind(older_than)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Bumps `updated_at` on a job still `analyzing` so the next re-check batch
/// starts with jobs that have waited longest since their last check.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn touch_analyzing_job(pool: &PgPool, id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE scan_jobs SET updated_at = NOW() \
         WHERE id = $1 AND status = 'analyzing'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Returns jobs still `analyzing` that were created before `created_before`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_stale_analyzing_jobs(
    pool: &PgPool,
    created_before: DateTime<Utc>,
) -> Result<Vec<ScanJobRow>, DbError> {
    let sql = format!(
        "SELECT {SCAN_JOB_COLUMNS} FROM scan_jobs \
         WHERE status = 'analyzing' AND created_at < $1 \
         ORDER BY created_at ASC"
    );
    let rows = sqlx::query_as::<_, ScanJobRow>(&sql)
        .bind(created_before)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
