use async_trait::async_trait;
use brandscan_collect::SourceReport;
use brandscan_core::{JobHandle, JobState, JobStatus, ScanRequest, ScanResult};
use brandscan_db::{CompletedScan, DbError, NewScanJob, NewScanLog, ScanJobRow};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{CachedScan, JobRecord, ScanStore};
use crate::error::StoreError;

/// [`ScanStore`] over the `scan_jobs`, `scan_cache` and `scan_logs` tables.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn corrupt(what: &'static str, reason: impl ToString) -> StoreError {
    StoreError::Corrupt {
        what,
        reason: reason.to_string(),
    }
}

impl TryFrom<ScanJobRow> for JobRecord {
    type Error = StoreError;

    fn try_from(row: ScanJobRow) -> Result<Self, Self::Error> {
        let status = JobStatus::parse(&row.status)
            .ok_or_else(|| corrupt("job status", format!("unknown status {:?}", row.status)))?;
        let request: ScanRequest =
            serde_json::from_value(row.request).map_err(|e| corrupt("scan request", e))?;
        let result: Option<ScanResult> = row
            .result
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| corrupt("scan result", e))?;
        let handle = match (row.thread_id, row.run_id) {
            (Some(thread_id), Some(run_id)) => Some(JobHandle { thread_id, run_id }),
            _ => None,
        };

        Ok(JobRecord {
            id: row.id,
            request,
            fingerprint: row.fingerprint,
            state: JobState {
                status,
                handle,
                result,
                error: row.error_message,
            },
            pillars: row.pillars,
            cached: row.cached,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
        })
    }
}

fn records(rows: Vec<ScanJobRow>) -> Result<Vec<JobRecord>, StoreError> {
    rows.into_iter().map(JobRecord::try_from).collect()
}

#[async_trait]
impl ScanStore for PgStore {
    async fn insert_job(
        &self,
        id: Uuid,
        request: &ScanRequest,
        fingerprint: &str,
    ) -> Result<(), StoreError> {
        let request_json = serde_json::to_value(request)?;
        brandscan_db::insert_scan_job(
            &self.pool,
            &NewScanJob {
                id,
                brand_name: request.brand_name.trim(),
                website_url: &request.website_url,
                fingerprint,
                request: &request_json,
                callback_url: request.callback_url.as_deref(),
            },
        )
        .await?;
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        match brandscan_db::get_scan_job(&self.pool, id).await {
            Ok(row) => Ok(Some(JobRecord::try_from(row)?)),
            Err(DbError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn record_pillars(
        &self,
        id: Uuid,
        pillars: &serde_json::Value,
    ) -> Result<bool, StoreError> {
        Ok(brandscan_db::record_scan_pillars(&self.pool, id, pillars).await?)
    }

    async fn mark_analyzing(&self, id: Uuid, handle: &JobHandle) -> Result<bool, StoreError> {
        Ok(
            brandscan_db::mark_scan_job_analyzing(&self.pool, id, &handle.thread_id, &handle.run_id)
                .await?,
        )
    }

    async fn complete_job(
        &self,
        id: Uuid,
        result: &ScanResult,
        pillars: Option<&serde_json::Value>,
        cached: bool,
    ) -> Result<bool, StoreError> {
        let result_json = serde_json::to_value(result)?;
        let scores_json = serde_json::to_value(result.pillar_scores)?;
        let completed = CompletedScan {
            result: &result_json,
            pillar_scores: &scores_json,
            overall_score: i16::from(result.overall_score),
            pillars,
            cached,
        };
        Ok(brandscan_db::complete_scan_job(&self.pool, id, &completed).await?)
    }

    async fn fail_job(&self, id: Uuid, message: &str) -> Result<bool, StoreError> {
        Ok(brandscan_db::fail_scan_job(&self.pool, id, message).await?)
    }

    async fn list_analyzing(&self, limit: i64) -> Result<Vec<JobRecord>, StoreError> {
        records(brandscan_db::list_analyzing_jobs(&self.pool, limit).await?)
    }

    async fn list_stale_processing(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<JobRecord>, StoreError> {
        records(brandscan_db::list_stale_processing_jobs(&self.pool, older_than).await?)
    }

    async fn list_stale_analyzing(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<JobRecord>, StoreError> {
        records(brandscan_db::list_stale_analyzing_jobs(&self.pool, created_before).await?)
    }

    async fn touch_analyzing(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(brandscan_db::touch_analyzing_job(&self.pool, id).await?)
    }

    async fn get_cached(&self, fingerprint: &str) -> Result<Option<CachedScan>, StoreError> {
        let Some(row) = brandscan_db::get_cache_entry(&self.pool, fingerprint).await? else {
            return Ok(None);
        };
        match serde_json::from_value::<CachedScan>(row.payload) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                // An unreadable entry is a miss; the next completion overwrites it.
                tracing::warn!(fingerprint, error = %e, "ignoring unreadable cache entry");
                Ok(None)
            }
        }
    }

    async fn put_cached(
        &self,
        fingerprint: &str,
        entry: &CachedScan,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_value(entry)?;
        brandscan_db::upsert_cache_entry(&self.pool, fingerprint, &payload, expires_at).await?;
        Ok(())
    }

    async fn purge_expired_cache(&self) -> Result<u64, StoreError> {
        Ok(brandscan_db::purge_expired_cache(&self.pool).await?)
    }

    async fn record_source(&self, job_id: Uuid, report: &SourceReport) -> Result<(), StoreError> {
        let log = NewScanLog {
            job_id,
            source: &report.source,
            outcome: report.outcome.as_str(),
            duration_ms: i64::try_from(report.duration_ms).unwrap_or(i64::MAX),
            data_size: report.data_size.and_then(|size| i64::try_from(size).ok()),
            error_message: report.error.as_deref(),
        };
        brandscan_db::insert_scan_log(&self.pool, &log).await?;
        Ok(())
    }
}
