//! Persistence seam for the scan pipeline.
//!
//! [`PgStore`] backs the service; [`MemoryStore`] holds everything in process
//! for tests and one-off CLI runs. Both honour the same contract: every job
//! transition is conditional on the job being non-terminal and reports whether
//! it applied.

mod memory;
mod postgres;

use async_trait::async_trait;
use brandscan_collect::SourceReport;
use brandscan_core::{JobHandle, JobState, ScanRequest, ScanResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// One scan job as the pipeline sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub id: Uuid,
    pub request: ScanRequest,
    pub fingerprint: String,
    pub state: JobState,
    /// The aggregated bundle, once collection has finished.
    pub pillars: Option<serde_json::Value>,
    pub cached: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// What the cache keeps per fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedScan {
    pub pillars: serde_json::Value,
    pub result: ScanResult,
}

#[async_trait]
pub trait ScanStore: Send + Sync {
    /// Persists a new job in `processing` status.
    async fn insert_job(
        &self,
        id: Uuid,
        request: &ScanRequest,
        fingerprint: &str,
    ) -> Result<(), StoreError>;

    async fn get_job(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError>;

    /// Stores the bundle on a job still in `processing`.
    async fn record_pillars(&self, id: Uuid, pillars: &serde_json::Value)
        -> Result<bool, StoreError>;

    /// `processing -> analyzing`.
    async fn mark_analyzing(&self, id: Uuid, handle: &JobHandle) -> Result<bool, StoreError>;

    /// Any non-terminal status `-> completed`. `pillars` replaces the stored
    /// bundle when given.
    async fn complete_job(
        &self,
        id: Uuid,
        result: &ScanResult,
        pillars: Option<&serde_json::Value>,
        cached: bool,
    ) -> Result<bool, StoreError>;

    /// Any non-terminal status `-> failed`.
    async fn fail_job(&self, id: Uuid, message: &str) -> Result<bool, StoreError>;

    async fn list_analyzing(&self, limit: i64) -> Result<Vec<JobRecord>, StoreError>;

    async fn list_stale_processing(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<JobRecord>, StoreError>;

    /// Jobs still `analyzing` that were created before `created_before`.
    async fn list_stale_analyzing(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<JobRecord>, StoreError>;

    /// Refreshes `updated_at` on an `analyzing` job after a check that left it
    /// waiting, moving it to the back of [`ScanStore::list_analyzing`].
    async fn touch_analyzing(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Returns the entry only while it is unexpired.
    async fn get_cached(&self, fingerprint: &str) -> Result<Option<CachedScan>, StoreError>;

    async fn put_cached(
        &self,
        fingerprint: &str,
        entry: &CachedScan,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn purge_expired_cache(&self) -> Result<u64, StoreError>;

    async fn record_source(&self, job_id: Uuid, report: &SourceReport) -> Result<(), StoreError>;
}
