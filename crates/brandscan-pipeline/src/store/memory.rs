use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use brandscan_collect::SourceReport;
use brandscan_core::{JobHandle, JobState, JobStatus, ScanRequest, ScanResult};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{CachedScan, JobRecord, ScanStore};
use crate::error::StoreError;

/// In-process store. Inspection helpers let tests assert on what was written.
#[derive(Debug, Default)]
pub struct MemoryStore {
    jobs: Mutex<HashMap<Uuid, JobRecord>>,
    cache: Mutex<HashMap<String, (CachedScan, DateTime<Utc>)>>,
    logs: Mutex<Vec<(Uuid, SourceReport)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan log entries written for `job_id`, in order.
    #[must_use]
    pub fn source_reports(&self, job_id: Uuid) -> Vec<SourceReport> {
        lock(&self.logs)
            .iter()
            .filter(|(id, _)| *id == job_id)
            .map(|(_, report)| report.clone())
            .collect()
    }

    /// Pushes a job's `updated_at` into the past, dragging `created_at` with
    /// it when needed.
    pub fn backdate(&self, id: Uuid, updated_at: DateTime<Utc>) {
        if let Some(job) = lock(&self.jobs).get_mut(&id) {
            job.updated_at = updated_at;
            job.created_at = job.created_at.min(updated_at);
        }
    }

    /// Applies `change` to a non-terminal job. Returns whether it applied.
    fn transition(&self, id: Uuid, change: impl FnOnce(&mut JobRecord)) -> bool {
        let mut jobs = lock(&self.jobs);
        match jobs.get_mut(&id) {
            Some(job) if !job.state.status.is_terminal() => {
                change(job);
                job.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl ScanStore for MemoryStore {
    async fn insert_job(
        &self,
        id: Uuid,
        request: &ScanRequest,
        fingerprint: &str,
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        lock(&self.jobs).insert(
            id,
            JobRecord {
                id,
                request: request.clone(),
                fingerprint: fingerprint.to_owned(),
                state: JobState::processing(),
                pillars: None,
                cached: false,
                created_at: now,
                updated_at: now,
                completed_at: None,
            },
        );
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<JobRecord>, StoreError> {
        Ok(lock(&self.jobs).get(&id).cloned())
    }

    async fn record_pillars(
        &self,
        id: Uuid,
        pillars: &serde_json::Value,
    ) -> Result<bool, StoreError> {
        let mut jobs = lock(&self.jobs);
        match jobs.get_mut(&id) {
            Some(job) if job.state.status == JobStatus::Processing => {
                job.pillars = Some(pillars.clone());
                job.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_analyzing(&self, id: Uuid, handle: &JobHandle) -> Result<bool, StoreError> {
        let mut jobs = lock(&self.jobs);
        match jobs.get_mut(&id) {
            Some(job) if job.state.status == JobStatus::Processing => {
                job.state.status = JobStatus::Analyzing;
                job.state.handle = Some(handle.clone());
                job.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn complete_job(
        &self,
        id: Uuid,
        result: &ScanResult,
        pillars: Option<&serde_json::Value>,
        cached: bool,
    ) -> Result<bool, StoreError> {
        Ok(self.transition(id, |job| {
            job.state.status = JobStatus::Completed;
            job.state.result = Some(result.clone());
            job.state.error = None;
            if let Some(pillars) = pillars {
                job.pillars = Some(pillars.clone());
            }
            job.cached = cached;
            job.completed_at = Some(Utc::now());
        }))
    }

    async fn fail_job(&self, id: Uuid, message: &str) -> Result<bool, StoreError> {
        Ok(self.transition(id, |job| {
            job.state.status = JobStatus::Failed;
            job.state.error = Some(message.to_owned());
            job.completed_at = Some(Utc::now());
        }))
    }

    async fn list_analyzing(&self, limit: i64) -> Result<Vec<JobRecord>, StoreError> {
        let mut jobs: Vec<JobRecord> = lock(&self.jobs)
            .values()
            .filter(|job| job.state.status == JobStatus::Analyzing)
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.updated_at);
        jobs.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(jobs)
    }

    async fn list_stale_processing(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<JobRecord>, StoreError> {
        let mut jobs: Vec<JobRecord> = lock(&self.jobs)
            .values()
            .filter(|job| job.state.status == JobStatus::Processing && job.updated_at < older_than)
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.updated_at);
        Ok(jobs)
    }

    async fn list_stale_analyzing(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<JobRecord>, StoreError> {
        let mut jobs: Vec<JobRecord> = lock(&self.jobs)
            .values()
            .filter(|job| {
                job.state.status == JobStatus::Analyzing && job.created_at < created_before
            })
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.created_at);
        Ok(jobs)
    }

    async fn touch_analyzing(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut jobs = lock(&self.jobs);
        match jobs.get_mut(&id) {
            Some(job) if job.state.status == JobStatus::Analyzing => {
                job.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_cached(&self, fingerprint: &str) -> Result<Option<CachedScan>, StoreError> {
        let now = Utc::now();
        Ok(lock(&self.cache)
            .get(fingerprint)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(entry, _)| entry.clone()))
    }

    async fn put_cached(
        &self,
        fingerprint: &str,
        entry: &CachedScan,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        lock(&self.cache).insert(fingerprint.to_owned(), (entry.clone(), expires_at));
        Ok(())
    }

    async fn purge_expired_cache(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let mut cache = lock(&self.cache);
        let before = cache.len();
        cache.retain(|_, (_, expires_at)| *expires_at > now);
        Ok(u64::try_from(before - cache.len()).unwrap_or(0))
    }

    async fn record_source(&self, job_id: Uuid, report: &SourceReport) -> Result<(), StoreError> {
        lock(&self.logs).push((job_id, report.clone()));
        Ok(())
    }
}
