//! Scan orchestration.
//!
//! A submitted scan is persisted as `processing` and handed to a background
//! task: cache lookup, source collection, aggregation, submission to the
//! analysis service. Completion happens either inline (the task keeps
//! polling) or later through [`ScanPipeline::check_status`], driven by the
//! re-check sweep or by callers. Every state change goes through
//! [`JobState::apply`] and a conditional store write, so repeated checks never
//! produce a second completion or callback.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use brandscan_analysis::{AnalysisClient, AnalysisError, AnalysisPayload, RunStatus};
use brandscan_collect::{Collector, SourceReport};
use brandscan_core::{
    aggregate, fingerprint, AnalysisMode, AppConfig, JobEvent, JobHandle, JobState, JobStatus,
    ScanRequest, ScanResult, Transition,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::{PipelineError, StoreError};
use crate::notify::{Notification, Notifier};
use crate::store::{CachedScan, JobRecord, ScanStore};

const CACHE_TTL_HOURS: i64 = 24;
const RECHECK_BATCH: i64 = 50;
const PERSIST_ATTEMPTS: u32 = 3;
const PERSIST_BACKOFF_BASE_MS: u64 = 500;

/// Tunables for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub mode: AnalysisMode,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub cache_ttl: chrono::Duration,
    pub stale_after: chrono::Duration,
    /// Jobs still `analyzing` this long after creation are failed.
    pub analyzing_timeout: chrono::Duration,
    pub recheck_batch: i64,
    pub persist_attempts: u32,
    pub persist_backoff_base_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            mode: AnalysisMode::Deferred,
            poll_interval: Duration::from_secs(5),
            max_poll_attempts: 60,
            cache_ttl: chrono::Duration::hours(CACHE_TTL_HOURS),
            stale_after: chrono::Duration::minutes(30),
            analyzing_timeout: chrono::Duration::minutes(120),
            recheck_batch: RECHECK_BATCH,
            persist_attempts: PERSIST_ATTEMPTS,
            persist_backoff_base_ms: PERSIST_BACKOFF_BASE_MS,
        }
    }
}

impl PipelineSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            mode: config.analysis_mode,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            max_poll_attempts: config.max_poll_attempts,
            stale_after: chrono::Duration::minutes(config.stale_processing_minutes),
            analyzing_timeout: chrono::Duration::minutes(config.stale_analyzing_minutes),
            ..Self::default()
        }
    }
}

struct Inner {
    store: Arc<dyn ScanStore>,
    collector: Collector,
    analysis: Option<AnalysisClient>,
    notifier: Notifier,
    settings: PipelineSettings,
}

/// Cheap to clone; clones share one store and one set of HTTP clients.
#[derive(Clone)]
pub struct ScanPipeline {
    inner: Arc<Inner>,
}

impl ScanPipeline {
    #[must_use]
    pub fn new(
        store: Arc<dyn ScanStore>,
        collector: Collector,
        analysis: Option<AnalysisClient>,
        notifier: Notifier,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                collector,
                analysis,
                notifier,
                settings,
            }),
        }
    }

    /// Builds a pipeline from the application config.
    ///
    /// A missing API key is not an error here: scans are still accepted and
    /// collected, and fail at submission with a clear message.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if an HTTP client cannot be built.
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn ScanStore>,
    ) -> Result<Self, PipelineError> {
        let analysis = match AnalysisClient::from_config(config) {
            Ok(client) => Some(client),
            Err(AnalysisError::MissingApiKey) => {
                tracing::warn!("OPENAI_API_KEY not set; scans will fail at analysis submission");
                None
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self::new(
            store,
            Collector::from_config(config)?,
            analysis,
            Notifier::new()?,
            PipelineSettings::from_config(config),
        ))
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn ScanStore> {
        &self.inner.store
    }

    /// Validates and persists `request`, starts the scan in the background,
    /// and returns the new job id.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidRequest`] if the request is malformed.
    /// - [`PipelineError::Store`] if the job row cannot be written.
    pub async fn submit(&self, request: ScanRequest) -> Result<Uuid, PipelineError> {
        let (id, fingerprint) = self.accept(&request).await?;

        let pipeline = self.clone();
        tokio::spawn(async move {
            pipeline.run_job(id, &request, &fingerprint).await;
        });

        Ok(id)
    }

    /// Like [`ScanPipeline::submit`] but runs the scan on the caller's task
    /// and returns the job's state when the run ends.
    ///
    /// # Errors
    ///
    /// As for [`ScanPipeline::submit`], plus [`PipelineError::Store`] if the
    /// final state cannot be read back.
    pub async fn run_inline(&self, request: ScanRequest) -> Result<JobRecord, PipelineError> {
        let (id, fingerprint) = self.accept(&request).await?;
        self.run_job(id, &request, &fingerprint).await;
        self.job(id).await
    }

    async fn accept(&self, request: &ScanRequest) -> Result<(Uuid, String), PipelineError> {
        request.validate()?;
        let fingerprint = fingerprint(&request.brand_name, &request.website_url)?;
        let id = Uuid::new_v4();

        self.persist("insert job", || {
            self.inner.store.insert_job(id, request, &fingerprint)
        })
        .await?;

        tracing::info!(job_id = %id, brand = %request.brand_name, "scan accepted");
        Ok((id, fingerprint))
    }

    /// Fetches a job by id.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::JobNotFound`] for unknown ids.
    pub async fn job(&self, id: Uuid) -> Result<JobRecord, PipelineError> {
        self.inner
            .store
            .get_job(id)
            .await?
            .ok_or(PipelineError::JobNotFound(id))
    }

    /// Runs one job to submission (and to completion in inline mode).
    ///
    /// Never returns an error: anything that aborts the run is logged and the
    /// job is marked failed where possible.
    pub async fn run_job(&self, id: Uuid, request: &ScanRequest, fingerprint: &str) {
        if let Err(e) = self.execute(id, request, fingerprint).await {
            tracing::error!(job_id = %id, brand = %request.brand_name, error = %e, "scan aborted");
            self.abandon(id, &format!("scan aborted: {e}")).await;
        }
    }

    async fn execute(
        &self,
        id: Uuid,
        request: &ScanRequest,
        fingerprint: &str,
    ) -> Result<(), PipelineError> {
        let mut job = self.job(id).await?;

        if let Some(hit) = self.cached(fingerprint).await {
            tracing::info!(job_id = %id, brand = %request.brand_name, "serving scan from cache");
            self.advance(&job, JobEvent::CacheHit(hit.result), Some(&hit.pillars), true)
                .await?;
            return Ok(());
        }

        let collection = self.inner.collector.collect(request).await;
        tracing::info!(
            job_id = %id,
            brand = %request.brand_name,
            succeeded = collection.succeeded(),
            total = collection.reports.len(),
            "collection finished"
        );
        self.log_sources(id, &collection.reports).await;

        let bundle = aggregate(request, &collection.sources);
        let pillars = serde_json::to_value(&bundle).map_err(StoreError::from)?;
        self.persist("record pillars", || {
            self.inner.store.record_pillars(id, &pillars)
        })
        .await?;

        let payload = AnalysisPayload::new(request, &bundle, Utc::now())
            .to_value()
            .map_err(StoreError::from)?;
        job.pillars = Some(pillars);

        let event = match self.submit_analysis(&payload).await {
            Ok(handle) => JobEvent::Submitted(handle),
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "analysis submission failed");
                JobEvent::SubmissionFailed(e.to_string())
            }
        };
        let state = self.advance(&job, event, None, false).await?;

        if state.status == JobStatus::Analyzing && self.inner.settings.mode == AnalysisMode::Inline
        {
            self.poll_inline(id).await?;
        }
        Ok(())
    }

    async fn submit_analysis(
        &self,
        payload: &serde_json::Value,
    ) -> Result<JobHandle, AnalysisError> {
        let client = self
            .inner
            .analysis
            .as_ref()
            .ok_or(AnalysisError::MissingApiKey)?;
        client.submit(payload).await
    }

    async fn poll_inline(&self, id: Uuid) -> Result<(), PipelineError> {
        let settings = &self.inner.settings;
        for _ in 0..settings.max_poll_attempts {
            tokio::time::sleep(settings.poll_interval).await;
            match self.check_status(id).await {
                Ok(state) if state.status.is_terminal() => return Ok(()),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        job_id = %id,
                        error = %e,
                        "inline poll failed; leaving job for re-check"
                    );
                    return Ok(());
                }
            }
        }
        tracing::warn!(
            job_id = %id,
            attempts = settings.max_poll_attempts,
            "analysis still running after inline polling; leaving job for re-check"
        );
        Ok(())
    }

    /// Re-checks a job against the analysis service and advances it if the
    /// remote run has settled. Safe to call any number of times.
    ///
    /// Terminal and `processing` jobs are returned as stored without any
    /// remote call.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::JobNotFound`] for unknown ids, or
    /// [`PipelineError::Store`] if a transition cannot be persisted.
    pub async fn check_status(&self, id: Uuid) -> Result<JobState, PipelineError> {
        let job = self.job(id).await?;
        if job.state.status != JobStatus::Analyzing {
            return Ok(job.state);
        }
        let Some(handle) = job.state.handle.clone() else {
            return Ok(job.state);
        };

        let event = self.poll_event(id, &handle).await;
        let state = self.advance(&job, event, None, false).await?;
        if state.status == JobStatus::Analyzing {
            if let Err(e) = self.inner.store.touch_analyzing(id).await {
                tracing::warn!(job_id = %id, error = %e, "failed to record re-check time");
            }
        }
        Ok(state)
    }

    async fn poll_event(&self, id: Uuid, handle: &JobHandle) -> JobEvent {
        let Some(client) = self.inner.analysis.as_ref() else {
            return JobEvent::PollError(AnalysisError::MissingApiKey.to_string());
        };

        let event = match client.run_status(handle).await {
            Ok(RunStatus::Running) => JobEvent::RemoteRunning,
            Ok(RunStatus::Failed(message)) => JobEvent::RemoteFailed(message),
            Ok(RunStatus::Completed) => match client.fetch_output(handle).await {
                Ok(output) => JobEvent::RemoteCompleted(ScanResult::from_output(output)),
                Err(e) => poll_failure(&e),
            },
            Err(e) => poll_failure(&e),
        };

        if let JobEvent::PollError(message) = &event {
            tracing::warn!(
                job_id = %id,
                run_id = %handle.run_id,
                error = %message,
                "analysis poll failed"
            );
        }
        event
    }

    /// Applies `event` to `job`, persists the resulting state, and runs the
    /// terminal side effects if this call was the one that applied it.
    async fn advance(
        &self,
        job: &JobRecord,
        event: JobEvent,
        pillars: Option<&serde_json::Value>,
        cached: bool,
    ) -> Result<JobState, PipelineError> {
        let next = match job.state.apply(event) {
            Transition::Stay => return Ok(job.state.clone()),
            Transition::Advance(next) => next,
        };

        if !self.persist_state(job.id, &next, pillars, cached).await? {
            tracing::debug!(job_id = %job.id, "transition already applied elsewhere");
            return Ok(self.job(job.id).await?.state);
        }

        tracing::info!(job_id = %job.id, status = %next.status, "job advanced");
        if next.status.is_terminal() {
            self.on_terminal(job, &next, pillars, cached).await;
        }
        Ok(next)
    }

    async fn persist_state(
        &self,
        id: Uuid,
        next: &JobState,
        pillars: Option<&serde_json::Value>,
        cached: bool,
    ) -> Result<bool, StoreError> {
        let store = &self.inner.store;
        match next.status {
            JobStatus::Analyzing => {
                let Some(handle) = next.handle.as_ref() else {
                    return Ok(false);
                };
                self.persist("mark analyzing", || store.mark_analyzing(id, handle))
                    .await
            }
            JobStatus::Completed => {
                let Some(result) = next.result.as_ref() else {
                    return Ok(false);
                };
                self.persist("complete job", || {
                    store.complete_job(id, result, pillars, cached)
                })
                .await
            }
            JobStatus::Failed => {
                let message = next.error.as_deref().unwrap_or("scan failed");
                self.persist("fail job", || store.fail_job(id, message)).await
            }
            JobStatus::Processing => Ok(false),
        }
    }

    async fn on_terminal(
        &self,
        job: &JobRecord,
        state: &JobState,
        pillars: Option<&serde_json::Value>,
        cached: bool,
    ) {
        if let (JobStatus::Completed, Some(result), false) = (state.status, &state.result, cached) {
            match pillars.or(job.pillars.as_ref()) {
                Some(pillars) => self.store_cache(job, pillars, result).await,
                None => {
                    tracing::warn!(job_id = %job.id, "completed without stored pillars; not cached");
                }
            }
        }

        let Some(url) = job.request.callback_url.as_deref() else {
            return;
        };
        let notification = Notification {
            job_id: job.id,
            status: state.status,
            brand_name: job.request.brand_name.clone(),
            cached,
            overall_score: state.result.as_ref().map(|r| r.overall_score),
            pillar_scores: state.result.as_ref().map(|r| r.pillar_scores),
            error: state.error.clone(),
        };
        self.inner.notifier.send(url, &notification).await;
    }

    async fn store_cache(
        &self,
        job: &JobRecord,
        pillars: &serde_json::Value,
        result: &ScanResult,
    ) {
        let entry = CachedScan {
            pillars: pillars.clone(),
            result: result.clone(),
        };
        let expires_at = Utc::now() + self.inner.settings.cache_ttl;
        if let Err(e) = self
            .inner
            .store
            .put_cached(&job.fingerprint, &entry, expires_at)
            .await
        {
            tracing::warn!(job_id = %job.id, error = %e, "failed to cache scan result");
        }
    }

    async fn cached(&self, fingerprint: &str) -> Option<CachedScan> {
        match self.inner.store.get_cached(fingerprint).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(fingerprint, error = %e, "cache lookup failed; treating as miss");
                None
            }
        }
    }

    async fn log_sources(&self, id: Uuid, reports: &[SourceReport]) {
        for report in reports {
            if let Err(e) = self.inner.store.record_source(id, report).await {
                tracing::warn!(
                    job_id = %id,
                    source = %report.source,
                    error = %e,
                    "failed to write scan log"
                );
            }
        }
    }

    /// Best-effort move to `failed` after the run could not continue.
    async fn abandon(&self, id: Uuid, message: &str) {
        let result = match self.job(id).await {
            Ok(job) => self
                .advance(&job, JobEvent::Abandoned(message.to_owned()), None, false)
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::error!(job_id = %id, error = %e, "could not record scan failure");
        }
    }

    /// Retries a store write with exponential back-off.
    async fn persist<T, F, Fut>(&self, what: &'static str, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let settings = &self.inner.settings;
        let attempts = settings.persist_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt + 1 < attempts => {
                    let delay_ms = settings
                        .persist_backoff_base_ms
                        .saturating_mul(1u64 << attempt.min(10));
                    tracing::warn!(
                        what,
                        attempt,
                        delay_ms,
                        error = %e,
                        "store write failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Re-checks every job waiting on the analysis service. Returns how many
    /// reached a terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Store`] if the waiting jobs cannot be listed.
    pub async fn recheck_analyzing(&self) -> Result<usize, PipelineError> {
        let jobs = self
            .inner
            .store
            .list_analyzing(self.inner.settings.recheck_batch)
            .await?;
        let mut settled = 0;
        for job in jobs {
            match self.check_status(job.id).await {
                Ok(state) if state.status.is_terminal() => settled += 1,
                Ok(_) => {}
                Err(e) => tracing::warn!(job_id = %job.id, error = %e, "re-check failed"),
            }
        }
        Ok(settled)
    }

    /// Fails jobs that have sat in `processing` past the stale threshold.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Store`] if the stale jobs cannot be listed.
    pub async fn fail_stale_processing(&self) -> Result<usize, PipelineError> {
        let stale_after = self.inner.settings.stale_after;
        let older_than = Utc::now() - stale_after;
        let jobs = self.inner.store.list_stale_processing(older_than).await?;

        let message = format!(
            "scan did not finish within {} minutes",
            stale_after.num_minutes()
        );
        Ok(self.abandon_all(jobs, &message).await)
    }

    /// Fails jobs still waiting on the analysis service past the analyzing
    /// cutoff, counted from job creation.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Store`] if the stale jobs cannot be listed.
    pub async fn fail_stale_analyzing(&self) -> Result<usize, PipelineError> {
        let timeout = self.inner.settings.analyzing_timeout;
        let jobs = self
            .inner
            .store
            .list_stale_analyzing(Utc::now() - timeout)
            .await?;

        let message = format!(
            "analysis did not finish within {} minutes",
            timeout.num_minutes()
        );
        Ok(self.abandon_all(jobs, &message).await)
    }

    async fn abandon_all(&self, jobs: Vec<JobRecord>, message: &str) -> usize {
        let mut failed = 0;
        for job in jobs {
            match self
                .advance(&job, JobEvent::Abandoned(message.to_owned()), None, false)
                .await
            {
                Ok(state) if state.status == JobStatus::Failed => failed += 1,
                Ok(_) => {}
                Err(e) => tracing::warn!(job_id = %job.id, error = %e, "stale sweep failed"),
            }
        }
        failed
    }

    /// Removes expired cache entries.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Store`] if the delete fails.
    pub async fn purge_cache(&self) -> Result<u64, PipelineError> {
        Ok(self.inner.store.purge_expired_cache().await?)
    }
}

/// Maps a failed status or output call to an event. Output that can never
/// parse and client errors other than 429 end the job; anything else may
/// clear up on a later check.
fn poll_failure(error: &AnalysisError) -> JobEvent {
    match error {
        AnalysisError::EmptyOutput | AnalysisError::UnparseableOutput(_) => {
            JobEvent::RemoteFailed(error.to_string())
        }
        AnalysisError::Api { status, .. } if (400..500).contains(status) && *status != 429 => {
            JobEvent::RemoteFailed(error.to_string())
        }
        _ => JobEvent::PollError(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> AnalysisError {
        AnalysisError::Api {
            status,
            message: "nope".to_string(),
        }
    }

    #[test]
    fn client_errors_end_the_job() {
        for status in [400, 401, 403, 404, 410] {
            assert!(
                matches!(poll_failure(&api(status)), JobEvent::RemoteFailed(_)),
                "status {status}"
            );
        }
        assert!(matches!(
            poll_failure(&AnalysisError::EmptyOutput),
            JobEvent::RemoteFailed(_)
        ));
    }

    #[test]
    fn throttling_and_server_errors_are_retried_later() {
        for status in [429, 500, 502, 503] {
            assert!(
                matches!(poll_failure(&api(status)), JobEvent::PollError(_)),
                "status {status}"
            );
        }
        assert!(matches!(
            poll_failure(&AnalysisError::MissingApiKey),
            JobEvent::PollError(_)
        ));
    }
}
