//! Background sweeps.
//!
//! Keeps `analyzing` jobs moving without an external trigger, fails jobs stuck
//! in `processing`, and clears expired cache rows.

use std::sync::Arc;

use brandscan_core::AppConfig;
use brandscan_pipeline::ScanPipeline;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

const STALE_SWEEP_CRON: &str = "0 */5 * * * *";
const CACHE_PURGE_CRON: &str = "0 0 * * * *";

/// Builds and starts the scheduler. Dropping the returned handle stops every
/// job, so keep it alive for the life of the process.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, a
/// cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    pipeline: ScanPipeline,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_recheck_job(&scheduler, pipeline.clone(), &config.recheck_cron).await?;
    register_stale_sweep_job(&scheduler, pipeline.clone()).await?;
    register_cache_purge_job(&scheduler, pipeline).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_recheck_job(
    scheduler: &JobScheduler,
    pipeline: ScanPipeline,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let pipeline = pipeline.clone();
        Box::pin(async move {
            match pipeline.recheck_analyzing().await {
                Ok(0) => tracing::debug!("scheduler: no analyzing jobs settled"),
                Ok(settled) => tracing::info!(settled, "scheduler: analyzing jobs settled"),
                Err(e) => tracing::error!(error = %e, "scheduler: re-check sweep failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered analysis re-check job");
    Ok(())
}

async fn register_stale_sweep_job(
    scheduler: &JobScheduler,
    pipeline: ScanPipeline,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(STALE_SWEEP_CRON, move |_uuid, _lock| {
        let pipeline = pipeline.clone();
        Box::pin(async move {
            match pipeline.fail_stale_processing().await {
                Ok(0) => {}
                Ok(failed) => tracing::warn!(failed, "scheduler: failed stale processing jobs"),
                Err(e) => tracing::error!(error = %e, "scheduler: stale sweep failed"),
            }
            match pipeline.fail_stale_analyzing().await {
                Ok(0) => {}
                Ok(failed) => tracing::warn!(failed, "scheduler: failed stale analyzing jobs"),
                Err(e) => tracing::error!(error = %e, "scheduler: analyzing cutoff sweep failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = STALE_SWEEP_CRON, "scheduler: registered stale-job sweep");
    Ok(())
}

async fn register_cache_purge_job(
    scheduler: &JobScheduler,
    pipeline: ScanPipeline,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(CACHE_PURGE_CRON, move |_uuid, _lock| {
        let pipeline = pipeline.clone();
        Box::pin(async move {
            match pipeline.purge_cache().await {
                Ok(removed) => tracing::info!(removed, "scheduler: purged expired cache rows"),
                Err(e) => tracing::error!(error = %e, "scheduler: cache purge failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = CACHE_PURGE_CRON, "scheduler: registered cache purge job");
    Ok(())
}
