//! Scan command handlers for the CLI.
//!
//! Scans started here always run inline: the process waits for the analysis
//! service (up to the configured poll budget) before printing.

use std::sync::Arc;

use brandscan_core::{AnalysisMode, AppConfig, JobState, ScanRequest};
use brandscan_pipeline::{JobRecord, MemoryStore, PgStore, ScanPipeline, ScanStore};
use uuid::Uuid;

use crate::SweepCommands;

fn inline_pipeline(config: &AppConfig, store: Arc<dyn ScanStore>) -> anyhow::Result<ScanPipeline> {
    let mut config = config.clone();
    config.analysis_mode = AnalysisMode::Inline;
    Ok(ScanPipeline::from_config(&config, store)?)
}

pub(crate) async fn run_scan(
    config: &AppConfig,
    pool: sqlx::PgPool,
    request: ScanRequest,
) -> anyhow::Result<()> {
    let store: Arc<dyn ScanStore> = Arc::new(PgStore::new(pool));
    tracing::info!(brand = %request.brand_name, website = %request.website_url, "starting scan");
    let job = inline_pipeline(config, store)?.run_inline(request).await?;
    log_finished(&job);
    print_json(&job_summary(&job))
}

pub(crate) async fn run_scan_in_memory(
    config: &AppConfig,
    request: ScanRequest,
) -> anyhow::Result<()> {
    let store: Arc<dyn ScanStore> = Arc::new(MemoryStore::new());
    tracing::info!(
        brand = %request.brand_name,
        website = %request.website_url,
        "starting scan without database"
    );
    let job = inline_pipeline(config, store)?.run_inline(request).await?;
    log_finished(&job);
    print_json(&job_summary(&job))
}

fn log_finished(job: &JobRecord) {
    match &job.state.error {
        Some(error) => tracing::warn!(job_id = %job.id, error = %error, "scan failed"),
        None => tracing::info!(
            job_id = %job.id,
            status = %job.state.status,
            cached = job.cached,
            "scan finished"
        ),
    }
}

pub(crate) async fn run_status(
    config: &AppConfig,
    pool: sqlx::PgPool,
    job_id: Uuid,
) -> anyhow::Result<()> {
    let store: Arc<dyn ScanStore> = Arc::new(PgStore::new(pool));
    let pipeline = ScanPipeline::from_config(config, store)?;
    let state = pipeline.check_status(job_id).await?;
    tracing::info!(job_id = %job_id, status = %state.status, "status re-checked");
    print_json(&state_summary(job_id, &state))
}

pub(crate) async fn run_sweep(
    config: &AppConfig,
    pool: sqlx::PgPool,
    command: &SweepCommands,
) -> anyhow::Result<()> {
    let store: Arc<dyn ScanStore> = Arc::new(PgStore::new(pool));
    let pipeline = ScanPipeline::from_config(config, store)?;

    match command {
        SweepCommands::Recheck => {
            let settled = pipeline.recheck_analyzing().await?;
            tracing::info!(settled, "re-check sweep finished");
            println!("settled {settled} analyzing job(s)");
        }
        SweepCommands::Stale => {
            let processing = pipeline.fail_stale_processing().await?;
            let analyzing = pipeline.fail_stale_analyzing().await?;
            if processing + analyzing > 0 {
                tracing::warn!(processing, analyzing, "failed stale jobs");
            }
            println!("failed {processing} stale processing and {analyzing} stale analyzing job(s)");
        }
        SweepCommands::PurgeCache => {
            let removed = pipeline.purge_cache().await?;
            tracing::info!(removed, "cache purge finished");
            println!("removed {removed} expired cache entr(ies)");
        }
    }
    Ok(())
}

pub(crate) fn state_summary(job_id: Uuid, state: &JobState) -> serde_json::Value {
    let mut summary = serde_json::json!({
        "job_id": job_id,
        "status": state.status,
    });
    if let Some(result) = &state.result {
        summary["overall_score"] = result.overall_score.into();
        summary["pillar_scores"] = serde_json::json!(result.pillar_scores);
        summary["summary"] = result.summary.clone().into();
    }
    if let Some(error) = &state.error {
        summary["error"] = error.clone().into();
    }
    summary
}

pub(crate) fn job_summary(job: &JobRecord) -> serde_json::Value {
    let mut summary = state_summary(job.id, &job.state);
    summary["brand_name"] = job.request.brand_name.clone().into();
    summary["cached"] = job.cached.into();
    summary
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
