use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use brandscan_core::{JobStatus, ScanRequest, ScanResult};
use brandscan_pipeline::JobRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{map_pipeline_error, ApiError, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Serialize)]
pub(super) struct SubmitResponse {
    job_id: Uuid,
    status: JobStatus,
}

#[derive(Debug, Deserialize)]
pub(super) struct CheckStatusRequest {
    #[serde(alias = "jobId")]
    job_id: Uuid,
}

#[derive(Debug, Serialize)]
pub(super) struct StatusResponse {
    job_id: Uuid,
    status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    overall_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Full view of a stored scan.
#[derive(Debug, Serialize)]
pub(super) struct ScanView {
    job_id: Uuid,
    brand_name: String,
    website_url: String,
    status: JobStatus,
    cached: bool,
    result: Option<ScanResult>,
    pillars: Option<serde_json::Value>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<JobRecord> for ScanView {
    fn from(job: JobRecord) -> Self {
        Self {
            job_id: job.id,
            brand_name: job.request.brand_name,
            website_url: job.request.website_url,
            status: job.state.status,
            cached: job.cached,
            result: job.state.result,
            pillars: job.pillars,
            error: job.state.error,
            created_at: job.created_at,
            updated_at: job.updated_at,
            completed_at: job.completed_at,
        }
    }
}

pub(super) async fn submit_scan(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.body_text()))?;

    let job_id = state
        .pipeline
        .submit(request)
        .await
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            job_id,
            status: JobStatus::Processing,
        }),
    ))
}

pub(super) async fn check_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<CheckStatusRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) =
        payload.map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.body_text()))?;

    let job_state = state
        .pipeline
        .check_status(body.job_id)
        .await
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;

    Ok(Json(StatusResponse {
        job_id: body.job_id,
        status: job_state.status,
        overall_score: job_state.result.as_ref().map(|r| r.overall_score),
        error: job_state.error,
    }))
}

pub(super) async fn get_scan(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    job_id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(job_id) =
        job_id.map_err(|e| ApiError::new(req_id.0.clone(), "bad_request", e.body_text()))?;

    let job = state
        .pipeline
        .job(job_id)
        .await
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;

    Ok(Json(ScanView::from(job)))
}
