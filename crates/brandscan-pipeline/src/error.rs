use brandscan_analysis::AnalysisError;
use brandscan_collect::CollectError;
use brandscan_core::CoreError;
use brandscan_db::DbError;
use thiserror::Error;
use uuid::Uuid;

/// Failures of a [`crate::store::ScanStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),

    /// A stored row could not be mapped back to domain types.
    #[error("corrupt stored {what}: {reason}")]
    Corrupt { what: &'static str, reason: String },

    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    InvalidRequest(#[from] CoreError),

    #[error("scan job {0} not found")]
    JobNotFound(Uuid),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("collector setup failed: {0}")]
    Collect(#[from] CollectError),

    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),
}
