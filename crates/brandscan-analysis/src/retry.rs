//! Retry with exponential back-off and jitter for analysis API calls.
//!
//! Only failures that never produced an answer, or produced a 5xx, are
//! retried. A run that the service rejected stays rejected.

use std::future::Future;
use std::time::Duration;

use crate::error::AnalysisError;

/// Returns `true` when the request never reached the service, so resending
/// cannot start a second run.
pub(crate) fn is_unsent(err: &AnalysisError) -> bool {
    matches!(err, AnalysisError::Http(e) if e.is_connect())
}

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** timeouts, connection failures, HTTP 5xx and 429.
///
/// **Not retriable:** other API statuses, malformed responses, missing
/// configuration and unusable output.
pub(crate) fn is_retriable(err: &AnalysisError) -> bool {
    match err {
        AnalysisError::Http(e) => e.is_timeout() || e.is_connect(),
        AnalysisError::Api { status, .. } => *status == 429 || *status >= 500,
        AnalysisError::Deserialize { .. }
        | AnalysisError::MissingApiKey
        | AnalysisError::InvalidBaseUrl { .. }
        | AnalysisError::EmptyOutput
        | AnalysisError::UnparseableOutput(_) => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on errors
/// accepted by `retriable`.
///
/// With `backoff_base_ms = 1_000` the sleeps are roughly 1 s, 2 s, 4 s, each
/// with ±25 % jitter. Delay is capped at 60 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    retriable: fn(&AnalysisError) -> bool,
    mut operation: F,
) -> Result<T, AnalysisError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AnalysisError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "analysis API transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
