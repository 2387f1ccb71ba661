//! Bounded exponential backoff for outbound calls.
//!
//! Only HTTP 429 and transport failures are retried. Every other outcome,
//! including non-2xx statuses, is handed back to the caller on the first try.

use std::future::Future;
use std::time::Duration;

use crate::error::CollectError;

/// Upper bound on how long a server-supplied `Retry-After` may stall a call.
const MAX_RETRY_AFTER_SECS: u64 = 60;

fn is_retriable(err: &CollectError) -> bool {
    matches!(
        err,
        CollectError::RateLimited { .. } | CollectError::Http(_)
    )
}

/// Delay before the retry that follows attempt number `attempt` (0-based).
///
/// `backoff_base_ms * 2^attempt`, raised to the server's `Retry-After` when
/// that is longer (capped at one minute).
fn backoff_delay(backoff_base_ms: u64, attempt: u32, err: &CollectError) -> Duration {
    let exponential = backoff_base_ms.saturating_mul(1u64 << attempt.min(62));
    let requested = match err {
        CollectError::RateLimited {
            retry_after_secs, ..
        } => retry_after_secs.min(&MAX_RETRY_AFTER_SECS).saturating_mul(1000),
        _ => 0,
    };
    Duration::from_millis(exponential.max(requested))
}

/// Runs `operation` up to `max_attempts` times, sleeping between retriable failures.
///
/// With `backoff_base_ms = 1000` the waits are 1 s, 2 s, 4 s, ... After the
/// last attempt the final error is returned. `max_attempts` of zero is
/// treated as one.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, CollectError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CollectError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !is_retriable(&err) || attempt + 1 >= max_attempts {
            return Err(err);
        }

        let delay = backoff_delay(backoff_base_ms, attempt, &err);
        tracing::debug!(
            attempt = attempt + 1,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "transient fetch error, retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
