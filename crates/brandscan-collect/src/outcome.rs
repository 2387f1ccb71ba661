//! Maps fetch errors onto the per-source outcome taxonomy.

use brandscan_core::CollaboratorResult;

use crate::error::CollectError;

/// Statuses that mean the remote refused us rather than broke.
fn is_refusal(status: u16) -> bool {
    matches!(status, 401 | 403 | 429)
}

/// Converts an adapter error into the matching failure variant.
///
/// An exhausted 429 and any 401/403/429 status become `Blocked`, a transport
/// timeout becomes `Timeout`, everything else is `Failed` with the error text.
pub(crate) fn failure<T>(err: &CollectError) -> CollaboratorResult<T> {
    match err {
        CollectError::RateLimited { .. } => CollaboratorResult::Blocked(429),
        CollectError::UnexpectedStatus { status, .. } if is_refusal(*status) => {
            CollaboratorResult::Blocked(*status)
        }
        CollectError::UnexpectedStatus { status, .. } => {
            CollaboratorResult::Failed(format!("unexpected HTTP status {status}"))
        }
        err if err.is_timeout() => CollaboratorResult::Timeout,
        err => CollaboratorResult::Failed(err.to_string()),
    }
}

/// Collapses an adapter's `Result` into a [`CollaboratorResult`], logging failures.
pub(crate) fn settle<T>(
    source: &str,
    brand: &str,
    result: Result<T, CollectError>,
) -> CollaboratorResult<T> {
    match result {
        Ok(value) => CollaboratorResult::Success(value),
        Err(err) => {
            tracing::warn!(brand, source, error = %err, "source collection failed");
            failure(&err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16) -> CollectError {
        CollectError::UnexpectedStatus {
            status,
            url: "https://acme.com".to_string(),
        }
    }

    #[test]
    fn refusal_statuses_are_blocked() {
        for code in [401, 403, 429] {
            assert_eq!(failure::<()>(&status(code)), CollaboratorResult::Blocked(code));
        }
    }

    #[test]
    fn exhausted_rate_limit_is_blocked() {
        let err = CollectError::RateLimited {
            url: "https://html.duckduckgo.com/html/".to_string(),
            retry_after_secs: 0,
        };
        assert_eq!(failure::<()>(&err), CollaboratorResult::Blocked(429));
    }

    #[test]
    fn other_statuses_fail_with_code() {
        assert_eq!(
            failure::<()>(&status(503)),
            CollaboratorResult::Failed("unexpected HTTP status 503".to_string())
        );
    }

    #[test]
    fn decode_errors_fail_with_message() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = CollectError::Deserialize {
            context: "rdap".to_string(),
            source,
        };
        assert!(matches!(failure::<()>(&err), CollaboratorResult::Failed(msg) if msg.contains("rdap")));
    }

    #[test]
    fn settle_passes_success_through() {
        assert_eq!(settle("website", "Acme", Ok(7)), CollaboratorResult::Success(7));
    }
}
