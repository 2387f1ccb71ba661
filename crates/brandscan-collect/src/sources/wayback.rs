//! Earliest archived snapshot as a proxy for domain age.

use brandscan_core::sources::ArchiveSnapshot;
use chrono::{DateTime, Datelike, Utc};
use reqwest::Url;
use serde::Deserialize;

use crate::endpoints::SourceEndpoints;
use crate::error::CollectError;
use crate::fetch::{FetchClient, FetchOptions};

/// Asking for the snapshot closest to the archive's first year makes
/// "closest" mean "earliest".
const EARLIEST_TIMESTAMP: &str = "19960101";

#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    #[serde(default)]
    archived_snapshots: Option<Snapshots>,
}

#[derive(Debug, Deserialize)]
struct Snapshots {
    #[serde(default)]
    closest: Option<Closest>,
}

#[derive(Debug, Deserialize)]
struct Closest {
    timestamp: String,
    #[serde(default)]
    url: Option<String>,
}

/// # Errors
///
/// Returns [`CollectError`] when the availability API cannot be reached or
/// answers with something other than the expected JSON.
pub async fn fetch_wayback(
    client: &FetchClient,
    endpoints: &SourceEndpoints,
    domain: &str,
) -> Result<ArchiveSnapshot, CollectError> {
    let url = Url::parse_with_params(
        &endpoints.wayback,
        &[("url", domain), ("timestamp", EARLIEST_TIMESTAMP)],
    )
    .map_err(|e| CollectError::InvalidUrl {
        url: endpoints.wayback.clone(),
        reason: e.to_string(),
    })?;

    let body: AvailabilityResponse = client
        .fetch(url.as_str(), &FetchOptions::default())
        .await?
        .require_success()?
        .json()?;

    Ok(snapshot_from(body, Utc::now()))
}

fn snapshot_from(body: AvailabilityResponse, now: DateTime<Utc>) -> ArchiveSnapshot {
    let Some(closest) = body.archived_snapshots.and_then(|s| s.closest) else {
        return ArchiveSnapshot::default();
    };
    let ts = closest.timestamp;
    let (first_seen, age_years) = match (ts.get(0..4), ts.get(4..6), ts.get(6..8)) {
        (Some(year), Some(month), Some(day)) => (
            Some(format!("{year}-{month}-{day}")),
            year.parse::<i32>().ok().map(|y| now.year() - y),
        ),
        _ => (None, None),
    };

    ArchiveSnapshot {
        available: true,
        timestamp: Some(ts),
        url: closest.url,
        first_seen,
        age_years,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn parse(json: &str) -> AvailabilityResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn derives_first_seen_and_age() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let body = parse(
            r#"{"archived_snapshots":{"closest":{"available":true,"status":"200",
                "timestamp":"20080315123000","url":"http://web.archive.org/web/20080315123000/acme.com"}}}"#,
        );
        let snapshot = snapshot_from(body, now);
        assert!(snapshot.available);
        assert_eq!(snapshot.first_seen.as_deref(), Some("2008-03-15"));
        assert_eq!(snapshot.age_years, Some(18));
        assert_eq!(snapshot.timestamp.as_deref(), Some("20080315123000"));
    }

    #[test]
    fn no_snapshot_is_unavailable() {
        let now = Utc::now();
        assert_eq!(
            snapshot_from(parse(r#"{"archived_snapshots":{}}"#), now),
            ArchiveSnapshot::default()
        );
        assert!(!snapshot_from(parse("{}"), now).available);
    }
}
