//! Outbound completion callbacks.
//!
//! One POST per applied terminal transition. Delivery failures are logged and
//! dropped; they never touch job state.

use std::time::Duration;

use brandscan_core::{JobStatus, PillarScores};
use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

const NOTIFY_TIMEOUT_SECS: u64 = 10;

/// Body posted to a job's callback URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub brand_name: String,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pillar_scores: Option<PillarScores>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    client: Client,
}

impl Notifier {
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(NOTIFY_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("BrandScan")
            .build()?;
        Ok(Self { client })
    }

    /// Delivers `notification` to `url`, logging the outcome.
    pub async fn send(&self, url: &str, notification: &Notification) {
        match self.client.post(url).json(notification).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!(
                    job_id = %notification.job_id,
                    status = %notification.status,
                    "callback delivered"
                );
            }
            Ok(response) => {
                tracing::warn!(
                    job_id = %notification.job_id,
                    http_status = response.status().as_u16(),
                    "callback rejected"
                );
            }
            Err(e) => {
                tracing::warn!(job_id = %notification.job_id, error = %e, "callback failed");
            }
        }
    }
}
