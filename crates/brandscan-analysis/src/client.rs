//! HTTP client for the assistants-style analysis API.
//!
//! A scan is submitted as a single-message thread and run in one call; the
//! returned thread and run identifiers are the job handle. Status checks and
//! output retrieval read the same thread back.

use std::time::Duration;

use brandscan_core::{AppConfig, JobHandle};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use crate::error::AnalysisError;
use crate::output::parse_output;
use crate::retry::{is_retriable, is_unsent, retry_with_backoff};
use crate::types::{
    CreateThreadAndRun, ErrorEnvelope, MessageList, NewMessage, NewThread, RunObject, RunStatus,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";

const REQUEST_TIMEOUT_SECS: u64 = 60;
const MAX_RETRIES: u32 = 3;
const BACKOFF_BASE_MS: u64 = 1_000;
const ERROR_BODY_CHARS: usize = 300;

/// Client for the analysis API.
///
/// Use [`AnalysisClient::from_config`] in the service, or
/// [`AnalysisClient::with_base_url`] to point at a mock server in tests.
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    client: Client,
    assistant_id: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl AnalysisClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, assistant_id: &str) -> Result<Self, AnalysisError> {
        Self::with_base_url(api_key, assistant_id, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Http`] if the client cannot be built, or
    /// [`AnalysisError::InvalidBaseUrl`] if `base_url` does not parse or the
    /// key is not a valid header value.
    pub fn with_base_url(
        api_key: &str,
        assistant_id: &str,
        base_url: &str,
    ) -> Result<Self, AnalysisError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
            AnalysisError::InvalidBaseUrl {
                url: base_url.to_owned(),
                reason: format!("API key is not a valid header value: {e}"),
            }
        })?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("OpenAI-Beta", HeaderValue::from_static("assistants=v2"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("brandscan/0.1 (brand-analysis)")
            .default_headers(headers)
            .build()?;

        // Ensure exactly one trailing slash so relative joins append to the path.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| AnalysisError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            assistant_id: assistant_id.to_owned(),
            base_url,
            max_retries: MAX_RETRIES,
            backoff_base_ms: BACKOFF_BASE_MS,
        })
    }

    /// Builds a client from the application config.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::MissingApiKey`] when no key is configured, or
    /// any error from [`AnalysisClient::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Self, AnalysisError> {
        let key = config
            .openai_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AnalysisError::MissingApiKey)?;
        Self::with_base_url(key, &config.assistant_id, &config.openai_base_url)
    }

    /// Overrides the retry policy. Tests use a zero base delay.
    #[must_use]
    pub fn with_retry_policy(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Submits `payload` as a new thread and starts a run on it.
    ///
    /// Only connection failures are retried: once the request may have
    /// reached the service, resending could start a duplicate run.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::Api`] if the service rejects the submission.
    /// - [`AnalysisError::Http`] on network failure.
    /// - [`AnalysisError::Deserialize`] if the run object is malformed.
    pub async fn submit(&self, payload: &serde_json::Value) -> Result<JobHandle, AnalysisError> {
        let url = self.endpoint("threads/runs")?;
        let body = CreateThreadAndRun {
            assistant_id: &self.assistant_id,
            thread: NewThread {
                messages: vec![NewMessage {
                    role: "user",
                    content: payload.to_string(),
                }],
            },
        };

        let run: RunObject =
            retry_with_backoff(self.max_retries, self.backoff_base_ms, is_unsent, || {
                self.send_json(
                    self.client.post(url.clone()).json(&body),
                    "create thread and run",
                )
            })
            .await?;

        tracing::info!(
            thread_id = %run.thread_id,
            run_id = %run.id,
            status = %run.status,
            "analysis run submitted"
        );
        Ok(JobHandle {
            thread_id: run.thread_id,
            run_id: run.id,
        })
    }

    /// Reads the current status of the run behind `handle`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Api`], [`AnalysisError::Http`] or
    /// [`AnalysisError::Deserialize`] once transient retries are exhausted.
    pub async fn run_status(&self, handle: &JobHandle) -> Result<RunStatus, AnalysisError> {
        let url = self.endpoint(&format!(
            "threads/{}/runs/{}",
            handle.thread_id, handle.run_id
        ))?;
        let run: RunObject = retry_with_backoff(
            self.max_retries,
            self.backoff_base_ms,
            is_retriable,
            || self.send_json(self.client.get(url.clone()), "retrieve run"),
        )
        .await?;

        Ok(RunStatus::from_run(&run))
    }

    /// Fetches the assistant's reply on a completed run and parses it.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::EmptyOutput`] if the thread has no assistant text.
    /// - [`AnalysisError::UnparseableOutput`] if the text holds no JSON object.
    /// - Transport errors as for [`AnalysisClient::run_status`].
    pub async fn fetch_output(
        &self,
        handle: &JobHandle,
    ) -> Result<serde_json::Value, AnalysisError> {
        let url = self.endpoint(&format!("threads/{}/messages", handle.thread_id))?;
        let messages: MessageList = retry_with_backoff(
            self.max_retries,
            self.backoff_base_ms,
            is_retriable,
            || self.send_json(self.client.get(url.clone()), "list messages"),
        )
        .await?;

        let text = messages.assistant_text().ok_or(AnalysisError::EmptyOutput)?;
        parse_output(text)
    }

    fn endpoint(&self, path: &str) -> Result<Url, AnalysisError> {
        self.base_url
            .join(path)
            .map_err(|e| AnalysisError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    /// Sends the request, maps non-2xx statuses to [`AnalysisError::Api`], and
    /// deserializes the body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<T, AnalysisError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.chars().take(ERROR_BODY_CHARS).collect());
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| AnalysisError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
