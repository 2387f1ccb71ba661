//! Shared HTTP client with bounded retry for every collaborator adapter.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};

use crate::cookies::CookieJar;
use crate::error::CollectError;
use crate::retry::retry_with_backoff;

pub(crate) const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Header set sent to pages that gate content on looking like a browser.
pub(crate) fn browser_headers() -> Vec<(HeaderName, HeaderValue)> {
    use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, UPGRADE_INSECURE_REQUESTS, USER_AGENT};
    vec![
        (USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT)),
        (
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        ),
        (ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9")),
        (HeaderName::from_static("dnt"), HeaderValue::from_static("1")),
        (UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1")),
        (HeaderName::from_static("sec-fetch-dest"), HeaderValue::from_static("document")),
        (HeaderName::from_static("sec-fetch-mode"), HeaderValue::from_static("navigate")),
        (HeaderName::from_static("sec-fetch-site"), HeaderValue::from_static("none")),
        (CACHE_CONTROL, HeaderValue::from_static("max-age=0")),
    ]
}

/// Per-call knobs for [`FetchClient::fetch`].
#[derive(Debug, Clone)]
pub struct FetchOptions<'a> {
    pub method: Method,
    pub headers: Vec<(HeaderName, HeaderValue)>,
    /// Overrides the client-wide attempt budget for this call.
    pub max_attempts: Option<u32>,
    /// Replays and records cookies for `domain` across attempts.
    pub cookies: Option<(&'a CookieJar, &'a str)>,
}

impl Default for FetchOptions<'_> {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: Vec::new(),
            max_attempts: None,
            cookies: None,
        }
    }
}

impl<'a> FetchOptions<'a> {
    #[must_use]
    pub fn attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }

    #[must_use]
    pub fn browser(mut self) -> Self {
        self.headers.extend(browser_headers());
        self
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn cookies(mut self, jar: &'a CookieJar, domain: &'a str) -> Self {
        self.cookies = Some((jar, domain));
        self
    }
}

/// A fully read response. The status is data here; callers decide what a
/// non-2xx means for their source.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: StatusCode,
    pub url: String,
    pub body: String,
}

impl FetchedPage {
    /// Returns the page only when the status is 2xx.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::UnexpectedStatus`] for any other status.
    pub fn require_success(self) -> Result<Self, CollectError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(CollectError::UnexpectedStatus {
                status: self.status.as_u16(),
                url: self.url,
            })
        }
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Deserialize`] when the body is not valid JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, CollectError> {
        serde_json::from_str(&self.body).map_err(|source| CollectError::Deserialize {
            context: format!("response from {}", self.url),
            source,
        })
    }
}

/// HTTP client shared by all adapters of one collector.
///
/// Transport errors and HTTP 429 are retried with exponential backoff up to
/// `max_attempts` total attempts. Every other status is returned to the caller.
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
    max_attempts: u32,
    backoff_base_ms: u64,
}

impl FetchClient {
    /// Creates a client with the given timeout, default `User-Agent`, and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_attempts: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, CollectError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_attempts,
            backoff_base_ms,
        })
    }

    /// Fetches `url` and reads the full body.
    ///
    /// # Errors
    ///
    /// - [`CollectError::RateLimited`]: HTTP 429 on every attempt.
    /// - [`CollectError::Http`]: network, TLS or timeout failure on the last attempt.
    pub async fn fetch(
        &self,
        url: &str,
        options: &FetchOptions<'_>,
    ) -> Result<FetchedPage, CollectError> {
        let max_attempts = options.max_attempts.unwrap_or(self.max_attempts);

        retry_with_backoff(max_attempts, self.backoff_base_ms, || async move {
            let mut headers = HeaderMap::new();
            for (name, value) in &options.headers {
                headers.insert(name.clone(), value.clone());
            }
            if let Some((jar, domain)) = options.cookies {
                if let Some(cookie) = jar.header_for(domain) {
                    if let Ok(value) = HeaderValue::from_str(&cookie) {
                        headers.insert(reqwest::header::COOKIE, value);
                    }
                }
            }

            let response = self
                .client
                .request(options.method.clone(), url)
                .headers(headers)
                .send()
                .await?;
            let status = response.status();

            if let Some((jar, domain)) = options.cookies {
                jar.record(
                    domain,
                    response
                        .headers()
                        .get_all(reqwest::header::SET_COOKIE)
                        .iter()
                        .filter_map(|v| v.to_str().ok()),
                );
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .unwrap_or(0);
                return Err(CollectError::RateLimited {
                    url: url.to_owned(),
                    retry_after_secs,
                });
            }

            let final_url = response.url().to_string();
            let body = response.text().await?;
            Ok(FetchedPage {
                status,
                url: final_url,
                body,
            })
        })
        .await
    }
}
