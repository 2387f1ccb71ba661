//! Concurrent fan-out over every source for one scan.

use std::future::Future;
use std::time::{Duration, Instant};

use brandscan_core::sources::{FeedData, SearchResults, SocialProfile, SocialResults, WebsiteData};
use brandscan_core::{
    AppConfig, CollaboratorResult, CollectedSources, Platform, ScanRequest, SourceOutcome,
};
use futures::future::join_all;
use reqwest::Url;
use serde::Serialize;

use crate::cookies::CookieJar;
use crate::endpoints::SourceEndpoints;
use crate::error::CollectError;
use crate::fetch::FetchClient;
use crate::outcome::settle;
use crate::sources::{
    feed, hackernews, https_probe, rdap, search, social, wayback, website, wikipedia,
};

/// Timing and outcome of one source call, destined for the scan log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub source: String,
    pub outcome: SourceOutcome,
    pub duration_ms: u64,
    /// Serialized size of the successful payload.
    pub data_size: Option<u64>,
    pub error: Option<String>,
}

impl SourceReport {
    fn new<T: Serialize>(
        source: impl Into<String>,
        result: &CollaboratorResult<T>,
        elapsed: Duration,
    ) -> Self {
        let data_size = result
            .success()
            .and_then(|value| serde_json::to_vec(value).ok())
            .and_then(|bytes| u64::try_from(bytes.len()).ok());
        Self {
            source: source.into(),
            outcome: result.outcome(),
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            data_size,
            error: result.error_message(),
        }
    }
}

/// Everything one collection pass produced.
#[derive(Debug, Clone)]
pub struct Collection {
    pub sources: CollectedSources,
    pub reports: Vec<SourceReport>,
}

impl Collection {
    /// Number of source calls that came back successful.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome == SourceOutcome::Success)
            .count()
    }
}

/// Runs a domain-keyed adapter, failing fast when the website had no usable host.
async fn with_domain<'a, T, F, Fut>(
    source: &str,
    brand: &str,
    domain: Option<&'a str>,
    run: F,
) -> CollaboratorResult<T>
where
    F: FnOnce(&'a str) -> Fut,
    Fut: Future<Output = Result<T, CollectError>>,
{
    match domain {
        Some(domain) => settle(source, brand, run(domain).await),
        None => CollaboratorResult::Failed("website URL has no usable domain".to_string()),
    }
}

async fn timed<F: Future>(future: F) -> (F::Output, Duration) {
    let started = Instant::now();
    let output = future.await;
    (output, started.elapsed())
}

/// Runs every adapter for a request and gathers their outcomes.
///
/// All sources run concurrently except the web search family, which is one
/// sequential unit. The feed depends on the homepage and runs right after it.
/// Collection never fails: each source settles to its own outcome.
#[derive(Debug, Clone)]
pub struct Collector {
    client: FetchClient,
    endpoints: SourceEndpoints,
    search_delay: Duration,
}

impl Collector {
    #[must_use]
    pub fn new(client: FetchClient, endpoints: SourceEndpoints, search_delay: Duration) -> Self {
        Self {
            client,
            endpoints,
            search_delay,
        }
    }

    /// Builds a collector against the production endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, CollectError> {
        let client = FetchClient::new(
            config.fetch_timeout_secs,
            &config.user_agent,
            config.fetch_max_attempts,
            config.fetch_backoff_base_ms,
        )?;
        Ok(Self::new(
            client,
            SourceEndpoints::default(),
            Duration::from_millis(config.search_delay_ms),
        ))
    }

    pub async fn collect(&self, request: &ScanRequest) -> Collection {
        let brand = request.brand_name.trim();
        let site = request.website().ok();
        let domain = brandscan_core::registrable_domain(&request.website_url).ok();
        let jar = CookieJar::new();

        tracing::info!(brand, website = %request.website_url, "collecting sources");

        let (
            (website_res, website_took, feed_res, feed_took),
            (wikipedia_res, wikipedia_took),
            (wayback_res, wayback_took),
            (rdap_res, rdap_took),
            (https_res, https_took),
            (community_res, community_took),
            (search_res, mut search_reports),
            social_runs,
        ) = tokio::join!(
            self.website_and_feed(brand, site.as_ref()),
            timed(async {
                settle(
                    "wikipedia",
                    brand,
                    wikipedia::fetch_wikipedia(&self.client, &self.endpoints, brand).await,
                )
            }),
            timed(with_domain("wayback", brand, domain.as_deref(), |d| {
                wayback::fetch_wayback(&self.client, &self.endpoints, d)
            })),
            timed(with_domain("rdap_whois", brand, domain.as_deref(), |d| {
                rdap::fetch_registration(&self.client, &self.endpoints, d)
            })),
            timed(with_domain("https_check", brand, domain.as_deref(), |d| {
                https_probe::probe_https(&self.client, &self.endpoints, d)
            })),
            timed(async {
                settle(
                    "hackernews",
                    brand,
                    hackernews::fetch_mentions(&self.client, &self.endpoints, brand).await,
                )
            }),
            self.search_family(brand),
            self.social_profiles(request, brand, &jar),
        );

        let mut reports = vec![
            SourceReport::new("website", &website_res, website_took),
            SourceReport::new("rss", &feed_res, feed_took),
            SourceReport::new("wikipedia", &wikipedia_res, wikipedia_took),
            SourceReport::new("wayback", &wayback_res, wayback_took),
            SourceReport::new("rdap_whois", &rdap_res, rdap_took),
            SourceReport::new("https_check", &https_res, https_took),
            SourceReport::new("hackernews", &community_res, community_took),
        ];
        reports.append(&mut search_reports);

        let mut social = SocialResults::default();
        for (platform, result, took) in social_runs {
            reports.push(SourceReport::new(format!("social_{platform}"), &result, took));
            social.set(platform, result);
        }

        let collection = Collection {
            sources: CollectedSources {
                website: website_res,
                feed: feed_res,
                wikipedia: wikipedia_res,
                archive: wayback_res,
                registration: rdap_res,
                https: https_res,
                community: community_res,
                search: search_res,
                social,
            },
            reports,
        };

        tracing::info!(
            brand,
            succeeded = collection.succeeded(),
            total = collection.reports.len(),
            "source collection finished"
        );
        collection
    }

    async fn website_and_feed(
        &self,
        brand: &str,
        site: Option<&Url>,
    ) -> (
        CollaboratorResult<WebsiteData>,
        Duration,
        CollaboratorResult<FeedData>,
        Duration,
    ) {
        let Some(site) = site else {
            let reason = "website URL is not valid".to_string();
            return (
                CollaboratorResult::Failed(reason.clone()),
                Duration::ZERO,
                CollaboratorResult::Failed(reason),
                Duration::ZERO,
            );
        };

        let (website_res, website_took) = timed(async {
            settle(
                "website",
                brand,
                website::fetch_website(&self.client, site.as_str()).await,
            )
        })
        .await;

        let (feed_res, feed_took) = match website_res.success() {
            Some(page) => {
                let (data, took) = timed(feed::fetch_feed(
                    &self.client,
                    site,
                    page.metadata.feed_url.as_deref(),
                ))
                .await;
                (CollaboratorResult::Success(data), took)
            }
            None => (
                CollaboratorResult::Failed("homepage unavailable for feed discovery".to_string()),
                Duration::ZERO,
            ),
        };

        (website_res, website_took, feed_res, feed_took)
    }

    async fn search_family(&self, brand: &str) -> (SearchResults, Vec<SourceReport>) {
        let runs = search::search_all(&self.client, &self.endpoints, brand, self.search_delay).await;
        let mut results = SearchResults::default();
        let mut reports = Vec::with_capacity(runs.len());
        for (intent, result, took) in runs {
            reports.push(SourceReport::new(search::source_name(intent), &result, took));
            results.set(intent, result);
        }
        (results, reports)
    }

    async fn social_profiles(
        &self,
        request: &ScanRequest,
        brand: &str,
        jar: &CookieJar,
    ) -> Vec<(Platform, CollaboratorResult<SocialProfile>, Duration)> {
        let runs = request.social.provided().map(|(platform, handle)| async move {
            let (result, took) = timed(social::fetch_profile(
                &self.client,
                &self.endpoints,
                jar,
                brand,
                platform,
                handle,
            ))
            .await;
            (platform, result, took)
        });
        join_all(runs).await
    }
}
