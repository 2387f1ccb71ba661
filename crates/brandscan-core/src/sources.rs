//! Normalized per-source results produced by the collaborator adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::request::Platform;

/// Outcome of one collaborator call. Failure variants never carry partial data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum CollaboratorResult<T> {
    Success(T),
    Failed(String),
    /// The remote answered with a refusal status (401/403/429 after retries).
    Blocked(u16),
    Timeout,
}

impl<T> Default for CollaboratorResult<T> {
    fn default() -> Self {
        Self::Failed("not collected".to_string())
    }
}

impl<T> CollaboratorResult<T> {
    #[must_use]
    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub fn outcome(&self) -> SourceOutcome {
        match self {
            Self::Success(_) => SourceOutcome::Success,
            Self::Failed(_) => SourceOutcome::Failed,
            Self::Blocked(_) => SourceOutcome::Blocked,
            Self::Timeout => SourceOutcome::Timeout,
        }
    }

    /// Human-readable failure text for scan logs; `None` on success.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Success(_) => None,
            Self::Failed(reason) => Some(reason.clone()),
            Self::Blocked(status) => Some(format!("blocked with HTTP {status}")),
            Self::Timeout => Some("timed out".to_string()),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> CollaboratorResult<U> {
        match self {
            Self::Success(value) => CollaboratorResult::Success(f(value)),
            Self::Failed(reason) => CollaboratorResult::Failed(reason),
            Self::Blocked(status) => CollaboratorResult::Blocked(status),
            Self::Timeout => CollaboratorResult::Timeout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceOutcome {
    Success,
    Failed,
    Blocked,
    Timeout,
}

impl SourceOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceOutcome::Success => "success",
            SourceOutcome::Failed => "failed",
            SourceOutcome::Blocked => "blocked",
            SourceOutcome::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for SourceOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Website
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebsiteMetadata {
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub author: String,
    pub robots: String,
    pub og_title: String,
    pub og_description: String,
    pub og_image: String,
    pub og_url: String,
    pub og_type: String,
    pub og_site_name: String,
    pub twitter_card: String,
    pub twitter_site: String,
    pub twitter_title: String,
    pub twitter_description: String,
    pub twitter_image: String,
    pub canonical: String,
    pub favicon: String,
    pub feed_url: Option<String>,
    pub has_contact_page: bool,
    pub has_about_page: bool,
    pub has_blog_section: bool,
    /// Parsed `application/ld+json` blocks; invalid blocks are skipped.
    pub schema_org: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebsiteData {
    pub metadata: WebsiteMetadata,
    /// Technology tags detected in the page source (e.g. `"Shopify"`).
    pub technologies: Vec<String>,
    pub html_length: usize,
}

// ---------------------------------------------------------------------------
// RSS / Atom
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    /// Raw date text as published in the feed.
    pub published: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishingFrequency {
    Daily,
    MultiplePerWeek,
    Weekly,
    Monthly,
    Infrequent,
    #[default]
    Unknown,
}

impl PublishingFrequency {
    /// Classifies posting cadence as posts per day across the dated span.
    ///
    /// Fewer than two dates yields `Unknown`. Dates that all fall on the same
    /// instant count as `Daily`.
    #[must_use]
    pub fn classify(dates: &[DateTime<Utc>]) -> Self {
        if dates.len() < 2 {
            return Self::Unknown;
        }
        let newest = dates.iter().max();
        let oldest = dates.iter().min();
        let (Some(newest), Some(oldest)) = (newest, oldest) else {
            return Self::Unknown;
        };

        #[allow(clippy::cast_precision_loss)]
        let span_days = (*newest - *oldest).num_seconds() as f64 / 86_400.0;
        if span_days <= 0.0 {
            return Self::Daily;
        }

        #[allow(clippy::cast_precision_loss)]
        let posts_per_day = dates.len() as f64 / span_days;
        if posts_per_day >= 1.0 {
            Self::Daily
        } else if posts_per_day >= 0.5 {
            Self::MultiplePerWeek
        } else if posts_per_day >= 0.14 {
            Self::Weekly
        } else if posts_per_day >= 0.033 {
            Self::Monthly
        } else {
            Self::Infrequent
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::MultiplePerWeek => "multiple_per_week",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Infrequent => "infrequent",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedData {
    pub found: bool,
    pub url: Option<String>,
    /// The page advertised a feed but fetching it did not succeed.
    pub fetch_failed: bool,
    pub items: Vec<FeedItem>,
    pub frequency: PublishingFrequency,
}

// ---------------------------------------------------------------------------
// Authority sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WikipediaEntry {
    pub exists: bool,
    pub title: Option<String>,
    pub extract: Option<String>,
    pub page_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveSnapshot {
    pub available: bool,
    /// Raw `YYYYMMDDhhmmss` archive timestamp.
    pub timestamp: Option<String>,
    pub url: Option<String>,
    /// `YYYY-MM-DD` rendering of `timestamp`.
    pub first_seen: Option<String>,
    pub age_years: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub registration_date: Option<String>,
    pub registrar: Option<String>,
    pub expires: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpsProbe {
    pub https_available: bool,
    pub status: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityHit {
    pub title: Option<String>,
    pub points: Option<i64>,
    pub num_comments: Option<i64>,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityMentions {
    pub total_hits: u64,
    pub hits: Vec<CommunityHit>,
}

// ---------------------------------------------------------------------------
// Web search
// ---------------------------------------------------------------------------

/// The distinct intents the web search adapter is queried with, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchIntent {
    Brand,
    News,
    Complaints,
    Reviews,
    Alternatives,
    Content,
}

impl SearchIntent {
    pub const ALL: [SearchIntent; 6] = [
        SearchIntent::Brand,
        SearchIntent::News,
        SearchIntent::Complaints,
        SearchIntent::Reviews,
        SearchIntent::Alternatives,
        SearchIntent::Content,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SearchIntent::Brand => "brand",
            SearchIntent::News => "news",
            SearchIntent::Complaints => "complaints",
            SearchIntent::Reviews => "reviews",
            SearchIntent::Alternatives => "alternatives",
            SearchIntent::Content => "content",
        }
    }

    /// Query text sent to the search engine for `brand_name`.
    #[must_use]
    pub fn query(self, brand_name: &str) -> String {
        match self {
            SearchIntent::Brand => format!("\"{brand_name}\""),
            SearchIntent::News => format!("\"{brand_name}\" news"),
            SearchIntent::Complaints => format!("\"{brand_name}\" complaints OR scam OR fraud"),
            SearchIntent::Reviews => format!("\"{brand_name}\" reviews OR ratings"),
            SearchIntent::Alternatives => {
                format!("\"{brand_name}\" alternatives OR competitors")
            }
            SearchIntent::Content => format!("site:{brand_name} blog OR articles OR content"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHits {
    pub results_count: u64,
    /// At most five cleaned result snippets.
    pub snippets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub brand: CollaboratorResult<SearchHits>,
    pub news: CollaboratorResult<SearchHits>,
    pub complaints: CollaboratorResult<SearchHits>,
    pub reviews: CollaboratorResult<SearchHits>,
    pub alternatives: CollaboratorResult<SearchHits>,
    pub content: CollaboratorResult<SearchHits>,
}

impl SearchResults {
    #[must_use]
    pub fn get(&self, intent: SearchIntent) -> &CollaboratorResult<SearchHits> {
        match intent {
            SearchIntent::Brand => &self.brand,
            SearchIntent::News => &self.news,
            SearchIntent::Complaints => &self.complaints,
            SearchIntent::Reviews => &self.reviews,
            SearchIntent::Alternatives => &self.alternatives,
            SearchIntent::Content => &self.content,
        }
    }

    pub fn set(&mut self, intent: SearchIntent, result: CollaboratorResult<SearchHits>) {
        let slot = match intent {
            SearchIntent::Brand => &mut self.brand,
            SearchIntent::News => &mut self.news,
            SearchIntent::Complaints => &mut self.complaints,
            SearchIntent::Reviews => &mut self.reviews,
            SearchIntent::Alternatives => &mut self.alternatives,
            SearchIntent::Content => &mut self.content,
        };
        *slot = result;
    }

    /// Result count for `intent`, zero when the call did not succeed.
    #[must_use]
    pub fn count(&self, intent: SearchIntent) -> u64 {
        self.get(intent).success().map_or(0, |h| h.results_count)
    }

    #[must_use]
    pub fn snippets(&self, intent: SearchIntent) -> &[String] {
        self.get(intent)
            .success()
            .map_or(&[][..], |h| h.snippets.as_slice())
    }
}

// ---------------------------------------------------------------------------
// Social
// ---------------------------------------------------------------------------

/// Fields scraped from a public profile page's preview metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialProfile {
    pub handle: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub followers: Option<String>,
    pub following: Option<String>,
    pub posts: Option<String>,
    pub likes: Option<String>,
    pub profile_image: Option<String>,
    /// The page loaded but exposed no preview metadata.
    pub no_data: bool,
}

/// Per-platform social results. `None` means no handle was supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialResults {
    pub instagram: Option<CollaboratorResult<SocialProfile>>,
    pub x: Option<CollaboratorResult<SocialProfile>>,
    pub linkedin: Option<CollaboratorResult<SocialProfile>>,
    pub tiktok: Option<CollaboratorResult<SocialProfile>>,
}

impl SocialResults {
    #[must_use]
    pub fn get(&self, platform: Platform) -> Option<&CollaboratorResult<SocialProfile>> {
        match platform {
            Platform::Instagram => self.instagram.as_ref(),
            Platform::X => self.x.as_ref(),
            Platform::LinkedIn => self.linkedin.as_ref(),
            Platform::TikTok => self.tiktok.as_ref(),
        }
    }

    pub fn set(&mut self, platform: Platform, result: CollaboratorResult<SocialProfile>) {
        let slot = match platform {
            Platform::Instagram => &mut self.instagram,
            Platform::X => &mut self.x,
            Platform::LinkedIn => &mut self.linkedin,
            Platform::TikTok => &mut self.tiktok,
        };
        *slot = Some(result);
    }
}

/// Everything one collection pass produced, success or not, for the aggregator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectedSources {
    pub website: CollaboratorResult<WebsiteData>,
    pub feed: CollaboratorResult<FeedData>,
    pub wikipedia: CollaboratorResult<WikipediaEntry>,
    pub archive: CollaboratorResult<ArchiveSnapshot>,
    pub registration: CollaboratorResult<RegistrationRecord>,
    pub https: CollaboratorResult<HttpsProbe>,
    pub community: CollaboratorResult<CommunityMentions>,
    pub search: SearchResults,
    pub social: SocialResults,
}
