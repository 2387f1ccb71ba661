//! The document submitted to the analysis service for one scan.

use brandscan_core::{PillarBundle, ScanRequest};
use chrono::{DateTime, Utc};
use serde::Serialize;

const AVAILABLE: &str = "available";
const UNAVAILABLE: &str = "unavailable";

/// Scoring guidance sent with every bundle. The reply must be a single JSON
/// object so [`crate::parse_output`] can read it.
pub const INSTRUCTIONS: &str = "\
You are assessing the online health of a brand from the collected signals in `pillars`. \
`data_sources` tells you which collectors returned data; treat an unavailable source as \
missing evidence, not as a negative signal.

Score each of the eight pillars from 0 to 100:
- search_visibility: volume of main, news and content search results.
- digital_authority: encyclopedia entry, archive history and domain age, registration \
record, HTTPS support, and developer community mentions.
- social_presence: number of supplied profiles that could be read, follower counts and \
activity. Blocked profiles are unknown, not absent.
- brand_mentions: total mentions across news, reviews and community discussion.
- sentiment_analysis: balance of complaint and review volume and the tone of the snippets.
- content_footprint: site metadata quality, blog and feed activity, publishing frequency \
and technology stack.
- brand_consistency: agreement between the page title, social titles and site name.
- competitive_landscape: presence of alternatives and comparisons in the stated industry \
and market.

Reply with JSON only, using exactly these keys: search_visibility_score, \
digital_authority_score, social_presence_score, brand_mentions_score, \
sentiment_analysis_score, content_footprint_score, brand_consistency_score, \
competitive_landscape_score (integers), recommendations (an object with one short \
actionable recommendation per pillar, keyed search_visibility, digital_authority, \
social_presence, brand_mentions, sentiment_analysis, content_footprint, \
brand_consistency, competitive_landscape), and summary (two or three sentences).";

/// Availability flag for each upstream collector, as shown to the analyst.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSources {
    pub website: &'static str,
    pub wikipedia: &'static str,
    pub wayback: &'static str,
    pub duckduckgo: &'static str,
    pub social_media: &'static str,
    pub rss: &'static str,
    pub rdap_whois: &'static str,
    pub https_check: &'static str,
    pub hackernews: &'static str,
    pub tech_stack_detection: &'static str,
}

fn flag(present: bool) -> &'static str {
    if present {
        AVAILABLE
    } else {
        UNAVAILABLE
    }
}

impl DataSources {
    #[must_use]
    pub fn from_bundle(pillars: &PillarBundle) -> Self {
        let authority = &pillars.digital_authority;
        let content = &pillars.content_footprint;
        Self {
            website: flag(content.html_size > 0),
            wikipedia: flag(authority.wikipedia.exists),
            wayback: flag(authority.wayback.available),
            duckduckgo: "partial (6 queries)",
            social_media: "og_metadata_with_metrics",
            rss: flag(content.rss.found),
            rdap_whois: flag(authority.whois.available),
            https_check: flag(authority.https_check.https_available),
            hackernews: flag(authority.hacker_news_mentions > 0),
            tech_stack_detection: flag(!content.tech_stack.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisPayload<'a> {
    pub brand_name: &'a str,
    pub website_url: &'a str,
    pub analysis_date: DateTime<Utc>,
    pub pillars: &'a PillarBundle,
    pub data_sources: DataSources,
    pub instructions: &'static str,
}

impl<'a> AnalysisPayload<'a> {
    #[must_use]
    pub fn new(request: &'a ScanRequest, pillars: &'a PillarBundle, now: DateTime<Utc>) -> Self {
        Self {
            brand_name: request.brand_name.trim(),
            website_url: &request.website_url,
            analysis_date: now,
            pillars,
            data_sources: DataSources::from_bundle(pillars),
            instructions: INSTRUCTIONS,
        }
    }

    /// The payload as a JSON value, ready to submit.
    ///
    /// # Errors
    ///
    /// Returns an error only if a pillar field fails to serialize.
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
