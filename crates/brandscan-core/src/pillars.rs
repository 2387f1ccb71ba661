//! The eight-pillar data model and the pure aggregator that fills it.
//!
//! Every pillar is always present. Sources that failed contribute zeros,
//! `false`, and empty lists; they never remove a key.

use serde::{Deserialize, Serialize};

use crate::request::{Platform, ScanRequest};
use crate::sources::{
    CollaboratorResult, CollectedSources, FeedItem, PublishingFrequency, SearchIntent,
    SocialProfile, WebsiteMetadata,
};

const SNIPPETS_PER_INTENT: usize = 5;
const MENTION_SNIPPETS_MAIN: usize = 3;
const MENTION_SNIPPETS_NEWS: usize = 2;
const NOT_SPECIFIED: &str = "not_specified";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PillarBundle {
    pub search_visibility: SearchVisibility,
    pub digital_authority: DigitalAuthority,
    pub social_presence: SocialPresence,
    pub brand_mentions: BrandMentions,
    pub sentiment: Sentiment,
    pub content_footprint: ContentFootprint,
    pub brand_consistency: BrandConsistency,
    pub competitive_landscape: CompetitiveLandscape,
}

impl PillarBundle {
    /// Serialized keys of the eight pillars, in display order.
    pub const KEYS: [&'static str; 8] = [
        "search_visibility",
        "digital_authority",
        "social_presence",
        "brand_mentions",
        "sentiment",
        "content_footprint",
        "brand_consistency",
        "competitive_landscape",
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSnippets {
    pub main: Vec<String>,
    pub news: Vec<String>,
    pub content: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchVisibility {
    pub main_search_results: u64,
    pub news_results: u64,
    pub content_results: u64,
    pub total_search_visibility: u64,
    pub search_snippets: SearchSnippets,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncyclopediaSignal {
    pub exists: bool,
    pub extract: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveSignal {
    pub available: bool,
    pub timestamp: Option<String>,
    pub first_seen: Option<String>,
    pub age_years: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationSignal {
    pub available: bool,
    pub registration_date: Option<String>,
    pub registrar: Option<String>,
    pub expires: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpsSignal {
    pub https_available: bool,
    pub status: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DigitalAuthority {
    pub wikipedia: EncyclopediaSignal,
    pub wayback: ArchiveSignal,
    pub whois: RegistrationSignal,
    pub https_check: HttpsSignal,
    pub hacker_news_mentions: u64,
    pub domain_age_years: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformPresence {
    pub provided: bool,
    pub fetched: bool,
    pub blocked: bool,
    pub status: Option<u16>,
    pub profile: Option<SocialProfile>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialPresence {
    pub instagram: PlatformPresence,
    pub x: PlatformPresence,
    pub linkedin: PlatformPresence,
    pub tiktok: PlatformPresence,
    pub profiles_count: usize,
    pub platforms: Vec<String>,
    pub fetched_count: usize,
    pub fetched_platforms: Vec<String>,
    pub estimated_total_followers: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandMentions {
    pub total_mentions: u64,
    pub news_mentions: u64,
    pub review_mentions: u64,
    pub hacker_news_mentions: u64,
    pub snippets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentIndicators {
    pub has_complaints: bool,
    pub has_reviews: bool,
}

/// Complaint and review volumes. No text classification is applied; this is
/// a count-based proxy only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub complaints_found: u64,
    pub reviews_found: u64,
    pub complaints_snippets: Vec<String>,
    pub reviews_snippets: Vec<String>,
    pub indicators: SentimentIndicators,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedSignal {
    pub found: bool,
    pub url: Option<String>,
    pub items_count: usize,
    pub frequency: PublishingFrequency,
    pub recent_posts: Vec<FeedItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentFootprint {
    pub website_metadata: WebsiteMetadata,
    pub rss: FeedSignal,
    pub tech_stack: Vec<String>,
    pub blog_detected: bool,
    pub content_search_results: u64,
    pub html_size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyCheck {
    pub titles_provided: usize,
    pub all_titles_match: bool,
    pub social_profiles_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandConsistency {
    pub website_title: String,
    pub og_title: String,
    pub twitter_title: String,
    pub og_site_name: String,
    pub social_profiles: Vec<String>,
    pub consistency_check: ConsistencyCheck,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitiveIndicators {
    pub has_alternatives: bool,
    pub industry_specified: bool,
    pub market_specified: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitiveLandscape {
    pub industry: String,
    pub market: String,
    pub alternatives_found: u64,
    pub alternatives_snippets: Vec<String>,
    pub indicators: CompetitiveIndicators,
}

/// Fold every collected source into the eight pillars.
///
/// Deterministic and total: any mix of successes and failures, including all
/// failures, yields a complete bundle.
#[must_use]
pub fn aggregate(request: &ScanRequest, sources: &CollectedSources) -> PillarBundle {
    let social_presence = social_presence(request, sources);
    PillarBundle {
        search_visibility: search_visibility(sources),
        digital_authority: digital_authority(sources),
        brand_mentions: brand_mentions(sources),
        sentiment: sentiment(sources),
        content_footprint: content_footprint(sources),
        brand_consistency: brand_consistency(sources, &social_presence.platforms),
        competitive_landscape: competitive_landscape(request, sources),
        social_presence,
    }
}

fn capped(snippets: &[String], cap: usize) -> Vec<String> {
    snippets.iter().take(cap).cloned().collect()
}

fn search_visibility(sources: &CollectedSources) -> SearchVisibility {
    let search = &sources.search;
    let main = search.count(SearchIntent::Brand);
    let news = search.count(SearchIntent::News);
    let content = search.count(SearchIntent::Content);

    SearchVisibility {
        main_search_results: main,
        news_results: news,
        content_results: content,
        total_search_visibility: main + news + content,
        search_snippets: SearchSnippets {
            main: capped(search.snippets(SearchIntent::Brand), SNIPPETS_PER_INTENT),
            news: capped(search.snippets(SearchIntent::News), SNIPPETS_PER_INTENT),
            content: capped(search.snippets(SearchIntent::Content), SNIPPETS_PER_INTENT),
        },
    }
}

fn community_hits(sources: &CollectedSources) -> u64 {
    sources.community.success().map_or(0, |c| c.total_hits)
}

fn digital_authority(sources: &CollectedSources) -> DigitalAuthority {
    let wikipedia = sources
        .wikipedia
        .success()
        .map_or_else(EncyclopediaSignal::default, |w| EncyclopediaSignal {
            exists: w.exists,
            extract: w.extract.clone(),
            url: w.page_url.clone(),
        });

    let wayback = sources
        .archive
        .success()
        .map_or_else(ArchiveSignal::default, |a| ArchiveSignal {
            available: a.available,
            timestamp: a.timestamp.clone(),
            first_seen: a.first_seen.clone(),
            age_years: a.age_years,
        });

    let whois = sources
        .registration
        .success()
        .map_or_else(RegistrationSignal::default, |r| RegistrationSignal {
            available: true,
            registration_date: r.registration_date.clone(),
            registrar: r.registrar.clone(),
            expires: r.expires.clone(),
        });

    let https_check = sources
        .https
        .success()
        .map_or_else(HttpsSignal::default, |h| HttpsSignal {
            https_available: h.https_available,
            status: Some(h.status),
        });

    DigitalAuthority {
        domain_age_years: wayback.age_years,
        wikipedia,
        wayback,
        whois,
        https_check,
        hacker_news_mentions: community_hits(sources),
    }
}

fn social_presence(request: &ScanRequest, sources: &CollectedSources) -> SocialPresence {
    let mut presence = SocialPresence::default();
    let mut total_followers: u64 = 0;

    for platform in Platform::ALL {
        if request.social.get(platform).is_none() {
            continue;
        }

        let mut entry = PlatformPresence {
            provided: true,
            ..PlatformPresence::default()
        };
        presence.platforms.push(platform.as_str().to_string());

        match sources.social.get(platform) {
            Some(CollaboratorResult::Success(profile)) => {
                entry.fetched = true;
                if let Some(followers) = profile.followers.as_deref() {
                    total_followers = total_followers.saturating_add(parse_follower_count(followers));
                }
                entry.profile = Some(profile.clone());
                presence.fetched_platforms.push(platform.as_str().to_string());
            }
            Some(CollaboratorResult::Blocked(status)) => {
                entry.blocked = true;
                entry.status = Some(*status);
            }
            Some(other) => entry.error = other.error_message(),
            None => entry.error = Some("not collected".to_string()),
        }

        match platform {
            Platform::Instagram => presence.instagram = entry,
            Platform::X => presence.x = entry,
            Platform::LinkedIn => presence.linkedin = entry,
            Platform::TikTok => presence.tiktok = entry,
        }
    }

    presence.profiles_count = presence.platforms.len();
    presence.fetched_count = presence.fetched_platforms.len();
    presence.estimated_total_followers = total_followers;
    presence
}

fn brand_mentions(sources: &CollectedSources) -> BrandMentions {
    let search = &sources.search;
    let news = search.count(SearchIntent::News);
    let reviews = search.count(SearchIntent::Reviews);
    let community = community_hits(sources);

    let mut snippets = capped(search.snippets(SearchIntent::Brand), MENTION_SNIPPETS_MAIN);
    snippets.extend(capped(search.snippets(SearchIntent::News), MENTION_SNIPPETS_NEWS));

    BrandMentions {
        total_mentions: search.count(SearchIntent::Brand) + news + reviews + community,
        news_mentions: news,
        review_mentions: reviews,
        hacker_news_mentions: community,
        snippets,
    }
}

fn sentiment(sources: &CollectedSources) -> Sentiment {
    let search = &sources.search;
    let complaints = search.count(SearchIntent::Complaints);
    let reviews = search.count(SearchIntent::Reviews);

    Sentiment {
        complaints_found: complaints,
        reviews_found: reviews,
        complaints_snippets: capped(search.snippets(SearchIntent::Complaints), SNIPPETS_PER_INTENT),
        reviews_snippets: capped(search.snippets(SearchIntent::Reviews), SNIPPETS_PER_INTENT),
        indicators: SentimentIndicators {
            has_complaints: complaints > 0,
            has_reviews: reviews > 0,
        },
    }
}

fn content_footprint(sources: &CollectedSources) -> ContentFootprint {
    let website = sources.website.success();
    let rss = sources
        .feed
        .success()
        .map_or_else(FeedSignal::default, |f| FeedSignal {
            found: f.found,
            url: f.url.clone(),
            items_count: f.items.len(),
            frequency: f.frequency,
            recent_posts: f.items.clone(),
        });

    ContentFootprint {
        website_metadata: website.map(|w| w.metadata.clone()).unwrap_or_default(),
        rss,
        tech_stack: website.map(|w| w.technologies.clone()).unwrap_or_default(),
        blog_detected: website.is_some_and(|w| w.metadata.has_blog_section),
        content_search_results: sources.search.count(SearchIntent::Content),
        html_size: website.map_or(0, |w| w.html_length),
    }
}

fn brand_consistency(sources: &CollectedSources, social_profiles: &[String]) -> BrandConsistency {
    let metadata = sources.website.success().map(|w| &w.metadata);
    let field = |pick: fn(&WebsiteMetadata) -> &String| -> String {
        metadata.map(pick).cloned().unwrap_or_default()
    };

    let website_title = field(|m| &m.title);
    let og_title = field(|m| &m.og_title);
    let twitter_title = field(|m| &m.twitter_title);

    let titles: Vec<&str> = [&website_title, &og_title, &twitter_title]
        .into_iter()
        .map(String::as_str)
        .filter(|t| !t.is_empty())
        .collect();
    let all_titles_match = titles.len() > 1 && titles.iter().all(|t| *t == titles[0]);

    BrandConsistency {
        og_site_name: field(|m| &m.og_site_name),
        consistency_check: ConsistencyCheck {
            titles_provided: titles.len(),
            all_titles_match,
            social_profiles_count: social_profiles.len(),
        },
        social_profiles: social_profiles.to_vec(),
        website_title,
        og_title,
        twitter_title,
    }
}

fn competitive_landscape(request: &ScanRequest, sources: &CollectedSources) -> CompetitiveLandscape {
    let alternatives = sources.search.count(SearchIntent::Alternatives);
    CompetitiveLandscape {
        industry: request.industry().unwrap_or(NOT_SPECIFIED).to_string(),
        market: request.market().unwrap_or(NOT_SPECIFIED).to_string(),
        alternatives_found: alternatives,
        alternatives_snippets: capped(
            sources.search.snippets(SearchIntent::Alternatives),
            SNIPPETS_PER_INTENT,
        ),
        indicators: CompetitiveIndicators {
            has_alternatives: alternatives > 0,
            industry_specified: request.industry().is_some(),
            market_specified: request.market().is_some(),
        },
    }
}

/// Parse a display follower count such as `"12.5K"`, `"1,204"`, or `"3M"`.
///
/// Suffixes `K`, `M`, and `B` (either case) scale by 10^3, 10^6, and 10^9.
/// Anything unparseable counts as zero.
#[must_use]
pub fn parse_follower_count(raw: &str) -> u64 {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    let Some(last) = cleaned.chars().last() else {
        return 0;
    };

    let (number, multiplier) = match last.to_ascii_uppercase() {
        'K' => (&cleaned[..cleaned.len() - 1], 1_000.0),
        'M' => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        'B' => (&cleaned[..cleaned.len() - 1], 1_000_000_000.0),
        _ => (cleaned.as_str(), 1.0),
    };

    match number.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let count = (value * multiplier).round() as u64;
            count
        }
        _ => 0,
    }
}

#[cfg(test)]
#[path = "pillars_test.rs"]
mod tests;
