use super::*;
use crate::request::SocialHandles;
use crate::sources::{
    CommunityMentions, FeedData, HttpsProbe, SearchHits, WebsiteData, WikipediaEntry,
};

fn request() -> ScanRequest {
    ScanRequest {
        brand_name: "Acme".to_string(),
        website_url: "https://acme.com".to_string(),
        social: SocialHandles::default(),
        industry: None,
        market: None,
        callback_url: None,
    }
}

fn hits(count: u64, snippets: &[&str]) -> CollaboratorResult<SearchHits> {
    CollaboratorResult::Success(SearchHits {
        results_count: count,
        snippets: snippets.iter().map(|s| (*s).to_string()).collect(),
    })
}

#[test]
fn all_failed_sources_still_produce_eight_pillars() {
    let bundle = aggregate(&request(), &CollectedSources::default());

    let value = serde_json::to_value(&bundle).unwrap();
    let keys: Vec<&str> = value
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys.len(), 8);
    for key in PillarBundle::KEYS {
        assert!(keys.contains(&key), "missing pillar {key}");
    }

    assert_eq!(bundle.search_visibility.total_search_visibility, 0);
    assert_eq!(bundle.brand_mentions.total_mentions, 0);
    assert_eq!(bundle.social_presence.profiles_count, 0);
    assert_eq!(bundle.social_presence.estimated_total_followers, 0);
    assert!(!bundle.digital_authority.wikipedia.exists);
    assert!(!bundle.digital_authority.whois.available);
    assert!(!bundle.digital_authority.https_check.https_available);
    assert!(!bundle.sentiment.indicators.has_complaints);
    assert!(!bundle.content_footprint.rss.found);
    assert_eq!(
        bundle.content_footprint.rss.frequency,
        PublishingFrequency::Unknown
    );
    assert_eq!(bundle.competitive_landscape.industry, "not_specified");
    assert!(!bundle.competitive_landscape.indicators.industry_specified);
}

#[test]
fn search_visibility_sums_three_intents_and_caps_snippets() {
    let mut sources = CollectedSources::default();
    let many = ["s1", "s2", "s3", "s4", "s5", "s6", "s7"];
    sources.search.set(SearchIntent::Brand, hits(10, &many));
    sources.search.set(SearchIntent::News, hits(4, &["n1", "n2", "n3"]));
    sources.search.set(SearchIntent::Content, hits(2, &[]));
    sources.search.set(SearchIntent::Reviews, CollaboratorResult::Blocked(429));

    let bundle = aggregate(&request(), &sources);
    let sv = &bundle.search_visibility;
    assert_eq!(sv.main_search_results, 10);
    assert_eq!(sv.news_results, 4);
    assert_eq!(sv.content_results, 2);
    assert_eq!(sv.total_search_visibility, 16);
    assert_eq!(sv.search_snippets.main.len(), 5);

    let mentions = &bundle.brand_mentions;
    assert_eq!(mentions.review_mentions, 0);
    assert_eq!(
        mentions.snippets,
        vec!["s1", "s2", "s3", "n1", "n2"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    );
}

#[test]
fn brand_mentions_include_community_hits() {
    let mut sources = CollectedSources::default();
    sources.search.set(SearchIntent::Brand, hits(3, &[]));
    sources.search.set(SearchIntent::News, hits(2, &[]));
    sources.search.set(SearchIntent::Reviews, hits(1, &[]));
    sources.community = CollaboratorResult::Success(CommunityMentions {
        total_hits: 40,
        hits: vec![],
    });

    let bundle = aggregate(&request(), &sources);
    assert_eq!(bundle.brand_mentions.total_mentions, 46);
    assert_eq!(bundle.brand_mentions.hacker_news_mentions, 40);
    assert_eq!(bundle.digital_authority.hacker_news_mentions, 40);
}

#[test]
fn sentiment_is_volumetric_only() {
    let mut sources = CollectedSources::default();
    sources
        .search
        .set(SearchIntent::Complaints, hits(0, &[]));
    sources.search.set(
        SearchIntent::Reviews,
        hits(12, &["Great product, would recommend to anyone"]),
    );

    let sentiment = aggregate(&request(), &sources).sentiment;
    assert_eq!(sentiment.complaints_found, 0);
    assert_eq!(sentiment.reviews_found, 12);
    assert!(!sentiment.indicators.has_complaints);
    assert!(sentiment.indicators.has_reviews);
    assert_eq!(sentiment.reviews_snippets.len(), 1);
}

#[test]
fn social_presence_counts_only_supplied_platforms() {
    let mut req = request();
    req.social.instagram = Some("acme".to_string());
    req.social.tiktok = Some("acme".to_string());
    req.social.x = Some("acme".to_string());

    let mut sources = CollectedSources::default();
    sources.social.set(
        Platform::Instagram,
        CollaboratorResult::Success(SocialProfile {
            handle: "acme".to_string(),
            followers: Some("12.5K".to_string()),
            ..SocialProfile::default()
        }),
    );
    sources.social.set(
        Platform::TikTok,
        CollaboratorResult::Success(SocialProfile {
            handle: "acme".to_string(),
            followers: Some("1M".to_string()),
            ..SocialProfile::default()
        }),
    );
    sources
        .social
        .set(Platform::X, CollaboratorResult::Blocked(403));

    let social = aggregate(&req, &sources).social_presence;
    assert_eq!(social.profiles_count, 3);
    assert_eq!(social.platforms, vec!["instagram", "x", "tiktok"]);
    assert_eq!(social.fetched_count, 2);
    assert_eq!(social.estimated_total_followers, 1_012_500);
    assert!(social.x.blocked);
    assert_eq!(social.x.status, Some(403));
    assert!(!social.linkedin.provided);
    assert!(!social.linkedin.fetched);
}

#[test]
fn content_footprint_comes_from_website_and_feed() {
    let mut sources = CollectedSources::default();
    sources.website = CollaboratorResult::Success(WebsiteData {
        metadata: WebsiteMetadata {
            title: "Acme".to_string(),
            og_title: "Acme".to_string(),
            has_blog_section: true,
            ..WebsiteMetadata::default()
        },
        technologies: vec!["Shopify".to_string()],
        html_length: 5120,
    });
    sources.feed = CollaboratorResult::Success(FeedData {
        found: true,
        url: Some("https://acme.com/feed".to_string()),
        fetch_failed: false,
        items: vec![FeedItem::default(), FeedItem::default()],
        frequency: PublishingFrequency::Weekly,
    });

    let bundle = aggregate(&request(), &sources);
    let content = &bundle.content_footprint;
    assert_eq!(content.html_size, 5120);
    assert!(content.blog_detected);
    assert_eq!(content.tech_stack, vec!["Shopify"]);
    assert!(content.rss.found);
    assert_eq!(content.rss.items_count, 2);
    assert_eq!(content.rss.frequency, PublishingFrequency::Weekly);

    let consistency = &bundle.brand_consistency.consistency_check;
    assert_eq!(consistency.titles_provided, 2);
    assert!(consistency.all_titles_match);
}

#[test]
fn single_title_does_not_count_as_consistent() {
    let mut sources = CollectedSources::default();
    sources.website = CollaboratorResult::Success(WebsiteData {
        metadata: WebsiteMetadata {
            title: "Acme".to_string(),
            ..WebsiteMetadata::default()
        },
        ..WebsiteData::default()
    });
    let check = aggregate(&request(), &sources)
        .brand_consistency
        .consistency_check;
    assert_eq!(check.titles_provided, 1);
    assert!(!check.all_titles_match);
}

#[test]
fn digital_authority_carries_independent_signals() {
    let mut sources = CollectedSources::default();
    sources.wikipedia = CollaboratorResult::Success(WikipediaEntry {
        exists: true,
        title: Some("Acme Corporation".to_string()),
        extract: Some("Acme is a company.".to_string()),
        page_url: Some("https://en.wikipedia.org/wiki/Acme_Corporation".to_string()),
    });
    sources.https = CollaboratorResult::Success(HttpsProbe {
        https_available: true,
        status: 200,
    });
    sources.archive = CollaboratorResult::Timeout;

    let authority = aggregate(&request(), &sources).digital_authority;
    assert!(authority.wikipedia.exists);
    assert!(authority.https_check.https_available);
    assert_eq!(authority.https_check.status, Some(200));
    assert!(!authority.wayback.available);
    assert_eq!(authority.domain_age_years, None);
}

#[test]
fn competitive_landscape_passes_through_tags() {
    let mut req = request();
    req.industry = Some("Beverages".to_string());
    req.market = Some("  ".to_string());
    let mut sources = CollectedSources::default();
    sources
        .search
        .set(SearchIntent::Alternatives, hits(9, &["Other brands like Acme"]));

    let landscape = aggregate(&req, &sources).competitive_landscape;
    assert_eq!(landscape.industry, "Beverages");
    assert_eq!(landscape.market, "not_specified");
    assert_eq!(landscape.alternatives_found, 9);
    assert!(landscape.indicators.has_alternatives);
    assert!(landscape.indicators.industry_specified);
    assert!(!landscape.indicators.market_specified);
}

#[test]
fn follower_counts_parse_suffixes() {
    assert_eq!(parse_follower_count("12.5K"), 12_500);
    assert_eq!(parse_follower_count("1M"), 1_000_000);
    assert_eq!(parse_follower_count("800"), 800);
    assert_eq!(parse_follower_count("2.1b"), 2_100_000_000);
    assert_eq!(parse_follower_count("1,204"), 1_204);
}

#[test]
fn unparseable_follower_counts_are_zero() {
    assert_eq!(parse_follower_count(""), 0);
    assert_eq!(parse_follower_count("lots"), 0);
    assert_eq!(parse_follower_count("K"), 0);
    assert_eq!(parse_follower_count("-5"), 0);
}
