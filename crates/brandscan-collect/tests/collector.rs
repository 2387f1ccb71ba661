//! Integration tests for `FetchClient` and `Collector`.
//!
//! Every external service is stood up on one local `wiremock` server via
//! `SourceEndpoints::all_at`, so no real network traffic is made.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use brandscan_collect::{
    CollectError, Collector, FetchClient, FetchOptions, SourceEndpoints,
};
use brandscan_core::sources::{PublishingFrequency, SearchIntent};
use brandscan_core::{CollaboratorResult, Platform, ScanRequest, SocialHandles, SourceOutcome};

/// 5-second timeout, three attempts, zero backoff.
fn test_client() -> FetchClient {
    FetchClient::new(5, "brandscan-test/0.1", 3, 0).expect("failed to build test FetchClient")
}

fn collector(server: &MockServer) -> Collector {
    Collector::new(
        test_client(),
        SourceEndpoints::all_at(&server.uri()),
        Duration::ZERO,
    )
}

fn request(server: &MockServer, social: SocialHandles) -> ScanRequest {
    ScanRequest {
        brand_name: "Acme".to_string(),
        website_url: server.uri(),
        social,
        industry: Some("Hardware".to_string()),
        market: None,
        callback_url: None,
    }
}

const HOMEPAGE: &str = r#"<html><head>
<title>Acme Corporation</title>
<meta name="description" content="Anvils, rockets and more.">
<meta property="og:title" content="Acme Corporation">
<link rel="alternate" type="application/rss+xml" href="/feed.xml">
</head><body><a href="/blog">Blog</a> <a href="/contact">Contact</a> wp-content/wordpress</body></html>"#;

const FEED: &str = r"<rss><channel>
<item><title>One</title><link>https://acme.com/1</link><pubDate>Tue, 12 Mar 2024 10:00:00 +0000</pubDate></item>
<item><title>Two</title><link>https://acme.com/2</link><pubDate>Sat, 02 Mar 2024 10:00:00 +0000</pubDate></item>
</channel></rss>";

const INSTAGRAM_PAGE: &str = r#"<meta property="og:title" content="Acme (@acme)">
<meta property="og:description" content="12.5K Followers, 10 Following, 99 Posts">"#;

async fn mount_authority_sources(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("list", "search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": {"search": [{"title": "Acme Corporation", "pageid": 4242}]}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("prop", "extracts"))
        .and(query_param("pageids", "4242"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": {"pages": {"4242": {"extract": "Acme is a fictional company."}}}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wayback/available"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "archived_snapshots": {"closest": {"timestamp": "20050101000000", "url": "http://archive/acme"}}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rdap/domain/127.0.0.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [{"eventAction": "registration", "eventDate": "1999-01-01T00:00:00Z"}],
            "entities": [{"vcardArray": ["vcard", [["fn", {}, "text", "Example Registrar"]]]}]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nbHits": 7,
            "hits": [{"title": "Acme", "points": 3, "num_comments": 1, "url": null, "objectID": "11"}]
        })))
        .mount(server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(HOMEPAGE))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// FetchClient
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_retries_rate_limit_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let page = test_client()
        .fetch(&format!("{}/page", server.uri()), &FetchOptions::default())
        .await
        .expect("third attempt should succeed");
    assert_eq!(page.status.as_u16(), 200);
    assert_eq!(page.body, "ok");
}

#[tokio::test]
async fn fetch_gives_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&server)
        .await;

    let result = test_client()
        .fetch(
            &format!("{}/page", server.uri()),
            &FetchOptions::default().attempts(2),
        )
        .await;
    assert!(matches!(result, Err(CollectError::RateLimited { .. })));
}

#[tokio::test]
async fn fetch_returns_server_errors_without_retrying() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .expect(1)
        .mount(&server)
        .await;

    let page = test_client()
        .fetch(&format!("{}/page", server.uri()), &FetchOptions::default())
        .await
        .expect("non-429 statuses are returned, not raised");
    assert_eq!(page.status.as_u16(), 503);
    assert!(matches!(
        page.require_success(),
        Err(CollectError::UnexpectedStatus { status: 503, .. })
    ));
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

#[tokio::test]
async fn collects_every_source_with_blocked_search() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    mount_authority_sources(&server).await;
    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let collection = collector(&server)
        .collect(&request(&server, SocialHandles::default()))
        .await;
    let sources = &collection.sources;

    let website = sources.website.success().expect("website should load");
    assert_eq!(website.metadata.title, "Acme Corporation");
    assert!(website.technologies.contains(&"WordPress".to_string()));

    let feed = sources.feed.success().expect("feed should settle");
    assert!(feed.found);
    assert!(!feed.fetch_failed);
    assert_eq!(feed.items.len(), 2);
    assert_eq!(feed.frequency, PublishingFrequency::Weekly);
    assert_eq!(
        feed.url.as_deref(),
        Some(format!("{}/feed.xml", server.uri()).as_str())
    );

    let wiki = sources.wikipedia.success().expect("wikipedia should succeed");
    assert!(wiki.exists);
    assert_eq!(wiki.extract.as_deref(), Some("Acme is a fictional company."));

    let archive = sources.archive.success().expect("wayback should succeed");
    assert_eq!(archive.first_seen.as_deref(), Some("2005-01-01"));

    let registration = sources.registration.success().expect("rdap should succeed");
    assert_eq!(registration.registrar.as_deref(), Some("Example Registrar"));

    assert!(sources.https.success().expect("probe").https_available);
    assert_eq!(sources.community.success().expect("hn").total_hits, 7);

    for intent in SearchIntent::ALL {
        assert_eq!(sources.search.get(intent), &CollaboratorResult::Blocked(429));
    }
    assert!(sources.social.instagram.is_none());

    // website, rss, wikipedia, wayback, rdap, https, hn, six searches
    assert_eq!(collection.reports.len(), 13);
    let search_report = collection
        .reports
        .iter()
        .find(|r| r.source == "duckduckgo_news")
        .expect("search intents are reported individually");
    assert_eq!(search_report.outcome, SourceOutcome::Blocked);
    assert_eq!(search_report.error.as_deref(), Some("blocked with HTTP 429"));
}

#[tokio::test]
async fn failing_homepage_fails_feed_but_not_other_sources() {
    let server = MockServer::start().await;
    mount_authority_sources(&server).await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let collection = collector(&server)
        .collect(&request(&server, SocialHandles::default()))
        .await;
    let sources = &collection.sources;

    assert_eq!(
        sources.website,
        CollaboratorResult::Failed("unexpected HTTP status 500".to_string())
    );
    assert!(!sources.feed.is_success());
    assert!(sources.wikipedia.is_success());
    assert_eq!(sources.search.count(SearchIntent::Brand), 0);
    assert!(sources.search.brand.is_success());
}

#[tokio::test]
async fn social_profiles_only_for_supplied_handles() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    mount_authority_sources(&server).await;
    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/instagram/acme/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(INSTAGRAM_PAGE))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/x/acme"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let handles = SocialHandles {
        instagram: Some("@acme".to_string()),
        x: Some("acme".to_string()),
        ..SocialHandles::default()
    };
    let collection = collector(&server).collect(&request(&server, handles)).await;
    let social = &collection.sources.social;

    let instagram = social
        .get(Platform::Instagram)
        .and_then(CollaboratorResult::success)
        .expect("instagram should be fetched");
    assert_eq!(instagram.followers.as_deref(), Some("12.5K"));
    assert_eq!(social.get(Platform::X), Some(&CollaboratorResult::Blocked(403)));
    assert!(social.get(Platform::LinkedIn).is_none());
    assert!(social.get(Platform::TikTok).is_none());
    assert!(collection.reports.iter().any(|r| r.source == "social_x"));
}

#[tokio::test]
async fn cookies_set_by_a_refusal_are_replayed_on_retry() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    mount_authority_sources(&server).await;
    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tiktok/@acme"))
        .and(header("cookie", "ttwid=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<meta property="og:description" content="1M Followers. 3.4M Likes.">"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tiktok/@acme"))
        .respond_with(
            ResponseTemplate::new(429).insert_header("set-cookie", "ttwid=abc; Path=/; HttpOnly"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let handles = SocialHandles {
        tiktok: Some("acme".to_string()),
        ..SocialHandles::default()
    };
    let collection = collector(&server).collect(&request(&server, handles)).await;
    let tiktok = collection
        .sources
        .social
        .get(Platform::TikTok)
        .and_then(CollaboratorResult::success)
        .expect("second attempt should carry the cookie and succeed");
    assert_eq!(tiktok.followers.as_deref(), Some("1M"));
    assert_eq!(tiktok.likes.as_deref(), Some("3.4M"));
}
