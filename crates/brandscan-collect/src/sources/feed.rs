//! RSS and Atom feed discovery and parsing.

use std::sync::LazyLock;

use brandscan_core::sources::{FeedData, FeedItem, PublishingFrequency};
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::Url;

use crate::fetch::{FetchClient, FetchOptions};
use crate::html;

/// Items kept from any one feed.
const MAX_FEED_ITEMS: usize = 10;

static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<item\b[^>]*>(.*?)</item>").expect("valid item regex"));
static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<entry\b[^>]*>(.*?)</entry>").expect("valid entry regex"));
static LINK_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<link(?:\s[^>]*[^/])?>(.*?)</link>").expect("valid link text regex")
});
static LINK_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<link\b[^>]*>").expect("valid link tag regex"));

struct FieldPatterns {
    title: Vec<Regex>,
    date: Vec<Regex>,
    description: Vec<Regex>,
}

fn element(name: &str) -> Regex {
    let name = regex::escape(name);
    Regex::new(&format!(r"(?is)<{name}(?:\s[^>]*)?>(.*?)</{name}>"))
        .expect("valid feed element regex")
}

static FIELDS: LazyLock<FieldPatterns> = LazyLock::new(|| FieldPatterns {
    title: vec![element("title")],
    date: ["pubDate", "published", "updated", "dc:date"]
        .into_iter()
        .map(element)
        .collect(),
    description: ["description", "summary"].into_iter().map(element).collect(),
});

/// Resolves the advertised feed link against the site URL and fetches it.
///
/// A site without a feed link is `found = false`. A feed that cannot be
/// fetched is still a success, flagged with `fetch_failed`.
pub async fn fetch_feed(client: &FetchClient, site: &Url, feed_link: Option<&str>) -> FeedData {
    let Some(link) = feed_link else {
        return FeedData::default();
    };
    let Some(feed_url) = resolve_feed_url(site, link) else {
        tracing::debug!(site = %site, link, "feed link did not resolve to a URL");
        return FeedData {
            found: true,
            url: Some(link.to_string()),
            fetch_failed: true,
            ..FeedData::default()
        };
    };

    let fetched = client
        .fetch(feed_url.as_str(), &FetchOptions::default())
        .await
        .and_then(crate::fetch::FetchedPage::require_success);

    match fetched {
        Ok(page) => {
            let (items, frequency) = parse_feed(&page.body);
            FeedData {
                found: true,
                url: Some(feed_url.to_string()),
                fetch_failed: false,
                items,
                frequency,
            }
        }
        Err(e) => {
            tracing::warn!(feed = %feed_url, error = %e, "feed fetch failed");
            FeedData {
                found: true,
                url: Some(feed_url.to_string()),
                fetch_failed: true,
                ..FeedData::default()
            }
        }
    }
}

/// Absolute links pass through; relative ones are joined onto the site URL.
#[must_use]
pub fn resolve_feed_url(site: &Url, link: &str) -> Option<Url> {
    site.join(link.trim()).ok()
}

/// Extracts up to ten items (RSS `<item>` or Atom `<entry>`) and classifies
/// the publishing cadence from their dates.
#[must_use]
pub fn parse_feed(xml: &str) -> (Vec<FeedItem>, PublishingFrequency) {
    let blocks: Vec<&str> = {
        let rss: Vec<&str> = capture_bodies(&ITEM_RE, xml);
        if rss.is_empty() {
            capture_bodies(&ENTRY_RE, xml)
        } else {
            rss
        }
    };

    let items: Vec<FeedItem> = blocks
        .into_iter()
        .take(MAX_FEED_ITEMS)
        .map(parse_item)
        .collect();

    let dates: Vec<DateTime<Utc>> = items
        .iter()
        .filter_map(|item| parse_feed_date(&item.published))
        .collect();

    let frequency = PublishingFrequency::classify(&dates);
    (items, frequency)
}

fn capture_bodies<'a>(re: &Regex, xml: &'a str) -> Vec<&'a str> {
    re.captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}

fn parse_item(block: &str) -> FeedItem {
    let title = first_text(&FIELDS.title, block)
        .map(|t| html::decode_entities(&html::unwrap_cdata(&t)))
        .unwrap_or_default();
    let description = first_text(&FIELDS.description, block)
        .map(|d| html::clean_text(&html::unwrap_cdata(&d)))
        .unwrap_or_default();
    let published = first_text(&FIELDS.date, block)
        .map(|d| d.trim().to_string())
        .unwrap_or_default();

    FeedItem {
        title,
        link: item_link(block),
        published,
        description,
    }
}

fn first_text(patterns: &[Regex], block: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures(block)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    })
}

/// RSS carries the link as element text; Atom as an `href` attribute.
fn item_link(block: &str) -> String {
    if let Some(text) = LINK_TEXT_RE
        .captures(block)
        .and_then(|c| c.get(1))
        .map(|m| html::unwrap_cdata(m.as_str()))
        .filter(|t| !t.is_empty())
    {
        return text;
    }

    let tags: Vec<&str> = LINK_TAG_RE.find_iter(block).map(|m| m.as_str()).collect();
    let preferred = tags.iter().find(|tag| {
        html::attr(tag, "rel").is_none_or(|rel| rel.eq_ignore_ascii_case("alternate"))
    });
    preferred
        .or_else(|| tags.first())
        .and_then(|tag| html::attr(tag, "href"))
        .unwrap_or_default()
}

/// Parses RFC 2822 (`pubDate`) or RFC 3339 (Atom) dates.
#[must_use]
pub fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
