//! Homepage metadata and technology fingerprinting.

use std::sync::LazyLock;

use brandscan_core::sources::{WebsiteData, WebsiteMetadata};
use regex::Regex;

use crate::error::CollectError;
use crate::fetch::{FetchClient, FetchOptions};
use crate::html;

static CONTACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)contact|kontakt|nous-contacter").expect("valid contact regex")
});
static ABOUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)about|à-propos|über-uns").expect("valid about regex"));
static BLOG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)blog|articles|news|actualités").expect("valid blog regex")
});

/// Technology tags and the case-insensitive marker that reveals each one.
const TECHNOLOGY_MARKERS: [(&str, &str); 10] = [
    ("React", "react"),
    ("Vue.js", "vue"),
    ("Angular", "angular"),
    ("WordPress", "wordpress"),
    ("Shopify", "shopify"),
    ("Wix", "wix"),
    ("Squarespace", "squarespace"),
    ("jQuery", "jquery"),
    ("Bootstrap", "bootstrap"),
    ("Tailwind CSS", "tailwind"),
];

/// Fetches the homepage and extracts its metadata.
///
/// # Errors
///
/// Returns [`CollectError`] when the page cannot be fetched or answers non-2xx.
pub async fn fetch_website(client: &FetchClient, url: &str) -> Result<WebsiteData, CollectError> {
    let page = client
        .fetch(url, &FetchOptions::default())
        .await?
        .require_success()?;
    Ok(parse_website(&page.body))
}

/// Extracts every metadata field plus technology tags from raw page HTML.
#[must_use]
pub fn parse_website(page: &str) -> WebsiteData {
    let name = |key: &str| html::meta_content(page, "name", key).unwrap_or_default();
    let property = |key: &str| html::meta_content(page, "property", key).unwrap_or_default();

    let metadata = WebsiteMetadata {
        title: html::title(page).unwrap_or_default(),
        description: name("description"),
        keywords: name("keywords"),
        author: name("author"),
        robots: name("robots"),
        og_title: property("og:title"),
        og_description: property("og:description"),
        og_image: property("og:image"),
        og_url: property("og:url"),
        og_type: property("og:type"),
        og_site_name: property("og:site_name"),
        twitter_card: name("twitter:card"),
        twitter_site: name("twitter:site"),
        twitter_title: name("twitter:title"),
        twitter_description: name("twitter:description"),
        twitter_image: name("twitter:image"),
        canonical: html::link_href(page, |tag| rel_is(tag, &["canonical"])).unwrap_or_default(),
        favicon: html::link_href(page, |tag| rel_is(tag, &["icon", "shortcut icon"]))
            .unwrap_or_default(),
        feed_url: html::feed_link(page),
        has_contact_page: CONTACT_RE.is_match(page),
        has_about_page: ABOUT_RE.is_match(page),
        has_blog_section: BLOG_RE.is_match(page),
        schema_org: html::ld_json_blocks(page),
    };

    WebsiteData {
        metadata,
        technologies: detect_technologies(page),
        html_length: page.chars().count(),
    }
}

fn rel_is(tag: &str, accepted: &[&str]) -> bool {
    html::attr(tag, "rel").is_some_and(|rel| accepted.iter().any(|a| rel.eq_ignore_ascii_case(a)))
}

/// Technology tags whose marker appears anywhere in the page source.
#[must_use]
pub fn detect_technologies(page: &str) -> Vec<String> {
    let lower = page.to_lowercase();
    TECHNOLOGY_MARKERS
        .iter()
        .filter(|(_, marker)| lower.contains(marker))
        .map(|(tag, _)| (*tag).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!doctype html>
<html><head>
  <title>Acme | Anvils since 1949</title>
  <meta name="description" content="Quality anvils and rockets.">
  <meta name="keywords" content="anvils, rockets">
  <meta property="og:title" content="Acme">
  <meta property="og:site_name" content="Acme Corporation">
  <meta name="twitter:card" content="summary_large_image">
  <meta name="twitter:site" content="@acme">
  <link rel="canonical" href="https://acme.com/">
  <link rel="shortcut icon" href="/favicon.ico">
  <link rel="alternate" type="application/rss+xml" href="/blog/feed.xml">
  <script src="https://cdn.shopify.com/s/files/jquery.min.js"></script>
  <script type="application/ld+json">{"@type":"Organization","name":"Acme"}</script>
</head><body><a href="/pages/contact">Contact us</a><a href="/blogs/news">Blog</a></body></html>"#;

    #[test]
    fn extracts_metadata_fields() {
        let data = parse_website(PAGE);
        let meta = &data.metadata;
        assert_eq!(meta.title, "Acme | Anvils since 1949");
        assert_eq!(meta.description, "Quality anvils and rockets.");
        assert_eq!(meta.keywords, "anvils, rockets");
        assert_eq!(meta.og_title, "Acme");
        assert_eq!(meta.og_site_name, "Acme Corporation");
        assert_eq!(meta.twitter_card, "summary_large_image");
        assert_eq!(meta.twitter_site, "@acme");
        assert_eq!(meta.canonical, "https://acme.com/");
        assert_eq!(meta.favicon, "/favicon.ico");
        assert_eq!(meta.feed_url.as_deref(), Some("/blog/feed.xml"));
        assert!(meta.has_contact_page);
        assert!(meta.has_blog_section);
        assert!(!meta.has_about_page);
        assert_eq!(meta.schema_org.len(), 1);
        assert!(meta.author.is_empty());
        assert_eq!(data.html_length, PAGE.chars().count());
    }

    #[test]
    fn detects_technologies_case_insensitively() {
        let techs = detect_technologies(PAGE);
        assert_eq!(techs, vec!["Shopify", "jQuery"]);
    }

    #[test]
    fn empty_page_yields_defaults() {
        let data = parse_website("");
        assert_eq!(data.metadata, WebsiteMetadata::default());
        assert!(data.technologies.is_empty());
        assert_eq!(data.html_length, 0);
    }
}
