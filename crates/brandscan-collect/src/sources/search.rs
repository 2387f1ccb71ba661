//! Web search result counts and snippets from the HTML search endpoint.
//!
//! The endpoint rate-limits aggressively, so the six intents run strictly one
//! after another with a fixed pause between calls.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use brandscan_core::sources::{SearchHits, SearchIntent};
use brandscan_core::CollaboratorResult;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use regex::Regex;

use crate::endpoints::SourceEndpoints;
use crate::error::CollectError;
use crate::fetch::{FetchClient, FetchOptions};
use crate::html;
use crate::outcome::settle;

const MAX_SNIPPETS: usize = 5;
/// Snippets this short are navigation chrome, not result text.
const MIN_SNIPPET_CHARS: usize = 20;

static RESULT_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"class="result[^"]*""#).expect("valid result class regex"));
static LINKS_MAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"class="links_main[^"]*""#).expect("valid links_main regex"));
static SNIPPET_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"class="result__snippet[^"]*""#).expect("valid snippet class regex")
});
static SNIPPET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a[^>]*class="result__snippet[^"]*"[^>]*>(.*?)</a>"#)
        .expect("valid snippet regex")
});

/// Runs one query.
///
/// # Errors
///
/// Returns [`CollectError`] when the page cannot be fetched or answers non-2xx.
pub async fn search(
    client: &FetchClient,
    endpoints: &SourceEndpoints,
    query: &str,
) -> Result<SearchHits, CollectError> {
    let url = format!(
        "{}?q={}",
        endpoints.search,
        utf8_percent_encode(query, NON_ALPHANUMERIC)
    );
    let page = client
        .fetch(&url, &FetchOptions::default().browser().attempts(2))
        .await?
        .require_success()?;
    Ok(parse_results(&page.body))
}

/// Runs every intent for `brand_name` in order, pausing `delay` between calls.
///
/// Each intent settles independently; one blocked query does not stop the
/// rest. Returns each intent's outcome with its own wall time.
pub async fn search_all(
    client: &FetchClient,
    endpoints: &SourceEndpoints,
    brand_name: &str,
    delay: Duration,
) -> Vec<(SearchIntent, CollaboratorResult<SearchHits>, Duration)> {
    let mut runs = Vec::with_capacity(SearchIntent::ALL.len());
    for (i, intent) in SearchIntent::ALL.into_iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let started = Instant::now();
        let query = intent.query(brand_name);
        let outcome = search(client, endpoints, &query).await;
        let result = settle(&source_name(intent), brand_name, outcome);
        runs.push((intent, result, started.elapsed()));
    }
    runs
}

/// Scan-log source key for one search intent.
#[must_use]
pub fn source_name(intent: SearchIntent) -> String {
    format!("duckduckgo_{}", intent.as_str())
}

/// Result count is the largest of three independent markers; the page layout
/// varies and no single marker is always present.
#[must_use]
pub fn parse_results(page: &str) -> SearchHits {
    let results_count = [&RESULT_CLASS_RE, &LINKS_MAIN_RE, &SNIPPET_CLASS_RE]
        .iter()
        .map(|re| re.find_iter(page).count())
        .max()
        .unwrap_or(0);

    let snippets = SNIPPET_RE
        .captures_iter(page)
        .filter_map(|c| c.get(1))
        .map(|m| html::clean_text(m.as_str()))
        .filter(|s| s.chars().count() > MIN_SNIPPET_CHARS)
        .take(MAX_SNIPPETS)
        .collect();

    SearchHits {
        results_count: u64::try_from(results_count).unwrap_or(u64::MAX),
        snippets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_block(snippet: &str) -> String {
        format!(
            r#"<div class="result results_links web-result"><div class="links_main links_deep result__body">
<a class="result__snippet" href="/l/?u=x">{snippet}</a></div></div>"#
        )
    }

    #[test]
    fn counts_and_cleans_snippets() {
        let page = [
            result_block("<b>Acme</b> makes the finest anvils &amp; rockets in the west."),
            result_block("too short"),
            result_block("Acme Corporation reviews from verified customers."),
        ]
        .concat();

        let hits = parse_results(&page);
        assert!(hits.results_count >= 3);
        assert_eq!(
            hits.snippets,
            vec![
                "Acme makes the finest anvils & rockets in the west.".to_string(),
                "Acme Corporation reviews from verified customers.".to_string(),
            ]
        );
    }

    #[test]
    fn caps_snippets_at_five() {
        let page = (0..8)
            .map(|i| result_block(&format!("Snippet number {i} about the Acme brand")))
            .collect::<String>();
        assert_eq!(parse_results(&page).snippets.len(), MAX_SNIPPETS);
    }

    #[test]
    fn empty_page_has_zero_results() {
        let hits = parse_results("<html><body>No results.</body></html>");
        assert_eq!(hits.results_count, 0);
        assert!(hits.snippets.is_empty());
    }

    #[test]
    fn links_main_alone_still_counts() {
        let page = r#"<div class="links_main">a</div><div class="links_main">b</div>"#;
        assert_eq!(parse_results(page).results_count, 2);
    }
}
