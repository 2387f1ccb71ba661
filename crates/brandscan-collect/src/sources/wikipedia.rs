//! Encyclopedia presence via the MediaWiki search and extract APIs.

use std::collections::HashMap;

use brandscan_core::sources::WikipediaEntry;
use reqwest::Url;
use serde::Deserialize;

use crate::endpoints::SourceEndpoints;
use crate::error::CollectError;
use crate::fetch::{FetchClient, FetchOptions};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
    pageid: u64,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: HashMap<String, ExtractPage>,
}

#[derive(Debug, Deserialize)]
struct ExtractPage {
    #[serde(default)]
    extract: Option<String>,
}

fn api_url(base: &str, params: &[(&str, &str)]) -> Result<Url, CollectError> {
    Url::parse_with_params(base, params).map_err(|e| CollectError::InvalidUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })
}

/// Searches for `brand_name` and, on a hit, fetches the top page's intro text.
///
/// No search hit is a successful `exists = false`.
///
/// # Errors
///
/// Returns [`CollectError`] when either API call fails or returns malformed JSON.
pub async fn fetch_wikipedia(
    client: &FetchClient,
    endpoints: &SourceEndpoints,
    brand_name: &str,
) -> Result<WikipediaEntry, CollectError> {
    let search_url = api_url(
        &endpoints.wikipedia_api,
        &[
            ("action", "query"),
            ("list", "search"),
            ("srsearch", brand_name),
            ("format", "json"),
        ],
    )?;
    let search: SearchResponse = client
        .fetch(search_url.as_str(), &FetchOptions::default())
        .await?
        .require_success()?
        .json()?;

    let Some(top) = search.query.and_then(|q| q.search.into_iter().next()) else {
        return Ok(WikipediaEntry::default());
    };

    let page_id = top.pageid.to_string();
    let extract_url = api_url(
        &endpoints.wikipedia_api,
        &[
            ("action", "query"),
            ("prop", "extracts"),
            ("exintro", "1"),
            ("explaintext", "1"),
            ("pageids", &page_id),
            ("format", "json"),
        ],
    )?;
    let extract: ExtractResponse = client
        .fetch(extract_url.as_str(), &FetchOptions::default())
        .await?
        .require_success()?
        .json()?;

    let extract_text = extract
        .query
        .and_then(|mut q| q.pages.remove(&page_id))
        .and_then(|p| p.extract)
        .filter(|e| !e.trim().is_empty());

    Ok(WikipediaEntry {
        exists: true,
        page_url: Some(page_url(&endpoints.wikipedia_pages, &top.title)),
        title: Some(top.title),
        extract: extract_text,
    })
}

fn page_url(prefix: &str, title: &str) -> String {
    let slug = title.replace(' ', "_");
    let encoded = percent_encoding::utf8_percent_encode(&slug, PAGE_TITLE);
    format!("{}/{encoded}", prefix.trim_end_matches('/'))
}

/// Characters escaped in article slugs. Wikipedia keeps `_`, `(`, `)` and `,` literal.
const PAGE_TITLE: &percent_encoding::AsciiSet = &percent_encoding::NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'-')
    .remove(b'.')
    .remove(b'(')
    .remove(b')')
    .remove(b',');
