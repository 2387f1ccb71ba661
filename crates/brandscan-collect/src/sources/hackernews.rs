//! Community mentions from the Hacker News Algolia search API.

use brandscan_core::sources::{CommunityHit, CommunityMentions};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;

use crate::endpoints::SourceEndpoints;
use crate::error::CollectError;
use crate::fetch::{FetchClient, FetchOptions};

const HITS_PER_PAGE: u32 = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
    #[serde(default)]
    nb_hits: u64,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    points: Option<i64>,
    #[serde(default)]
    num_comments: Option<i64>,
    #[serde(default)]
    url: Option<String>,
    #[serde(rename = "objectID", default)]
    object_id: String,
}

/// # Errors
///
/// Returns [`CollectError`] on transport failure, a non-2xx answer, or malformed JSON.
pub async fn fetch_mentions(
    client: &FetchClient,
    endpoints: &SourceEndpoints,
    brand_name: &str,
) -> Result<CommunityMentions, CollectError> {
    let query = utf8_percent_encode(brand_name, NON_ALPHANUMERIC);
    let url = format!(
        "{}?query={query}&hitsPerPage={HITS_PER_PAGE}",
        endpoints.hackernews
    );
    let body: SearchResponse = client
        .fetch(&url, &FetchOptions::default().attempts(2))
        .await?
        .require_success()?
        .json()?;
    Ok(mentions_from(body))
}

fn mentions_from(body: SearchResponse) -> CommunityMentions {
    let hits = body
        .hits
        .into_iter()
        .map(|hit| CommunityHit {
            url: hit
                .url
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={}", hit.object_id)),
            title: hit.title,
            points: hit.points,
            num_comments: hit.num_comments,
        })
        .collect();

    CommunityMentions {
        total_hits: body.nb_hits,
        hits,
    }
}
