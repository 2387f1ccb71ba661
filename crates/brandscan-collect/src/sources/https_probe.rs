//! Single-attempt HTTPS availability probe.

use brandscan_core::sources::HttpsProbe;
use reqwest::Method;

use crate::endpoints::SourceEndpoints;
use crate::error::CollectError;
use crate::fetch::{FetchClient, FetchOptions};

/// Sends one `HEAD` to the domain over HTTPS. Any status is a successful probe;
/// only a 2xx counts as available.
///
/// # Errors
///
/// Returns [`CollectError`] when no response arrives at all.
pub async fn probe_https(
    client: &FetchClient,
    endpoints: &SourceEndpoints,
    domain: &str,
) -> Result<HttpsProbe, CollectError> {
    let url = endpoints.https_probe_url(domain);
    let page = client
        .fetch(&url, &FetchOptions::default().method(Method::HEAD).attempts(1))
        .await?;
    Ok(HttpsProbe {
        https_available: page.status.is_success(),
        status: page.status.as_u16(),
    })
}
