//! Base URLs of every external service the collector talks to.

use brandscan_core::Platform;

/// Production service locations, overridable so tests can point every
/// adapter at a local mock server.
#[derive(Debug, Clone)]
pub struct SourceEndpoints {
    /// MediaWiki action API.
    pub wikipedia_api: String,
    /// Prefix for article links (`{prefix}/{Title_With_Underscores}`).
    pub wikipedia_pages: String,
    pub wayback: String,
    /// RDAP bootstrap service; the domain is appended as a path segment.
    pub rdap: String,
    pub hackernews: String,
    pub search: String,
    pub instagram: String,
    pub x: String,
    pub linkedin: String,
    pub tiktok: String,
    /// When set, the HTTPS probe targets this origin instead of `https://{domain}`.
    pub https_probe: Option<String>,
}

impl Default for SourceEndpoints {
    fn default() -> Self {
        Self {
            wikipedia_api: "https://en.wikipedia.org/w/api.php".to_string(),
            wikipedia_pages: "https://en.wikipedia.org/wiki".to_string(),
            wayback: "https://archive.org/wayback/available".to_string(),
            rdap: "https://rdap.org/domain".to_string(),
            hackernews: "https://hn.algolia.com/api/v1/search".to_string(),
            search: "https://html.duckduckgo.com/html/".to_string(),
            instagram: "https://www.instagram.com".to_string(),
            x: "https://twitter.com".to_string(),
            linkedin: "https://www.linkedin.com".to_string(),
            tiktok: "https://www.tiktok.com".to_string(),
            https_probe: None,
        }
    }
}

impl SourceEndpoints {
    /// Routes every service to `base` (a mock server URI), keeping each
    /// service's path distinct.
    #[must_use]
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            wikipedia_api: format!("{base}/w/api.php"),
            wikipedia_pages: format!("{base}/wiki"),
            wayback: format!("{base}/wayback/available"),
            rdap: format!("{base}/rdap/domain"),
            hackernews: format!("{base}/api/v1/search"),
            search: format!("{base}/html/"),
            instagram: format!("{base}/instagram"),
            x: format!("{base}/x"),
            linkedin: format!("{base}/linkedin"),
            tiktok: format!("{base}/tiktok"),
            https_probe: Some(base.to_string()),
        }
    }

    #[must_use]
    pub fn profile_origin(&self, platform: Platform) -> &str {
        match platform {
            Platform::Instagram => &self.instagram,
            Platform::X => &self.x,
            Platform::LinkedIn => &self.linkedin,
            Platform::TikTok => &self.tiktok,
        }
    }

    #[must_use]
    pub fn profile_url(&self, platform: Platform, handle: &str) -> String {
        format!(
            "{}{}",
            self.profile_origin(platform).trim_end_matches('/'),
            platform.profile_path(handle)
        )
    }

    #[must_use]
    pub fn https_probe_url(&self, domain: &str) -> String {
        match &self.https_probe {
            Some(origin) => origin.clone(),
            None => format!("https://{domain}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_profile_urls() {
        let endpoints = SourceEndpoints::default();
        assert_eq!(
            endpoints.profile_url(Platform::Instagram, "acme"),
            "https://www.instagram.com/acme/"
        );
        assert_eq!(
            endpoints.profile_url(Platform::LinkedIn, "acme"),
            "https://www.linkedin.com/company/acme/"
        );
        assert_eq!(
            endpoints.profile_url(Platform::TikTok, "acme"),
            "https://www.tiktok.com/@acme"
        );
        assert_eq!(endpoints.https_probe_url("acme.com"), "https://acme.com");
    }

    #[test]
    fn mock_routing_keeps_paths_distinct() {
        let endpoints = SourceEndpoints::all_at("http://127.0.0.1:9000/");
        assert_eq!(endpoints.search, "http://127.0.0.1:9000/html/");
        assert_eq!(
            endpoints.profile_url(Platform::X, "acme"),
            "http://127.0.0.1:9000/x/acme"
        );
        assert_eq!(endpoints.https_probe_url("acme.com"), "http://127.0.0.1:9000");
    }
}
