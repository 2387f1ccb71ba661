use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::fingerprint::parse_website_url;
use crate::CoreError;

/// Characters kept verbatim in a profile path segment.
const HANDLE_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Social platforms a scan can be given a profile handle for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    X,
    LinkedIn,
    TikTok,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Instagram,
        Platform::X,
        Platform::LinkedIn,
        Platform::TikTok,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::X => "x",
            Platform::LinkedIn => "linkedin",
            Platform::TikTok => "tiktok",
        }
    }

    /// Domain whose cookies are captured and replayed for this platform.
    #[must_use]
    pub fn cookie_domain(self) -> &'static str {
        match self {
            Platform::Instagram => "instagram.com",
            Platform::X => "twitter.com",
            Platform::LinkedIn => "linkedin.com",
            Platform::TikTok => "tiktok.com",
        }
    }

    /// Path of the public profile page relative to the platform origin.
    ///
    /// A leading `@` is dropped and the handle is encoded as a single path
    /// segment, so `/`, `?` and `#` cannot reach the request line.
    #[must_use]
    pub fn profile_path(self, handle: &str) -> String {
        let handle = handle.trim().trim_start_matches('@');
        let handle = if handle.bytes().all(|b| b == b'.') {
            utf8_percent_encode(handle, NON_ALPHANUMERIC).to_string()
        } else {
            utf8_percent_encode(handle, HANDLE_SEGMENT).to_string()
        };
        match self {
            Platform::Instagram => format!("/{handle}/"),
            Platform::X => format!("/{handle}"),
            Platform::LinkedIn => format!("/company/{handle}/"),
            Platform::TikTok => format!("/@{handle}"),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialHandles {
    #[serde(default)]
    pub instagram: Option<String>,
    #[serde(default)]
    pub x: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub tiktok: Option<String>,
}

impl SocialHandles {
    /// Returns the cleaned handle for `platform`, or `None` when it was not supplied.
    #[must_use]
    pub fn get(&self, platform: Platform) -> Option<&str> {
        let raw = match platform {
            Platform::Instagram => self.instagram.as_deref(),
            Platform::X => self.x.as_deref(),
            Platform::LinkedIn => self.linkedin.as_deref(),
            Platform::TikTok => self.tiktok.as_deref(),
        };
        raw.map(clean_handle).filter(|h| !h.is_empty())
    }

    /// Iterates over the platforms that were given a non-empty handle.
    pub fn provided(&self) -> impl Iterator<Item = (Platform, &str)> + '_ {
        Platform::ALL
            .into_iter()
            .filter_map(move |p| self.get(p).map(|h| (p, h)))
    }
}

/// Reduces user input to a bare handle. Accepts `@acme`, `acme/` and pasted
/// profile URLs (`https://www.instagram.com/acme/?hl=en`), keeping the last
/// path segment of a URL.
fn clean_handle(raw: &str) -> &str {
    let raw = raw.trim();
    let raw = raw.split(['?', '#']).next().unwrap_or_default();
    let handle = match raw.split_once("://") {
        Some((_, rest)) => rest
            .split('/')
            .skip(1)
            .filter(|s| !matches!(*s, "" | "." | ".."))
            .last()
            .unwrap_or_default(),
        None => raw.trim_matches('/'),
    };
    let handle = handle.trim().trim_start_matches('@');
    if handle.bytes().all(|b| b == b'.') {
        ""
    } else {
        handle
    }
}

/// A single brand scan submission. Immutable once accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    #[serde(alias = "brandName")]
    pub brand_name: String,
    #[serde(alias = "websiteUrl")]
    pub website_url: String,
    #[serde(flatten)]
    pub social: SocialHandles,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default, alias = "webhookUrl", alias = "callbackUrl")]
    pub callback_url: Option<String>,
}

impl ScanRequest {
    /// Checks that the request carries a brand name, a usable website URL,
    /// and (when present) an http(s) callback address.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRequest`] or [`CoreError::InvalidUrl`].
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.brand_name.trim().is_empty() {
            return Err(CoreError::InvalidRequest(
                "brand_name must not be empty".to_string(),
            ));
        }
        parse_website_url(&self.website_url)?;

        if let Some(callback) = self.callback_url.as_deref() {
            let url = reqwest::Url::parse(callback).map_err(|e| CoreError::InvalidUrl {
                url: callback.to_string(),
                reason: e.to_string(),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(CoreError::InvalidUrl {
                    url: callback.to_string(),
                    reason: "callback must use http or https".to_string(),
                });
            }
        }
        Ok(())
    }

    /// The website URL with a scheme applied, as used for every website fetch.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidUrl`] when the URL has no host.
    pub fn website(&self) -> Result<reqwest::Url, CoreError> {
        parse_website_url(&self.website_url)
    }

    /// Industry tag, with blank strings treated as absent.
    #[must_use]
    pub fn industry(&self) -> Option<&str> {
        self.industry.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn market(&self) -> Option<&str> {
        self.market.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}
