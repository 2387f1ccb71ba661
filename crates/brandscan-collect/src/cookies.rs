//! Per-job cookie jar for social profile fetches.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Cookies captured from `Set-Cookie` headers, keyed by platform domain.
///
/// One jar lives for exactly one collection pass and is never shared across
/// jobs. Later cookies replace earlier ones with the same name.
#[derive(Debug, Default)]
pub struct CookieJar {
    inner: Mutex<HashMap<String, BTreeMap<String, String>>>,
}

impl CookieJar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the `name=value` pair of each `Set-Cookie` line, dropping attributes.
    pub fn record<'h>(&self, domain: &str, set_cookie: impl IntoIterator<Item = &'h str>) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        for line in set_cookie {
            let pair = line.split(';').next().unwrap_or_default().trim();
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            inner
                .entry(domain.to_owned())
                .or_default()
                .insert(name.to_owned(), value.trim().to_owned());
        }
    }

    /// The `Cookie` header value for `domain`, or `None` if nothing was captured.
    #[must_use]
    pub fn header_for(&self, domain: &str) -> Option<String> {
        let inner = self.inner.lock().ok()?;
        let cookies = inner.get(domain)?;
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_jar_has_no_header() {
        let jar = CookieJar::new();
        assert_eq!(jar.header_for("instagram.com"), None);
    }

    #[test]
    fn strips_attributes_and_joins_pairs() {
        let jar = CookieJar::new();
        jar.record(
            "instagram.com",
            [
                "csrftoken=abc; Path=/; Secure",
                "mid=xyz; Max-Age=31536000",
            ],
        );
        assert_eq!(
            jar.header_for("instagram.com").as_deref(),
            Some("csrftoken=abc; mid=xyz")
        );
    }

    #[test]
    fn later_cookie_replaces_same_name() {
        let jar = CookieJar::new();
        jar.record("tiktok.com", ["ttwid=1; Path=/"]);
        jar.record("tiktok.com", ["ttwid=2; Path=/"]);
        assert_eq!(jar.header_for("tiktok.com").as_deref(), Some("ttwid=2"));
    }

    #[test]
    fn domains_are_isolated() {
        let jar = CookieJar::new();
        jar.record("twitter.com", ["guest_id=g1"]);
        assert_eq!(jar.header_for("linkedin.com"), None);
    }

    #[test]
    fn malformed_lines_are_ignored() {
        let jar = CookieJar::new();
        jar.record("linkedin.com", ["no-equals-sign", "=orphan"]);
        assert_eq!(jar.header_for("linkedin.com"), None);
    }
}
