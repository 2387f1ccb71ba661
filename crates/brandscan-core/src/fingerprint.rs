//! Cache fingerprint derivation.
//!
//! Two requests that name the same brand on the same site must collide on the
//! same fingerprint regardless of URL scheme, path, or letter case.

use sha2::{Digest, Sha256};

use crate::CoreError;

/// Parse a user-supplied website URL, assuming `https://` when no scheme is given.
///
/// # Errors
///
/// Returns [`CoreError::InvalidUrl`] when the value cannot be parsed or has no host.
pub fn parse_website_url(raw: &str) -> Result<reqwest::Url, CoreError> {
    let trimmed = raw.trim();
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = reqwest::Url::parse(&candidate).map_err(|e| CoreError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(CoreError::InvalidUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        }),
    }
}

/// Lower-cased host of `website_url` with any leading `www.` removed.
///
/// # Errors
///
/// Returns [`CoreError::InvalidUrl`] when the URL has no host.
pub fn registrable_domain(website_url: &str) -> Result<String, CoreError> {
    let url = parse_website_url(website_url)?;
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let host = host.trim_end_matches('.');
    Ok(host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// Trim, collapse internal whitespace, and lower-case a brand name.
#[must_use]
pub fn normalize_brand_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Stable hex SHA-256 over `normalized name | registrable domain`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidUrl`] when the website URL has no host.
pub fn fingerprint(brand_name: &str, website_url: &str) -> Result<String, CoreError> {
    let domain = registrable_domain(website_url)?;
    let key = format!("{}|{domain}", normalize_brand_name(brand_name));
    Ok(format!("{:x}", Sha256::digest(key.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_ignores_scheme_path_and_case() {
        let a = fingerprint("Acme", "https://acme.com").unwrap();
        let b = fingerprint("Acme", "http://WWW.Acme.com/about?ref=1").unwrap();
        let c = fingerprint("  acme ", "ACME.COM/").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn fingerprint_changes_with_name_or_domain() {
        let base = fingerprint("Acme", "https://acme.com").unwrap();
        assert_ne!(base, fingerprint("Acme Labs", "https://acme.com").unwrap());
        assert_ne!(base, fingerprint("Acme", "https://acme.io").unwrap());
    }

    #[test]
    fn registrable_domain_drops_port_and_www() {
        assert_eq!(
            registrable_domain("https://www.Shop.Acme.com:8443/x").unwrap(),
            "shop.acme.com"
        );
    }

    #[test]
    fn normalize_brand_name_collapses_whitespace() {
        assert_eq!(normalize_brand_name("  Big \t Brand  Co "), "big brand co");
    }

    #[test]
    fn unparseable_url_is_rejected() {
        assert!(matches!(
            fingerprint("Acme", "https://"),
            Err(CoreError::InvalidUrl { .. })
        ));
    }
}
