//! Tolerant tag and attribute extraction over raw HTML and feed XML.
//!
//! Nothing here builds a document tree. Tags are located with regular
//! expressions and attributes are read in any order and with either quote
//! style, so malformed markup degrades to missing fields instead of errors.

use std::sync::LazyLock;

use regex::Regex;

static META_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid meta regex"));
static LINK_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<link\b[^>]*>").expect("valid link regex"));
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("valid attr regex")
});
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title regex"));
static LD_JSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid ld+json regex")
});
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("valid tag regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static CDATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("valid cdata regex"));

/// Reads attribute `name` (case-insensitive) from a single tag.
pub(crate) fn attr(tag: &str, name: &str) -> Option<String> {
    ATTR_RE.captures_iter(tag).find_map(|caps| {
        let key = caps.get(1)?.as_str();
        if !key.eq_ignore_ascii_case(name) {
            return None;
        }
        let value = caps.get(2).or_else(|| caps.get(3))?.as_str();
        Some(decode_entities(value.trim()))
    })
}

/// `content` of the first `<meta>` whose `key_attr` equals `key_value`.
///
/// Empty content counts as absent.
pub(crate) fn meta_content(html: &str, key_attr: &str, key_value: &str) -> Option<String> {
    META_TAG_RE.find_iter(html).find_map(|m| {
        let tag = m.as_str();
        let key = attr(tag, key_attr)?;
        if key.eq_ignore_ascii_case(key_value) {
            attr(tag, "content").filter(|c| !c.is_empty())
        } else {
            None
        }
    })
}

/// `href` of the first `<link>` tag accepted by `matches`.
pub(crate) fn link_href(html: &str, matches: impl Fn(&str) -> bool) -> Option<String> {
    LINK_TAG_RE.find_iter(html).find_map(|m| {
        let tag = m.as_str();
        if matches(tag) {
            attr(tag, "href").filter(|h| !h.is_empty())
        } else {
            None
        }
    })
}

/// The advertised RSS or Atom feed link, as written in the page.
pub(crate) fn feed_link(html: &str) -> Option<String> {
    link_href(html, |tag| {
        attr(tag, "type").is_some_and(|t| {
            let t = t.to_ascii_lowercase();
            t == "application/rss+xml" || t == "application/atom+xml"
        })
    })
}

pub(crate) fn title(html: &str) -> Option<String> {
    TITLE_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| clean_text(m.as_str()))
        .filter(|t| !t.is_empty())
}

/// Every `application/ld+json` block that parses as JSON.
pub(crate) fn ld_json_blocks(html: &str) -> Vec<serde_json::Value> {
    LD_JSON_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .filter_map(|m| serde_json::from_str(m.as_str().trim()).ok())
        .collect()
}

/// Removes tags, decodes common entities and collapses whitespace.
pub(crate) fn clean_text(raw: &str) -> String {
    let stripped = TAG_RE.replace_all(raw, "");
    let decoded = decode_entities(&stripped);
    WHITESPACE_RE.replace_all(&decoded, " ").trim().to_string()
}

/// Replaces each `<![CDATA[...]]>` section with its contents.
pub(crate) fn unwrap_cdata(raw: &str) -> String {
    CDATA_RE.replace_all(raw, "$1").trim().to_string()
}

pub(crate) fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
