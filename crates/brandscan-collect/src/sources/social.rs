//! Public profile preview metadata for the supported social platforms.

use std::sync::LazyLock;

use brandscan_core::sources::SocialProfile;
use brandscan_core::{CollaboratorResult, Platform};
use regex::Regex;

use crate::cookies::CookieJar;
use crate::endpoints::SourceEndpoints;
use crate::fetch::{FetchClient, FetchOptions};
use crate::html;
use crate::outcome::settle;

fn metric_re(label: &str) -> Regex {
    Regex::new(&format!(r"(?i)([\d][\d,.]*[KkMmBb]?)\s*{label}\b")).expect("valid metric regex")
}

static FOLLOWERS_RE: LazyLock<Regex> = LazyLock::new(|| metric_re("Followers"));
static FOLLOWING_RE: LazyLock<Regex> = LazyLock::new(|| metric_re("Following"));
static POSTS_RE: LazyLock<Regex> = LazyLock::new(|| metric_re("Posts"));
static LIKES_RE: LazyLock<Regex> = LazyLock::new(|| metric_re("Likes"));

/// Fetches one profile page with browser headers, replaying any cookies the
/// platform set earlier in this job.
///
/// Any non-2xx answer is reported as `Blocked` with that status, since these
/// platforms answer bots with redirects to login walls or bare refusals.
pub async fn fetch_profile(
    client: &FetchClient,
    endpoints: &SourceEndpoints,
    jar: &CookieJar,
    brand_name: &str,
    platform: Platform,
    handle: &str,
) -> CollaboratorResult<SocialProfile> {
    let source = format!("social_{platform}");
    let url = endpoints.profile_url(platform, handle);
    let options = FetchOptions::default()
        .browser()
        .attempts(2)
        .cookies(jar, platform.cookie_domain());

    match client.fetch(&url, &options).await {
        Ok(page) if page.status.is_success() => {
            CollaboratorResult::Success(parse_profile(handle, &page.body))
        }
        Ok(page) => {
            tracing::warn!(
                brand = brand_name,
                source = %source,
                status = page.status.as_u16(),
                "profile page refused"
            );
            CollaboratorResult::Blocked(page.status.as_u16())
        }
        Err(e) => settle(&source, brand_name, Err(e)),
    }
}

/// Reads `og:title`, `og:description` and `og:image`, pulling count strings
/// such as `"12.5K Followers"` out of the description.
#[must_use]
pub fn parse_profile(handle: &str, page: &str) -> SocialProfile {
    let title = html::meta_content(page, "property", "og:title");
    let description = html::meta_content(page, "property", "og:description");
    let image = html::meta_content(page, "property", "og:image");

    if title.is_none() && description.is_none() {
        return SocialProfile {
            handle: handle.to_string(),
            no_data: true,
            ..SocialProfile::default()
        };
    }

    let metric = |re: &Regex| {
        description
            .as_deref()
            .and_then(|d| re.captures(d))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    };

    SocialProfile {
        handle: handle.to_string(),
        followers: metric(&FOLLOWERS_RE),
        following: metric(&FOLLOWING_RE),
        posts: metric(&POSTS_RE),
        likes: metric(&LIKES_RE),
        display_name: title,
        bio: description,
        profile_image: image,
        no_data: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_instagram_style_description() {
        let page = r#"<meta property="og:title" content="Acme (@acme) &#x27; Instagram photos">
<meta property="og:description" content="12.5K Followers, 310 Following, 1,204 Posts - See Instagram photos and videos from Acme">
<meta property="og:image" content="https://cdn.example.com/acme.jpg">"#;
        let profile = parse_profile("acme", page);
        assert_eq!(profile.followers.as_deref(), Some("12.5K"));
        assert_eq!(profile.following.as_deref(), Some("310"));
        assert_eq!(profile.posts.as_deref(), Some("1,204"));
        assert_eq!(profile.likes, None);
        assert_eq!(profile.profile_image.as_deref(), Some("https://cdn.example.com/acme.jpg"));
        assert_eq!(profile.display_name.as_deref(), Some("Acme (@acme) ' Instagram photos"));
        assert!(!profile.no_data);
    }

    #[test]
    fn parses_tiktok_likes() {
        let page = r#"<meta property="og:description" content="Acme on TikTok | 3.4M Likes. 1M Followers.">"#;
        let profile = parse_profile("acme", page);
        assert_eq!(profile.likes.as_deref(), Some("3.4M"));
        assert_eq!(profile.followers.as_deref(), Some("1M"));
    }

    #[test]
    fn page_without_preview_metadata_is_no_data() {
        let profile = parse_profile("acme", "<html><body>Log in</body></html>");
        assert!(profile.no_data);
        assert_eq!(profile.handle, "acme");
        assert_eq!(profile.followers, None);
    }
}
