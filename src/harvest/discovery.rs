//! Channel discovery from site landing pages

use crate::catalog::normalize_name;
use crate::config::{ChannelTarget, SiteProfile};
use crate::fetch::{FetchClient, FetchError};
use crate::url::{extract_domain, parse_http_url, resolve_reference};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

/// Path shapes that channel pages commonly use
static CHANNEL_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(-en-vivo\.html$|/ver/|/canal/|/watch/|/live/)")
        .expect("hardcoded regex pattern is valid")
});

/// Collects channel targets from a landing page
///
/// Links are taken from the site's `channel_selectors` first, then from every anchor on the
/// same host whose path looks like a channel page. A matched element that is not itself a
/// link contributes its first descendant link.
///
/// # Arguments
///
/// * `html` - Landing page content
/// * `base_url` - URL the content was served from
/// * `profile` - Site the page belongs to
///
/// # Returns
///
/// Targets in document order, deduplicated by URL. Links without a usable name are skipped.
pub fn discover_channels(html: &str, base_url: &Url, profile: &SiteProfile) -> Vec<ChannelTarget> {
    let document = Html::parse_document(html);
    let mut seen: HashSet<String> = HashSet::new();
    let mut targets: Vec<ChannelTarget> = Vec::new();

    let Ok(anchor) = Selector::parse("a[href]") else {
        return targets;
    };

    // Step 1: Configured selectors
    for raw_selector in &profile.channel_selectors {
        let Ok(selector) = Selector::parse(raw_selector) else {
            tracing::warn!("Ignoring invalid selector '{}' for {}", raw_selector, profile.name);
            continue;
        };

        for element in document.select(&selector) {
            let link = if element.value().attr("href").is_some() {
                Some(element)
            } else {
                element.select(&anchor).next()
            };

            if let Some(link) = link {
                push_target(link, base_url, profile, &mut seen, &mut targets);
            }
        }
    }

    // Step 2: URL-shape heuristics, same host only
    let base_host = extract_domain(base_url);
    for link in document.select(&anchor) {
        let Some(url) = link_url(link, base_url) else {
            continue;
        };
        if extract_domain(&url) != base_host || !CHANNEL_PATH.is_match(url.path()) {
            continue;
        }
        push_target(link, base_url, profile, &mut seen, &mut targets);
    }

    targets
}

/// Fetches a site's landing page and discovers its channels
pub async fn discover_site(
    fetcher: &FetchClient,
    profile: &SiteProfile,
) -> Result<Vec<ChannelTarget>, FetchError> {
    let base_url = match parse_http_url(&profile.base_url) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Site {} has an unusable base URL: {}", profile.name, e);
            return Ok(Vec::new());
        }
    };

    let page = fetcher.fetch_following(&base_url, profile, None).await?;
    let targets = discover_channels(&page.body, &page.url, profile);

    tracing::info!("Discovered {} channels on {}", targets.len(), profile.name);
    Ok(targets)
}

fn link_url(link: ElementRef<'_>, base_url: &Url) -> Option<Url> {
    let href = link.value().attr("href")?;
    resolve_reference(href, base_url)
}

fn push_target(
    link: ElementRef<'_>,
    base_url: &Url,
    profile: &SiteProfile,
    seen: &mut HashSet<String>,
    targets: &mut Vec<ChannelTarget>,
) {
    let Some(url) = link_url(link, base_url) else {
        return;
    };

    if &url == base_url || seen.contains(url.as_str()) {
        return;
    }

    let Some(name) = link_name(link, &url) else {
        return;
    };

    seen.insert(url.as_str().to_string());
    targets.push(ChannelTarget {
        name,
        url: url.to_string(),
        site: profile.name.clone(),
    });
}

/// Picks a channel name from link text, the title attribute, or the last path segment
fn link_name(link: ElementRef<'_>, url: &Url) -> Option<String> {
    let text = link.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let raw = if !text.is_empty() {
        text
    } else if let Some(title) = link.value().attr("title").filter(|t| !t.trim().is_empty()) {
        title.to_string()
    } else {
        let segment = url
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))?;
        segment
            .trim_end_matches(".html")
            .trim_end_matches(".php")
            .replace(['-', '_'], " ")
    };

    let name = normalize_name(&raw);
    (!name.is_empty()).then_some(name)
}
