use crate::UrlError;
use url::Url;

/// Schemes that can never point at a fetchable stream or frame
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "data:", "mailto:", "tel:", "blob:", "about:"];

/// Parses an absolute HTTP(S) URL with a host
///
/// # Arguments
///
/// * `url_str` - The URL string to parse
///
/// # Returns
///
/// * `Ok(Url)` - The parsed URL with its fragment removed
/// * `Err(UrlError)` - Malformed, non-HTTP(S), or host-less URL
///
/// # Examples
///
/// ```
/// use stream_harvest::url::parse_http_url;
///
/// let url = parse_http_url("https://example.com/live#player").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/live");
/// assert!(parse_http_url("ftp://example.com/").is_err());
/// ```
pub fn parse_http_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Resolves a raw reference found in page content against the page URL
///
/// The reference may be absolute, protocol-relative (`//host/path`), root-relative or
/// path-relative. HTML-escaped ampersands are decoded first.
///
/// Returns None if the reference should be excluded:
/// - empty or fragment-only references
/// - javascript:, data:, mailto:, tel:, blob:, about: schemes
/// - references that fail to resolve
/// - non-HTTP(S) URLs after resolution
///
/// # Arguments
///
/// * `raw` - The reference as it appeared in the content
/// * `base` - The URL of the page the reference was found on
pub fn resolve_reference(raw: &str, base: &Url) -> Option<Url> {
    let raw = raw.trim().trim_matches(|c| c == '"' || c == '\'');

    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }

    let lower = raw.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return None;
    }

    let decoded = raw.replace("&amp;", "&");
    let mut resolved = base.join(&decoded).ok()?;

    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    resolved.host_str()?;

    resolved.set_fragment(None);
    Some(resolved)
}

/// Replaces JSON-escaped slashes (`\/`) with plain slashes
///
/// Player configurations embedded in scripts frequently carry URLs in this form.
pub fn unescape_slashes(content: &str) -> String {
    content.replace("\\/", "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://site.example.com/canal/espn.html").unwrap()
    }

    #[test]
    fn test_parse_http_url_strips_fragment() {
        let url = parse_http_url("https://example.com/page#frag").unwrap();
        assert_eq!(url.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_parse_http_url_rejects_other_schemes() {
        assert!(matches!(
            parse_http_url("ftp://example.com/"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(
            parse_http_url("not a url"),
            Err(UrlError::Parse(_))
        ));
    }

    #[test]
    fn test_resolve_absolute_reference() {
        let url = resolve_reference("https://cdn.example.com/a.m3u8", &base_url()).unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.com/a.m3u8");
    }

    #[test]
    fn test_resolve_protocol_relative_reference() {
        let url = resolve_reference("//player.example.net/embed/1", &base_url()).unwrap();
        assert_eq!(url.as_str(), "https://player.example.net/embed/1");
    }

    #[test]
    fn test_resolve_root_and_path_relative_references() {
        let root = resolve_reference("/hls/live.m3u8", &base_url()).unwrap();
        assert_eq!(root.as_str(), "https://site.example.com/hls/live.m3u8");

        let relative = resolve_reference("player.php?id=3", &base_url()).unwrap();
        assert_eq!(
            relative.as_str(),
            "https://site.example.com/canal/player.php?id=3"
        );
    }

    #[test]
    fn test_resolve_strips_fragment_and_decodes_ampersands() {
        let url = resolve_reference("/embed?a=1&amp;b=2#autoplay", &base_url()).unwrap();
        assert_eq!(url.as_str(), "https://site.example.com/embed?a=1&b=2");
    }

    #[test]
    fn test_resolve_skips_special_schemes() {
        assert!(resolve_reference("javascript:void(0)", &base_url()).is_none());
        assert!(resolve_reference("data:text/html;base64,AAAA", &base_url()).is_none());
        assert!(resolve_reference("about:blank", &base_url()).is_none());
        assert!(resolve_reference("blob:https://x/1", &base_url()).is_none());
        assert!(resolve_reference("#top", &base_url()).is_none());
        assert!(resolve_reference("   ", &base_url()).is_none());
    }

    #[test]
    fn test_unescape_slashes() {
        assert_eq!(
            unescape_slashes(r#"{"file":"https:\/\/cdn.example.com\/live.m3u8"}"#),
            r#"{"file":"https://cdn.example.com/live.m3u8"}"#
        );
    }
}
