use url::Url;

/// Extracts the lowercase host from a URL
///
/// Used as the key for per-host pacing and for deny/embed host checks.
///
/// # Arguments
///
/// * `url` - The URL to extract the host from
///
/// # Returns
///
/// * `Some(String)` - The lowercase host
/// * `None` - If the URL has no host
///
/// # Examples
///
/// ```
/// use url::Url;
/// use stream_harvest::url::extract_domain;
///
/// let url = Url::parse("https://CDN.Example.com:8443/live.m3u8").unwrap();
/// assert_eq!(extract_domain(&url), Some("cdn.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the scheme and host of a URL as an origin string (`https://host[:port]`)
///
/// Used when a page's origin is sent as the referer of a follow-up request.
pub fn origin_of(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    match url.port() {
        Some(port) => Some(format!("{}://{}:{}", url.scheme(), host, port)),
        None => Some(format!("{}://{}", url.scheme(), host)),
    }
}
