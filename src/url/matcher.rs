/// Checks if a host matches a configured host fragment
///
/// Fragments are matched the way operators write them in filter lists: a fragment
/// matches when it appears in the host starting on a label boundary. So `dood` matches
/// `dood.watch` and `www.doodstream.com`, and `ads` matches `ads.example.net`, but `ads`
/// does not match `roads.example.com`.
///
/// # Arguments
///
/// * `host` - The lowercase host to test
/// * `fragment` - The configured fragment (case-insensitive)
///
/// # Returns
///
/// * `true` - If some label of the host starts with the fragment
/// * `false` - Otherwise
///
/// # Examples
///
/// ```
/// use stream_harvest::url::matches_host_fragment;
///
/// assert!(matches_host_fragment("ads.example.net", "ads"));
/// assert!(matches_host_fragment("www.doodstream.com", "dood"));
/// assert!(matches_host_fragment("ok.ru", "ok.ru"));
/// assert!(!matches_host_fragment("roads.example.com", "ads"));
/// ```
pub fn matches_host_fragment(host: &str, fragment: &str) -> bool {
    let fragment = fragment.trim().to_ascii_lowercase();
    if fragment.is_empty() {
        return false;
    }

    let host = host.to_ascii_lowercase();
    host.match_indices(&fragment)
        .any(|(index, _)| index == 0 || host.as_bytes()[index - 1] == b'.')
}

/// Checks a host against a list of fragments
pub fn host_matches_any<S: AsRef<str>>(host: &str, fragments: &[S]) -> bool {
    fragments
        .iter()
        .any(|fragment| matches_host_fragment(host, fragment.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_at_host_start() {
        assert!(matches_host_fragment("doubleclick.net", "doubleclick"));
        assert!(matches_host_fragment("streamtape.com", "streamtape"));
    }

    #[test]
    fn test_fragment_on_inner_label() {
        assert!(matches_host_fragment(
            "pagead2.googlesyndication.com",
            "googlesyndication"
        ));
        assert!(matches_host_fragment("www.facebook.com", "facebook"));
    }

    #[test]
    fn test_fragment_inside_label_does_not_match() {
        assert!(!matches_host_fragment("roads.example.com", "ads"));
        assert!(!matches_host_fragment("mydood.example.com", "dood"));
    }

    #[test]
    fn test_multi_label_fragment() {
        assert!(matches_host_fragment("ok.ru", "ok.ru"));
        assert!(matches_host_fragment("m.ok.ru", "ok.ru"));
        assert!(!matches_host_fragment("book.ru", "ok.ru"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(matches_host_fragment("ADS.Example.NET", "Ads"));
    }

    #[test]
    fn test_empty_fragment_never_matches() {
        assert!(!matches_host_fragment("example.com", ""));
        assert!(!matches_host_fragment("example.com", "   "));
    }

    #[test]
    fn test_host_matches_any() {
        let fragments = vec!["google".to_string(), "ads".to_string()];
        assert!(host_matches_any("www.google.com", &fragments));
        assert!(host_matches_any("ads.example.net", &fragments));
        assert!(!host_matches_any("cdn.example.com", &fragments));
    }
}
