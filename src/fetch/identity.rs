//! Rotating browser identities
//!
//! Each fetch attempt presents a freshly drawn desktop browser identity: a user agent that
//! agrees with its client-hint headers, a rotated accept-language, and small cache/DNT
//! variations, so consecutive retries do not look like the same client.

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, DNT, REFERER,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};

/// Chrome releases as (major, full version)
const CHROME_VERSIONS: &[(&str, &str)] = &[
    ("128", "128.0.6613.138"),
    ("129", "129.0.6668.101"),
    ("130", "130.0.6723.117"),
    ("131", "131.0.6778.86"),
];

/// Firefox releases
const FIREFOX_VERSIONS: &[&str] = &["130.0", "131.0", "132.0", "133.0"];

/// Edge releases as (major, full version)
const EDGE_VERSIONS: &[(&str, &str)] = &[
    ("129", "129.0.2792.89"),
    ("130", "130.0.2849.80"),
    ("131", "131.0.2903.70"),
];

/// Accept-Language values matching the audiences of the target sites
const ACCEPT_LANGUAGES: &[&str] = &[
    "es-ES,es;q=0.9,en;q=0.8",
    "es-MX,es;q=0.9,en;q=0.8",
    "es-AR,es;q=0.9,en;q=0.8",
    "es-CO,es;q=0.9,en;q=0.8",
    "en-US,en;q=0.9,es;q=0.8",
];

/// Search and social landing pages used as a referer when nothing better is known
const NATURAL_REFERERS: &[&str] = &[
    "https://www.google.com/",
    "https://www.bing.com/",
    "https://duckduckgo.com/",
    "https://search.yahoo.com/",
    "https://www.reddit.com/",
];

const CACHE_CONTROLS: &[&str] = &["max-age=0", "no-cache"];

/// Desktop platform an identity claims to run on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOS,
    Linux,
}

impl Platform {
    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        // Rough desktop share: Windows 65%, macOS 20%, Linux 15%
        let roll: f32 = rng.gen();
        if roll < 0.65 {
            Platform::Windows
        } else if roll < 0.85 {
            Platform::MacOS
        } else {
            Platform::Linux
        }
    }

    fn os_string(&self) -> &'static str {
        match self {
            Platform::Windows => "Windows NT 10.0; Win64; x64",
            Platform::MacOS => "Macintosh; Intel Mac OS X 10_15_7",
            Platform::Linux => "X11; Linux x86_64",
        }
    }

    fn sec_ch_platform(&self) -> &'static str {
        match self {
            Platform::Windows => "\"Windows\"",
            Platform::MacOS => "\"macOS\"",
            Platform::Linux => "\"Linux\"",
        }
    }
}

/// Browser family an identity claims to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    Chrome,
    Firefox,
    Edge,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Edge => "edge",
        }
    }
}

/// One complete set of identity headers
#[derive(Debug, Clone)]
pub struct HeaderProfile {
    pub browser: Browser,
    pub platform: Platform,
    pub user_agent: String,
    pub accept: &'static str,
    pub accept_language: &'static str,
    /// `sec-ch-ua` brand list; Firefox does not send client hints
    pub sec_ch_ua: Option<String>,
    pub cache_control: &'static str,
    pub do_not_track: bool,
}

impl HeaderProfile {
    /// Draws a random identity (Chrome 60%, Firefox 25%, Edge 15%)
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let platform = Platform::random(rng);
        let roll: f32 = rng.gen();
        let mut profile = if roll < 0.60 {
            Self::chrome(rng, platform)
        } else if roll < 0.85 {
            Self::firefox(rng, platform)
        } else {
            Self::edge(rng, platform)
        };

        profile.accept_language = ACCEPT_LANGUAGES
            .choose(rng)
            .copied()
            .unwrap_or(ACCEPT_LANGUAGES[0]);
        profile.cache_control = CACHE_CONTROLS.choose(rng).copied().unwrap_or("max-age=0");
        profile.do_not_track = rng.gen_bool(0.3);
        profile
    }

    fn chrome<R: Rng + ?Sized>(rng: &mut R, platform: Platform) -> Self {
        let (major, full) = CHROME_VERSIONS.choose(rng).copied().unwrap_or(CHROME_VERSIONS[0]);

        Self {
            browser: Browser::Chrome,
            platform,
            user_agent: format!(
                "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{} Safari/537.36",
                platform.os_string(),
                full
            ),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
            accept_language: ACCEPT_LANGUAGES[0],
            sec_ch_ua: Some(format!(
                "\"Google Chrome\";v=\"{major}\", \"Chromium\";v=\"{major}\", \"Not_A Brand\";v=\"24\""
            )),
            cache_control: "max-age=0",
            do_not_track: false,
        }
    }

    fn firefox<R: Rng + ?Sized>(rng: &mut R, platform: Platform) -> Self {
        let version = FIREFOX_VERSIONS.choose(rng).copied().unwrap_or(FIREFOX_VERSIONS[0]);

        Self {
            browser: Browser::Firefox,
            platform,
            user_agent: format!(
                "Mozilla/5.0 ({}; rv:{}) Gecko/20100101 Firefox/{}",
                platform.os_string(),
                version,
                version
            ),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            accept_language: ACCEPT_LANGUAGES[0],
            sec_ch_ua: None,
            cache_control: "max-age=0",
            do_not_track: false,
        }
    }

    fn edge<R: Rng + ?Sized>(rng: &mut R, platform: Platform) -> Self {
        let (major, full) = EDGE_VERSIONS.choose(rng).copied().unwrap_or(EDGE_VERSIONS[0]);

        Self {
            browser: Browser::Edge,
            platform,
            user_agent: format!(
                "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{}.0.0.0 Safari/537.36 Edg/{}",
                platform.os_string(),
                major,
                full
            ),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
            accept_language: ACCEPT_LANGUAGES[0],
            sec_ch_ua: Some(format!(
                "\"Microsoft Edge\";v=\"{major}\", \"Chromium\";v=\"{major}\", \"Not_A Brand\";v=\"24\""
            )),
            cache_control: "max-age=0",
            do_not_track: false,
        }
    }

    /// Short description recorded in the attempt log, e.g. `chrome/windows`
    pub fn label(&self) -> String {
        let platform = match self.platform {
            Platform::Windows => "windows",
            Platform::MacOS => "macos",
            Platform::Linux => "linux",
        };
        format!("{}/{}", self.browser.as_str(), platform)
    }

    /// Builds the request headers for this identity
    ///
    /// # Arguments
    ///
    /// * `referer` - The referer to send; `sec-fetch-site` is derived from its presence
    pub fn to_header_map(&self, referer: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        insert(&mut headers, USER_AGENT, &self.user_agent);
        headers.insert(ACCEPT, HeaderValue::from_static(self.accept));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(self.accept_language));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static(self.cache_control));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

        if self.do_not_track {
            headers.insert(DNT, HeaderValue::from_static("1"));
        }

        if let Some(brands) = &self.sec_ch_ua {
            insert(&mut headers, HeaderName::from_static("sec-ch-ua"), brands);
            headers.insert(
                HeaderName::from_static("sec-ch-ua-mobile"),
                HeaderValue::from_static("?0"),
            );
            headers.insert(
                HeaderName::from_static("sec-ch-ua-platform"),
                HeaderValue::from_static(self.platform.sec_ch_platform()),
            );
        }

        let fetch_site = if referer.is_some() { "cross-site" } else { "none" };
        headers.insert(
            HeaderName::from_static("sec-fetch-dest"),
            HeaderValue::from_static("document"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-mode"),
            HeaderValue::from_static("navigate"),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-site"),
            HeaderValue::from_static(fetch_site),
        );
        headers.insert(
            HeaderName::from_static("sec-fetch-user"),
            HeaderValue::from_static("?1"),
        );

        if let Some(referer) = referer {
            insert(&mut headers, REFERER, referer);
        }

        headers
    }
}

/// Inserts a dynamic header value, skipping values that are not valid header text
fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::debug!("Skipping invalid {} header value", name),
    }
}

/// Picks a search-engine style referer
pub fn natural_referer<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    NATURAL_REFERERS.choose(rng).copied().unwrap_or(NATURAL_REFERERS[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_chrome_profile_sends_client_hints() {
        let mut rng = StdRng::seed_from_u64(7);
        let profile = HeaderProfile::chrome(&mut rng, Platform::Windows);
        let headers = profile.to_header_map(None);

        assert!(profile.user_agent.contains("Chrome/"));
        assert!(profile.user_agent.contains("Windows NT 10.0"));
        assert!(headers
            .get("sec-ch-ua")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("Google Chrome")));
        assert_eq!(headers.get("sec-ch-ua-platform").unwrap(), "\"Windows\"");
    }

    #[test]
    fn test_firefox_profile_omits_client_hints() {
        let mut rng = StdRng::seed_from_u64(7);
        let profile = HeaderProfile::firefox(&mut rng, Platform::Linux);
        let headers = profile.to_header_map(None);

        assert!(profile.user_agent.contains("Firefox/"));
        assert!(headers.get("sec-ch-ua").is_none());
        assert!(headers.get("sec-fetch-mode").is_some());
    }

    #[test]
    fn test_edge_profile_brand() {
        let mut rng = StdRng::seed_from_u64(7);
        let profile = HeaderProfile::edge(&mut rng, Platform::MacOS);

        assert!(profile.user_agent.contains("Edg/"));
        assert!(profile.sec_ch_ua.as_deref().unwrap().contains("Microsoft Edge"));
        assert_eq!(profile.label(), "edge/macos");
    }

    #[test]
    fn test_random_profiles_vary() {
        let mut rng = StdRng::seed_from_u64(42);
        let agents: std::collections::HashSet<String> = (0..50)
            .map(|_| HeaderProfile::random(&mut rng).user_agent)
            .collect();

        assert!(agents.len() > 1);
    }

    #[test]
    fn test_referer_sets_cross_site() {
        let mut rng = StdRng::seed_from_u64(1);
        let profile = HeaderProfile::random(&mut rng);

        let headers = profile.to_header_map(Some("https://tv.example.com/"));
        assert_eq!(headers.get(REFERER).unwrap(), "https://tv.example.com/");
        assert_eq!(headers.get("sec-fetch-site").unwrap(), "cross-site");

        let headers = profile.to_header_map(None);
        assert!(headers.get(REFERER).is_none());
        assert_eq!(headers.get("sec-fetch-site").unwrap(), "none");
    }

    #[test]
    fn test_accept_language_is_rotated_from_pool() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let profile = HeaderProfile::random(&mut rng);
            assert!(ACCEPT_LANGUAGES.contains(&profile.accept_language));
        }
    }

    #[test]
    fn test_natural_referer_from_pool() {
        let mut rng = StdRng::seed_from_u64(9);
        assert!(NATURAL_REFERERS.contains(&natural_referer(&mut rng)));
    }
}
