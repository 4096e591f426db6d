use serde::Deserialize;

/// Main configuration structure for Stream-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvester: HarvesterConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteProfile>,
    #[serde(default, rename = "channel")]
    pub channels: Vec<ChannelTarget>,
}

impl Config {
    /// Looks up a site profile by name
    pub fn site(&self, name: &str) -> Option<&SiteProfile> {
        self.sites.iter().find(|site| site.name == name)
    }
}

/// Worker pool and recursion configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvesterConfig {
    /// Number of channel pipelines processed concurrently
    pub workers: usize,

    /// Maximum iframe nesting depth followed from a channel page
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Probe every resolved address after the run
    #[serde(rename = "verify-streams")]
    pub verify_streams: bool,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            max_depth: 2,
            verify_streams: false,
        }
    }
}

/// Resilient fetch configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Attempts per logical fetch before giving up
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// TCP/TLS connect timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Backoff before the first retry (milliseconds)
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Upper bound on any backoff delay (milliseconds)
    #[serde(rename = "backoff-max-ms")]
    pub backoff_max_ms: u64,

    /// Jitter added on top of the nominal delay, as a fraction of it (at most 0.5)
    #[serde(rename = "jitter-ratio")]
    pub jitter_ratio: f64,

    /// Rebuild every HTTP client (connection pool and cookies) after this many attempts
    #[serde(rename = "rotate-client-every")]
    pub rotate_client_every: u64,

    /// Proxies with more failures than this are skipped
    #[serde(rename = "proxy-failure-threshold")]
    pub proxy_failure_threshold: u32,

    /// 200 responses shorter than this are treated as block pages
    #[serde(rename = "min-body-bytes")]
    pub min_body_bytes: usize,

    /// Minimum spacing between requests to one host (milliseconds, 0 disables)
    #[serde(rename = "min-host-interval-ms")]
    pub min_host_interval_ms: u64,

    /// Upper bound of the random pause before requests to protected sites (milliseconds)
    #[serde(rename = "protection-pause-ms")]
    pub protection_pause_ms: u64,

    /// Accept self-signed or otherwise invalid TLS certificates
    #[serde(rename = "accept-invalid-certs")]
    pub accept_invalid_certs: bool,

    /// Proxy URLs (http, https or socks5); direct connections are always in the pool
    pub proxies: Vec<String>,

    /// Replaces the built-in block keyword list when set
    #[serde(rename = "block-keywords")]
    pub block_keywords: Option<Vec<String>>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            request_timeout_secs: 20,
            connect_timeout_secs: 10,
            backoff_base_ms: 1_000,
            backoff_max_ms: 30_000,
            jitter_ratio: 0.5,
            rotate_client_every: 50,
            proxy_failure_threshold: 3,
            min_body_bytes: 1_000,
            min_host_interval_ms: 500,
            protection_pause_ms: 1_500,
            accept_invalid_certs: false,
            proxies: Vec::new(),
            block_keywords: None,
        }
    }
}

/// Host filters applied to extracted candidates
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Host fragments that are never followed or reported (ads, trackers, social widgets)
    #[serde(rename = "deny-hosts")]
    pub deny_hosts: Vec<String>,

    /// Host fragments of known embed players, ranked above generic iframes
    #[serde(rename = "embed-hosts")]
    pub embed_hosts: Vec<String>,
}

/// Default deny list
pub const DEFAULT_DENY_HOSTS: &[&str] = &[
    "google",
    "googlesyndication",
    "googletagmanager",
    "doubleclick",
    "amazon-adsystem",
    "facebook",
    "twitter",
    "instagram",
    "ads",
    "adserver",
    "popads",
    "disqus",
];

/// Default embed player allow list
pub const DEFAULT_EMBED_HOSTS: &[&str] = &[
    "dood",
    "streamtape",
    "vidmoly",
    "ok.ru",
    "okru",
    "hlswish",
    "streamhide",
    "videok",
    "filemoon",
    "voe",
];

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            deny_hosts: DEFAULT_DENY_HOSTS.iter().map(|s| s.to_string()).collect(),
            embed_hosts: DEFAULT_EMBED_HOSTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path of the M3U playlist written after a run
    #[serde(rename = "playlist-path")]
    pub playlist_path: String,

    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            playlist_path: "catalog.m3u".to_string(),
            database_path: "harvest.db".to_string(),
        }
    }
}

/// Static description of one source site
#[derive(Debug, Clone, Deserialize)]
pub struct SiteProfile {
    /// Unique site name referenced by channel targets
    pub name: String,

    /// Landing page of the site
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// CSS selectors matching channel links on the landing page
    #[serde(default, rename = "channel-selectors")]
    pub channel_selectors: Vec<String>,

    /// The site runs bot protection; requests get an extra random pause
    #[serde(default, rename = "uses-blocking-protection")]
    pub uses_blocking_protection: bool,

    /// The site's players are assembled by scripts; only static extraction is attempted
    #[serde(default, rename = "needs-scripted-rendering")]
    pub needs_scripted_rendering: bool,
}

/// One channel page to resolve
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelTarget {
    /// Display name as listed by the site
    pub name: String,

    /// Channel page URL
    pub url: String,

    /// Name of the site profile this page belongs to
    pub site: String,
}
