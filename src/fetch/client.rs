//! HTTP fetch client
//!
//! This module owns the retry loop used for every page retrieval:
//! - Building HTTP clients (one per proxy pool member) and rebuilding them periodically
//! - Choosing a fresh identity and proxy for every attempt
//! - Per-host pacing and the extra pause for protected sites
//! - Response classification through the configured `BlockClassifier`
//! - Exponential backoff between attempts and the attempt log on exhaustion
//!
//! Clients never follow redirects on their own. A 3xx answer is returned as a page whose
//! `redirect` names the target, so callers that track visited URLs see every hop.

use crate::config::{FetchConfig, SiteProfile};
use crate::fetch::backoff::Backoff;
use crate::fetch::classify::{BlockClassifier, KeywordBlockClassifier, ResponseClassification};
use crate::fetch::identity::{natural_referer, HeaderProfile};
use crate::fetch::proxy::ProxyPool;
use crate::fetch::{FetchAttempt, FetchError};
use crate::state::{FetchState, HostPacer, RunCounters};
use crate::url::extract_domain;
use parking_lot::RwLock;
use rand::Rng;
use reqwest::header::{HeaderValue, LOCATION, RANGE};
use reqwest::redirect::Policy;
use reqwest::{Client, Proxy, Response};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Longest redirect chain followed by `fetch_following` and `probe_range`
pub const MAX_REDIRECTS: usize = 10;

/// A page retrieved by a successful fetch
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested
    pub url: Url,

    /// Redirect target when the server answered 3xx with a usable `Location`
    ///
    /// The body of a redirect is empty.
    pub redirect: Option<Url>,

    /// HTTP status code
    pub status: u16,

    /// Decoded response body
    pub body: String,

    /// Number of attempts the fetch needed (1 when the first attempt succeeded)
    pub attempts: u32,
}

impl FetchedPage {
    pub fn is_redirect(&self) -> bool {
        self.redirect.is_some()
    }
}

/// Outcome of a single attempt
enum AttemptOutcome {
    Success {
        status: u16,
        body: String,
    },
    Redirect {
        status: u16,
        location: Url,
    },
    NotFound {
        status: u16,
    },
    Failed {
        classification: ResponseClassification,
        error: FetchError,
    },
}

/// Builds an HTTP client for one proxy pool member
///
/// Identity headers are set per request, so the client itself carries no user agent.
/// Redirects are disabled; see `redirect_target`.
///
/// # Arguments
///
/// * `config` - The fetch configuration (timeouts, TLS leniency)
/// * `proxy` - Proxy URL to route all traffic through, or None for direct connections
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build the client or parse the proxy
pub fn build_http_client(config: &FetchConfig, proxy: Option<&str>) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .redirect(Policy::none())
        .danger_accept_invalid_certs(config.accept_invalid_certs);

    builder = match proxy {
        Some(address) => builder.proxy(Proxy::all(address)?),
        None => builder.no_proxy(),
    };

    builder.build()
}

/// The resilient fetch client shared by all workers
pub struct FetchClient {
    config: FetchConfig,
    clients: RwLock<Vec<Client>>,
    proxies: ProxyPool,
    classifier: Box<dyn BlockClassifier>,
    backoff: Backoff,
    pacer: HostPacer,
    counters: Arc<RunCounters>,
    attempts_total: AtomicU64,
    rotations: AtomicU64,
}

impl FetchClient {
    /// Creates a fetch client from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The fetch configuration
    /// * `counters` - Run counters updated on every attempt
    ///
    /// # Returns
    ///
    /// * `Ok(FetchClient)` - Client ready for use
    /// * `Err(reqwest::Error)` - An HTTP client could not be built (e.g. a malformed proxy)
    pub fn new(config: &FetchConfig, counters: Arc<RunCounters>) -> Result<Self, reqwest::Error> {
        let proxies = ProxyPool::new(&config.proxies, config.proxy_failure_threshold);
        let clients = build_clients(config, &proxies)?;

        let classifier: Box<dyn BlockClassifier> = match &config.block_keywords {
            Some(keywords) => Box::new(KeywordBlockClassifier::new(keywords, config.min_body_bytes)),
            None => Box::new(KeywordBlockClassifier::with_defaults(config.min_body_bytes)),
        };

        Ok(Self {
            config: config.clone(),
            clients: RwLock::new(clients),
            proxies,
            classifier,
            backoff: Backoff::from_config(config),
            pacer: HostPacer::new(Duration::from_millis(config.min_host_interval_ms)),
            counters,
            attempts_total: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
        })
    }

    /// Replaces the block classifier
    pub fn with_classifier(mut self, classifier: Box<dyn BlockClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Returns the shared run counters
    pub fn counters(&self) -> &Arc<RunCounters> {
        &self.counters
    }

    /// Returns the proxy pool
    pub fn proxies(&self) -> &ProxyPool {
        &self.proxies
    }

    /// Returns how many times the client set has been rebuilt
    pub fn rotation_count(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    /// Fetches a URL using the configured attempt budget
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    /// * `profile` - The site the URL belongs to (referer fallback and protection pause)
    /// * `referer` - The embedding page, if any
    ///
    /// # Returns
    ///
    /// * `Ok(FetchedPage)` - A response classified as usable
    /// * `Err(FetchError::NotFound)` - The page is gone (404/410); not retried
    /// * `Err(FetchError::Exhausted)` - Every attempt failed; carries the attempt log
    pub async fn fetch(
        &self,
        url: &Url,
        profile: &SiteProfile,
        referer: Option<&Url>,
    ) -> Result<FetchedPage, FetchError> {
        self.fetch_with_attempts(url, profile, referer, self.config.max_attempts)
            .await
    }

    /// Fetches a URL with an explicit attempt budget
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 200 passing the classifier | Return the page |
    /// | 3xx with a `Location` header | Return the page with `redirect` set |
    /// | HTTP 404 / 410 | Immediate NotFound |
    /// | Block status, keyword, or short body | Count block, mark proxy, back off, retry |
    /// | Other status, timeout, connection error | Mark proxy, back off, retry |
    /// | `max_attempts` failures | Exhausted with attempt log |
    pub async fn fetch_with_attempts(
        &self,
        url: &Url,
        profile: &SiteProfile,
        referer: Option<&Url>,
        max_attempts: u32,
    ) -> Result<FetchedPage, FetchError> {
        let max_attempts = max_attempts.max(1);
        let host = extract_domain(url).unwrap_or_default();
        let mut state = FetchState::Idle;
        let mut attempts: Vec<FetchAttempt> = Vec::new();

        for index in 1..=max_attempts {
            // Step 1: Back off after a failed attempt
            let backoff_before = if index > 1 {
                state = state.transition(FetchState::Backoff)?;
                let delay = self.backoff.delay(index - 1, &mut rand::thread_rng());
                tracing::debug!("Backing off {:?} before attempt {} for {}", delay, index, url);
                tokio::time::sleep(delay).await;
                Some(delay)
            } else {
                None
            };
            state = state.transition(FetchState::Attempting)?;

            // Step 2: Pace the request
            if profile.uses_blocking_protection {
                self.protection_pause().await;
            }
            self.pacer.wait_turn(&host).await;

            // Step 3: Pick proxy, client and identity
            self.rotate_if_due();
            let proxy_index = self.proxies.next();
            let proxy = self
                .proxies
                .get(proxy_index)
                .and_then(|record| record.address.clone());
            let client = self.client_for(proxy_index);
            let identity = HeaderProfile::random(&mut rand::thread_rng());
            let referer = self.choose_referer(profile, referer);

            tracing::debug!(
                "Attempt {}/{} for {} via {} as {}",
                index,
                max_attempts,
                url,
                proxy.as_deref().unwrap_or("direct"),
                identity.label()
            );

            // Step 4: Send and classify
            self.counters.record_request();
            match self.attempt(&client, url, &identity, &referer).await {
                AttemptOutcome::Success { status, body } => {
                    state.transition(FetchState::Success)?;
                    return Ok(FetchedPage {
                        url: url.clone(),
                        redirect: None,
                        status,
                        body,
                        attempts: index,
                    });
                }
                AttemptOutcome::Redirect { status, location } => {
                    state.transition(FetchState::Success)?;
                    tracing::debug!("{} redirects ({}) to {}", url, status, location);
                    return Ok(FetchedPage {
                        url: url.clone(),
                        redirect: Some(location),
                        status,
                        body: String::new(),
                        attempts: index,
                    });
                }
                AttemptOutcome::NotFound { status } => {
                    state.transition(FetchState::NotFound)?;
                    tracing::debug!("{} returned {}, not retrying", url, status);
                    return Err(FetchError::NotFound {
                        url: url.to_string(),
                        status,
                    });
                }
                AttemptOutcome::Failed {
                    classification,
                    error,
                } => {
                    if classification == ResponseClassification::Blocked {
                        self.counters.record_block();
                        tracing::warn!("Blocked on attempt {} for {}: {}", index, url, error);
                        state = state.transition(FetchState::Blocked)?;
                    } else {
                        tracing::debug!("Attempt {} for {} failed: {}", index, url, error);
                        state = state.transition(FetchState::TransientError)?;
                    }

                    self.proxies.mark_failure(proxy_index);
                    attempts.push(FetchAttempt {
                        index,
                        proxy,
                        header_profile: identity.label(),
                        backoff_before,
                        outcome: error,
                    });
                }
            }
        }

        state.transition(FetchState::Exhausted)?;
        tracing::warn!("Giving up on {} after {} attempts", url, attempts.len());

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts,
        })
    }

    /// Fetches a URL and follows its redirect chain
    ///
    /// Used where only the landing content matters (site discovery). Each hop is a full
    /// logical fetch with its own attempt budget.
    ///
    /// # Returns
    ///
    /// * `Ok(FetchedPage)` - The first non-redirect page; its `url` is where the chain ended
    /// * `Err(FetchError::TooManyRedirects)` - The chain loops or exceeds `MAX_REDIRECTS`
    /// * `Err(FetchError)` - Any hop failed
    pub async fn fetch_following(
        &self,
        url: &Url,
        profile: &SiteProfile,
        referer: Option<&Url>,
    ) -> Result<FetchedPage, FetchError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut current = url.clone();

        loop {
            seen.insert(current.as_str().to_string());
            let page = self.fetch(&current, profile, referer).await?;

            let Some(next) = page.redirect else {
                return Ok(page);
            };

            if seen.len() > MAX_REDIRECTS || seen.contains(next.as_str()) {
                return Err(FetchError::TooManyRedirects {
                    url: url.to_string(),
                });
            }
            current = next;
        }
    }

    /// Sends one ranged GET (`bytes=0-1023`) without retries, following redirects
    ///
    /// # Returns
    ///
    /// * `Ok(u16)` - The status of the last response in the redirect chain
    /// * `Err(FetchError)` - Timeout, connection failure, or a redirect chain that is too long
    pub async fn probe_range(&self, url: &Url) -> Result<u16, FetchError> {
        let mut current = url.clone();

        for _ in 0..=MAX_REDIRECTS {
            if let Some(host) = extract_domain(&current) {
                self.pacer.wait_turn(&host).await;
            }

            let proxy_index = self.proxies.next();
            let client = self.client_for(proxy_index);
            let identity = HeaderProfile::random(&mut rand::thread_rng());
            let mut headers = identity.to_header_map(None);
            headers.insert(RANGE, HeaderValue::from_static("bytes=0-1023"));

            self.counters.record_request();
            let response = match client.get(current.clone()).headers(headers).send().await {
                Ok(response) => response,
                Err(e) => {
                    self.proxies.mark_failure(proxy_index);
                    return Err(transport_error(&current, &e));
                }
            };

            match redirect_target(&current, &response) {
                Some(next) => current = next,
                None => return Ok(response.status().as_u16()),
            }
        }

        Err(FetchError::TooManyRedirects {
            url: url.to_string(),
        })
    }

    /// Performs a single request and classifies the result
    async fn attempt(
        &self,
        client: &Client,
        url: &Url,
        identity: &HeaderProfile,
        referer: &str,
    ) -> AttemptOutcome {
        let request = client
            .get(url.clone())
            .headers(identity.to_header_map(Some(referer)));

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                return AttemptOutcome::Failed {
                    classification: ResponseClassification::TransientError,
                    error: transport_error(url, &e),
                }
            }
        };

        let status = response.status().as_u16();

        if let Some(location) = redirect_target(url, &response) {
            return AttemptOutcome::Redirect { status, location };
        }

        if status == 404 || status == 410 {
            return AttemptOutcome::NotFound { status };
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return AttemptOutcome::Failed {
                    classification: ResponseClassification::TransientError,
                    error: transport_error(url, &e),
                }
            }
        };

        match self.classifier.classify(status, &body) {
            ResponseClassification::Success => AttemptOutcome::Success { status, body },
            ResponseClassification::Blocked => AttemptOutcome::Failed {
                classification: ResponseClassification::Blocked,
                error: FetchError::Blocked {
                    url: url.to_string(),
                    status,
                },
            },
            ResponseClassification::TransientError | ResponseClassification::Exhausted => {
                AttemptOutcome::Failed {
                    classification: ResponseClassification::TransientError,
                    error: FetchError::UnexpectedStatus {
                        url: url.to_string(),
                        status,
                    },
                }
            }
        }
    }

    /// Chooses the referer: the embedding page, else the site's landing page, else a
    /// search-engine page
    fn choose_referer(&self, profile: &SiteProfile, referer: Option<&Url>) -> String {
        if let Some(referer) = referer {
            return referer.to_string();
        }

        if Url::parse(&profile.base_url).is_ok() {
            return profile.base_url.clone();
        }

        natural_referer(&mut rand::thread_rng()).to_string()
    }

    /// Sleeps a random share of the configured protection pause
    async fn protection_pause(&self) {
        let ceiling = self.config.protection_pause_ms;
        if ceiling == 0 {
            return;
        }

        let pause = {
            let mut rng = rand::thread_rng();
            Duration::from_millis(rng.gen_range(ceiling / 2..=ceiling))
        };
        tokio::time::sleep(pause).await;
    }

    /// Returns the client for a proxy pool member
    fn client_for(&self, proxy_index: usize) -> Client {
        let clients = self.clients.read();
        clients[proxy_index % clients.len()].clone()
    }

    /// Rebuilds every client (connection pools and cookie jars) every N attempts
    fn rotate_if_due(&self) {
        let total = self.attempts_total.fetch_add(1, Ordering::Relaxed) + 1;
        let every = self.config.rotate_client_every.max(1);
        if total % every != 0 {
            return;
        }

        match build_clients(&self.config, &self.proxies) {
            Ok(clients) => {
                *self.clients.write() = clients;
                self.rotations.fetch_add(1, Ordering::Relaxed);
                tracing::info!("Rotated HTTP clients after {} requests", total);
            }
            Err(e) => {
                tracing::warn!("Failed to rebuild HTTP clients, keeping current set: {}", e);
            }
        }
    }
}

/// Builds one client per proxy pool member, in pool order
fn build_clients(config: &FetchConfig, proxies: &ProxyPool) -> Result<Vec<Client>, reqwest::Error> {
    proxies
        .records()
        .iter()
        .map(|record| build_http_client(config, record.address.as_deref()))
        .collect()
}

/// Returns the target of a 3xx response, resolved against the requested URL
///
/// Responses without a `Location` header, or whose target is not HTTP(S), are not treated
/// as redirects and go through normal classification.
fn redirect_target(requested: &Url, response: &Response) -> Option<Url> {
    if !response.status().is_redirection() {
        return None;
    }

    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    let target = requested.join(location.trim()).ok()?;
    matches!(target.scheme(), "http" | "https").then_some(target)
}

/// Maps a transport-level reqwest error to a fetch error
fn transport_error(url: &Url, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::ConnectionFailed {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
