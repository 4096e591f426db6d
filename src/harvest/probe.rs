//! Optional reachability check of resolved stream addresses

use crate::catalog::ChannelEntry;
use crate::fetch::FetchClient;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Checks whether stream addresses answer a ranged request
#[derive(Clone)]
pub struct VerificationProbe {
    fetcher: Arc<FetchClient>,
}

impl VerificationProbe {
    pub fn new(fetcher: Arc<FetchClient>) -> Self {
        Self { fetcher }
    }

    /// Probes one address with `Range: bytes=0-1023`
    ///
    /// # Returns
    ///
    /// `true` for 200 or 206; `false` for any other status, a transport failure, or an
    /// address that does not parse.
    pub async fn probe(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            tracing::debug!("Probe skipped unparsable address {}", url);
            return false;
        };

        match self.fetcher.probe_range(&parsed).await {
            Ok(status) => {
                tracing::debug!("Probe of {} returned {}", url, status);
                status == 200 || status == 206
            }
            Err(e) => {
                tracing::debug!("Probe of {} failed: {}", url, e);
                false
            }
        }
    }

    /// Probes every resolved entry and records the outcome in `verified`
    ///
    /// Unresolved entries are left untouched. At most `concurrency` probes run at once.
    pub async fn verify_entries(&self, entries: &mut [ChannelEntry], concurrency: usize) {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, entry) in entries.iter().enumerate() {
            let Some(url) = entry.resolved_url.clone() else {
                continue;
            };

            let probe = self.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (index, probe.probe(&url).await)
            });
        }

        let mut failed = 0usize;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, reachable)) => {
                    if !reachable {
                        failed += 1;
                    }
                    if let Some(entry) = entries.get_mut(index) {
                        entry.verified = Some(reachable);
                    }
                }
                Err(e) => tracing::warn!("Probe task failed: {}", e),
            }
        }

        if failed > 0 {
            tracing::info!("{} stream addresses failed verification", failed);
        }
    }
}
