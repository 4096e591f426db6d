//! Harvest coordinator - run orchestration
//!
//! This module drives one harvest run:
//! - Pairing every channel target with its site profile
//! - Running channel pipelines on a bounded pool of workers
//! - Re-ordering the results and building the catalog
//! - Optionally verifying the resolved addresses
//! - Summarizing the run

use super::discovery::discover_site;
use super::probe::VerificationProbe;
use super::resolver::ChannelResolver;
use crate::catalog::{self, Catalog, ChannelEntry};
use crate::config::{ChannelTarget, Config, SiteProfile};
use crate::extract::StreamExtractor;
use crate::fetch::FetchClient;
use crate::output::RunSummary;
use crate::state::RunCounters;
use crate::{HarvestError, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct HarvestOutcome {
    /// One entry per processed target, in target order, names as listed
    pub entries: Vec<ChannelEntry>,

    /// Normalized, deduplicated catalog
    pub catalog: Catalog,

    /// Counts of the run
    pub summary: RunSummary,
}

/// Main harvest coordinator
pub struct Harvester {
    config: Arc<Config>,
    fetcher: Arc<FetchClient>,
    resolver: Arc<ChannelResolver>,
    probe: VerificationProbe,
    counters: Arc<RunCounters>,
}

impl Harvester {
    /// Creates a harvester from a validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Ready to run
    /// * `Err(HarvestError)` - An HTTP client could not be built (e.g. a malformed proxy)
    pub fn new(config: Config) -> Result<Self> {
        let counters = Arc::new(RunCounters::new());
        let fetcher = Arc::new(FetchClient::new(&config.fetch, counters.clone())?);
        Ok(Self::with_fetcher(config, fetcher))
    }

    /// Creates a harvester around an existing fetch client
    ///
    /// The run counters are taken from the fetch client.
    pub fn with_fetcher(config: Config, fetcher: Arc<FetchClient>) -> Self {
        let extractor = Arc::new(StreamExtractor::new(&config.filters));
        let resolver = Arc::new(ChannelResolver::new(
            fetcher.clone(),
            extractor,
            config.harvester.max_depth,
        ));

        Self {
            counters: fetcher.counters().clone(),
            probe: VerificationProbe::new(fetcher.clone()),
            config: Arc::new(config),
            fetcher,
            resolver,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn counters(&self) -> &Arc<RunCounters> {
        &self.counters
    }

    /// Discovers channel targets on every configured site
    ///
    /// A site whose landing page cannot be fetched is logged and skipped. Targets are
    /// deduplicated by URL across sites.
    pub async fn discover(&self) -> Vec<ChannelTarget> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut targets: Vec<ChannelTarget> = Vec::new();

        for profile in &self.config.sites {
            match discover_site(&self.fetcher, profile).await {
                Ok(found) => {
                    for target in found {
                        if seen.insert(target.url.clone()) {
                            targets.push(target);
                        }
                    }
                }
                Err(e) => tracing::warn!("Discovery failed for {}: {}", profile.name, e),
            }
        }

        targets
    }

    /// Runs the harvest over a list of targets
    ///
    /// # Process
    ///
    /// 1. Look up the site profile of every target
    /// 2. Spawn `min(workers, targets)` workers pulling target indices from a shared cursor
    /// 3. Collect the entries and restore target order
    /// 4. Build the catalog and, if configured, verify its addresses
    /// 5. Summarize
    ///
    /// Cancellation is checked before each target is taken; entries already produced are
    /// kept and the summary is marked as cancelled.
    ///
    /// # Returns
    ///
    /// * `Ok(HarvestOutcome)` - The run completed (possibly cancelled early)
    /// * `Err(HarvestError::MissingSiteProfile)` - A target names an unknown site
    pub async fn run(
        &self,
        targets: Vec<ChannelTarget>,
        cancel: CancellationToken,
    ) -> Result<HarvestOutcome> {
        // Step 1: Pair targets with profiles
        let jobs = Arc::new(self.prepare_jobs(targets)?);
        let total = jobs.len();

        tracing::info!(
            "Starting harvest of {} channels across {} sites",
            total,
            self.config.sites.len()
        );

        // Step 2: Worker pool
        let cursor = Arc::new(AtomicUsize::new(0));
        let results: Arc<Mutex<Vec<(usize, ChannelEntry)>>> =
            Arc::new(Mutex::new(Vec::with_capacity(total)));
        let workers = self.config.harvester.workers.max(1).min(total.max(1));

        let mut pool = JoinSet::new();
        for worker_id in 0..workers {
            let jobs = jobs.clone();
            let cursor = cursor.clone();
            let results = results.clone();
            let resolver = self.resolver.clone();
            let cancel = cancel.clone();

            pool.spawn(async move {
                loop {
                    if cancel.is_cancelled() {
                        tracing::debug!("Worker {} stopping on cancellation", worker_id);
                        break;
                    }

                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some((target, profile)) = jobs.get(index) else {
                        break;
                    };

                    let entry = resolver.resolve(target, profile).await;
                    let done = {
                        let mut results = results.lock();
                        results.push((index, entry));
                        results.len()
                    };

                    if done % 10 == 0 {
                        tracing::info!("Progress: {}/{} channels processed", done, total);
                    }
                }
            });
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Harvest worker failed: {}", e);
            }
        }

        // Step 3: Restore target order
        let mut indexed = std::mem::take(&mut *results.lock());
        indexed.sort_by_key(|(index, _)| *index);
        let entries: Vec<ChannelEntry> = indexed.into_iter().map(|(_, entry)| entry).collect();
        let cancelled = entries.len() < total;

        if cancelled {
            tracing::warn!(
                "Harvest cancelled after {} of {} channels",
                entries.len(),
                total
            );
        }

        // Step 4: Catalog and verification
        let mut catalog = catalog::resolve(entries.clone());
        if self.config.harvester.verify_streams && !cancel.is_cancelled() {
            tracing::info!("Verifying {} stream addresses", catalog.resolved_count());
            self.probe
                .verify_entries(&mut catalog.unique, self.config.harvester.workers)
                .await;
        }

        // Step 5: Summary
        let summary = RunSummary {
            request_count: self.counters.request_count(),
            blocked_count: self.counters.blocked_count(),
            channels_attempted: entries.len() as u64,
            channels_resolved: entries.iter().filter(|e| e.is_resolved()).count() as u64,
            duplicate_groups: catalog.duplicates.len() as u64,
            cancelled,
        };

        tracing::info!(
            "Harvest finished: {}/{} channels resolved, {} requests, {} blocked",
            summary.channels_resolved,
            summary.channels_attempted,
            summary.request_count,
            summary.blocked_count
        );

        Ok(HarvestOutcome {
            entries,
            catalog,
            summary,
        })
    }

    /// Pairs targets with their site profiles
    fn prepare_jobs(&self, targets: Vec<ChannelTarget>) -> Result<Vec<(ChannelTarget, SiteProfile)>> {
        let mut jobs = Vec::with_capacity(targets.len());
        let mut warned: HashSet<String> = HashSet::new();

        for target in targets {
            let profile = self.config.site(&target.site).cloned().ok_or_else(|| {
                HarvestError::MissingSiteProfile {
                    channel: target.name.clone(),
                    site: target.site.clone(),
                }
            })?;

            if profile.needs_scripted_rendering && warned.insert(profile.name.clone()) {
                tracing::warn!(
                    "Site {} needs scripted rendering; only static extraction is attempted",
                    profile.name
                );
            }

            jobs.push((target, profile));
        }

        Ok(jobs)
    }
}
