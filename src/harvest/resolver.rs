//! Per-channel frame recursion
//!
//! A channel page rarely carries its stream address directly. More often it embeds a player
//! frame, which embeds another, and only the innermost page names the manifest. The resolver
//! walks that frame graph breadth-first, bounded by depth and guarded against cycles.

use crate::catalog::ChannelEntry;
use crate::config::{ChannelTarget, SiteProfile};
use crate::extract::{ExtractedCandidate, StreamExtractor};
use crate::fetch::{FetchClient, MAX_REDIRECTS};
use crate::url::parse_http_url;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use url::Url;

/// Number of alternative addresses kept next to the resolved one
const MAX_BACKUPS: usize = 2;

/// One page waiting to be fetched
#[derive(Debug, Clone)]
struct Hop {
    url: Url,
    depth: u32,
    referer: Option<Url>,
}

/// Resolves channel targets into channel entries
pub struct ChannelResolver {
    fetcher: Arc<FetchClient>,
    extractor: Arc<StreamExtractor>,
    max_depth: u32,
}

impl ChannelResolver {
    /// Creates a resolver
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Shared fetch client used for every hop
    /// * `extractor` - Candidate extractor
    /// * `max_depth` - Deepest frame level that is still fetched (the channel page is 0)
    pub fn new(fetcher: Arc<FetchClient>, extractor: Arc<StreamExtractor>, max_depth: u32) -> Self {
        Self {
            fetcher,
            extractor,
            max_depth,
        }
    }

    /// Resolves one channel
    ///
    /// # Process
    ///
    /// 1. Seed the frontier with the channel page at depth 0
    /// 2. Fetch the next page and extract candidates from it
    /// 3. If a playable candidate exists, adopt the best one (plus up to two backups) and stop
    /// 4. Otherwise enqueue unvisited frame candidates while below the depth bound
    ///
    /// A URL is marked visited when it is enqueued, so no page is fetched twice even when
    /// frames embed each other. Redirects go through the same check: a 3xx hop queues its
    /// target at the same depth, ahead of the rest of the frontier, unless it was already
    /// seen.
    ///
    /// # Returns
    ///
    /// The channel entry. Failures never surface as errors: an entry whose stream could not
    /// be found simply has no `resolved_url`.
    pub async fn resolve(&self, target: &ChannelTarget, profile: &SiteProfile) -> ChannelEntry {
        let mut entry = ChannelEntry::unresolved(target);

        let root = match parse_http_url(&target.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Skipping channel '{}': {}", target.name, e);
                return entry;
            }
        };

        let mut visited: HashSet<String> = HashSet::new();
        let mut redirects = 0usize;
        let mut frontier: VecDeque<Hop> = VecDeque::new();
        visited.insert(root.as_str().to_string());
        frontier.push_back(Hop {
            url: root,
            depth: 0,
            referer: None,
        });

        while let Some(hop) = frontier.pop_front() {
            // Step 1: Fetch
            let page = match self
                .fetcher
                .fetch(&hop.url, profile, hop.referer.as_ref())
                .await
            {
                Ok(page) => page,
                Err(e) if hop.depth == 0 => {
                    tracing::warn!("Channel page for '{}' failed: {}", target.name, e);
                    return entry;
                }
                Err(e) => {
                    tracing::debug!("Skipping frame {} at depth {}: {}", hop.url, hop.depth, e);
                    continue;
                }
            };

            // Step 2: Queue redirect targets in place of the hop
            if let Some(target_url) = page.redirect {
                if redirects >= MAX_REDIRECTS {
                    tracing::debug!("Redirect limit reached, not following {}", target_url);
                } else if visited.insert(target_url.as_str().to_string()) {
                    redirects += 1;
                    frontier.push_front(Hop {
                        url: target_url,
                        depth: hop.depth,
                        referer: hop.referer,
                    });
                } else {
                    tracing::debug!("{} redirects to visited {}", hop.url, target_url);
                }
                continue;
            }

            // Step 3: Extract
            let candidates = self
                .extractor
                .extract_at_depth(&page.body, &page.url, hop.depth);

            if candidates.is_empty() {
                tracing::debug!("No candidates on {}", page.url);
                continue;
            }

            // Step 4: Early exit on a playable candidate
            if let Some((resolved, backups)) = pick_playable(&candidates) {
                tracing::info!(
                    "Resolved '{}' at depth {}: {}",
                    target.name,
                    hop.depth,
                    resolved
                );
                entry.resolved_url = Some(resolved);
                entry.backup_urls = backups;
                return entry;
            }

            // Step 5: Follow frames
            for candidate in candidates.iter().filter(|c| c.kind.is_frame()) {
                if visited.contains(candidate.url.as_str()) {
                    continue;
                }

                if hop.depth >= self.max_depth {
                    tracing::debug!(
                        "Recursion depth {} reached, not following {}",
                        self.max_depth,
                        candidate.url
                    );
                    continue;
                }

                visited.insert(candidate.url.as_str().to_string());
                frontier.push_back(Hop {
                    url: candidate.url.clone(),
                    depth: hop.depth + 1,
                    referer: Some(page.url.clone()),
                });
            }
        }

        tracing::info!("No stream found for '{}'", target.name);
        entry
    }
}

/// Picks the resolved address and backups from ranked candidates
fn pick_playable(candidates: &[ExtractedCandidate]) -> Option<(String, Vec<String>)> {
    let mut playable = candidates
        .iter()
        .filter(|c| c.kind.is_playable())
        .map(|c| c.url.to_string());

    let resolved = playable.next()?;
    let backups = playable.take(MAX_BACKUPS).collect();
    Some((resolved, backups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::CandidateKind;

    fn candidate(url: &str, kind: CandidateKind) -> ExtractedCandidate {
        ExtractedCandidate {
            url: Url::parse(url).unwrap(),
            kind,
            discovery_depth: 0,
        }
    }

    #[test]
    fn test_pick_playable_takes_best_and_two_backups() {
        let candidates = vec![
            candidate("https://cdn.example.com/master.m3u8", CandidateKind::ManifestMaster),
            candidate("https://cdn.example.com/a.m3u8", CandidateKind::ManifestGeneric),
            candidate("https://cdn.example.com/b.mpd", CandidateKind::ManifestGeneric),
            candidate("https://cdn.example.com/c.mp4", CandidateKind::DirectMedia),
            candidate("https://player.example.com/embed", CandidateKind::GenericIframe),
        ];

        let (resolved, backups) = pick_playable(&candidates).unwrap();
        assert_eq!(resolved, "https://cdn.example.com/master.m3u8");
        assert_eq!(
            backups,
            vec![
                "https://cdn.example.com/a.m3u8".to_string(),
                "https://cdn.example.com/b.mpd".to_string(),
            ]
        );
    }

    #[test]
    fn test_pick_playable_ignores_frames() {
        let candidates = vec![
            candidate("https://dood.example.com/e/1", CandidateKind::KnownEmbedHost),
            candidate("https://player.example.com/embed", CandidateKind::GenericIframe),
        ];

        assert!(pick_playable(&candidates).is_none());
    }

    #[test]
    fn test_pick_playable_without_backups() {
        let candidates = vec![candidate(
            "https://cdn.example.com/live.mp4",
            CandidateKind::DirectMedia,
        )];

        let (resolved, backups) = pick_playable(&candidates).unwrap();
        assert_eq!(resolved, "https://cdn.example.com/live.mp4");
        assert!(backups.is_empty());
    }
}
