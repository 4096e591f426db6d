//! Stream candidate extraction
//!
//! Given the content of one page, the extractor runs seven independent passes (literal
//! URLs, player assignments, data attributes, player scripts, base64 payloads, media
//! elements and frames), resolves every match against the page URL, drops frames on denied
//! hosts and duplicates, and returns the candidates ranked by how directly they lead to a stream.

mod markers;
mod passes;

pub use markers::{has_manifest_marker, is_manifest_mime, media_kind};

use crate::config::FilterConfig;
use crate::url::{resolve_reference, unescape_slashes, url_matches_any};
use passes::{Origin, RawMatch};
use scraper::Html;
use std::collections::HashSet;
use std::fmt;
use url::Url;

/// Maximum number of candidates returned for one page
pub const MAX_CANDIDATES: usize = 10;

/// Kind of a stream candidate, declared in priority order (best first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CandidateKind {
    /// Adaptive-streaming master playlist
    ManifestMaster,
    /// Any other HLS/DASH manifest
    ManifestGeneric,
    /// A direct media file
    DirectMedia,
    /// A frame hosted by a known embed player
    KnownEmbedHost,
    /// Any other frame
    GenericIframe,
}

impl CandidateKind {
    /// Returns true for candidates a player can load directly
    pub fn is_playable(&self) -> bool {
        matches!(
            self,
            Self::ManifestMaster | Self::ManifestGeneric | Self::DirectMedia
        )
    }

    /// Returns true for candidates that must be fetched and extracted again
    pub fn is_frame(&self) -> bool {
        matches!(self, Self::KnownEmbedHost | Self::GenericIframe)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManifestMaster => "manifest_master",
            Self::ManifestGeneric => "manifest_generic",
            Self::DirectMedia => "direct_media",
            Self::KnownEmbedHost => "known_embed_host",
            Self::GenericIframe => "generic_iframe",
        }
    }
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved, classified candidate address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCandidate {
    /// Absolute URL with the fragment removed
    pub url: Url,
    pub kind: CandidateKind,
    /// Frame nesting depth of the page the candidate was found on
    pub discovery_depth: u32,
}

/// Multi-pass stream candidate extractor
#[derive(Debug, Clone)]
pub struct StreamExtractor {
    embed_hosts: Vec<String>,
    deny_hosts: Vec<String>,
    max_candidates: usize,
}

impl Default for StreamExtractor {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}

impl StreamExtractor {
    /// Creates an extractor using the configured host filters
    pub fn new(filters: &FilterConfig) -> Self {
        Self {
            embed_hosts: filters.embed_hosts.clone(),
            deny_hosts: filters.deny_hosts.clone(),
            max_candidates: MAX_CANDIDATES,
        }
    }

    /// Returns true if the URL's host is on the deny list
    ///
    /// Only frames are filtered; manifests and media files are kept wherever they are hosted.
    pub fn is_denied(&self, url: &Url) -> bool {
        url_matches_any(url, &self.deny_hosts)
    }

    /// Extracts candidates from a top-level page
    pub fn extract(&self, content: &str, base_url: &Url) -> Vec<ExtractedCandidate> {
        self.extract_at_depth(content, base_url, 0)
    }

    /// Extracts ranked stream candidates from page content
    ///
    /// # Steps
    ///
    /// 1. Unescape JSON-escaped slashes
    /// 2. Run every pass, collecting raw matches in discovery order
    /// 3. Resolve each match against `base_url` (fragments stripped, non-HTTP(S) dropped)
    /// 4. Classify, dropping frames on deny-listed hosts
    /// 5. Remove duplicates keeping the first occurrence
    /// 6. Stable sort by kind and truncate
    ///
    /// # Arguments
    ///
    /// * `content` - Page body
    /// * `base_url` - URL the content was served from
    /// * `depth` - Frame depth of the page, recorded on every candidate
    ///
    /// # Returns
    ///
    /// Up to ten candidates, best first. Never fails; an empty list means nothing was found.
    pub fn extract_at_depth(
        &self,
        content: &str,
        base_url: &Url,
        depth: u32,
    ) -> Vec<ExtractedCandidate> {
        let content = unescape_slashes(content);
        let document = Html::parse_document(&content);

        let mut raw: Vec<RawMatch> = Vec::new();
        passes::literal_pass(&content, &mut raw);
        passes::assignment_pass(&content, &mut raw);
        passes::data_attribute_pass(&document, &mut raw);
        passes::script_pass(&document, &mut raw);
        passes::base64_pass(&content, &mut raw);
        passes::media_element_pass(&document, &mut raw);
        passes::frame_pass(&document, &mut raw);

        let mut seen: HashSet<String> = HashSet::new();
        let mut candidates: Vec<ExtractedCandidate> = Vec::new();

        for m in raw {
            let Some(url) = resolve_reference(&m.raw, base_url) else {
                continue;
            };

            let Some(kind) = self.classify(&url, m.origin) else {
                continue;
            };

            if kind.is_frame() && self.is_denied(&url) {
                tracing::trace!("Dropping denied frame {}", url);
                continue;
            }

            if seen.insert(url.as_str().to_string()) {
                candidates.push(ExtractedCandidate {
                    url,
                    kind,
                    discovery_depth: depth,
                });
            }
        }

        candidates.sort_by_key(|c| c.kind);
        candidates.truncate(self.max_candidates);

        if candidates.is_empty() {
            tracing::debug!("No stream candidates on {}", base_url);
        } else {
            tracing::debug!("{} candidate(s) on {}", candidates.len(), base_url);
        }

        candidates
    }

    /// Assigns a kind to a resolved match, or None when it is not a candidate
    fn classify(&self, url: &Url, origin: Origin) -> Option<CandidateKind> {
        if let Some(kind) = media_kind(url) {
            return Some(kind);
        }

        match origin {
            Origin::MediaElement {
                declared_manifest: true,
            } => {
                if markers::is_master_stem(url) {
                    Some(CandidateKind::ManifestMaster)
                } else {
                    Some(CandidateKind::ManifestGeneric)
                }
            }
            Origin::MediaElement { .. } => Some(CandidateKind::DirectMedia),
            Origin::Frame => {
                if url_matches_any(url, &self.embed_hosts) {
                    Some(CandidateKind::KnownEmbedHost)
                } else {
                    Some(CandidateKind::GenericIframe)
                }
            }
            Origin::Text => None,
        }
    }
}
