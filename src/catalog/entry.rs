use crate::config::ChannelTarget;

/// One channel as discovered by a harvest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEntry {
    /// Channel name (the listed name until the catalog normalizes it)
    pub canonical_name: String,

    /// Name of the site profile the channel page belongs to
    pub source_site: String,

    /// Channel page the address was discovered from
    pub page_url: String,

    /// Best stream address found, if any
    pub resolved_url: Option<String>,

    /// Up to two further playable addresses from the same page
    pub backup_urls: Vec<String>,

    /// Shared by entries that carry the same channel from different streams
    pub duplicate_group: Option<String>,

    /// Result of the verification probe, None when not probed
    pub verified: Option<bool>,
}

impl ChannelEntry {
    /// Creates an entry for a target whose stream has not been found
    pub fn unresolved(target: &ChannelTarget) -> Self {
        Self {
            canonical_name: target.name.clone(),
            source_site: target.site.clone(),
            page_url: target.url.clone(),
            resolved_url: None,
            backup_urls: Vec::new(),
            duplicate_group: None,
            verified: None,
        }
    }

    /// Returns true if a stream address was found
    pub fn is_resolved(&self) -> bool {
        self.resolved_url.is_some()
    }

    /// Returns true if the entry should be offered to players
    ///
    /// Entries that failed verification are withheld; unverified ones are kept.
    pub fn is_playable(&self) -> bool {
        self.is_resolved() && self.verified != Some(false)
    }
}
