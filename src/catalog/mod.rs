//! Channel catalog
//!
//! This module turns the noisy per-page results of a harvest into a clean channel list:
//! names are normalized, entries for the same channel are merged, and channels that are
//! carried by several distinct streams are kept as numbered options of one group.

mod entry;
mod names;

pub use entry::ChannelEntry;
pub use names::{name_key, normalize_name};

use std::collections::HashMap;

/// One channel offered by several distinct streams
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// Canonical name shared by the options
    pub canonical_name: String,

    /// Group identifier stored on every member entry
    pub group_id: String,

    /// The distinct stream addresses, in option order
    pub urls: Vec<String>,
}

/// The deduplicated result of a harvest
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Entries sorted by canonical name, then source site
    pub unique: Vec<ChannelEntry>,

    /// Channels that appear with more than one stream
    pub duplicates: Vec<DuplicateGroup>,
}

impl Catalog {
    /// Returns the number of entries with a stream address
    pub fn resolved_count(&self) -> usize {
        self.unique.iter().filter(|e| e.is_resolved()).count()
    }

    pub fn len(&self) -> usize {
        self.unique.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unique.is_empty()
    }
}

/// Normalizes names and resolves duplicates across all entries of a run
///
/// # Rules
///
/// Entries are grouped by the key of their normalized name. Within a group:
/// - entries sharing a stream address (or all lacking one) collapse into the first;
/// - distinct addresses are all kept, suffixed `(Option 1)`, `(Option 2)`, ... in input
///   order and tagged with the group key;
/// - unresolved entries are dropped when the group has a resolved one.
///
/// # Arguments
///
/// * `entries` - Raw entries in target order
///
/// # Returns
///
/// A catalog whose entries are sorted by name then site, independent of worker timing.
pub fn resolve(entries: Vec<ChannelEntry>) -> Catalog {
    // Step 1: Normalize names and group by key, keeping first-appearance order
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<ChannelEntry>> = HashMap::new();

    for mut entry in entries {
        entry.canonical_name = normalize_name(&entry.canonical_name);
        let key = name_key(&entry.canonical_name);

        groups
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(entry);
    }

    // Step 2: Resolve each group
    let mut sortable: Vec<(String, usize, ChannelEntry)> = Vec::new();
    let mut duplicates: Vec<DuplicateGroup> = Vec::new();

    for key in order {
        let Some(members) = groups.remove(&key) else {
            continue;
        };

        let mut resolved: Vec<ChannelEntry> = Vec::new();
        let mut first_unresolved: Option<ChannelEntry> = None;

        for entry in members {
            let already_kept = entry.resolved_url.as_ref().map(|url| {
                resolved
                    .iter()
                    .any(|kept| kept.resolved_url.as_ref() == Some(url))
            });

            match already_kept {
                Some(true) => {}
                Some(false) => resolved.push(entry),
                None => {
                    if first_unresolved.is_none() {
                        first_unresolved = Some(entry);
                    }
                }
            }
        }

        match resolved.len() {
            0 => {
                if let Some(entry) = first_unresolved {
                    sortable.push((entry.canonical_name.clone(), 0, entry));
                }
            }
            1 => {
                if first_unresolved.is_some() {
                    tracing::debug!("Dropping unresolved duplicate of '{}'", key);
                }
                let entry = resolved.remove(0);
                sortable.push((entry.canonical_name.clone(), 0, entry));
            }
            _ => {
                let base_name = resolved[0].canonical_name.clone();
                let urls: Vec<String> = resolved
                    .iter()
                    .filter_map(|e| e.resolved_url.clone())
                    .collect();

                tracing::info!("'{}' has {} distinct streams", base_name, urls.len());

                for (index, mut entry) in resolved.into_iter().enumerate() {
                    entry.canonical_name = format!("{} (Option {})", base_name, index + 1);
                    entry.duplicate_group = Some(key.clone());
                    sortable.push((base_name.clone(), index + 1, entry));
                }

                duplicates.push(DuplicateGroup {
                    canonical_name: base_name,
                    group_id: key.clone(),
                    urls,
                });
            }
        }
    }

    // Step 3: Deterministic order
    sortable.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then(a.1.cmp(&b.1))
            .then_with(|| a.2.source_site.cmp(&b.2.source_site))
    });
    duplicates.sort_by(|a, b| a.canonical_name.cmp(&b.canonical_name));

    Catalog {
        unique: sortable.into_iter().map(|(_, _, entry)| entry).collect(),
        duplicates,
    }
}
