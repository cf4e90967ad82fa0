//! Graph statistics.
//!
//! Pure aggregation over a snapshot of entries and links.

use crate::types::{Entry, EntryId, Link, LinkType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// How many entries `most_connected` reports
pub const MOST_CONNECTED_LIMIT: usize = 10;

/// An entry ranked by total degree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedEntry {
    pub id: EntryId,
    pub title: String,
    /// Incoming plus outgoing links.
    pub link_count: usize,
}

/// Summary of the link graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_entries: usize,
    pub total_links: usize,
    /// Distinct entries with at least one outgoing link.
    pub entries_with_links: usize,
    /// `total_entries - entries_with_links`.
    pub orphaned_entries: usize,
    /// Links per entry, rounded to two decimals. Zero for an empty store.
    pub avg_links_per_entry: f64,
    /// Top entries by degree, ties by id. Entries without links are omitted.
    pub most_connected: Vec<ConnectedEntry>,
    /// Link count per type. Types with no links are omitted.
    pub link_types: BTreeMap<LinkType, usize>,
}

impl GraphStats {
    pub fn compute(entries: &[Entry], links: &[Link]) -> Self {
        let total_entries = entries.len();
        let total_links = links.len();

        let sources: HashSet<EntryId> = links.iter().map(|l| l.from).collect();
        let entries_with_links = sources.len();

        let avg_links_per_entry = if total_entries > 0 {
            (total_links as f64 / total_entries as f64 * 100.0).round() / 100.0
        } else {
            0.0
        };

        let mut link_types: BTreeMap<LinkType, usize> = BTreeMap::new();
        for link in links {
            *link_types.entry(link.link_type).or_insert(0) += 1;
        }

        Self {
            total_entries,
            total_links,
            entries_with_links,
            orphaned_entries: total_entries.saturating_sub(entries_with_links),
            avg_links_per_entry,
            most_connected: most_connected(entries, links, MOST_CONNECTED_LIMIT),
            link_types,
        }
    }
}

/// Entries ranked by in + out degree, descending, ties by id
pub fn most_connected(entries: &[Entry], links: &[Link], limit: usize) -> Vec<ConnectedEntry> {
    let mut degrees: HashMap<EntryId, usize> = HashMap::new();
    for link in links {
        *degrees.entry(link.from).or_insert(0) += 1;
        *degrees.entry(link.to).or_insert(0) += 1;
    }

    let mut ranked: Vec<ConnectedEntry> = entries
        .iter()
        .filter_map(|e| {
            degrees.get(&e.id).map(|&link_count| ConnectedEntry {
                id: e.id,
                title: e.title.clone(),
                link_count,
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.link_count.cmp(&a.link_count).then_with(|| a.id.cmp(&b.id)));
    ranked.truncate(limit);
    ranked
}

/// Entries with no tags, no projects and no links in either direction.
/// Candidates for cleanup.
pub fn orphaned_entries(entries: &[Entry], links: &[Link]) -> Vec<Entry> {
    let linked: HashSet<EntryId> = links.iter().flat_map(|l| [l.from, l.to]).collect();

    entries
        .iter()
        .filter(|e| e.tags.is_empty() && e.projects.is_empty() && !linked.contains(&e.id))
        .cloned()
        .collect()
}
