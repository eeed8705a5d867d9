//! Site-map grouping of HTTP entries.
//!
//! Entries group by host, then by path segment into a tree; each node records the ids
//! of the entries terminating there. Hosts and segments are sorted, so the same history
//! always yields the same map.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::http::HttpEntry;

/// One node of a host's path tree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SiteMapNode {
    /// Path segment this node represents; empty for a host root
    pub segment: String,
    /// Ids of entries whose path ends at this node
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entry_ids: Vec<u64>,
    /// Child segments, sorted
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SiteMapNode>,
}

/// A host and its path tree.
#[derive(Debug, Clone, Serialize)]
pub struct SiteMapHost {
    /// The host header value, without port
    pub host: String,
    /// Number of entries under this host
    pub entry_count: usize,
    /// Root of the path tree
    pub root: SiteMapNode,
}

/// The whole site map, hosts sorted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SiteMap {
    /// All hosts seen in the history
    pub hosts: Vec<SiteMapHost>,
}

#[derive(Default)]
struct TreeBuilder {
    entry_ids: Vec<u64>,
    children: BTreeMap<String, TreeBuilder>,
}

impl TreeBuilder {
    fn insert(&mut self, segments: &[&str], id: u64) {
        match segments.split_first() {
            None => self.entry_ids.push(id),
            Some((first, rest)) => self
                .children
                .entry((*first).to_string())
                .or_default()
                .insert(rest, id),
        }
    }

    fn into_node(self, segment: String) -> SiteMapNode {
        SiteMapNode {
            segment,
            entry_ids: self.entry_ids,
            children: self
                .children
                .into_iter()
                .map(|(segment, child)| child.into_node(segment))
                .collect(),
        }
    }
}

/// Groups entries by host, then path segments.
///
/// Entries without a host are skipped; they carry nothing to group under.
#[must_use]
pub fn build_site_map(entries: &[HttpEntry]) -> SiteMap {
    let mut hosts: BTreeMap<String, (usize, TreeBuilder)> = BTreeMap::new();

    for entry in entries {
        if entry.host.is_empty() {
            continue;
        }

        let (count, tree) = hosts.entry(entry.host.clone()).or_default();
        *count += 1;

        let segments: Vec<&str> = entry
            .path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();
        tree.insert(&segments, entry.id);
    }

    SiteMap {
        hosts: hosts
            .into_iter()
            .map(|(host, (entry_count, tree))| SiteMapHost {
                host,
                entry_count,
                root: tree.into_node(String::new()),
            })
            .collect(),
    }
}
