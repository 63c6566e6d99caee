//! Cluster labels for one language partition.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One human-assigned label for a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Canonical IPA text (base glyph plus diacritics).
    pub glyph: String,
    pub votes: u32,
}

/// Cluster id to labels, most recent relabel first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingTable {
    #[serde(default)]
    pub clusters: BTreeMap<String, Vec<Label>>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self, cluster_id: &str) -> &[Label] {
        self.clusters
            .get(cluster_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Most recently assigned label.
    pub fn primary(&self, cluster_id: &str) -> Option<&Label> {
        self.labels(cluster_id).first()
    }

    pub fn total_votes(&self, cluster_id: &str) -> u32 {
        self.labels(cluster_id).iter().map(|l| l.votes).sum()
    }

    /// Record a label for a cluster and make it the primary one.
    ///
    /// Returns the label's vote count after the update.
    pub fn relabel(&mut self, cluster_id: &str, glyph: &str) -> u32 {
        let labels = self.clusters.entry(cluster_id.to_string()).or_default();
        let mut label = match labels.iter().position(|l| l.glyph == glyph) {
            Some(index) => labels.remove(index),
            None => Label {
                glyph: glyph.to_string(),
                votes: 0,
            },
        };
        label.votes = label.votes.saturating_add(1);
        let votes = label.votes;
        labels.insert(0, label);
        votes
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}
