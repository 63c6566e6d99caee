//! Cluster-to-IPA mapping for pseudo-phones from unsupervised discovery.
//!
//! Lookups walk the language's fallback chain, then the global partition,
//! then (when the token carries a feature estimate) the whole inventory.
//! Anything that still does not match within the distance threshold maps to
//! the placeholder with the maximum penalty.

pub mod service;
pub mod store;
pub mod table;

pub use service::MappingService;
pub use store::{JsonFileStore, MappingStore, MemoryStore};
pub use table::{Label, MappingTable};

use crate::defaults::GLOBAL_PARTITION;
use crate::error::Result;
use crate::language;
use crate::registry::features::FeatureVector;
use crate::registry::{Notation, Resolved, SymbolRegistry};
use std::sync::Arc;

/// Source reported when a cluster matched the inventory directly.
pub const INVENTORY_SOURCE: &str = "inventory";

/// Source reported when a cluster fell back to the placeholder.
pub const NO_MATCH: &str = "none";

/// Result of mapping one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterMatch {
    pub resolved: Resolved,
    /// Mapping uncertainty in `[0, 1]`, separate from acoustic confidence.
    pub penalty: f32,
    /// Partition (or source) that produced the match.
    pub partition: String,
}

#[derive(Debug, Clone)]
pub struct ClusterMapper {
    registry: Arc<SymbolRegistry>,
    service: Arc<MappingService>,
}

impl ClusterMapper {
    pub fn new(registry: Arc<SymbolRegistry>, service: Arc<MappingService>) -> Self {
        Self { registry, service }
    }

    pub fn service(&self) -> &Arc<MappingService> {
        &self.service
    }

    /// Partitions consulted for a normalized language, in order.
    pub fn partitions(language: &str) -> Vec<String> {
        let mut chain = language::fallback_chain(language);
        chain.push(GLOBAL_PARTITION.to_string());
        chain
    }

    /// Partition a relabel for `language` writes to.
    pub fn write_partition(language: &str) -> String {
        if language::is_unknown(language) {
            GLOBAL_PARTITION.to_string()
        } else {
            language.to_string()
        }
    }

    /// Best symbol for a cluster in a language.
    pub fn map(
        &self,
        cluster_id: &str,
        language: &str,
        hint: Option<&FeatureVector>,
        distance_threshold: f32,
    ) -> ClusterMatch {
        for partition in Self::partitions(language) {
            let labels = self.service.labels(&partition, cluster_id);
            if labels.is_empty() {
                continue;
            }
            if let Some(found) = self.match_labels(&labels, hint, distance_threshold) {
                return ClusterMatch {
                    resolved: found.0,
                    penalty: found.1,
                    partition,
                };
            }
        }

        if let Some(target) = hint
            && let Some((entry, distance)) = self.registry.nearest_known(target)
            && distance <= distance_threshold
            && let Ok(resolved) = self.registry.resolve(&entry.glyph, Some(Notation::Ipa))
        {
            return ClusterMatch {
                resolved,
                penalty: distance,
                partition: INVENTORY_SOURCE.to_string(),
            };
        }

        ClusterMatch {
            resolved: self.placeholder(),
            penalty: 1.0,
            partition: NO_MATCH.to_string(),
        }
    }

    /// Assign `symbol` to a cluster for a language.
    ///
    /// The symbol is validated against the registry first. Persistence
    /// failures are returned after the in-memory table has been updated.
    pub fn relabel(
        &self,
        cluster_id: &str,
        language: &str,
        symbol: &str,
        notation: Option<Notation>,
    ) -> Result<Resolved> {
        let resolved = self.registry.resolve(symbol, notation)?;
        let language = language::normalize(Some(language));
        let partition = Self::write_partition(&language);
        self.service
            .relabel(&partition, cluster_id, &resolved.text())?;
        Ok(resolved)
    }

    fn match_labels(
        &self,
        labels: &[Label],
        hint: Option<&FeatureVector>,
        distance_threshold: f32,
    ) -> Option<(Resolved, f32)> {
        let total: u32 = labels.iter().map(|l| l.votes).sum();
        let resolved: Vec<(Resolved, u32)> = labels
            .iter()
            .filter_map(|label| match self.registry.resolve(&label.glyph, Some(Notation::Ipa)) {
                Ok(resolved) => Some((resolved, label.votes)),
                Err(e) => {
                    tracing::warn!("Ignoring stored label: {e}");
                    None
                }
            })
            .collect();

        let Some(target) = hint else {
            let (first, votes) = resolved.into_iter().next()?;
            let penalty = if total == 0 {
                1.0
            } else {
                1.0 - votes as f32 / total as f32
            };
            return Some((first, penalty));
        };

        let mut best: Option<(Resolved, f32)> = None;
        for (candidate, _) in resolved {
            let Some(vector) = self
                .registry
                .features_of(&candidate.glyph, &candidate.diacritics)
                .vector()
            else {
                continue;
            };
            let distance = target.distance(&vector);
            if best.as_ref().is_none_or(|(_, d)| distance < *d) {
                best = Some((candidate, distance));
            }
        }
        best.filter(|(_, distance)| *distance <= distance_threshold)
    }

    fn placeholder(&self) -> Resolved {
        Resolved {
            glyph: self.registry.placeholder().glyph.clone(),
            diacritics: Vec::new(),
            long: false,
            placeholder: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IpaError;
    use crate::registry::features::{FEATURE_DIMS, Features, Manner, Place};

    fn mapper() -> ClusterMapper {
        ClusterMapper::new(
            Arc::new(SymbolRegistry::builtin().unwrap()),
            Arc::new(MappingService::in_memory()),
        )
    }

    fn t_vector() -> FeatureVector {
        Features::consonant(Place::Alveolar, Manner::Plosive, false)
            .vector()
            .unwrap()
    }

    #[test]
    fn test_unmapped_cluster_without_hint_is_placeholder() {
        let found = mapper().map("C17", "tlh", None, 0.25);
        assert!(found.resolved.placeholder);
        assert_eq!(found.penalty, 1.0);
        assert_eq!(found.partition, NO_MATCH);
    }

    #[test]
    fn test_distant_hint_is_placeholder() {
        let hint = FeatureVector([0.5; FEATURE_DIMS]);
        let found = mapper().map("C17", "tlh", Some(&hint), 0.1);
        assert!(found.resolved.placeholder);
        assert_eq!(found.penalty, 1.0);
    }

    #[test]
    fn test_close_hint_matches_inventory() {
        let found = mapper().map("C17", "tlh", Some(&t_vector()), 0.25);
        assert_eq!(found.resolved.glyph, "t");
        assert_eq!(found.penalty, 0.0);
        assert_eq!(found.partition, INVENTORY_SOURCE);
    }

    #[test]
    fn test_relabel_scoped_to_language() {
        let mapper = mapper();
        mapper.relabel("C17", "tlh", "t", None).unwrap();

        let found = mapper.map("C17", "tlh", None, 0.25);
        assert_eq!(found.resolved.glyph, "t");
        assert_eq!(found.penalty, 0.0);
        assert_eq!(found.partition, "tlh");

        assert!(mapper.map("C17", "en", None, 0.25).resolved.placeholder);
    }

    #[test]
    fn test_global_partition_is_fallback() {
        let mapper = mapper();
        mapper.relabel("C5", "unknown", "s", None).unwrap();

        let found = mapper.map("C5", "en", None, 0.25);
        assert_eq!(found.resolved.glyph, "s");
        assert_eq!(found.partition, GLOBAL_PARTITION);
    }

    #[test]
    fn test_region_falls_back_to_base_language() {
        let mapper = mapper();
        mapper.relabel("C9", "pt", "ɾ", None).unwrap();
        assert_eq!(mapper.map("C9", "pt-br", None, 0.25).partition, "pt");
    }

    #[test]
    fn test_split_votes_give_penalty() {
        let mapper = mapper();
        mapper.relabel("C2", "en", "d", None).unwrap();
        mapper.relabel("C2", "en", "t", None).unwrap();

        let found = mapper.map("C2", "en", None, 0.25);
        assert_eq!(found.resolved.glyph, "t");
        assert!((found.penalty - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_hint_picks_nearest_label() {
        let mapper = mapper();
        mapper.relabel("C2", "en", "t", None).unwrap();
        mapper.relabel("C2", "en", "a", None).unwrap();

        let found = mapper.map("C2", "en", Some(&t_vector()), 0.25);
        assert_eq!(found.resolved.glyph, "t");
        assert_eq!(found.penalty, 0.0);
    }

    #[test]
    fn test_relabel_accepts_other_notations() {
        let mapper = mapper();
        let resolved = mapper
            .relabel("C4", "en", "SH", Some(Notation::Arpabet))
            .unwrap();
        assert_eq!(resolved.glyph, "ʃ");
        assert_eq!(mapper.map("C4", "en", None, 0.25).resolved.glyph, "ʃ");
    }

    #[test]
    fn test_relabel_rejects_unknown_symbol() {
        let error = mapper().relabel("C4", "en", "☃", None).unwrap_err();
        assert!(matches!(error, IpaError::UnknownSymbol { .. }));
    }
}
