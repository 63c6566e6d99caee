//! Shared, relabelable mapping tables partitioned by language.
//!
//! Each language partition sits behind its own `RwLock`: a relabel holds the
//! write lock for update and persistence, so concurrent lookups observe either
//! the old or the new label list, never a partial one.

use super::store::{MappingStore, MemoryStore};
use super::table::{Label, MappingTable};
use crate::error::Result;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

type Partition = Arc<RwLock<MappingTable>>;

pub struct MappingService {
    store: Box<dyn MappingStore>,
    partitions: RwLock<HashMap<String, Partition>>,
}

impl std::fmt::Debug for MappingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingService")
            .field("store", &self.store.name())
            .field("partitions", &self.loaded_partitions())
            .finish()
    }
}

impl MappingService {
    pub fn new(store: Box<dyn MappingStore>) -> Self {
        Self {
            store,
            partitions: RwLock::new(HashMap::new()),
        }
    }

    /// Service with no durable storage.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    /// Labels of a cluster in one partition, as of now.
    pub fn labels(&self, partition: &str, cluster_id: &str) -> Vec<Label> {
        let table = self.partition(partition);
        let guard = table.read().unwrap_or_else(PoisonError::into_inner);
        guard.labels(cluster_id).to_vec()
    }

    /// Copy of a whole partition.
    pub fn snapshot(&self, partition: &str) -> MappingTable {
        let table = self.partition(partition);
        let guard = table.read().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    /// Record `glyph` as the primary label of a cluster and persist the partition.
    ///
    /// The in-memory update stays in effect when persistence fails; the
    /// `MappingPersistenceFailure` is returned so the caller can retry.
    pub fn relabel(&self, partition: &str, cluster_id: &str, glyph: &str) -> Result<u32> {
        let table = self.partition(partition);
        let mut guard = table.write().unwrap_or_else(PoisonError::into_inner);
        let votes = guard.relabel(cluster_id, glyph);
        tracing::info!(
            "Relabeled {cluster_id} -> {glyph} in '{partition}' ({votes} vote{})",
            if votes == 1 { "" } else { "s" }
        );
        if let Err(e) = self.store.save(partition, &guard) {
            tracing::warn!("Mapping for '{partition}' not persisted: {e}");
            return Err(e);
        }
        Ok(votes)
    }

    /// Partitions loaded so far, sorted.
    pub fn loaded_partitions(&self) -> Vec<String> {
        let partitions = self
            .partitions
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = partitions.keys().cloned().collect();
        names.sort();
        names
    }

    fn partition(&self, name: &str) -> Partition {
        {
            let partitions = self
                .partitions
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(table) = partitions.get(name) {
                return Arc::clone(table);
            }
        }

        let mut partitions = self
            .partitions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let table = partitions
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(self.load_partition(name))));
        Arc::clone(table)
    }

    fn load_partition(&self, name: &str) -> MappingTable {
        match self.store.load(name) {
            Ok(Some(table)) => {
                tracing::debug!(
                    "Loaded mapping partition '{name}' ({} clusters) from {} store",
                    table.len(),
                    self.store.name()
                );
                table
            }
            Ok(None) => MappingTable::new(),
            Err(e) => {
                tracing::warn!("Mapping partition '{name}' could not be loaded, starting empty: {e}");
                MappingTable::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IpaError;
    use std::sync::Arc;
    use std::thread;

    /// Store shared between the service and the test.
    struct SharedStore(Arc<MemoryStore>);

    impl MappingStore for SharedStore {
        fn load(&self, partition: &str) -> Result<Option<MappingTable>> {
            self.0.load(partition)
        }

        fn save(&self, partition: &str, table: &MappingTable) -> Result<()> {
            self.0.save(partition, table)
        }

        fn name(&self) -> &'static str {
            "shared"
        }
    }

    #[test]
    fn test_relabel_visible_to_next_lookup() {
        let service = MappingService::in_memory();
        assert!(service.labels("tlh", "C17").is_empty());

        service.relabel("tlh", "C17", "t").unwrap();

        assert_eq!(service.labels("tlh", "C17")[0].glyph, "t");
        assert!(service.labels("en", "C17").is_empty());
    }

    #[test]
    fn test_relabel_persists_partition() {
        let store = Arc::new(MemoryStore::new());
        let service = MappingService::new(Box::new(SharedStore(Arc::clone(&store))));

        service.relabel("tlh", "C17", "t").unwrap();

        let saved = store.saved("tlh").unwrap();
        assert_eq!(saved.primary("C17").unwrap().glyph, "t");
    }

    #[test]
    fn test_persistence_failure_keeps_in_memory_update() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_saves(true);
        let service = MappingService::new(Box::new(SharedStore(Arc::clone(&store))));

        let error = service.relabel("tlh", "C17", "t").unwrap_err();

        assert!(matches!(error, IpaError::MappingPersistenceFailure { .. }));
        assert_eq!(service.labels("tlh", "C17")[0].glyph, "t");
    }

    #[test]
    fn test_partition_loaded_from_store() {
        let mut table = MappingTable::new();
        table.relabel("C3", "ʃ");
        let store = MemoryStore::new().with_table("en", table);
        let service = MappingService::new(Box::new(store));

        assert_eq!(service.labels("en", "C3")[0].glyph, "ʃ");
        assert_eq!(service.loaded_partitions(), vec!["en".to_string()]);
    }

    #[test]
    fn test_concurrent_relabels_are_all_applied() {
        let service = Arc::new(MappingService::in_memory());
        thread::scope(|s| {
            for i in 0..8 {
                let service = Arc::clone(&service);
                s.spawn(move || {
                    service.relabel("en", &format!("C{i}"), "a").unwrap();
                    service.relabel("en", "shared", "a").unwrap();
                });
            }
        });

        let table = service.snapshot("en");
        assert_eq!(table.len(), 9);
        assert_eq!(table.total_votes("shared"), 8);
    }
}
