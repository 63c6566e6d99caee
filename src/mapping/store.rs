//! Persistence backends for mapping tables.

use super::table::MappingTable;
use crate::defaults::GLOBAL_PARTITION;
use crate::error::{IpaError, Result};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Durable storage for per-language mapping tables.
///
/// Implementations must be safe to call from several worker threads; the
/// service serializes writes per partition.
pub trait MappingStore: Send + Sync {
    /// Load a partition. `Ok(None)` when nothing has been stored yet.
    fn load(&self, partition: &str) -> Result<Option<MappingTable>>;

    /// Persist a partition, replacing any previous version.
    fn save(&self, partition: &str, table: &MappingTable) -> Result<()>;

    /// Short name for logging.
    fn name(&self) -> &'static str;
}

/// One `<partition>.json` file per language under a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing a partition. The global partition is `_global.json`.
    pub fn path_for(&self, partition: &str) -> Result<PathBuf> {
        if partition == GLOBAL_PARTITION {
            return Ok(self.dir.join("_global.json"));
        }
        let valid = !partition.is_empty()
            && partition
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(IpaError::MappingPersistenceFailure {
                language: partition.to_string(),
                message: "language code is not a valid file name".to_string(),
            });
        }
        Ok(self.dir.join(format!("{partition}.json")))
    }
}

impl MappingStore for JsonFileStore {
    fn load(&self, partition: &str) -> Result<Option<MappingTable>> {
        let path = self.path_for(partition)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, partition: &str, table: &MappingTable) -> Result<()> {
        let path = self.path_for(partition)?;
        let failure = |message: String| IpaError::MappingPersistenceFailure {
            language: partition.to_string(),
            message,
        };

        fs::create_dir_all(&self.dir)
            .map_err(|e| failure(format!("cannot create {}: {e}", self.dir.display())))?;
        let json = serde_json::to_string_pretty(table).map_err(|e| failure(e.to_string()))?;

        // Write to a sibling temp file and rename so readers never see a partial table.
        let tmp_path = path.with_extension("json.tmp");
        let written = fs::File::create(&tmp_path).and_then(|mut file| {
            file.write_all(json.as_bytes())?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&tmp_path, &path)) {
            if let Err(cleanup) = fs::remove_file(&tmp_path) {
                tracing::debug!("Could not remove {}: {cleanup}", tmp_path.display());
            }
            return Err(failure(format!("cannot write {}: {e}", path.display())));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "json-file"
    }
}

/// In-process store. Saves can be made to fail for exercising error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, MappingTable>>,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a partition as if it had been persisted earlier.
    pub fn with_table(self, partition: &str, table: MappingTable) -> Self {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(partition.to_string(), table);
        self
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Last persisted version of a partition.
    pub fn saved(&self, partition: &str) -> Option<MappingTable> {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(partition)
            .cloned()
    }
}

impl MappingStore for MemoryStore {
    fn load(&self, partition: &str) -> Result<Option<MappingTable>> {
        Ok(self.saved(partition))
    }

    fn save(&self, partition: &str, table: &MappingTable) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(IpaError::MappingPersistenceFailure {
                language: partition.to_string(),
                message: "store rejected the write".to_string(),
            });
        }
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(partition.to_string(), table.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn table_with(cluster: &str, glyph: &str) -> MappingTable {
        let mut table = MappingTable::new();
        table.relabel(cluster, glyph);
        table
    }

    #[test]
    fn test_json_store_missing_partition_is_none() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load("tlh").unwrap().is_none());
    }

    #[test]
    fn test_json_store_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested"));
        let table = table_with("C17", "t");

        store.save("tlh", &table).unwrap();

        assert!(dir.path().join("nested/tlh.json").exists());
        assert!(!dir.path().join("nested/tlh.json.tmp").exists());
        assert_eq!(store.load("tlh").unwrap(), Some(table));
    }

    #[test]
    fn test_json_store_global_partition_file_name() {
        let store = JsonFileStore::new("/tmp/mappings");
        assert_eq!(
            store.path_for("*").unwrap(),
            PathBuf::from("/tmp/mappings/_global.json")
        );
    }

    #[test]
    fn test_json_store_rejects_path_like_language() {
        let store = JsonFileStore::new("/tmp/mappings");
        assert!(store.path_for("../etc").is_err());
    }

    #[test]
    fn test_json_store_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("en.json"), "{not json").unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.load("en").is_err());
    }

    #[test]
    fn test_memory_store_failure_switch() {
        let store = MemoryStore::new();
        store.set_fail_saves(true);
        let error = store.save("en", &table_with("C1", "a")).unwrap_err();
        assert!(matches!(error, IpaError::MappingPersistenceFailure { .. }));
        assert!(store.saved("en").is_none());

        store.set_fail_saves(false);
        store.save("en", &table_with("C1", "a")).unwrap();
        assert!(store.saved("en").is_some());
    }
}
