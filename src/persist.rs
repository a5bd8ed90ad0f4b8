//! Key-value storage for serialized store snapshots.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::debug;

use crate::error::StorageError;

/// Opaque string blobs by key.
pub trait SnapshotStorage: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn save(&self, key: &str, blob: &str) -> Result<(), StorageError>;
    /// Returns whether a blob existed.
    fn remove(&self, key: &str) -> Result<bool, StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let blobs = self.blobs.lock().map_err(|e| StorageError::Corrupt(e.to_string()))?;
        Ok(blobs.get(key).cloned())
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), StorageError> {
        let mut blobs = self.blobs.lock().map_err(|e| StorageError::Corrupt(e.to_string()))?;
        blobs.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let mut blobs = self.blobs.lock().map_err(|e| StorageError::Corrupt(e.to_string()))?;
        Ok(blobs.remove(key).is_some())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(StorageError::Corrupt(format!("invalid storage key {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl SnapshotStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, blob: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        // Replace atomically
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, blob)?;
        std::fs::rename(&tmp, &path)?;
        debug!("[FileStorage] saved {} ({} bytes)", path.display(), blob.len());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(storage: &dyn SnapshotStorage) {
        assert_eq!(storage.load("data").unwrap(), None);
        storage.save("data", "{\"a\":1}").unwrap();
        assert_eq!(storage.load("data").unwrap().as_deref(), Some("{\"a\":1}"));
        storage.save("data", "{}").unwrap();
        assert_eq!(storage.load("data").unwrap().as_deref(), Some("{}"));
        assert!(storage.remove("data").unwrap());
        assert!(!storage.remove("data").unwrap());
    }

    #[test]
    fn test_memory_storage() {
        exercise(&MemoryStorage::new());
    }

    #[test]
    fn test_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("snapshots")).unwrap();
        exercise(&storage);
        assert!(storage.dir().ends_with("snapshots"));
    }

    #[test]
    fn test_file_storage_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        assert!(matches!(storage.save("../escape", "{}"), Err(StorageError::Corrupt(_))));
        assert!(matches!(storage.load(""), Err(StorageError::Corrupt(_))));
    }
}
