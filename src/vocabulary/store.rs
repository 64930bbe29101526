//! Durable vocabulary stores.
//!
//! # Atomicity
//!
//! [`FilesystemVocabularyStore`] writes the snapshot to a sibling temporary
//! file, syncs it, then renames it over the target. A crash at any point
//! leaves either the previous snapshot or the new one on disk, never a
//! partial file.

use super::VocabularyStore;
use crate::models::VocabularySnapshot;
use crate::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Maximum snapshot file size (4MB).
const MAX_FILE_SIZE: u64 = 4 * 1024 * 1024;

/// Stores the vocabulary as one JSON file.
#[derive(Debug, Clone)]
pub struct FilesystemVocabularyStore {
    path: PathBuf,
}

impl FilesystemVocabularyStore {
    /// Creates a store backed by `path`. Parent directories are created on
    /// first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the snapshot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl VocabularyStore for FilesystemVocabularyStore {
    fn load(&self) -> Result<Option<VocabularySnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let metadata = fs::metadata(&self.path).map_err(|e| Error::OperationFailed {
            operation: "read_vocabulary_metadata".to_string(),
            cause: e.to_string(),
        })?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(Error::InvalidInput(format!(
                "Vocabulary file exceeds maximum size of {MAX_FILE_SIZE} bytes: {}",
                self.path.display()
            )));
        }

        let json = fs::read_to_string(&self.path).map_err(|e| Error::OperationFailed {
            operation: "read_vocabulary_file".to_string(),
            cause: e.to_string(),
        })?;
        let snapshot = serde_json::from_str(&json).map_err(|e| Error::OperationFailed {
            operation: "deserialize_vocabulary".to_string(),
            cause: e.to_string(),
        })?;
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &VocabularySnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                operation: "create_vocabulary_dir".to_string(),
                cause: e.to_string(),
            })?;
        }

        let json = serde_json::to_vec_pretty(snapshot).map_err(|e| Error::OperationFailed {
            operation: "serialize_vocabulary".to_string(),
            cause: e.to_string(),
        })?;

        let temp = self.temp_path();
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&temp)?;
            file.write_all(&json)?;
            file.sync_all()?;
            fs::rename(&temp, &self.path)
        };
        write().map_err(|e| {
            let _ = fs::remove_file(&temp);
            Error::OperationFailed {
                operation: "write_vocabulary_file".to_string(),
                cause: e.to_string(),
            }
        })
    }
}

/// Keeps the snapshot in memory. For tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryVocabularyStore {
    snapshot: Mutex<Option<VocabularySnapshot>>,
}

impl MemoryVocabularyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `snapshot`.
    #[must_use]
    pub fn with_snapshot(snapshot: VocabularySnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
        }
    }
}

impl VocabularyStore for MemoryVocabularyStore {
    fn load(&self) -> Result<Option<VocabularySnapshot>> {
        Ok(self
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, snapshot: &VocabularySnapshot) -> Result<()> {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{VocabularyEntry, VocabularyOrigin};
    use tempfile::TempDir;

    fn snapshot() -> VocabularySnapshot {
        VocabularySnapshot {
            version: VocabularySnapshot::CURRENT_VERSION,
            capacity: 8,
            entries: vec![
                VocabularyEntry::new("bus shelter", VocabularyOrigin::PointOfInterest, 10),
                VocabularyEntry::new("red door", VocabularyOrigin::DeepAnalysis, 20),
            ],
        }
    }

    #[test]
    fn test_missing_file_loads_none() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemVocabularyStore::new(dir.path().join("vocabulary.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemVocabularyStore::new(dir.path().join("nested/vocabulary.json"));
        store.save(&snapshot()).unwrap();
        assert_eq!(store.load().unwrap(), Some(snapshot()));
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vocabulary.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(FilesystemVocabularyStore::new(path).load().is_err());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryVocabularyStore::new();
        assert!(store.load().unwrap().is_none());
        store.save(&snapshot()).unwrap();
        assert_eq!(store.load().unwrap(), Some(snapshot()));
    }
}
