//! Durable key/value string storage.
//!
//! Values are opaque strings (callers store serialized JSON documents).
//! Access is synchronous; [`JsonFileStorage`] writes through to disk on every
//! `set`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::{Error, Result};

pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Process-local storage, used in tests and when no storage path is set.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Storage backed by a single JSON object file.
///
/// The file maps keys to string values:
/// `{ "modQuery": "{\"maxCount\":20,...}", "accent": "..." }`
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStorage {
    /// Open the storage file, starting empty if it does not exist.
    ///
    /// A file that exists but is not a JSON string map is treated as empty
    /// and overwritten on the next `set`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Ignoring unreadable storage file {:?}: {e}", path);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)
            .map_err(|e| Error::Storage(format!("failed to write {:?}: {e}", self.path)))
    }
}

impl Storage for JsonFileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert!(storage.get("modQuery").is_none());

        storage.set("modQuery", "{}").unwrap();
        assert_eq!(storage.get("modQuery").as_deref(), Some("{}"));
    }

    #[test]
    fn test_file_storage_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::open(tmp.path().join("storage.json")).unwrap();
        assert!(storage.get("accent").is_none());
    }

    #[test]
    fn test_file_storage_writes_through() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/storage.json");

        let storage = JsonFileStorage::open(&path).unwrap();
        storage.set("accent", r#"{"type":"default","name":"blue"}"#).unwrap();
        assert!(path.exists());

        let reopened = JsonFileStorage::open(&path).unwrap();
        assert_eq!(
            reopened.get("accent").as_deref(),
            Some(r#"{"type":"default","name":"blue"}"#)
        );
    }

    #[test]
    fn test_file_storage_corrupt_file_starts_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("storage.json");
        std::fs::write(&path, "{ not json").unwrap();

        let storage = JsonFileStorage::open(&path).unwrap();
        assert!(storage.get("modQuery").is_none());

        storage.set("modQuery", "{}").unwrap();
        let reopened = JsonFileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("modQuery").as_deref(), Some("{}"));
    }
}
