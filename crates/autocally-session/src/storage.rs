//! Durable key-value storage.
//!
//! [`FileStore`] keeps a flat JSON object of string values on disk with
//! secure file permissions (0o600). [`MemoryStore`] is the in-process
//! equivalent.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::errors::StorageError;

/// String-keyed, string-valued persistent storage.
pub trait KeyValueStore: Send + Sync {
    /// Read a key. Missing keys are `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write several keys as one unit.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError>;

    /// Remove several keys as one unit. Missing keys are ignored.
    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError>;

    /// Write one key.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.set_many(&[(key, value)])
    }

    /// Remove one key.
    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.remove_many(&[key])
    }
}

// ── File-backed ─────────────────────────────────────────────────────────────

/// JSON-file storage.
///
/// Every mutation rewrites the whole file, so a multi-key write either lands
/// completely or not at all from the reader's point of view.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Storage backed by `path`. Nothing is read until first access.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> BTreeMap<String, String> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read storage file, treating as empty");
                return BTreeMap::new();
            }
        };

        match serde_json::from_str::<BTreeMap<String, String>>(&data) {
            Ok(map) => map,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "malformed storage file, treating as empty");
                BTreeMap::new()
            }
        }
    }

    fn save(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&self.path, perms);
        }

        debug!(path = %self.path.display(), keys = map.len(), "storage file written");
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock();
        Ok(self.load().remove(key))
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let mut map = self.load();
        for (key, value) in entries {
            let _ = map.insert((*key).to_string(), (*value).to_string());
        }
        self.save(&map)
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let mut map = self.load();
        let before = map.len();
        for key in keys {
            let _ = map.remove(*key);
        }
        if map.len() == before && !self.path.exists() {
            return Ok(());
        }
        self.save(&map)
    }
}

// ── In-memory ───────────────────────────────────────────────────────────────

/// In-process storage. Contents are lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `entries`.
    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        let map = entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self {
            map: Mutex::new(map),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.map.lock().get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut map = self.map.lock();
        for (key, value) in entries {
            let _ = map.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut map = self.map.lock();
        for key in keys {
            let _ = map.remove(*key);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
