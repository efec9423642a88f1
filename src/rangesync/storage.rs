//! Durable key-value storage backing the persisted stores.
//!
//! A [`StateStorage`] maps a short key to one serialized JSON document. Two
//! implementations ship with the crate:
//!
//! - [`FileStorage`]: one `<key>.json` file per key inside a directory. Each save
//!   writes a uniquely named sibling temp file and renames it over the target, so a
//!   crash mid-write never leaves a truncated document behind and overlapping
//!   writers never clobber each other's temp file.
//! - [`MemoryStorage`]: a shared in-process map, handy for tests and for embedding
//!   where durability is not wanted.
//!
//! ```rust
//! use rangesync::storage::{MemoryStorage, StateStorage};
//!
//! let storage = MemoryStorage::new();
//! storage.save("range-storage", "{}").unwrap();
//! assert_eq!(storage.load("range-storage").unwrap(), Some("{}".to_string()));
//! assert_eq!(storage.load("missing").unwrap(), None);
//! ```

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Errors raised by a storage backend.
#[derive(Debug)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    Io(io::Error),
    /// A document could not be serialized or deserialized.
    Serialization(serde_json::Error),
    /// Keys may only contain ASCII letters, digits, `-` and `_`.
    InvalidKey(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "IO error: {}", err),
            StorageError::Serialization(err) => write!(f, "Serialization error: {}", err),
            StorageError::InvalidKey(key) => write!(f, "Invalid storage key: {:?}", key),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StorageError::Io(err) => Some(err),
            StorageError::Serialization(err) => Some(err),
            StorageError::InvalidKey(_) => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Io(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err)
    }
}

/// A local key-value store holding one JSON document per key.
pub trait StateStorage {
    /// The document stored under `key`, or `None` if nothing was ever saved there.
    fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the document stored under `key`.
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Directory-backed storage: `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir` for storage, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl StateStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        // Each save gets its own temp file, so concurrent writers to one key never
        // share a path; the last rename wins.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.persist(&path).map_err(|err| err.error)?;
        log::debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }
}

/// In-process storage.
///
/// Clones share the same underlying map, so a test can keep a handle and inspect
/// exactly what a store persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map still holds complete documents; keep using it.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of keys that have been saved.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.entries().remove(key)
    }
}

impl StateStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;
        Ok(self.entries().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<S: StateStorage + ?Sized> StateStorage for Box<S> {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).save(key, value)
    }
}

impl<S: StateStorage + ?Sized> StateStorage for Arc<S> {
    fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).save(key, value)
    }
}
