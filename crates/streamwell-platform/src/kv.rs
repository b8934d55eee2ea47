//! Key-value persistence.
//!
//! The streaming core treats persistence as an abstract get/set/delete
//! store of JSON values. [`MemoryStore`] keeps everything in process;
//! [`FileStore`] writes one JSON file per key under a root directory.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::fs::{FileSystem, NativeFileSystem};

/// Errors from a key-value backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The key cannot be stored by this backend.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// Underlying I/O failed.
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be (de)serialized.
    #[error("storage json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Abstract key-value persistence.
///
/// `delete` of a missing key succeeds.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// In-process store.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// One JSON file per key under `root`.
///
/// Keys are mapped to file names by replacing anything outside
/// `[A-Za-z0-9._-]` with `_`.
pub struct FileStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileStore {
    /// Store files under `root` on the native filesystem.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_fs(root, Arc::new(NativeFileSystem))
    }

    pub fn with_fs(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }

    /// `~/.streamwell/state`, or `None` without a home directory.
    pub fn default_root(fs: &dyn FileSystem) -> Option<PathBuf> {
        fs.home_dir().map(|h| h.join(".streamwell").join("state"))
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.trim().is_empty() {
            return Err(StoreError::InvalidKey(key.to_owned()));
        }
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Ok(self.root.join(format!("{name}.json")))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(key)?;
        if !self.fs.exists(&path).await {
            return Ok(None);
        }
        let contents = self.fs.read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let contents = serde_json::to_string(&value)?;
        debug!(path = %path.display(), bytes = contents.len(), "writing store entry");
        self.fs.write_string(&path, &contents).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match self.fs.remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
