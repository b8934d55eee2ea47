//! Filesystem abstraction and native implementation.
//!
//! The file-backed key-value store and config discovery go through
//! [`FileSystem`] so tests and embedders can swap the backing storage.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Platform-agnostic filesystem operations.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read a file's entire contents as a UTF-8 string.
    async fn read_to_string(&self, path: &Path) -> std::io::Result<String>;

    /// Write a string to a file, creating parent directories if needed.
    async fn write_string(&self, path: &Path, content: &str) -> std::io::Result<()>;

    /// Check whether a path exists.
    async fn exists(&self, path: &Path) -> bool;

    /// Remove a file.
    async fn remove_file(&self, path: &Path) -> std::io::Result<()>;

    /// The user's home directory, if known.
    fn home_dir(&self) -> Option<PathBuf>;
}

/// Native filesystem implementation using [`tokio::fs`].
pub struct NativeFileSystem;

#[async_trait]
impl FileSystem for NativeFileSystem {
    async fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn write_string(&self, path: &Path, content: &str) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn remove_file(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }
}
