//! File-backed key-value store.
//!
//! Layout: `<root>/<space>/<key>.json`, one directory per space and one file
//! per key. Both names are sanitized so any string maps to a valid file
//! name. Values are stored verbatim as UTF-8.

use async_trait::async_trait;
use chatforge_core::error::StoreError;
use chatforge_core::kv::{KvStore, check_key};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A key-value store rooted at a directory on disk.
///
/// Read failures other than a missing file are logged and reported as a
/// miss; write failures are returned to the caller.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    root: PathBuf,
}

impl FileKvStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        debug!(root = %root.display(), "File KV store opened");
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `space/key`.
    pub fn path_for(&self, space: &str, key: &str) -> PathBuf {
        self.root
            .join(sanitize_file_name(space))
            .join(format!("{}.json", sanitize_file_name(key)))
    }
}

/// Replace characters that are not valid in file names with `_`.
pub fn sanitize_file_name(input: &str) -> String {
    let sanitized: String = input
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match sanitized.as_str() {
        "." | ".." => "_".repeat(sanitized.len()),
        _ => sanitized,
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn read(&self, space: &str, key: &str) -> Result<Option<String>, StoreError> {
        check_key(space, key)?;
        let path = self.path_for(space, key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                warn!(space, key, path = %path.display(), error = %e, "Failed to read KV entry");
                Ok(None)
            }
        }
    }

    async fn write(&self, space: &str, key: &str, value: &str) -> Result<(), StoreError> {
        check_key(space, key)?;
        let path = self.path_for(space, key);
        let write_err = |e: std::io::Error| StoreError::Write {
            space: space.to_string(),
            key: key.to_string(),
            reason: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        tokio::fs::write(&path, value).await.map_err(write_err)?;
        debug!(space, key, bytes = value.len(), "KV entry written");
        Ok(())
    }
}
