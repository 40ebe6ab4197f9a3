//! Local-directory storage backend.

use crate::error::StorageError;
use crate::pipeline::sanitize::normalize_path;
use crate::storage::{EntryKind, PathFilter, Storage};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::warn;

/// A [`Storage`] rooted at a directory on the local filesystem.
///
/// Vault paths are resolved below the root; `..` segments are rejected.
/// There is no separate index, so `lookup` and `exists` both query the
/// filesystem.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let normalized = normalize_path(path);
        if normalized.split('/').any(|seg| seg == "..") {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        let mut full = self.root.clone();
        for seg in normalized.split('/').filter(|s| !s.is_empty()) {
            full.push(seg);
        }
        Ok(full)
    }
}

/// A parent segment that is a file means nothing can exist below it.
fn is_absent(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
}

/// Write `contents` into a freshly created file, deleting it again if the
/// write does not complete so no partial document is left behind.
async fn fill_new_file<W: AsyncWrite + Unpin>(
    mut file: W,
    full: &Path,
    contents: &[u8],
) -> Result<(), StorageError> {
    let written = async {
        file.write_all(contents).await?;
        file.flush().await
    }
    .await;
    if let Err(e) = written {
        drop(file);
        if let Err(rm) = tokio::fs::remove_file(full).await {
            warn!("Could not remove partial file {:?}: {}", full, rm);
        }
        return Err(StorageError::Io(e));
    }
    Ok(())
}

fn map_io(path: &str, e: std::io::Error) -> StorageError {
    match e.kind() {
        ErrorKind::AlreadyExists => StorageError::AlreadyExists(path.to_string()),
        ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
        _ => StorageError::Io(e),
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let full = self.resolve(path)?;
        match tokio::fs::try_exists(&full).await {
            Ok(found) => Ok(found),
            Err(e) if is_absent(&e) => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn lookup(&self, path: &str) -> Result<Option<EntryKind>, StorageError> {
        let full = self.resolve(path)?;
        match tokio::fs::metadata(&full).await {
            Ok(meta) if meta.is_dir() => Ok(Some(EntryKind::Folder)),
            Ok(_) => Ok(Some(EntryKind::File)),
            Err(e) if is_absent(&e) => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn create_folder(&self, path: &str) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        tokio::fs::create_dir(&full)
            .await
            .map_err(|e| map_io(path, e))
    }

    async fn create_file(&self, path: &str, contents: &str) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .await
            .map_err(|e| map_io(path, e))?;
        fill_new_file(file, &full, contents.as_bytes()).await
    }

    async fn write_binary(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        tokio::fs::write(&full, bytes)
            .await
            .map_err(|e| map_io(path, e))
    }

    async fn read_binary(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full).await.map_err(|e| map_io(path, e))
    }

    async fn list_files(&self, filter: PathFilter<'_>) -> Result<Vec<String>, StorageError> {
        let mut found = Vec::new();
        let mut pending = vec![String::new()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(self.resolve(&dir)?)
                .await
                .map_err(|e| map_io(&dir, e))?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                // dot-folders hold host configuration, not documents
                if name.starts_with('.') {
                    continue;
                }
                let rel = if dir.is_empty() {
                    name
                } else {
                    format!("{dir}/{name}")
                };
                if entry.file_type().await?.is_dir() {
                    pending.push(rel);
                } else if filter(&rel) {
                    found.push(rel);
                }
            }
        }

        Ok(found)
    }
}
