//! In-memory storage backend.
//!
//! Behaves like a host vault: folders must exist before anything is created
//! inside them, create calls refuse existing paths, and the index used by
//! `lookup` can lag behind the real contents (see
//! [`MemoryStorage::insert_unindexed_file`]). Write calls are counted so tests
//! can assert that a refused conversion never attempted a write.

use crate::error::StorageError;
use crate::pipeline::sanitize::normalize_path;
use crate::storage::{EntryKind, PathFilter, Storage};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Inner {
    files: BTreeMap<String, Vec<u8>>,
    folders: BTreeSet<String>,
    unindexed: HashSet<String>,
    create_file_calls: usize,
    write_binary_calls: usize,
}

impl Inner {
    fn kind(&self, path: &str) -> Option<EntryKind> {
        if path.is_empty() || self.folders.contains(path) {
            Some(EntryKind::Folder)
        } else if self.files.contains_key(path) {
            Some(EntryKind::File)
        } else {
            None
        }
    }

    fn require_parent(&self, path: &str) -> Result<(), StorageError> {
        let parent = parent_of(path);
        match self.kind(parent) {
            Some(EntryKind::Folder) => Ok(()),
            Some(EntryKind::File) => Err(StorageError::InvalidPath(path.to_string())),
            None => Err(StorageError::NotFound(parent.to_string())),
        }
    }
}

fn parent_of(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

/// A [`Storage`] held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a file, creating its parent folders. The file is indexed.
    pub fn insert_file(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        let path = normalize_path(path);
        let mut inner = self.lock();
        let mut parent = parent_of(&path);
        while !parent.is_empty() {
            inner.folders.insert(parent.to_string());
            parent = parent_of(parent);
        }
        inner.files.insert(path, bytes.into());
    }

    /// Seed a file that the index has not caught up with yet: `exists`
    /// reports it, `lookup` does not.
    pub fn insert_unindexed_file(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.insert_file(path, bytes);
        self.lock().unindexed.insert(normalize_path(path));
    }

    /// Seed a folder (and its ancestors) that the index has not seen.
    pub fn insert_unindexed_folder(&self, path: &str) {
        let path = normalize_path(path);
        let mut inner = self.lock();
        let mut current = path.as_str();
        while !current.is_empty() {
            inner.folders.insert(current.to_string());
            current = parent_of(current);
        }
        inner.unindexed.insert(path);
    }

    /// Contents of a file, if present.
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(&normalize_path(path)).cloned()
    }

    /// Contents of a file as UTF-8 text, if present.
    pub fn text(&self, path: &str) -> Option<String> {
        self.file(path)
            .map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    /// All file paths, sorted.
    pub fn file_paths(&self) -> Vec<String> {
        self.lock().files.keys().cloned().collect()
    }

    /// All folder paths, sorted.
    pub fn folder_paths(&self) -> Vec<String> {
        self.lock().folders.iter().cloned().collect()
    }

    /// Number of `create_file` calls made, successful or not.
    pub fn create_file_calls(&self) -> usize {
        self.lock().create_file_calls
    }

    /// Number of `write_binary` calls made, successful or not.
    pub fn write_binary_calls(&self) -> usize {
        self.lock().write_binary_calls
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.lock().kind(&normalize_path(path)).is_some())
    }

    async fn lookup(&self, path: &str) -> Result<Option<EntryKind>, StorageError> {
        let path = normalize_path(path);
        let inner = self.lock();
        if inner.unindexed.contains(&path) {
            return Ok(None);
        }
        Ok(inner.kind(&path))
    }

    async fn create_folder(&self, path: &str) -> Result<(), StorageError> {
        let path = normalize_path(path);
        let mut inner = self.lock();
        if inner.kind(&path).is_some() {
            return Err(StorageError::AlreadyExists(path));
        }
        inner.require_parent(&path)?;
        inner.folders.insert(path);
        Ok(())
    }

    async fn create_file(&self, path: &str, contents: &str) -> Result<(), StorageError> {
        let path = normalize_path(path);
        let mut inner = self.lock();
        inner.create_file_calls += 1;
        if inner.kind(&path).is_some() {
            return Err(StorageError::AlreadyExists(path));
        }
        inner.require_parent(&path)?;
        inner.files.insert(path, contents.as_bytes().to_vec());
        Ok(())
    }

    async fn write_binary(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = normalize_path(path);
        let mut inner = self.lock();
        inner.write_binary_calls += 1;
        if inner.kind(&path) == Some(EntryKind::Folder) {
            return Err(StorageError::InvalidPath(path));
        }
        inner.require_parent(&path)?;
        inner.unindexed.remove(&path);
        inner.files.insert(path, bytes.to_vec());
        Ok(())
    }

    async fn read_binary(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let path = normalize_path(path);
        self.lock()
            .files
            .get(&path)
            .cloned()
            .ok_or(StorageError::NotFound(path))
    }

    async fn list_files(&self, filter: PathFilter<'_>) -> Result<Vec<String>, StorageError> {
        Ok(self
            .lock()
            .files
            .keys()
            .filter(|p| filter(p))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn folders_need_parents() {
        let s = MemoryStorage::new();
        assert!(matches!(
            s.create_folder("a/b").await,
            Err(StorageError::NotFound(_))
        ));
        s.create_folder("a").await.unwrap();
        s.create_folder("a/b").await.unwrap();
        assert_eq!(s.folder_paths(), vec!["a".to_string(), "a/b".to_string()]);
    }

    #[tokio::test]
    async fn unindexed_file_is_only_visible_to_probe() {
        let s = MemoryStorage::new();
        s.insert_unindexed_file("notes/doc.md", "external");
        assert!(s.exists("notes/doc.md").await.unwrap());
        assert_eq!(s.lookup("notes/doc.md").await.unwrap(), None);
        assert_eq!(
            s.lookup("notes").await.unwrap(),
            Some(EntryKind::Folder)
        );
    }

    #[tokio::test]
    async fn create_file_counts_attempts() {
        let s = MemoryStorage::new();
        s.create_file("a.md", "1").await.unwrap();
        assert!(s.create_file("a.md", "2").await.is_err());
        assert_eq!(s.create_file_calls(), 2);
        assert_eq!(s.text("a.md").as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn write_binary_overwrites_and_lists() {
        let s = MemoryStorage::new();
        s.write_binary("x.bin", b"1").await.unwrap();
        s.write_binary("x.bin", b"2").await.unwrap();
        assert_eq!(s.file("x.bin"), Some(b"2".to_vec()));
        assert_eq!(s.write_binary_calls(), 2);
        let all = s.list_files(&|_: &str| true).await.unwrap();
        assert_eq!(all, vec!["x.bin".to_string()]);
    }
}
