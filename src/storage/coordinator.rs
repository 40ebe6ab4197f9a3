//! Storage policies layered over a [`Storage`] backend.
//!
//! - [`StorageCoordinator::ensure_folder`]: creates each missing segment in
//!   order and treats "already exists" from a concurrent creator as success.
//! - [`StorageCoordinator::create_document_if_absent`]: refuses to write when
//!   either the index or a direct probe reports the path, and still catches
//!   an `AlreadyExists` from the create call itself.
//! - [`StorageCoordinator::write_image`]: plain overwrite.

use crate::error::{Ocr2MdError, StorageError};
use crate::pipeline::sanitize::normalize_path;
use crate::storage::{EntryKind, Storage};
use tracing::debug;

/// Applies folder, no-clobber and image-write policies to a storage backend.
pub struct StorageCoordinator<'a, S: Storage + ?Sized> {
    storage: &'a S,
}

impl<'a, S: Storage + ?Sized> StorageCoordinator<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &'a S {
        self.storage
    }

    /// Make sure every segment of `path` exists as a folder.
    ///
    /// # Errors
    /// [`Ocr2MdError::PathConflict`] when a segment is a file.
    pub async fn ensure_folder(&self, path: &str) -> Result<(), Ocr2MdError> {
        let path = normalize_path(path);
        let mut current = String::new();

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(segment);

            match self.lookup(&current).await? {
                Some(EntryKind::Folder) => continue,
                Some(EntryKind::File) => {
                    return Err(Ocr2MdError::PathConflict { path: current });
                }
                None => {}
            }

            match self.storage.create_folder(&current).await {
                Ok(()) => debug!("Created folder '{}'", current),
                Err(StorageError::AlreadyExists(_)) => {
                    // Someone else created it between lookup and create.
                    if self.lookup(&current).await? == Some(EntryKind::File) {
                        return Err(Ocr2MdError::PathConflict { path: current });
                    }
                }
                Err(e) => return Err(Ocr2MdError::storage(current, e)),
            }
        }
        Ok(())
    }

    /// `true` if either the index or a direct probe reports `path`.
    pub async fn document_exists(&self, path: &str) -> Result<bool, Ocr2MdError> {
        if self.lookup(path).await?.is_some() {
            return Ok(true);
        }
        self.storage
            .exists(path)
            .await
            .map_err(|e| Ocr2MdError::storage(path, e))
    }

    /// Create the document at `path` unless something is already there.
    ///
    /// # Errors
    /// [`Ocr2MdError::AlreadyExists`] when the path is taken, whether detected
    /// up front or by the create call.
    pub async fn create_document_if_absent(
        &self,
        path: &str,
        content: &str,
    ) -> Result<(), Ocr2MdError> {
        if self.document_exists(path).await? {
            return Err(Ocr2MdError::AlreadyExists {
                path: path.to_string(),
            });
        }
        match self.storage.create_file(path, content).await {
            Ok(()) => Ok(()),
            Err(StorageError::AlreadyExists(_)) => Err(Ocr2MdError::AlreadyExists {
                path: path.to_string(),
            }),
            Err(e) => Err(Ocr2MdError::storage(path, e)),
        }
    }

    /// Write image bytes, replacing any previous file.
    pub async fn write_image(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.storage.write_binary(path, bytes).await
    }

    async fn lookup(&self, path: &str) -> Result<Option<EntryKind>, Ocr2MdError> {
        self.storage
            .lookup(path)
            .await
            .map_err(|e| Ocr2MdError::storage(path, e))
    }
}
