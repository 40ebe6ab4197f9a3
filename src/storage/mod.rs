//! Storage collaborator interface and backends.
//!
//! The pipeline never touches a filesystem directly. Every effect goes
//! through [`Storage`], which models a host document store (a notes vault,
//! a local directory, an in-memory map): vault-relative `/`-separated paths,
//! an indexed view (`lookup`) and a direct probe (`exists`) that may disagree,
//! and create calls that report [`StorageError::AlreadyExists`].
//!
//! None of these calls are assumed to be transactional. The no-clobber and
//! idempotent-folder policies live in [`coordinator::StorageCoordinator`].
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`FsStorage`] | a directory on the local filesystem (CLI) |
//! | [`MemoryStorage`] | tests and embedding; index can be made stale |

pub mod coordinator;
pub mod fs;
pub mod memory;

use crate::error::StorageError;
use async_trait::async_trait;

pub use coordinator::StorageCoordinator;
pub use fs::FsStorage;
pub use memory::MemoryStorage;

/// What the indexed view knows about a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

/// Predicate used by [`Storage::list_files`].
pub type PathFilter<'a> = &'a (dyn Fn(&str) -> bool + Send + Sync);

/// A host document store.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Direct existence probe against the underlying store.
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Look a path up in the host's index.
    async fn lookup(&self, path: &str) -> Result<Option<EntryKind>, StorageError>;

    /// Create one folder. The parent must exist.
    /// Fails with [`StorageError::AlreadyExists`] if anything is at `path`.
    async fn create_folder(&self, path: &str) -> Result<(), StorageError>;

    /// Create a new text file.
    /// Fails with [`StorageError::AlreadyExists`] if anything is at `path`.
    async fn create_file(&self, path: &str, contents: &str) -> Result<(), StorageError>;

    /// Write binary content, replacing any existing file.
    async fn write_binary(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Read a whole file.
    async fn read_binary(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// All file paths accepted by `filter`, in no particular order.
    async fn list_files(&self, filter: PathFilter<'_>) -> Result<Vec<String>, StorageError>;
}
