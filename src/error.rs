//! Error types for the edgequake-ocr2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Ocr2MdError`] — **Fatal**: the document conversion cannot proceed
//!   (OCR result has no pages, target document already exists, provider
//!   call failed, a folder path is blocked by a file). Returned as
//!   `Err(Ocr2MdError)` from the `convert*` functions.
//!
//! * [`ImageError`] — **Non-fatal**: a single image could not be decoded or
//!   written. The marker referencing it is removed from the page text and the
//!   conversion carries on. Stored in [`crate::output::OutputArtifact`] so
//!   callers can report partial success.
//!
//! Storage backends speak [`StorageError`]; the coordinator translates it
//! into the fatal or non-fatal type depending on what was being written.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// All fatal errors returned by the edgequake-ocr2md library.
#[derive(Debug, Error)]
pub enum Ocr2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The OCR result is structurally unusable (no pages, wrong shape).
    #[error("Malformed OCR result: {reason}")]
    MalformedResult { reason: String },

    /// The source document to convert could not be found.
    #[error("Source not found: '{path}'")]
    SourceNotFound { path: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The target document already exists; nothing was written.
    #[error("Document already exists: '{path}'\nDelete or rename it to convert again.")]
    AlreadyExists { path: String },

    /// A folder segment of an output path is occupied by a file.
    #[error("Cannot create folder '{path}': a file with that name already exists")]
    PathConflict { path: String },

    /// The storage collaborator failed unexpectedly.
    #[error("Storage error on '{path}': {source}")]
    Storage {
        path: String,
        #[source]
        source: StorageError,
    },

    // ── Provider errors ───────────────────────────────────────────────────
    /// Upload, signing or OCR processing failed at the provider.
    #[error("OCR provider failed during {stage}: {detail}")]
    UpstreamFailure { stage: UpstreamStage, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Ocr2MdError {
    /// `true` for the expected "target document exists" outcome.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Ocr2MdError::AlreadyExists { .. })
    }

    pub(crate) fn storage(path: impl Into<String>, source: StorageError) -> Self {
        Ocr2MdError::Storage {
            path: path.into(),
            source,
        }
    }
}

/// The provider call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamStage {
    Upload,
    Sign,
    Process,
}

impl fmt::Display for UpstreamStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UpstreamStage::Upload => "upload",
            UpstreamStage::Sign => "sign",
            UpstreamStage::Process => "process",
        })
    }
}

/// Why an image payload could not be turned into bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnresolvableReason {
    /// No payload at all.
    Empty,
    /// The provider sent a shortened placeholder ending in an ellipsis.
    Truncated,
    /// The body is not valid base64.
    InvalidBase64,
    /// The body decoded to zero bytes.
    EmptyBytes,
}

impl fmt::Display for UnresolvableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnresolvableReason::Empty => "empty",
            UnresolvableReason::Truncated => "truncated",
            UnresolvableReason::InvalidBase64 => "invalid-base64",
            UnresolvableReason::EmptyBytes => "empty-bytes",
        })
    }
}

/// A non-fatal error for a single image.
///
/// The marker for the image is removed from the page and conversion continues.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageError {
    /// Payload could not be decoded.
    #[error("Image '{id}' unresolvable: {reason}")]
    Unresolvable {
        id: String,
        reason: UnresolvableReason,
    },

    /// Bytes decoded fine but the write failed.
    #[error("Image '{path}' could not be written: {detail}")]
    PersistFailed { path: String, detail: String },
}

/// Errors reported by a [`crate::storage::Storage`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The create call found something already at the path.
    #[error("'{0}' already exists")]
    AlreadyExists(String),

    /// Nothing exists at the path.
    #[error("'{0}' not found")]
    NotFound(String),

    /// The path escapes the storage root or is otherwise unusable.
    #[error("invalid path '{0}'")]
    InvalidPath(String),

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_exists_display_names_path() {
        let e = Ocr2MdError::AlreadyExists {
            path: "notes/report.md".into(),
        };
        assert!(e.to_string().contains("notes/report.md"));
        assert!(e.is_already_exists());
    }

    #[test]
    fn upstream_failure_display() {
        let e = Ocr2MdError::UpstreamFailure {
            stage: UpstreamStage::Sign,
            detail: "HTTP 401".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("sign"), "got: {msg}");
        assert!(msg.contains("HTTP 401"), "got: {msg}");
        assert!(!e.is_already_exists());
    }

    #[test]
    fn unresolvable_reason_display() {
        assert_eq!(UnresolvableReason::Truncated.to_string(), "truncated");
        assert_eq!(UnresolvableReason::EmptyBytes.to_string(), "empty-bytes");
        let e = ImageError::Unresolvable {
            id: "img-0.jpeg".into(),
            reason: UnresolvableReason::Truncated,
        };
        assert_eq!(e.to_string(), "Image 'img-0.jpeg' unresolvable: truncated");
    }

    #[test]
    fn image_error_serialises() {
        let e = ImageError::Unresolvable {
            id: "x".into(),
            reason: UnresolvableReason::InvalidBase64,
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("invalid-base64"), "got: {json}");
    }
}
