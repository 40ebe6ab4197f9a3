//! Output types: what a conversion produced and how a batch went.

use crate::error::ImageError;
use serde::{Deserialize, Serialize};

/// The result of one successful document conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputArtifact {
    /// Vault path of the written document.
    pub document_path: String,
    /// The document text exactly as written.
    pub markdown: String,
    /// Images written, in document order.
    pub images: Vec<WrittenImage>,
    /// Images whose markers were removed instead.
    pub image_failures: Vec<ImageError>,
    pub stats: ConversionStats,
}

/// One stored image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenImage {
    /// Identifier as given by the OCR provider (may be blank).
    pub id: String,
    pub page_index: i64,
    /// Vault path the bytes were written to.
    pub path: String,
    pub size_bytes: usize,
}

/// Counters for one document conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub pages: usize,
    pub images_written: usize,
    pub images_removed: usize,
    /// Time spent in the OCR provider, zero when the result was supplied.
    pub ocr_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Where a single-document conversion was when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionPhase {
    /// Reading the source and running OCR.
    Fetched,
    /// OCR result parsed into pages.
    Validated,
    /// Writing images and rewriting markers.
    Assembling,
    /// Writing the document.
    Persisting,
    Done,
}

impl std::fmt::Display for ConversionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConversionPhase::Fetched => "fetch",
            ConversionPhase::Validated => "validate",
            ConversionPhase::Assembling => "assemble",
            ConversionPhase::Persisting => "persist",
            ConversionPhase::Done => "done",
        })
    }
}

/// Outcome of one document in a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    Converted {
        document_path: String,
        stats: ConversionStats,
    },
    /// The target document was already there; nothing was written.
    AlreadyExists { document_path: String },
    Failed { phase: ConversionPhase, error: String },
}

impl DocumentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DocumentOutcome::Converted { .. })
    }
}

/// Per-source report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    /// Vault path of the source file.
    pub source: String,
    pub outcome: DocumentOutcome,
}

/// Aggregate result of a batch run.
///
/// `succeeded + failed` always equals the number of sources queued.
/// `already_existed` is the subset of `failed` that hit an existing document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub already_existed: usize,
    /// Reports in completion order.
    pub reports: Vec<DocumentReport>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}
