//! Single-document conversion entry points.
//!
//! Every entry point runs the same pipeline:
//!
//! ```text
//! Fetched ──▶ Validated ──▶ Assembling ──▶ Persisting ──▶ Done
//! (read+OCR)  (parse JSON)  (images,      (no-clobber
//!                            markers)      document write)
//! ```
//!
//! Any error aborts the document in the phase it occurred in. The target
//! document is checked before the source is read, so a conversion that would
//! end in [`Ocr2MdError::AlreadyExists`] never pays for an OCR call, and the
//! document file is written exactly once, after every image has been handled.

use crate::config::ConversionConfig;
use crate::error::{Ocr2MdError, StorageError};
use crate::ocr::{OcrDocument, OcrProvider};
use crate::output::{ConversionPhase, ConversionStats, OutputArtifact};
use crate::pipeline::assemble::assemble_document;
use crate::pipeline::sanitize::{document_base_name, file_name};
use crate::storage::{Storage, StorageCoordinator};
use serde_json::Value;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where the source document comes from.
pub(crate) enum SourceInput<'a> {
    /// A file inside the storage backend.
    Vault(&'a str),
    /// A file on the local filesystem, outside the storage backend.
    Disk(&'a Path),
    /// Bytes already in memory.
    Bytes { file_name: &'a str, bytes: Vec<u8> },
    /// An OCR result that has already been fetched.
    OcrResult { file_name: &'a str, value: Value },
}

impl SourceInput<'_> {
    fn file_name(&self) -> String {
        match self {
            SourceInput::Vault(p) => file_name(p).to_string(),
            SourceInput::Disk(p) => p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            SourceInput::Bytes { file_name, .. } | SourceInput::OcrResult { file_name, .. } => {
                file_name.to_string()
            }
        }
    }
}

/// Assemble and persist an OCR result that has already been fetched.
///
/// `source_name` is the name of the document the result came from
/// (`report.pdf`); its sanitised stem names the output document and prefixes
/// every image file.
///
/// # Errors
/// - [`Ocr2MdError::AlreadyExists`] if the target document is present
/// - [`Ocr2MdError::MalformedResult`] if the result has no pages
/// - [`Ocr2MdError::PathConflict`] if an output folder is blocked by a file
pub async fn convert_ocr_result<S: Storage + ?Sized>(
    ocr_result: Value,
    source_name: &str,
    storage: &S,
    config: &ConversionConfig,
) -> Result<OutputArtifact, Ocr2MdError> {
    let input = SourceInput::OcrResult {
        file_name: source_name,
        value: ocr_result,
    };
    let mut phase = ConversionPhase::Fetched;
    convert_tracked(input, storage, None, config, &mut phase).await
}

/// Run OCR over in-memory bytes and persist the result.
pub async fn convert_bytes<S: Storage + ?Sized>(
    file_name: &str,
    bytes: Vec<u8>,
    storage: &S,
    provider: &dyn OcrProvider,
    config: &ConversionConfig,
) -> Result<OutputArtifact, Ocr2MdError> {
    let input = SourceInput::Bytes { file_name, bytes };
    let mut phase = ConversionPhase::Fetched;
    convert_tracked(input, storage, Some(provider), config, &mut phase).await
}

/// Convert a file from the local filesystem (an externally selected source).
pub async fn convert_file<S: Storage + ?Sized>(
    path: impl AsRef<Path>,
    storage: &S,
    provider: &dyn OcrProvider,
    config: &ConversionConfig,
) -> Result<OutputArtifact, Ocr2MdError> {
    let input = SourceInput::Disk(path.as_ref());
    let mut phase = ConversionPhase::Fetched;
    convert_tracked(input, storage, Some(provider), config, &mut phase).await
}

/// Convert a file that lives inside the storage backend.
pub async fn convert_source<S: Storage + ?Sized>(
    source_path: &str,
    storage: &S,
    provider: &dyn OcrProvider,
    config: &ConversionConfig,
) -> Result<OutputArtifact, Ocr2MdError> {
    let input = SourceInput::Vault(source_path);
    let mut phase = ConversionPhase::Fetched;
    convert_tracked(input, storage, Some(provider), config, &mut phase).await
}

/// The pipeline. `phase` is left at the phase that failed, or `Done`.
pub(crate) async fn convert_tracked<S: Storage + ?Sized>(
    input: SourceInput<'_>,
    storage: &S,
    provider: Option<&dyn OcrProvider>,
    config: &ConversionConfig,
    phase: &mut ConversionPhase,
) -> Result<OutputArtifact, Ocr2MdError> {
    let total_start = Instant::now();
    let source_name = input.file_name();
    let document_base = document_base_name(&source_name);
    let document_path = config.document_path(&document_base);
    let coordinator = StorageCoordinator::new(storage);
    info!("Converting '{}' → '{}'", source_name, document_path);

    // ── Fetched: target check, source read, OCR ──────────────────────────
    *phase = ConversionPhase::Fetched;
    if coordinator.document_exists(&document_path).await? {
        warn!("'{}' already exists, skipping '{}'", document_path, source_name);
        return Err(Ocr2MdError::AlreadyExists {
            path: document_path,
        });
    }

    let ocr_start = Instant::now();
    let value = match input {
        SourceInput::OcrResult { value, .. } => value,
        SourceInput::Bytes { bytes, .. } => run_ocr(provider, &source_name, bytes).await?,
        SourceInput::Disk(path) => {
            let bytes = tokio::fs::read(path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Ocr2MdError::SourceNotFound {
                        path: path.display().to_string(),
                    }
                } else {
                    Ocr2MdError::storage(path.display().to_string(), StorageError::Io(e))
                }
            })?;
            run_ocr(provider, &source_name, bytes).await?
        }
        SourceInput::Vault(path) => {
            let bytes = storage.read_binary(path).await.map_err(|e| match e {
                StorageError::NotFound(_) => Ocr2MdError::SourceNotFound {
                    path: path.to_string(),
                },
                other => Ocr2MdError::storage(path, other),
            })?;
            run_ocr(provider, &source_name, bytes).await?
        }
    };
    let ocr_duration_ms = if provider.is_some() {
        ocr_start.elapsed().as_millis() as u64
    } else {
        0
    };

    // ── Validated ────────────────────────────────────────────────────────
    advance(phase, ConversionPhase::Validated, &source_name);
    let doc = OcrDocument::from_value(value)?;
    debug!("OCR result has {} pages, {} images", doc.pages.len(), doc.image_count());

    // ── Assembling ───────────────────────────────────────────────────────
    advance(phase, ConversionPhase::Assembling, &source_name);
    let assembled = assemble_document(&doc, &document_base, config, &coordinator).await?;

    // ── Persisting ───────────────────────────────────────────────────────
    advance(phase, ConversionPhase::Persisting, &source_name);
    coordinator
        .ensure_folder(&config.document_output_folder)
        .await?;
    coordinator
        .create_document_if_absent(&document_path, &assembled.markdown)
        .await?;

    advance(phase, ConversionPhase::Done, &source_name);

    let stats = ConversionStats {
        pages: assembled.pages,
        images_written: assembled.images.len(),
        images_removed: assembled.image_failures.len(),
        ocr_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Converted '{}': {} pages, {} images ({} removed), {}ms",
        source_name, stats.pages, stats.images_written, stats.images_removed, stats.total_duration_ms
    );

    Ok(OutputArtifact {
        document_path,
        markdown: assembled.markdown,
        images: assembled.images,
        image_failures: assembled.image_failures,
        stats,
    })
}

async fn run_ocr(
    provider: Option<&dyn OcrProvider>,
    file_name: &str,
    bytes: Vec<u8>,
) -> Result<Value, Ocr2MdError> {
    let provider = provider
        .ok_or_else(|| Ocr2MdError::Internal("no OCR provider supplied for a source file".into()))?;
    provider.process(file_name, bytes).await
}

fn advance(phase: &mut ConversionPhase, next: ConversionPhase, source: &str) {
    debug!("'{}': {} → {}", source, phase, next);
    *phase = next;
}
