//! Batch conversion: a bounded worker pool over a shared queue.
//!
//! ```text
//!            ┌─────────── worker 1 ──┐
//! queue ─────┼─────────── worker 2 ──┼──▶ BatchSummary
//! (VecDeque) └─────────── worker N ──┘
//! ```
//!
//! Each worker loops "pop next source, run the single-document pipeline,
//! record the outcome" until the queue is empty. The pop is the only
//! critical section; the lock is never held across an await. Workers run
//! cooperatively on the caller's task via [`futures::future::join_all`], so
//! the storage and provider only need to be borrowed, not `'static`.
//!
//! A failing document is counted and reported; it never stops other workers.

use crate::config::ConversionConfig;
use crate::convert::{convert_tracked, SourceInput};
use crate::error::{Ocr2MdError, StorageError};
use crate::ocr::OcrProvider;
use crate::output::{BatchSummary, ConversionPhase, DocumentOutcome, DocumentReport};
use crate::pipeline::sanitize::extension_of;
use crate::progress::ProgressCallback;
use crate::storage::Storage;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Extension (lower-case) of files picked up by [`discover_sources`].
pub const SOURCE_EXTENSION: &str = "pdf";

/// List every `.pdf` file in the vault, sorted by path.
pub async fn discover_sources<S: Storage + ?Sized>(storage: &S) -> Result<Vec<String>, StorageError> {
    let mut sources = storage
        .list_files(&|path: &str| extension_of(path).as_deref() == Some(SOURCE_EXTENSION))
        .await?;
    sources.sort();
    debug!("Discovered {} source files", sources.len());
    Ok(sources)
}

/// Convert every source with at most `config.concurrency_limit` documents
/// in flight.
///
/// Returns one [`DocumentReport`] per source. `succeeded + failed` equals
/// `sources.len()`; an already-existing target counts as a failure and is
/// also tallied in `already_existed`.
pub async fn convert_batch<S: Storage + ?Sized>(
    sources: Vec<String>,
    storage: &S,
    provider: &dyn OcrProvider,
    config: &ConversionConfig,
    progress: Option<ProgressCallback>,
) -> BatchSummary {
    let total = sources.len();
    let workers = config.concurrency_limit.max(1).min(total.max(1));
    info!("Batch: {} documents, {} workers", total, workers);

    if let Some(cb) = &progress {
        cb.on_batch_start(total);
    }

    let shared = Shared {
        queue: Mutex::new(sources.into()),
        reports: Mutex::new(Vec::with_capacity(total)),
        succeeded: AtomicUsize::new(0),
        failed: AtomicUsize::new(0),
        already_existed: AtomicUsize::new(0),
    };

    futures::future::join_all(
        (0..workers).map(|id| worker(id, &shared, storage, provider, config, progress.as_ref())),
    )
    .await;

    let summary = BatchSummary {
        succeeded: shared.succeeded.load(Ordering::SeqCst),
        failed: shared.failed.load(Ordering::SeqCst),
        already_existed: shared.already_existed.load(Ordering::SeqCst),
        reports: shared
            .reports
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner),
    };

    if let Some(cb) = &progress {
        cb.on_batch_complete(summary.succeeded, summary.failed);
    }
    info!(
        "Batch done: {} succeeded, {} failed ({} already existed)",
        summary.succeeded, summary.failed, summary.already_existed
    );
    summary
}

struct Shared {
    queue: Mutex<VecDeque<String>>,
    reports: Mutex<Vec<DocumentReport>>,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    already_existed: AtomicUsize,
}

impl Shared {
    fn next(&self) -> Option<String> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn record(&self, report: DocumentReport) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report);
    }
}

async fn worker<S: Storage + ?Sized>(
    id: usize,
    shared: &Shared,
    storage: &S,
    provider: &dyn OcrProvider,
    config: &ConversionConfig,
    progress: Option<&ProgressCallback>,
) {
    while let Some(source) = shared.next() {
        debug!("Worker {} claimed '{}'", id, source);
        if let Some(cb) = progress {
            cb.on_document_start(&source);
        }

        let mut phase = ConversionPhase::Fetched;
        let result = convert_tracked(
            SourceInput::Vault(&source),
            storage,
            Some(provider),
            config,
            &mut phase,
        )
        .await;

        let outcome = match result {
            Ok(artifact) => {
                shared.succeeded.fetch_add(1, Ordering::SeqCst);
                if let Some(cb) = progress {
                    cb.on_document_complete(&source, &artifact.document_path);
                }
                DocumentOutcome::Converted {
                    document_path: artifact.document_path,
                    stats: artifact.stats,
                }
            }
            Err(e) => {
                shared.failed.fetch_add(1, Ordering::SeqCst);
                if let Some(cb) = progress {
                    cb.on_document_error(&source, &e.to_string());
                }
                match e {
                    Ocr2MdError::AlreadyExists { path } => {
                        shared.already_existed.fetch_add(1, Ordering::SeqCst);
                        DocumentOutcome::AlreadyExists {
                            document_path: path,
                        }
                    }
                    other => {
                        warn!("'{}' failed during {}: {}", source, phase, other);
                        DocumentOutcome::Failed {
                            phase,
                            error: other.to_string(),
                        }
                    }
                }
            }
        };

        shared.record(DocumentReport { source, outcome });
    }
    debug!("Worker {} finished", id);
}
