//! Progress-callback trait for per-document batch events.
//!
//! Pass an [`Arc<dyn ConversionProgressCallback>`] to
//! [`crate::batch::convert_batch`] to receive events as workers pick up and
//! finish documents.
//!
//! # Why callbacks instead of channels?
//!
//! Callers can forward events to a terminal progress bar, a log, or a host
//! notification without the library knowing how the host communicates. The
//! trait is `Send + Sync` because several workers report concurrently.
//!
//! # Example
//!
//! ```rust
//! use edgequake_ocr2md::ConversionProgressCallback;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     finished: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, source: &str, document_path: &str) {
//!         let done = self.finished.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("#{done}: {source} → {document_path}");
//!     }
//! }
//!
//! let cb: Arc<dyn ConversionProgressCallback> =
//!     Arc::new(CountingCallback { finished: AtomicUsize::new(0) });
//! cb.on_document_complete("in/a.pdf", "a.md");
//! ```

use std::sync::Arc;

/// Called by the batch runner as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// `on_document_start`, `on_document_complete` and `on_document_error` may
/// be called concurrently from different workers. Implementations must
/// protect shared mutable state (e.g. `Mutex`, `AtomicUsize`).
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before any worker starts.
    ///
    /// # Arguments
    /// * `total_documents` — number of sources queued
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called when a worker claims a source.
    fn on_document_start(&self, source: &str) {
        let _ = source;
    }

    /// Called when a source was converted and its document written.
    ///
    /// # Arguments
    /// * `source`        — vault path of the source file
    /// * `document_path` — vault path of the new document
    fn on_document_complete(&self, source: &str, document_path: &str) {
        let _ = (source, document_path);
    }

    /// Called when a source did not produce a document, including when the
    /// target document already existed.
    ///
    /// # Arguments
    /// * `source` — vault path of the source file
    /// * `error`  — human-readable error description
    fn on_document_error(&self, source: &str, error: &str) {
        let _ = (source, error);
    }

    /// Called once after the queue is drained.
    fn on_batch_complete(&self, succeeded: usize, failed: usize) {
        let _ = (succeeded, failed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias for the shared callback handle.
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        total: AtomicUsize,
        succeeded: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total_documents: usize) {
            self.total.store(total_documents, Ordering::SeqCst);
        }

        fn on_document_start(&self, _source: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _source: &str, _document_path: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_error(&self, _source: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, succeeded: usize, _failed: usize) {
            self.succeeded.store(succeeded, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_document_start("a.pdf");
        cb.on_document_complete("a.pdf", "a.md");
        cb.on_document_error("b.pdf", "boom");
        cb.on_batch_complete(1, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_batch_start(3);
        tracker.on_document_start("a.pdf");
        tracker.on_document_complete("a.pdf", "a.md");
        tracker.on_document_start("b.pdf");
        tracker.on_document_complete("b.pdf", "b.md");
        tracker.on_document_start("c.pdf");
        tracker.on_document_error("c.pdf", "upload failed");
        tracker.on_batch_complete(2, 1);

        assert_eq!(tracker.total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.succeeded.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(10);
        cb.on_document_start("x.pdf");
    }
}
