//! Integration tests for the batch worker pool.
//!
//! Run with:
//!   RUST_LOG=edgequake_ocr2md=debug cargo test --test batch -- --nocapture

use async_trait::async_trait;
use edgequake_ocr2md::{
    convert_batch, discover_sources, ConversionConfig, ConversionProgressCallback,
    DocumentOutcome, MemoryStorage, Ocr2MdError, OcrProvider, ProgressCallback, UpstreamStage,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Echoes the file name as page text, fails for names containing "bad", and
/// tracks how many calls are in flight at once.
#[derive(Default)]
struct TrackingProvider {
    seen: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl TrackingProvider {
    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn seen(&self) -> HashMap<String, usize> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl OcrProvider for TrackingProvider {
    async fn process(&self, file_name: &str, _bytes: Vec<u8>) -> Result<Value, Ocr2MdError> {
        *self
            .seen
            .lock()
            .unwrap()
            .entry(file_name.to_string())
            .or_default() += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if file_name.contains("bad") {
            return Err(Ocr2MdError::UpstreamFailure {
                stage: UpstreamStage::Process,
                detail: "HTTP 500".into(),
            });
        }
        Ok(json!({ "pages": [ { "index": 0, "markdown": file_name } ] }))
    }
}

/// Route library logs through the test harness; `RUST_LOG` picks the level.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn vault_with(names: &[&str]) -> MemoryStorage {
    init_tracing();
    let vault = MemoryStorage::new();
    for name in names {
        vault.insert_file(&format!("inbox/{name}"), "%PDF-1.7");
    }
    vault
}

fn config(workers: usize) -> ConversionConfig {
    ConversionConfig::builder()
        .document_output_folder("OCR")
        .concurrency_limit(workers)
        .build()
        .unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn every_source_processed_exactly_once() {
    let names: Vec<String> = (0..10).map(|i| format!("doc{i}.pdf")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let vault = vault_with(&refs);
    let provider = TrackingProvider::default();

    let sources = discover_sources(&vault).await.unwrap();
    assert_eq!(sources.len(), 10);

    let summary = convert_batch(sources, &vault, &provider, &config(3), None).await;

    assert_eq!(summary.succeeded, 10);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.reports.len(), 10);
    let seen = provider.seen();
    assert_eq!(seen.len(), 10);
    assert!(seen.values().all(|&n| n == 1));
    for name in &names {
        let stem = name.trim_end_matches(".pdf");
        assert!(vault.text(&format!("OCR/{stem}.md")).is_some(), "{stem}");
    }
}

#[tokio::test]
async fn in_flight_documents_bounded_by_limit() {
    let names: Vec<String> = (0..8).map(|i| format!("d{i}.pdf")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let vault = vault_with(&refs);
    let provider = TrackingProvider::default();
    let sources = discover_sources(&vault).await.unwrap();

    convert_batch(sources, &vault, &provider, &config(2), None).await;
    assert!(provider.peak() <= 2, "peak {}", provider.peak());
    assert!(provider.peak() >= 1);
}

#[tokio::test]
async fn failures_are_contained_and_counted() {
    let vault = vault_with(&["a.pdf", "bad-1.pdf", "b.pdf", "bad-2.pdf", "c.pdf"]);
    vault.insert_file("OCR/c.md", "already here");
    let provider = TrackingProvider::default();
    let sources = discover_sources(&vault).await.unwrap();

    let summary = convert_batch(sources, &vault, &provider, &config(3), None).await;

    assert_eq!(summary.total(), 5);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 3);
    assert_eq!(summary.already_existed, 1);
    assert_eq!(vault.text("OCR/c.md").as_deref(), Some("already here"));
    // existing target never reached the provider
    assert!(!provider.seen().contains_key("c.pdf"));

    let failed: Vec<&str> = summary
        .reports
        .iter()
        .filter(|r| matches!(r.outcome, DocumentOutcome::Failed { .. }))
        .map(|r| r.source.as_str())
        .collect();
    assert_eq!(failed.len(), 2);
    assert!(failed.iter().all(|s| s.contains("bad")));
}

#[tokio::test]
async fn limit_larger_than_queue_is_fine() {
    let vault = vault_with(&["only.pdf"]);
    let provider = TrackingProvider::default();
    let summary = convert_batch(
        vec!["inbox/only.pdf".into()],
        &vault,
        &provider,
        &config(16),
        None,
    )
    .await;
    assert_eq!(summary.succeeded, 1);
}

#[derive(Default)]
struct Events {
    started: AtomicUsize,
    completed: AtomicUsize,
    errored: AtomicUsize,
    total: AtomicUsize,
    final_counts: Mutex<Option<(usize, usize)>>,
}

impl ConversionProgressCallback for Events {
    fn on_batch_start(&self, total_documents: usize) {
        self.total.store(total_documents, Ordering::SeqCst);
    }
    fn on_document_start(&self, _source: &str) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }
    fn on_document_complete(&self, _source: &str, _document_path: &str) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
    fn on_document_error(&self, _source: &str, _error: &str) {
        self.errored.fetch_add(1, Ordering::SeqCst);
    }
    fn on_batch_complete(&self, succeeded: usize, failed: usize) {
        *self.final_counts.lock().unwrap() = Some((succeeded, failed));
    }
}

#[tokio::test]
async fn progress_callback_sees_every_document() {
    let vault = vault_with(&["a.pdf", "bad.pdf", "b.pdf"]);
    let provider = TrackingProvider::default();
    let events = Arc::new(Events::default());
    let cb: ProgressCallback = events.clone();
    let sources = discover_sources(&vault).await.unwrap();

    convert_batch(sources, &vault, &provider, &config(2), Some(cb)).await;

    assert_eq!(events.total.load(Ordering::SeqCst), 3);
    assert_eq!(events.started.load(Ordering::SeqCst), 3);
    assert_eq!(events.completed.load(Ordering::SeqCst), 2);
    assert_eq!(events.errored.load(Ordering::SeqCst), 1);
    assert_eq!(*events.final_counts.lock().unwrap(), Some((2, 1)));
}
