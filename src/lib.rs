//! # edgequake-ocr2md
//!
//! Turn page-structured OCR results into a single Markdown document whose
//! images are decoded, stored in the vault and linked with `![[path]]`
//! embeds.
//!
//! ## Why this crate?
//!
//! OCR services such as Mistral OCR return one Markdown fragment per page
//! plus every figure as base64, referenced from the text with
//! `![alt](img-0.jpeg)`. Those references point nowhere once the text is
//! saved. This crate resolves each payload to real bytes, gives it a stable
//! collision-free file name, writes it, and rewrites the reference, without
//! ever overwriting an existing document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source file
//!  │
//!  ├─ 1. Fetch     read the source, check the target is free, run OCR
//!  ├─ 2. Validate  parse pages, reject results without pages
//!  ├─ 3. Assemble  pages in index order; per image: decode → write → rewrite
//!  └─ 4. Persist   create the document (never clobbers)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_ocr2md::{convert_file, ConversionConfig, FsStorage, MistralOcrClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .api_key(std::env::var("MISTRAL_API_KEY")?)
//!         .document_output_folder("OCR")
//!         .build()?;
//!     let vault = FsStorage::new("./vault");
//!     let client = MistralOcrClient::from_config(&config)?;
//!     let output = convert_file("scan.pdf", &vault, &client, &config).await?;
//!     eprintln!("{} ({} images)", output.document_path, output.stats.images_written);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ocr2md` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-ocr2md = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod ocr;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{convert_batch, discover_sources};
pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{convert_bytes, convert_file, convert_ocr_result, convert_source};
pub use error::{ImageError, Ocr2MdError, StorageError, UnresolvableReason, UpstreamStage};
pub use ocr::{ImageReference, MistralOcrClient, OcrDocument, OcrProvider, Page};
pub use output::{
    BatchSummary, ConversionPhase, ConversionStats, DocumentOutcome, DocumentReport,
    OutputArtifact, WrittenImage,
};
pub use pipeline::rewrite::rewrite_or_remove_marker;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use storage::{EntryKind, FsStorage, MemoryStorage, Storage, StorageCoordinator};
