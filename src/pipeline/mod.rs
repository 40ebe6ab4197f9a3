//! Pipeline stages for turning an OCR result into a stored Markdown document.
//!
//! Each submodule implements exactly one transformation step and none of
//! them talk to the OCR provider; that happens in [`crate::ocr`] before the
//! pipeline starts.
//!
//! ## Data Flow
//!
//! ```text
//! pages ──▶ resolve ──▶ sanitize ──▶ store ──▶ rewrite ──▶ assemble
//!          (base64)    (file name)  (vault)   (marker)    (join pages)
//! ```
//!
//! 1. [`resolve`]  — decode an image payload and pick its file extension
//! 2. [`sanitize`] — make identifiers safe as vault file names
//! 3. [`rewrite`]  — swap an image's Markdown marker for a vault embed, or
//!    drop it when the image could not be stored
//! 4. [`assemble`] — walk pages in index order, drive the steps above for
//!    every image, and join the page texts

pub mod assemble;
pub mod resolve;
pub mod rewrite;
pub mod sanitize;
