//! Page assembly: ordered pages → one Markdown document with stored images.
//!
//! Pages are processed strictly one after another, and images within a page
//! one after another: each image is decoded, written, and its marker
//! rewritten before the next one is touched, so at most one decoded image is
//! held in memory at a time.
//!
//! A failed image never fails the page. Its marker is removed, the failure is
//! recorded, and assembly continues.
//!
//! The images folder is created just before the first image that decodes, so
//! a document whose payloads are all unusable leaves no empty folder behind.

use crate::config::ConversionConfig;
use crate::error::{ImageError, Ocr2MdError};
use crate::ocr::{ImageReference, OcrDocument};
use crate::output::WrittenImage;
use crate::pipeline::resolve::{resolve_image, ResolvedImage};
use crate::pipeline::rewrite::{embed_marker, rewrite_or_remove_marker};
use crate::pipeline::sanitize::{fallback_image_id, join_path, sanitize_fragment, strip_extension};
use crate::storage::{Storage, StorageCoordinator};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Separator appended after every page.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// The assembled text plus what happened to each image.
#[derive(Debug, Clone, Default)]
pub struct AssembledDocument {
    pub markdown: String,
    pub pages: usize,
    pub images: Vec<WrittenImage>,
    pub image_failures: Vec<ImageError>,
}

/// Assemble `doc` into Markdown, writing its images through `coordinator`.
///
/// `document_base` must already be sanitised; it prefixes every image file
/// name (`<document_base>_<image_base>.<ext>`).
///
/// # Errors
/// Only folder problems for the images folder are fatal
/// ([`Ocr2MdError::PathConflict`], [`Ocr2MdError::Storage`]).
pub async fn assemble_document<S: Storage + ?Sized>(
    doc: &OcrDocument,
    document_base: &str,
    config: &ConversionConfig,
    coordinator: &StorageCoordinator<'_, S>,
) -> Result<AssembledDocument, Ocr2MdError> {
    let images_folder = config.images_folder();
    let mut images_folder_ready = false;

    let mut out = AssembledDocument::default();
    let mut used_names: HashSet<String> = HashSet::new();

    for page in doc.ordered_pages() {
        let mut text = page.markdown.clone();

        for (position, image) in page.images.iter().enumerate() {
            let outcome = match resolve_image(&image.id, &image.payload) {
                Err(reason) => Err(ImageError::Unresolvable {
                    id: image.id.clone(),
                    reason,
                }),
                Ok(resolved) => {
                    if !images_folder_ready {
                        coordinator.ensure_folder(&images_folder).await?;
                        images_folder_ready = true;
                    }
                    store_image(
                        image,
                        resolved,
                        page.index,
                        position,
                        document_base,
                        &images_folder,
                        &mut used_names,
                        coordinator,
                    )
                    .await
                }
            };

            let marker_id = image.id.trim();
            match outcome {
                Ok(written) => {
                    text = rewrite_or_remove_marker(&text, marker_id, Some(&embed_marker(&written.path)))
                        .into_owned();
                    out.images.push(written);
                }
                Err(failure) => {
                    warn!(page = page.index, position, "{}", failure);
                    text = rewrite_or_remove_marker(&text, marker_id, None).into_owned();
                    out.image_failures.push(failure);
                }
            }
        }

        out.markdown.push_str(&text);
        out.markdown.push_str(PAGE_SEPARATOR);
        out.pages += 1;
    }

    debug!(
        pages = out.pages,
        images = out.images.len(),
        failed = out.image_failures.len(),
        "Assembled document"
    );
    Ok(out)
}

/// Write one decoded image, returning where it went.
#[allow(clippy::too_many_arguments)]
async fn store_image<S: Storage + ?Sized>(
    image: &ImageReference,
    resolved: ResolvedImage,
    page_index: i64,
    position: usize,
    document_base: &str,
    images_folder: &str,
    used_names: &mut HashSet<String>,
    coordinator: &StorageCoordinator<'_, S>,
) -> Result<WrittenImage, ImageError> {
    let file_name = unique_file_name(
        document_base,
        &image.id,
        page_index,
        position,
        &resolved.extension,
        used_names,
    );
    let path = join_path(images_folder, &file_name);

    coordinator
        .write_image(&path, &resolved.bytes)
        .await
        .map_err(|e| ImageError::PersistFailed {
            path: path.clone(),
            detail: e.to_string(),
        })?;

    debug!("Wrote image '{}' ({} bytes)", path, resolved.bytes.len());
    Ok(WrittenImage {
        id: image.id.clone(),
        page_index,
        path,
        size_bytes: resolved.bytes.len(),
    })
}

/// `<document_base>_<image_base>.<ext>`, unique within this document.
///
/// Blank ids use `img-<page>-<position>`. If the sanitised id clashes with a
/// name already used in this document, the positional id is used instead,
/// and a numeric suffix is added if even that is taken.
fn unique_file_name(
    document_base: &str,
    image_id: &str,
    page_index: i64,
    position: usize,
    extension: &str,
    used: &mut HashSet<String>,
) -> String {
    let fallback = fallback_image_id(page_index, position);
    let sanitized = sanitize_fragment(strip_extension(image_id.trim()));
    let base = if sanitized.is_empty() {
        fallback.clone()
    } else {
        sanitized
    };

    let mut name = format!("{document_base}_{base}.{extension}");
    if used.contains(&name) {
        name = format!("{document_base}_{fallback}.{extension}");
    }
    let mut n = 1;
    while used.contains(&name) {
        name = format!("{document_base}_{fallback}-{n}.{extension}");
        n += 1;
    }
    used.insert(name.clone());
    name
}
