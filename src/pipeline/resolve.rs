//! Image payload resolution: data-URL or raw base64 → bytes + extension.
//!
//! OCR providers return each embedded figure as a string. Depending on the
//! provider and request options that string is a full data URL
//! (`data:image/png;base64,iVBOR...`), bare base64 with no prefix, or a
//! shortened placeholder (`iVBOR...`) when image payloads were not requested.
//!
//! Resolution is a pure function of `(id, payload)`: the same inputs always
//! produce the same bytes and extension.
//!
//! ## Extension inference order
//!
//! 1. declared mime type of a data URL
//! 2. trailing extension of the image id (`img-0.jpeg` → `jpg`)
//! 3. magic-number sniffing of the decoded bytes
//! 4. `bin`

use crate::error::UnresolvableReason;
use crate::pipeline::sanitize::extension_of;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Extension used when nothing identifies the format.
pub const FALLBACK_EXTENSION: &str = "bin";

/// A decoded image ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub bytes: Vec<u8>,
    /// Canonical extension without the leading dot.
    pub extension: String,
}

/// Standard alphabet, padding optional. Some providers strip the `=` tail.
static BASE64: Lazy<GeneralPurpose> = Lazy::new(|| {
    GeneralPurpose::new(
        &alphabet::STANDARD,
        GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
    )
});

static RE_DATA_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^data:([a-z0-9.+-]+/[a-z0-9.+-]+)?(?:;[^,;]*)*?;base64,(.*)$").unwrap()
});

/// Resolve one image payload.
///
/// # Errors
/// Returns an [`UnresolvableReason`] when the payload is missing, a truncated
/// placeholder, not base64, or decodes to nothing.
pub fn resolve_image(id: &str, payload: &str) -> Result<ResolvedImage, UnresolvableReason> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(UnresolvableReason::Empty);
    }
    if is_truncated(payload) {
        return Err(UnresolvableReason::Truncated);
    }

    let (mime, body) = match RE_DATA_URL.captures(payload) {
        Some(caps) => (
            caps.get(1).map(|m| m.as_str().to_ascii_lowercase()),
            caps.get(2).map(|m| m.as_str()).unwrap_or(""),
        ),
        None => (None, payload),
    };

    let bytes = decode_base64(body).ok_or(UnresolvableReason::InvalidBase64)?;
    if bytes.is_empty() {
        return Err(UnresolvableReason::EmptyBytes);
    }

    let extension = mime
        .as_deref()
        .and_then(extension_for_mime)
        .or_else(|| extension_of(id).as_deref().and_then(canonical_extension))
        .or_else(|| sniff_extension(&bytes))
        .unwrap_or(FALLBACK_EXTENSION)
        .to_string();

    debug!(
        id,
        mime = mime.as_deref().unwrap_or("-"),
        bytes = bytes.len(),
        extension = %extension,
        "Resolved image payload"
    );

    Ok(ResolvedImage { bytes, extension })
}

/// Providers shorten omitted payloads to a prefix followed by an ellipsis.
fn is_truncated(payload: &str) -> bool {
    payload.ends_with("...") || payload.ends_with('\u{2026}')
}

fn decode_base64(body: &str) -> Option<Vec<u8>> {
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    BASE64.decode(compact.as_bytes()).ok()
}

/// Map a mime type to its canonical extension.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let ext = match mime.trim().to_ascii_lowercase().as_str() {
        "image/png" | "image/x-png" | "image/apng" => "png",
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/bmp" | "image/x-bmp" | "image/x-ms-bmp" => "bmp",
        "image/tiff" | "image/tiff-fx" => "tiff",
        "image/avif" => "avif",
        "image/x-icon" | "image/vnd.microsoft.icon" => "ico",
        _ => return None,
    };
    Some(ext)
}

/// Normalise a file extension, folding alternate spellings together.
/// Unknown extensions are rejected so a stray `.v2` in an id is not trusted.
pub fn canonical_extension(ext: &str) -> Option<&'static str> {
    let ext = match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "png" => "png",
        "jpg" | "jpeg" | "jpe" | "jfif" => "jpg",
        "gif" => "gif",
        "webp" => "webp",
        "svg" => "svg",
        "bmp" | "dib" => "bmp",
        "tif" | "tiff" => "tiff",
        "avif" => "avif",
        "ico" => "ico",
        _ => return None,
    };
    Some(ext)
}

/// Identify the format from the first bytes of the buffer.
pub fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "png"),
        (b"\xFF\xD8\xFF", "jpg"),
        (b"GIF87a", "gif"),
        (b"GIF89a", "gif"),
        (b"BM", "bmp"),
        (b"II*\x00", "tiff"),
        (b"MM\x00*", "tiff"),
        (b"\x00\x00\x01\x00", "ico"),
    ];

    if let Some((_, ext)) = SIGNATURES.iter().find(|(sig, _)| bytes.starts_with(sig)) {
        return Some(*ext);
    }
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("webp");
    }
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" && matches!(&bytes[8..12], b"avif" | b"avis") {
        return Some("avif");
    }
    if looks_like_svg(bytes) {
        return Some("svg");
    }
    None
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{FEFF}').trim_start();
    text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg"))
}
