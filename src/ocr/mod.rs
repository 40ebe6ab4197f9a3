//! OCR result model and provider boundary.
//!
//! The OCR provider is a black box that turns a source file into an untyped
//! JSON result. [`OcrDocument::from_value`] is the single place where that
//! JSON is checked and converted into typed pages; nothing downstream sees
//! `serde_json::Value`.
//!
//! Accepted shape (extra fields are ignored):
//!
//! ```json
//! { "pages": [
//!     { "index": 0,
//!       "markdown": "# Title\n![img-0.jpeg](img-0.jpeg)",
//!       "images": [ { "id": "img-0.jpeg", "image_base64": "data:image/jpeg;base64,..." } ] }
//! ] }
//! ```
//!
//! `markdown` may also be spelled `markdown_content`/`markdownContent`, and
//! the payload field `imageBase64`.

pub mod mistral;

use crate::error::Ocr2MdError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

pub use mistral::MistralOcrClient;

/// A provider that turns a source file into an untyped OCR result.
///
/// Implementations perform the network calls (upload, signing, OCR) and
/// report any failure as [`Ocr2MdError::UpstreamFailure`]. They are never
/// retried by this crate.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    /// Run OCR over `bytes`, which were read from a file named `file_name`.
    async fn process(&self, file_name: &str, bytes: Vec<u8>) -> Result<Value, Ocr2MdError>;
}

/// A validated OCR result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrDocument {
    /// Pages in provider order. Never empty.
    pub pages: Vec<Page>,
}

/// One OCR page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub index: i64,
    pub markdown: String,
    pub images: Vec<ImageReference>,
}

/// An image referenced from page text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageReference {
    /// Marker key inside the page text. May be blank.
    pub id: String,
    /// Data URL or raw base64. May be blank or truncated.
    pub payload: String,
}

// ── Wire shape ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawResult {
    pages: Option<Vec<RawPage>>,
}

#[derive(Deserialize)]
struct RawPage {
    index: Option<Value>,
    #[serde(alias = "markdown_content", alias = "markdownContent")]
    markdown: Option<String>,
    #[serde(default)]
    images: Option<Vec<RawImage>>,
}

#[derive(Deserialize)]
struct RawImage {
    id: Option<String>,
    #[serde(alias = "imageBase64")]
    image_base64: Option<String>,
}

impl OcrDocument {
    /// Parse and validate an untyped OCR result.
    ///
    /// # Errors
    /// [`Ocr2MdError::MalformedResult`] when the value is not an object with
    /// a non-empty `pages` array, or a page lacks an integer `index`.
    pub fn from_value(value: Value) -> Result<Self, Ocr2MdError> {
        let raw: RawResult = serde_json::from_value(value).map_err(|e| malformed(e.to_string()))?;
        let raw_pages = raw.pages.ok_or_else(|| malformed("result has no 'pages' field"))?;
        if raw_pages.is_empty() {
            return Err(malformed("result contains no pages"));
        }

        let pages = raw_pages
            .into_iter()
            .enumerate()
            .map(|(pos, p)| {
                let index = p
                    .index
                    .as_ref()
                    .and_then(page_index)
                    .ok_or_else(|| malformed(format!("page at position {pos} has no integer 'index'")))?;
                let images = p
                    .images
                    .unwrap_or_default()
                    .into_iter()
                    .map(|img| ImageReference {
                        id: img.id.unwrap_or_default(),
                        payload: img.image_base64.unwrap_or_default(),
                    })
                    .collect();
                Ok(Page {
                    index,
                    markdown: p.markdown.unwrap_or_default(),
                    images,
                })
            })
            .collect::<Result<Vec<_>, Ocr2MdError>>()?;

        Ok(Self { pages })
    }

    /// Parse and validate an OCR result from JSON text.
    pub fn from_json(json: &str) -> Result<Self, Ocr2MdError> {
        let value: Value = serde_json::from_str(json).map_err(|e| malformed(e.to_string()))?;
        Self::from_value(value)
    }

    /// Pages in ascending index order; equal indices keep provider order.
    pub fn ordered_pages(&self) -> Vec<&Page> {
        let mut pages: Vec<&Page> = self.pages.iter().collect();
        pages.sort_by_key(|p| p.index);
        pages
    }

    /// Total number of image references across all pages.
    pub fn image_count(&self) -> usize {
        self.pages.iter().map(|p| p.images.len()).sum()
    }
}

/// Integer page index; accepts integral floats (`2.0`) some encoders emit.
fn page_index(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        _ => None,
    }
}

fn malformed(reason: impl Into<String>) -> Ocr2MdError {
    Ocr2MdError::MalformedResult {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_full_shape() {
        let doc = OcrDocument::from_value(json!({
            "pages": [
                { "index": 1, "markdown": "second", "images": [] },
                { "index": 0, "markdown": "first",
                  "images": [ { "id": "img-0.jpeg", "image_base64": "abc" } ] }
            ],
            "model": "mistral-ocr-latest"
        }))
        .unwrap();
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[1].images[0].id, "img-0.jpeg");
        assert_eq!(doc.pages[1].images[0].payload, "abc");
        assert_eq!(doc.image_count(), 1);
    }

    #[test]
    fn test_alternate_field_spellings() {
        let doc = OcrDocument::from_value(json!({
            "pages": [
                { "index": 0, "markdownContent": "a",
                  "images": [ { "id": "x", "imageBase64": "p" } ] },
                { "index": 1, "markdown_content": "b" }
            ]
        }))
        .unwrap();
        assert_eq!(doc.pages[0].markdown, "a");
        assert_eq!(doc.pages[0].images[0].payload, "p");
        assert_eq!(doc.pages[1].markdown, "b");
        assert!(doc.pages[1].images.is_empty());
    }

    #[test]
    fn test_missing_fields_default() {
        let doc = OcrDocument::from_value(json!({
            "pages": [ { "index": 0, "images": [ { "id": null } ] } ]
        }))
        .unwrap();
        assert_eq!(doc.pages[0].markdown, "");
        assert_eq!(doc.pages[0].images[0], ImageReference::default());
    }

    #[test]
    fn test_no_pages_is_malformed() {
        for v in [json!({}), json!({ "pages": [] }), json!([1, 2]), json!("text")] {
            let err = OcrDocument::from_value(v).unwrap_err();
            assert!(matches!(err, Ocr2MdError::MalformedResult { .. }), "got {err:?}");
        }
    }

    #[test]
    fn test_page_without_index_is_malformed() {
        let err = OcrDocument::from_value(json!({ "pages": [ { "markdown": "x" } ] })).unwrap_err();
        assert!(err.to_string().contains("index"), "got: {err}");
        let err = OcrDocument::from_value(json!({ "pages": [ { "index": "0" } ] })).unwrap_err();
        assert!(matches!(err, Ocr2MdError::MalformedResult { .. }));
    }

    #[test]
    fn test_integral_float_index() {
        let doc = OcrDocument::from_value(json!({ "pages": [ { "index": 2.0 } ] })).unwrap();
        assert_eq!(doc.pages[0].index, 2);
        assert!(OcrDocument::from_value(json!({ "pages": [ { "index": 1.5 } ] })).is_err());
    }

    #[test]
    fn test_ordered_pages_is_stable() {
        let doc = OcrDocument::from_value(json!({
            "pages": [
                { "index": 2, "markdown": "c" },
                { "index": 0, "markdown": "a1" },
                { "index": 1, "markdown": "b" },
                { "index": 0, "markdown": "a2" }
            ]
        }))
        .unwrap();
        let order: Vec<&str> = doc.ordered_pages().iter().map(|p| p.markdown.as_str()).collect();
        assert_eq!(order, vec!["a1", "a2", "b", "c"]);
    }

    #[test]
    fn test_from_json_rejects_bad_json() {
        assert!(matches!(
            OcrDocument::from_json("{not json"),
            Err(Ocr2MdError::MalformedResult { .. })
        ));
    }
}
