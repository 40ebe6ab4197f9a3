//! Configuration types for OCR-result-to-document conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`] or deserialised from a host settings
//! file. The config is passed explicitly into every pipeline entry point;
//! there is no global settings object.

use crate::error::Ocr2MdError;
use crate::pipeline::sanitize::{join_path, normalize_path};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default sub-folder that receives extracted images.
pub const DEFAULT_IMAGES_FOLDER_SUBNAME: &str = "pdf-mistral-images";

/// Default number of documents converted concurrently in a batch.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 3;

/// Default OCR endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.mistral.ai";

/// Default OCR model.
pub const DEFAULT_OCR_MODEL: &str = "mistral-ocr-latest";

/// Configuration for a conversion.
///
/// Field names serialise in camelCase so a host settings file
/// (`{"documentOutputFolder": "notes", ...}`) maps onto it directly. Missing
/// fields take their defaults.
///
/// # Example
/// ```rust
/// use edgequake_ocr2md::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .document_output_folder("notes/ocr")
///     .images_output_folder("assets")
///     .concurrency_limit(5)
///     .build()
///     .unwrap();
/// assert_eq!(config.images_folder(), "assets/pdf-mistral-images");
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConversionConfig {
    /// Folder receiving the assembled document. Empty means the storage root.
    pub document_output_folder: String,

    /// Parent folder of the images sub-folder. Empty means the storage root.
    pub images_output_folder: String,

    /// Name of the sub-folder (under `images_output_folder`) receiving images.
    /// Default: `pdf-mistral-images`.
    pub images_folder_subname: String,

    /// Number of documents converted at once in a batch. Default: 3.
    pub concurrency_limit: usize,

    /// OCR provider API key.
    pub api_key: Option<String>,

    /// OCR provider base URL. Default: `https://api.mistral.ai`.
    pub api_base_url: String,

    /// OCR model identifier. Default: `mistral-ocr-latest`.
    pub model: String,

    /// Per-request timeout for provider calls, in seconds. Default: 300.
    ///
    /// OCR of a long PDF is a single request that can run for minutes.
    pub request_timeout_secs: u64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            document_output_folder: String::new(),
            images_output_folder: String::new(),
            images_folder_subname: DEFAULT_IMAGES_FOLDER_SUBNAME.to_string(),
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            model: DEFAULT_OCR_MODEL.to_string(),
            request_timeout_secs: 300,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("document_output_folder", &self.document_output_folder)
            .field("images_output_folder", &self.images_output_folder)
            .field("images_folder_subname", &self.images_folder_subname)
            .field("concurrency_limit", &self.concurrency_limit)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Folder receiving extracted images:
    /// `<images_output_folder>/<images_folder_subname>`.
    pub fn images_folder(&self) -> String {
        join_path(&self.images_output_folder, &self.images_folder_subname)
    }

    /// Path of the assembled document for a sanitised base name.
    pub fn document_path(&self, document_base: &str) -> String {
        join_path(
            &self.document_output_folder,
            &format!("{document_base}.md"),
        )
    }

    /// Check the constraints the builder enforces. Useful after loading a
    /// config from a settings file.
    pub fn validate(&self) -> Result<(), Ocr2MdError> {
        if self.concurrency_limit == 0 {
            return Err(Ocr2MdError::InvalidConfig(
                "Concurrency limit must be ≥ 1".into(),
            ));
        }
        let subname = normalize_path(&self.images_folder_subname);
        if subname.is_empty()
            || subname
                .split('/')
                .any(|seg| seg.trim().is_empty() || seg == "..")
        {
            return Err(Ocr2MdError::InvalidConfig(format!(
                "Images folder sub-name '{}' must name a folder below the images output folder",
                self.images_folder_subname
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(Ocr2MdError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn document_output_folder(mut self, folder: impl Into<String>) -> Self {
        self.config.document_output_folder = folder.into();
        self
    }

    pub fn images_output_folder(mut self, folder: impl Into<String>) -> Self {
        self.config.images_output_folder = folder.into();
        self
    }

    pub fn images_folder_subname(mut self, name: impl Into<String>) -> Self {
        self.config.images_folder_subname = name.into();
        self
    }

    pub fn concurrency_limit(mut self, n: usize) -> Self {
        self.config.concurrency_limit = n.max(1);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Ocr2MdError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_host_settings() {
        let c = ConversionConfig::default();
        assert_eq!(c.document_output_folder, "");
        assert_eq!(c.images_output_folder, "");
        assert_eq!(c.images_folder_subname, "pdf-mistral-images");
        assert_eq!(c.concurrency_limit, 3);
        assert_eq!(c.images_folder(), "pdf-mistral-images");
        assert_eq!(c.document_path("report"), "report.md");
    }

    #[test]
    fn derived_paths_use_folders() {
        let c = ConversionConfig::builder()
            .document_output_folder("notes/ocr/")
            .images_output_folder("assets")
            .images_folder_subname("scans")
            .build()
            .unwrap();
        assert_eq!(c.document_path("report"), "notes/ocr/report.md");
        assert_eq!(c.images_folder(), "assets/scans");
    }

    #[test]
    fn builder_clamps_concurrency() {
        let c = ConversionConfig::builder()
            .concurrency_limit(0)
            .build()
            .unwrap();
        assert_eq!(c.concurrency_limit, 1);
    }

    #[test]
    fn validate_rejects_zero_concurrency_from_settings() {
        let c: ConversionConfig = serde_json::from_str(r#"{"concurrencyLimit": 0}"#).unwrap();
        assert!(matches!(c.validate(), Err(Ocr2MdError::InvalidConfig(_))));
    }

    #[test]
    fn validate_rejects_blank_subname() {
        let err = ConversionConfig::builder()
            .images_folder_subname("  / ")
            .build();
        assert!(err.is_err());
        assert!(ConversionConfig::builder()
            .images_folder_subname("/")
            .build()
            .is_err());
        assert!(ConversionConfig::builder()
            .images_folder_subname("")
            .build()
            .is_err());
    }

    #[test]
    fn validate_rejects_subname_escaping_images_folder() {
        let err = ConversionConfig::builder()
            .images_output_folder("assets")
            .images_folder_subname("../elsewhere")
            .build();
        assert!(matches!(err, Err(Ocr2MdError::InvalidConfig(_))));
    }

    #[test]
    fn settings_json_uses_camel_case_and_defaults() {
        let c: ConversionConfig = serde_json::from_str(
            r#"{"documentOutputFolder": "docs", "concurrencyLimit": 7}"#,
        )
        .unwrap();
        assert_eq!(c.document_output_folder, "docs");
        assert_eq!(c.concurrency_limit, 7);
        assert_eq!(c.images_folder_subname, DEFAULT_IMAGES_FOLDER_SUBNAME);
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = ConversionConfig::builder()
            .api_key("sk-secret")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
