//! Mistral OCR client: upload → sign → process.
//!
//! The OCR endpoint reads documents from a URL, so a local file is first
//! uploaded to the files API (`purpose=ocr`), then exchanged for a short-lived
//! signed URL, which is finally handed to `/v1/ocr` with
//! `include_image_base64` set so figures come back as data URLs.
//!
//! Each step maps its failure to [`Ocr2MdError::UpstreamFailure`] tagged with
//! the step. Nothing is retried here; the caller decides whether to run the
//! whole conversion again.

use crate::config::ConversionConfig;
use crate::error::{Ocr2MdError, UpstreamStage};
use crate::ocr::OcrProvider;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Signed URLs only need to live long enough for the OCR call.
const SIGNED_URL_EXPIRY_HOURS: u32 = 1;

/// HTTP client for the Mistral OCR API.
pub struct MistralOcrClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl fmt::Debug for MistralOcrClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MistralOcrClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    id: String,
}

#[derive(Deserialize)]
struct SignedUrlResponse {
    url: String,
}

impl MistralOcrClient {
    /// Build a client from the conversion config.
    ///
    /// # Errors
    /// [`Ocr2MdError::InvalidConfig`] when no API key is configured.
    pub fn from_config(config: &ConversionConfig) -> Result<Self, Ocr2MdError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                Ocr2MdError::InvalidConfig(
                    "No OCR API key configured.\nSet MISTRAL_API_KEY or pass --api-key.".into(),
                )
            })?
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Ocr2MdError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, Ocr2MdError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| upstream(UpstreamStage::Upload, e))?;
        let form = Form::new().text("purpose", "ocr").part("file", part);

        let response = self
            .client
            .post(self.url("files"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| upstream(UpstreamStage::Upload, e))?;
        let body: UploadResponse = read_json(response, UpstreamStage::Upload).await?;
        debug!("Uploaded '{}' as file {}", file_name, body.id);
        Ok(body.id)
    }

    async fn sign(&self, file_id: &str) -> Result<String, Ocr2MdError> {
        let response = self
            .client
            .get(self.url(&format!("files/{file_id}/url")))
            .query(&[("expiry", SIGNED_URL_EXPIRY_HOURS)])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| upstream(UpstreamStage::Sign, e))?;
        let body: SignedUrlResponse = read_json(response, UpstreamStage::Sign).await?;
        Ok(body.url)
    }

    async fn ocr(&self, document_url: &str) -> Result<Value, Ocr2MdError> {
        let response = self
            .client
            .post(self.url("ocr"))
            .bearer_auth(&self.api_key)
            .json(&ocr_request_body(&self.model, document_url))
            .send()
            .await
            .map_err(|e| upstream(UpstreamStage::Process, e))?;
        read_json(response, UpstreamStage::Process).await
    }
}

#[async_trait]
impl OcrProvider for MistralOcrClient {
    async fn process(&self, file_name: &str, bytes: Vec<u8>) -> Result<Value, Ocr2MdError> {
        info!("Uploading '{}' ({} bytes) for OCR", file_name, bytes.len());
        let file_id = self.upload(file_name, bytes).await?;
        let signed_url = self.sign(&file_id).await?;
        let result = self.ocr(&signed_url).await?;
        info!("OCR finished for '{}'", file_name);
        Ok(result)
    }
}

fn ocr_request_body(model: &str, document_url: &str) -> Value {
    json!({
        "model": model,
        "document": {
            "type": "document_url",
            "document_url": document_url,
        },
        "include_image_base64": true,
    })
}

/// Check the status and decode the JSON body.
async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    stage: UpstreamStage,
) -> Result<T, Ocr2MdError> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(Ocr2MdError::UpstreamFailure {
            stage,
            detail: format!("HTTP {}: {}", status, truncate(&text, 300)),
        });
    }
    response.json::<T>().await.map_err(|e| upstream(stage, e))
}

fn upstream(stage: UpstreamStage, e: impl fmt::Display) -> Ocr2MdError {
    Ocr2MdError::UpstreamFailure {
        stage,
        detail: e.to_string(),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((i, _)) => format!("{}\u{2026}", &s[..i]),
        None => s.to_string(),
    }
}
