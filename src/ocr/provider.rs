//! OCR Providers
//!
//! Defines the provider trait and implementations for different OCR backends.

use std::path::PathBuf;

use async_trait::async_trait;

use super::types::{OcrError, OcrProvider, RecognitionResult};

/// OCR provider trait
#[async_trait]
pub trait OcrProviderTrait: Send + Sync {
    /// Get the provider type
    fn provider_type(&self) -> OcrProvider;

    /// Check if the provider is available
    async fn is_available(&self) -> bool;

    /// Recognize a PNG-encoded page image
    async fn recognize(
        &self,
        image_data: &[u8],
        language: Option<&str>,
    ) -> Result<RecognitionResult, OcrError>;
}

/// Tesseract OCR provider (CLI, TSV output)
pub struct TesseractProvider {
    /// Path or name of the tesseract binary
    binary: String,
    /// Default language
    default_language: String,
    /// Where page images are staged; the system temp dir when unset
    scratch_dir: Option<PathBuf>,
}

impl TesseractProvider {
    pub fn new(binary: &str, default_language: &str) -> Self {
        Self {
            binary: binary.to_string(),
            default_language: default_language.to_string(),
            scratch_dir: None,
        }
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl OcrProviderTrait for TesseractProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Tesseract
    }

    async fn is_available(&self) -> bool {
        tokio::process::Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    async fn recognize(
        &self,
        image_data: &[u8],
        language: Option<&str>,
    ) -> Result<RecognitionResult, OcrError> {
        let lang = language.unwrap_or(&self.default_language);

        // Removed on drop, including when a cancelled request drops this future
        let input = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("docmask_ocr_").suffix(".png");
            match &self.scratch_dir {
                Some(dir) => builder.tempfile_in(dir),
                None => builder.tempfile(),
            }
        }
        .map_err(|e| OcrError::ImageExtractionError(format!("Failed to create temp file: {}", e)))?;
        tokio::fs::write(input.path(), image_data)
            .await
            .map_err(|e| {
                OcrError::ImageExtractionError(format!("Failed to write temp file: {}", e))
            })?;

        let output = tokio::process::Command::new(&self.binary)
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(lang)
            .arg("--psm")
            .arg("3")
            .arg("tsv")
            .kill_on_drop(true)
            .output()
            .await;
        drop(input);

        let output = output.map_err(|e| {
            OcrError::ProviderNotAvailable(format!("Failed to run tesseract: {}", e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::ProcessingError(format!("Tesseract failed: {}", stderr)));
        }

        let tsv = String::from_utf8_lossy(&output.stdout).into_owned();
        let words = super::tsv::parse_tsv(&tsv);
        let text = words
            .iter()
            .map(|w| w.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let confident: Vec<f64> =
            words.iter().map(|w| w.confidence).filter(|c| *c >= 0.0).collect();
        let confidence = if confident.is_empty() {
            None
        } else {
            Some(confident.iter().sum::<f64>() / confident.len() as f64)
        };

        Ok(RecognitionResult {
            text: Some(text),
            confidence,
            tsv: Some(tsv),
            ..Default::default()
        })
    }
}

/// Ollama vision model provider
pub struct OllamaProvider {
    /// Ollama API URL
    base_url: String,
    /// Model name (e.g., "llava", "bakllava")
    model: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn default_url() -> Self {
        Self::new("http://localhost:11434", "llava")
    }
}

/// Parse a model reply: a JSON recognition result when the model complied,
/// plain text otherwise
fn parse_model_reply(reply: &str) -> RecognitionResult {
    let trimmed = reply.trim();
    match serde_json::from_str::<RecognitionResult>(trimmed) {
        Ok(result) if !result.words.is_empty() || !result.lines.is_empty() => result,
        _ => RecognitionResult {
            text: Some(trimmed.to_string()),
            ..Default::default()
        },
    }
}

#[async_trait]
impl OcrProviderTrait for OllamaProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Ollama
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn recognize(
        &self,
        image_data: &[u8],
        language: Option<&str>,
    ) -> Result<RecognitionResult, OcrError> {
        use base64::Engine;

        let url = format!("{}/api/generate", self.base_url);
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(image_data);

        let lang_hint = language
            .map(|l| format!(" The text is in {}.", l))
            .unwrap_or_default();

        let prompt = format!(
            "Extract every word from this image.{} Respond with JSON of the form \
             {{\"words\": [{{\"text\": \"...\", \"bbox\": {{\"x0\": 0, \"y0\": 0, \"x1\": 0, \"y1\": 0}}}}]}} \
             using pixel coordinates of the image.",
            lang_hint
        );

        let request = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "images": [image_base64],
            "format": "json",
            "stream": false
        });

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to call Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::ApiError(format!("Ollama returned {}: {}", status, body)));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to parse response: {}", e)))?;

        Ok(parse_model_reply(result["response"].as_str().unwrap_or("")))
    }
}

/// Mock provider for testing
#[cfg(test)]
pub struct MockProvider {
    pub response: RecognitionResult,
    pub available: bool,
    pub delay: Option<std::time::Duration>,
    pub calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockProvider {
    pub fn new(response: RecognitionResult) -> Self {
        Self {
            response,
            available: true,
            delay: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl OcrProviderTrait for MockProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Tesseract
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn recognize(
        &self,
        _image_data: &[u8],
        _language: Option<&str>,
    ) -> Result<RecognitionResult, OcrError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.response.clone())
    }
}
