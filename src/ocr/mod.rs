//! OCR Module
//!
//! Recognition and region text extraction for page images.
//!
//! Supports multiple backends:
//! - Tesseract (local CLI, TSV output)
//! - Ollama vision models (local LLM)
//!
//! Engines return differently shaped results; [`OcrWordIndex`] flattens them
//! into one word list and [`extract_region_text`] maps a display rectangle
//! onto it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docmask_server::ocr::{extract_region_text, OcrWordIndex, OcrWorker, TesseractProvider};
//!
//! let worker = OcrWorker::spawn(Arc::new(TesseractProvider::new("tesseract", "eng")));
//! let result = worker.recognize(png, None, &cancel).await?;
//! let index = OcrWordIndex::build(&result, bitmap_size);
//! let text = extract_region_text(&index, drawn_rect, bitmap_size, display_size);
//! ```

mod hocr;
mod index;
mod provider;
mod region;
mod tsv;
mod types;
mod worker;

pub use hocr::parse_hocr;
pub use index::{OcrWordIndex, WordSource};
pub use provider::{OcrProviderTrait, OllamaProvider, TesseractProvider};
pub use region::{extract_region_text, reading_order, RegionText};
pub use tsv::parse_tsv;
pub use types::{
    BBox, OcrError, OcrProvider, OcrWord, RawBlock, RawBox, RawLine, RawParagraph, RawWord,
    RecognitionResult,
};
pub use worker::OcrWorker;

#[cfg(test)]
pub(crate) use provider::MockProvider;

/// OCR configuration
#[derive(Debug, Clone)]
pub struct OcrServiceConfig {
    /// Engine used by the worker
    pub provider: OcrProvider,
    /// Tesseract binary
    pub tesseract_path: String,
    /// Ollama base URL
    pub ollama_url: String,
    /// Ollama model name
    pub ollama_model: String,
    /// Default OCR language
    pub default_language: String,
}

impl Default for OcrServiceConfig {
    fn default() -> Self {
        Self {
            provider: OcrProvider::Tesseract,
            tesseract_path: "tesseract".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llava".to_string(),
            default_language: "eng".to_string(),
        }
    }
}

impl OcrServiceConfig {
    /// Build the configured engine
    pub fn build_provider(&self) -> std::sync::Arc<dyn OcrProviderTrait> {
        match self.provider {
            OcrProvider::Tesseract => std::sync::Arc::new(TesseractProvider::new(
                &self.tesseract_path,
                &self.default_language,
            )),
            OcrProvider::Ollama => {
                std::sync::Arc::new(OllamaProvider::new(&self.ollama_url, &self.ollama_model))
            }
        }
    }
}
