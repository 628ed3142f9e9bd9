//! OCR Types
//!
//! Engine output shapes and the normalized word type the rest of the crate
//! works with.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};

/// OCR provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrProvider {
    /// Tesseract CLI (local)
    #[default]
    Tesseract,
    /// Ollama vision model (local LLM)
    Ollama,
}

impl std::str::FromStr for OcrProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tesseract" => Ok(Self::Tesseract),
            "ollama" => Ok(Self::Ollama),
            other => Err(format!("unknown OCR provider '{}'", other)),
        }
    }
}

/// Word box in the pixel space of the recognized image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn to_rect(&self) -> Rect {
        Rect::from_ltrb(self.x0, self.y0, self.x1, self.y1)
    }

    pub fn center(&self) -> Point {
        Point {
            x: (self.x0 + self.x1) / 2.0,
            y: (self.y0 + self.y1) / 2.0,
        }
    }
}

/// A recognized word
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrWord {
    pub text: String,
    pub bbox: BBox,
    pub confidence: f64,
}

/// Bounding box as engines report it: corner form or origin/extent form
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawBox {
    Corners {
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
    },
    Extent {
        #[serde(alias = "x")]
        left: f64,
        #[serde(alias = "y")]
        top: f64,
        width: f64,
        height: f64,
    },
}

impl RawBox {
    pub fn to_bbox(&self) -> BBox {
        match *self {
            RawBox::Corners { x0, y0, x1, y1 } => BBox { x0, y0, x1, y1 },
            RawBox::Extent {
                left,
                top,
                width,
                height,
            } => BBox {
                x0: left,
                y0: top,
                x1: left + width,
                y1: top + height,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawWord {
    #[serde(default)]
    pub text: String,
    #[serde(default, alias = "bounds", alias = "box")]
    pub bbox: Option<RawBox>,
    #[serde(default, alias = "conf")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLine {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub words: Vec<RawWord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawParagraph {
    #[serde(default)]
    pub lines: Vec<RawLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBlock {
    #[serde(default)]
    pub paragraphs: Vec<RawParagraph>,
}

/// Everything an engine may hand back for one image
///
/// Engines populate different subsets; the word index picks the first usable
/// representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub words: Vec<RawWord>,
    #[serde(default)]
    pub symbols: Vec<RawWord>,
    #[serde(default)]
    pub lines: Vec<RawLine>,
    #[serde(default)]
    pub blocks: Vec<RawBlock>,
    #[serde(default)]
    pub hocr: Option<String>,
    #[serde(default)]
    pub tsv: Option<String>,
}

/// OCR error types
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR provider not available: {0}")]
    ProviderNotAvailable(String),

    #[error("Failed to prepare image: {0}")]
    ImageExtractionError(String),

    #[error("OCR processing failed: {0}")]
    ProcessingError(String),

    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("hOCR parse error: {0}")]
    HocrError(String),

    #[error("OCR request cancelled")]
    Cancelled,

    #[error("OCR worker stopped")]
    WorkerClosed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_box_forms() {
        let corners: RawBox =
            serde_json::from_value(json!({"x0": 1, "y0": 2, "x1": 11, "y1": 12})).unwrap();
        let extent: RawBox =
            serde_json::from_value(json!({"x": 1, "y": 2, "width": 10, "height": 10})).unwrap();
        let left_top: RawBox =
            serde_json::from_value(json!({"left": 1, "top": 2, "width": 10, "height": 10}))
                .unwrap();

        assert_eq!(corners.to_bbox(), extent.to_bbox());
        assert_eq!(extent.to_bbox(), left_top.to_bbox());
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("Tesseract".parse::<OcrProvider>(), Ok(OcrProvider::Tesseract));
        assert_eq!(" ollama ".parse::<OcrProvider>(), Ok(OcrProvider::Ollama));
        assert!("openai".parse::<OcrProvider>().is_err());
    }
}
