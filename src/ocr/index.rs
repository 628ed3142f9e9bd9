//! Unified word index over heterogeneous engine output

use serde::Serialize;

use crate::geometry::Size;

use super::hocr::parse_hocr;
use super::tsv::parse_tsv;
use super::types::{OcrWord, RawWord, RecognitionResult};

/// Representation a word index was built from, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WordSource {
    Words,
    Symbols,
    Lines,
    Blocks,
    Hocr,
    Tsv,
}

impl WordSource {
    pub const ORDER: [WordSource; 6] = [
        WordSource::Words,
        WordSource::Symbols,
        WordSource::Lines,
        WordSource::Blocks,
        WordSource::Hocr,
        WordSource::Tsv,
    ];

    fn extract(&self, result: &RecognitionResult) -> Vec<OcrWord> {
        match self {
            WordSource::Words => from_raw(&result.words),
            WordSource::Symbols => from_raw(&result.symbols),
            WordSource::Lines => {
                from_raw(result.lines.iter().flat_map(|line| line.words.iter()))
            }
            WordSource::Blocks => from_raw(
                result
                    .blocks
                    .iter()
                    .flat_map(|b| b.paragraphs.iter())
                    .flat_map(|p| p.lines.iter())
                    .flat_map(|l| l.words.iter()),
            ),
            WordSource::Hocr => match result.hocr.as_deref() {
                Some(hocr) if !hocr.trim().is_empty() => match parse_hocr(hocr) {
                    Ok(words) => words,
                    Err(e) => {
                        tracing::warn!("Ignoring unparseable hOCR: {}", e);
                        Vec::new()
                    }
                },
                _ => Vec::new(),
            },
            WordSource::Tsv => result.tsv.as_deref().map(parse_tsv).unwrap_or_default(),
        }
    }
}

fn from_raw<'a>(words: impl IntoIterator<Item = &'a RawWord>) -> Vec<OcrWord> {
    words
        .into_iter()
        .filter_map(|word| {
            let bbox = word.bbox?.to_bbox();
            Some(OcrWord {
                text: word.text.clone(),
                bbox,
                confidence: word.confidence.unwrap_or(0.0),
            })
        })
        .collect()
}

/// Words recognized on one page image
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrWordIndex {
    words: Vec<OcrWord>,
    source: Option<WordSource>,
    /// Pixel size of the recognized image
    image_size: Size,
}

impl OcrWordIndex {
    /// Build from the first representation that yields non-blank words
    pub fn build(result: &RecognitionResult, image_size: Size) -> Self {
        for source in WordSource::ORDER {
            let words: Vec<OcrWord> = source
                .extract(result)
                .into_iter()
                .filter(|w| !w.text.trim().is_empty())
                .map(|mut w| {
                    w.text = w.text.trim().to_string();
                    w
                })
                .collect();

            if !words.is_empty() {
                tracing::debug!("OCR word index built from {:?} ({} words)", source, words.len());
                return Self {
                    words,
                    source: Some(source),
                    image_size,
                };
            }
        }

        tracing::debug!("OCR result has no word-level data");
        Self {
            words: Vec::new(),
            source: None,
            image_size,
        }
    }

    pub fn words(&self) -> &[OcrWord] {
        &self.words
    }

    pub fn source(&self) -> Option<WordSource> {
        self.source
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn image_size(&self) -> Size {
        self.image_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::types::{RawBlock, RawBox, RawLine, RawParagraph};

    fn raw(text: &str, x: f64) -> RawWord {
        RawWord {
            text: text.to_string(),
            bbox: Some(RawBox::Corners {
                x0: x,
                y0: 10.0,
                x1: x + 40.0,
                y1: 30.0,
            }),
            confidence: Some(90.0),
        }
    }

    fn page() -> Size {
        Size::new(800.0, 600.0)
    }

    #[test]
    fn test_same_words_same_index_regardless_of_shape() {
        let words = vec![raw("Jane", 10.0), raw("Doe", 60.0)];

        let flat = RecognitionResult {
            words: words.clone(),
            ..Default::default()
        };
        let in_lines = RecognitionResult {
            lines: vec![RawLine {
                text: "Jane Doe".into(),
                words: words.clone(),
            }],
            ..Default::default()
        };
        let in_blocks = RecognitionResult {
            blocks: vec![RawBlock {
                paragraphs: vec![RawParagraph {
                    lines: vec![RawLine {
                        text: String::new(),
                        words,
                    }],
                }],
            }],
            ..Default::default()
        };

        let a = OcrWordIndex::build(&flat, page());
        let b = OcrWordIndex::build(&in_lines, page());
        let c = OcrWordIndex::build(&in_blocks, page());
        assert_eq!(a.words(), b.words());
        assert_eq!(b.words(), c.words());
        assert_eq!(a.source(), Some(WordSource::Words));
        assert_eq!(b.source(), Some(WordSource::Lines));
        assert_eq!(c.source(), Some(WordSource::Blocks));
    }

    #[test]
    fn test_first_non_empty_source_wins() {
        let result = RecognitionResult {
            // Only blank words: skipped
            words: vec![raw("  ", 0.0)],
            symbols: vec![raw("J", 0.0)],
            tsv: Some("5\t1\t1\t1\t1\t1\t0\t0\t1\t1\t90\tignored".into()),
            ..Default::default()
        };
        let index = OcrWordIndex::build(&result, page());
        assert_eq!(index.source(), Some(WordSource::Symbols));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_falls_back_to_hocr_then_tsv() {
        let hocr = RecognitionResult {
            hocr: Some("<span class='ocrx_word' title='bbox 1 1 5 5'>word</span>".into()),
            tsv: Some("5\t1\t1\t1\t1\t1\t0\t0\t1\t1\t90\ttsv".into()),
            ..Default::default()
        };
        assert_eq!(OcrWordIndex::build(&hocr, page()).source(), Some(WordSource::Hocr));

        let tsv = RecognitionResult {
            tsv: Some("5\t1\t1\t1\t1\t1\t0\t0\t1\t1\t90\ttsv".into()),
            ..Default::default()
        };
        let index = OcrWordIndex::build(&tsv, page());
        assert_eq!(index.source(), Some(WordSource::Tsv));
        assert_eq!(index.words()[0].text, "tsv");
    }

    #[test]
    fn test_text_only_result_is_empty_index() {
        let result = RecognitionResult {
            text: Some("Some text without boxes".into()),
            ..Default::default()
        };
        let index = OcrWordIndex::build(&result, page());
        assert!(index.is_empty());
        assert_eq!(index.source(), None);
    }

    #[test]
    fn test_words_without_boxes_are_dropped() {
        let result = RecognitionResult {
            words: vec![RawWord {
                text: "floating".into(),
                bbox: None,
                confidence: None,
            }],
            ..Default::default()
        };
        assert!(OcrWordIndex::build(&result, page()).is_empty());
    }
}
