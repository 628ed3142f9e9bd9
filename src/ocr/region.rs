//! Region text extraction
//!
//! Maps a rectangle drawn on the displayed page onto recognized words and
//! joins them in reading order.

use serde::Serialize;

use crate::geometry::{to_natural, Rect, Size};

use super::index::OcrWordIndex;
use super::types::OcrWord;

/// Vertical centers closer than this share a line
const LINE_TOLERANCE_PX: f64 = 10.0;

/// Outcome of a region extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "text", rename_all = "camelCase")]
pub enum RegionText {
    /// The OCR result carried no word boxes at all
    NoWordData,
    /// Joined text of the selected words; empty when nothing matched
    Text(String),
}

/// Sort words into reading order: line bands top-down, then left-to-right
pub fn reading_order(words: &[OcrWord]) -> Vec<&OcrWord> {
    let mut by_center: Vec<&OcrWord> = words.iter().collect();
    by_center.sort_by(|a, b| {
        a.bbox
            .center()
            .y
            .total_cmp(&b.bbox.center().y)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    // Group into bands: a word joins the current band when its center is
    // within tolerance of the band's first word
    let mut bands: Vec<Vec<&OcrWord>> = Vec::new();
    let mut band_anchor = f64::NEG_INFINITY;
    for word in by_center {
        let cy = word.bbox.center().y;
        match bands.last_mut() {
            Some(band) if (cy - band_anchor).abs() <= LINE_TOLERANCE_PX => band.push(word),
            _ => {
                band_anchor = cy;
                bands.push(vec![word]);
            }
        }
    }

    bands
        .into_iter()
        .flat_map(|mut band| {
            band.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
            band
        })
        .collect()
}

fn selects(region: &Rect, word: &OcrWord) -> bool {
    let rect = word.bbox.to_rect();
    region.intersects(&rect)
        || region.contains_point(word.bbox.center())
        || rect.corners().iter().any(|corner| region.contains_point(*corner))
}

/// Text of the words under `display_rect`.
///
/// `natural` is the pixel size of the recognized image; `display` is the
/// size it is shown at.
pub fn extract_region_text(
    index: &OcrWordIndex,
    display_rect: Rect,
    natural: Size,
    display: Size,
) -> RegionText {
    if index.is_empty() {
        return RegionText::NoWordData;
    }

    let region = to_natural(display_rect, natural, display);
    let text = reading_order(index.words())
        .into_iter()
        .filter(|word| selects(&region, word))
        .map(|word| word.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    RegionText::Text(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::types::{RawBox, RawWord, RecognitionResult};

    fn word(text: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> RawWord {
        RawWord {
            text: text.into(),
            bbox: Some(RawBox::Corners { x0, y0, x1, y1 }),
            confidence: Some(90.0),
        }
    }

    fn index(words: Vec<RawWord>) -> OcrWordIndex {
        OcrWordIndex::build(
            &RecognitionResult {
                words,
                ..Default::default()
            },
            Size::new(1000.0, 1000.0),
        )
    }

    #[test]
    fn test_region_scenario() {
        let idx = index(vec![
            word("Doe", 60.0, 12.0, 100.0, 30.0),
            word("Jane", 10.0, 10.0, 50.0, 30.0),
            word("Other", 10.0, 200.0, 50.0, 220.0),
        ]);
        let natural = Size::new(1000.0, 1000.0);
        let text = extract_region_text(&idx, Rect::new(0.0, 0.0, 120.0, 40.0), natural, natural);
        assert_eq!(text, RegionText::Text("Jane Doe".into()));
    }

    #[test]
    fn test_display_rect_is_mapped_to_natural() {
        let idx = index(vec![word("far", 800.0, 800.0, 900.0, 850.0)]);
        // Display is half size: display rect {400,400,60,30} covers natural {800,800,120,60}
        let text = extract_region_text(
            &idx,
            Rect::new(400.0, 400.0, 60.0, 30.0),
            Size::new(1000.0, 1000.0),
            Size::new(500.0, 500.0),
        );
        assert_eq!(text, RegionText::Text("far".into()));
    }

    #[test]
    fn test_no_match_is_empty_text_not_no_data() {
        let idx = index(vec![word("Jane", 10.0, 10.0, 50.0, 30.0)]);
        let natural = Size::new(1000.0, 1000.0);
        let text = extract_region_text(&idx, Rect::new(500.0, 500.0, 10.0, 10.0), natural, natural);
        assert_eq!(text, RegionText::Text(String::new()));

        let empty = OcrWordIndex::default();
        assert_eq!(
            extract_region_text(&empty, Rect::new(0.0, 0.0, 10.0, 10.0), natural, natural),
            RegionText::NoWordData
        );
    }

    #[test]
    fn test_reading_order_multiple_lines() {
        let idx = index(vec![
            word("world", 70.0, 52.0, 120.0, 70.0),
            word("second", 10.0, 100.0, 60.0, 120.0),
            word("hello", 10.0, 50.0, 60.0, 68.0),
            word("line", 70.0, 104.0, 100.0, 122.0),
        ]);
        let natural = Size::new(1000.0, 1000.0);
        let text = extract_region_text(&idx, Rect::new(0.0, 0.0, 1000.0, 1000.0), natural, natural);
        assert_eq!(text, RegionText::Text("hello world second line".into()));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let words: Vec<RawWord> = (0..50)
            .map(|i| {
                let x = (i % 7) as f64 * 60.0;
                let y = (i / 7) as f64 * 25.0 + (i % 3) as f64;
                word(&format!("w{}", i), x, y, x + 50.0, y + 18.0)
            })
            .collect();
        let idx = index(words);
        let natural = Size::new(1000.0, 1000.0);
        let region = Rect::new(30.0, 20.0, 200.0, 90.0);

        let first = extract_region_text(&idx, region, natural, natural);
        for _ in 0..10 {
            assert_eq!(extract_region_text(&idx, region, natural, natural), first);
        }
    }
}
