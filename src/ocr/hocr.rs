//! hOCR word extraction

use std::cell::RefCell;

use lol_html::{element, rewrite_str, text, RewriteStrSettings};

use super::types::{BBox, OcrError, OcrWord};

/// Parse `bbox x0 y0 x1 y1` and `x_wconf N` out of an hOCR `title`
fn parse_title(title: &str) -> (Option<BBox>, Option<f64>) {
    let mut bbox = None;
    let mut confidence = None;

    for property in title.split(';') {
        let mut tokens = property.split_whitespace();
        match tokens.next() {
            Some("bbox") => {
                let coords: Vec<f64> = tokens.filter_map(|t| t.parse().ok()).collect();
                if let [x0, y0, x1, y1] = coords[..] {
                    bbox = Some(BBox { x0, y0, x1, y1 });
                }
            }
            Some("x_wconf") => {
                confidence = tokens.next().and_then(|t| t.parse().ok());
            }
            _ => {}
        }
    }
    (bbox, confidence)
}

/// Extract `.ocrx_word` elements from an hOCR document
pub fn parse_hocr(hocr: &str) -> Result<Vec<OcrWord>, OcrError> {
    // (bbox, confidence, raw text) per word element
    let words: RefCell<Vec<(Option<BBox>, Option<f64>, String)>> = RefCell::new(Vec::new());

    rewrite_str(
        hocr,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(".ocrx_word", |el| {
                    let (bbox, confidence) = el
                        .get_attribute("title")
                        .map(|title| parse_title(&title))
                        .unwrap_or((None, None));
                    words.borrow_mut().push((bbox, confidence, String::new()));
                    Ok(())
                }),
                text!(".ocrx_word", |chunk| {
                    if let Some(last) = words.borrow_mut().last_mut() {
                        last.2.push_str(chunk.as_str());
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| OcrError::HocrError(e.to_string()))?;

    Ok(words
        .into_inner()
        .into_iter()
        .filter_map(|(bbox, confidence, raw)| {
            let bbox = bbox?;
            let text = html_escape::decode_html_entities(raw.trim()).into_owned();
            Some(OcrWord {
                text,
                bbox,
                confidence: confidence.unwrap_or(0.0),
            })
        })
        .collect())
}
