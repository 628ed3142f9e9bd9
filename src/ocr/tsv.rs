//! Tesseract TSV word extraction

use super::types::{BBox, OcrWord};

/// Tesseract's word level in the `level` column
const WORD_LEVEL: &str = "5";

/// Parse level-5 rows of Tesseract TSV output.
///
/// Columns are read by position (`left=6, top=7, width=8, height=9,
/// conf=10, text=11`); a header row is skipped when present.
pub fn parse_tsv(tsv: &str) -> Vec<OcrWord> {
    tsv.lines()
        .filter_map(|line| {
            let cols: Vec<&str> = line.split('\t').collect();
            if cols.len() < 12 || cols[0].trim() != WORD_LEVEL {
                return None;
            }

            let left: f64 = cols[6].trim().parse().ok()?;
            let top: f64 = cols[7].trim().parse().ok()?;
            let width: f64 = cols[8].trim().parse().ok()?;
            let height: f64 = cols[9].trim().parse().ok()?;
            let confidence: f64 = cols[10].trim().parse().unwrap_or(-1.0);
            let text = cols[11..].join("\t").trim().to_string();

            Some(OcrWord {
                text,
                bbox: BBox {
                    x0: left,
                    y0: top,
                    x1: left + width,
                    y1: top + height,
                },
                confidence,
            })
        })
        .collect()
}
