//! Rendered page type

use std::io::Cursor;
use std::sync::Arc;

use image::{imageops::FilterType, DynamicImage, RgbaImage};
use serde::Serialize;

use crate::geometry::Size;

use super::error::{RasterResult, RasterizeError};

/// Kind of source a document was loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pdf,
    Image,
}

impl SourceKind {
    pub fn content_type(&self) -> &'static str {
        match self {
            SourceKind::Pdf => "application/pdf",
            SourceKind::Image => "image/png",
        }
    }
}

/// A single materialized page
///
/// `bitmap` is `natural * raster_scale` pixels. `display` is the size the page
/// is shown at in the viewer.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 1-based page number
    pub page_number: u32,
    pub bitmap: Arc<RgbaImage>,
    pub natural: Size,
    pub display: Size,
    pub raster_scale: f64,
}

impl RenderedPage {
    /// Bitmap dimensions as a `Size`
    pub fn bitmap_size(&self) -> Size {
        Size::new(self.bitmap.width() as f64, self.bitmap.height() as f64)
    }

    /// Bitmap resampled to the display size
    pub fn display_bitmap(&self) -> RgbaImage {
        let width = self.display.width.round().max(1.0) as u32;
        let height = self.display.height.round().max(1.0) as u32;
        if width == self.bitmap.width() && height == self.bitmap.height() {
            return (*self.bitmap).clone();
        }
        image::imageops::resize(self.bitmap.as_ref(), width, height, FilterType::Triangle)
    }

    /// Full-resolution bitmap encoded as PNG
    pub fn encode_png(&self) -> RasterResult<Vec<u8>> {
        encode_png(&self.bitmap)
    }
}

/// Encode an RGBA buffer as PNG
pub fn encode_png(bitmap: &RgbaImage) -> RasterResult<Vec<u8>> {
    let mut output = Vec::new();
    DynamicImage::ImageRgba8(bitmap.clone())
        .write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)
        .map_err(|e| RasterizeError::Render(format!("PNG encoding failed: {}", e)))?;
    Ok(output)
}
