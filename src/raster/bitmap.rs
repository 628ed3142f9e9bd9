//! Single-page raster image sources (PNG, JPEG, TIFF, ...)

use std::sync::Arc;

use image::RgbaImage;

use super::error::{RasterResult, RasterizeError};

/// Decode image bytes into an RGBA buffer
pub fn decode_image(data: &[u8]) -> RasterResult<Arc<RgbaImage>> {
    let decoded = image::load_from_memory(data)
        .map_err(|e| RasterizeError::Decode(format!("Failed to decode image: {}", e)))?;
    let rgba = decoded.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(RasterizeError::Decode("Image has no pixels".to_string()));
    }
    Ok(Arc::new(rgba))
}
