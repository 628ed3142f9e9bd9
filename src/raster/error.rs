//! Rasterization error types

use thiserror::Error;

/// Errors produced while loading or rendering a document page
#[derive(Debug, Error)]
pub enum RasterizeError {
    /// Source bytes could not be fetched
    #[error("Failed to fetch document: {0}")]
    Fetch(String),

    /// Bytes are neither a PDF nor a decodable raster image
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Source was recognised but could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Requested page does not exist
    #[error("Page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    /// Native render failed
    #[error("Render error: {0}")]
    Render(String),

    /// Render was cancelled before a result was produced
    #[error("Render cancelled")]
    Cancelled,

    /// Document has been closed
    #[error("Document closed")]
    Closed,

    /// Render did not complete in time
    #[error("Render timed out after {0} seconds")]
    Timeout(u64),
}

pub type RasterResult<T> = std::result::Result<T, RasterizeError>;

impl From<mupdf::Error> for RasterizeError {
    fn from(err: mupdf::Error) -> Self {
        RasterizeError::Render(err.to_string())
    }
}

impl From<image::ImageError> for RasterizeError {
    fn from(err: image::ImageError) -> Self {
        RasterizeError::Decode(err.to_string())
    }
}
