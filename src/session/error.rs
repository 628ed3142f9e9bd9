//! Session error types

use thiserror::Error;

use crate::masking::BakeError;
use crate::ocr::OcrError;
use crate::raster::RasterizeError;
use crate::restrictions::RestrictionError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Session is closed")]
    Closed,

    #[error("No page has been shown yet")]
    NoPageShown,

    #[error("Render of page {page} was superseded by a newer navigation")]
    Superseded { page: u32 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unsupported export: {0}")]
    UnsupportedExport(String),

    #[error(transparent)]
    Raster(#[from] RasterizeError),

    #[error(transparent)]
    Restriction(#[from] RestrictionError),

    #[error(transparent)]
    Bake(#[from] BakeError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type SessionResult<T> = Result<T, SessionError>;
