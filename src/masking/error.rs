use thiserror::Error;

/// Errors producing a redacted export
#[derive(Debug, Error)]
pub enum BakeError {
    /// Nothing valid to apply; no artifact is produced
    #[error("No maskable restrictions for this export")]
    NoMaskableRestrictions,

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Bake task failed: {0}")]
    Task(String),
}

impl From<lopdf::Error> for BakeError {
    fn from(err: lopdf::Error) -> Self {
        BakeError::Pdf(err.to_string())
    }
}

impl From<mupdf::Error> for BakeError {
    fn from(err: mupdf::Error) -> Self {
        BakeError::Pdf(err.to_string())
    }
}

pub type BakeResult<T> = std::result::Result<T, BakeError>;
