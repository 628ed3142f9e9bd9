//! Restriction store errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RestrictionError {
    /// Payload rejected before reaching the backend
    #[error("Invalid restriction: {0}")]
    Validation(String),

    #[error("Restriction not found: {0}")]
    NotFound(String),

    /// Backing service failed or returned an error status
    #[error("Restriction backend error: {0}")]
    Backend(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<reqwest::Error> for RestrictionError {
    fn from(err: reqwest::Error) -> Self {
        RestrictionError::Backend(err.to_string())
    }
}

pub type RestrictionResult<T> = std::result::Result<T, RestrictionError>;
