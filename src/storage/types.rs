//! Storage types

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata about a stored document file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub document_id: String,
    pub file_name: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// A stored document file with its bytes
#[derive(Debug)]
pub struct StorageObject {
    pub metadata: ObjectMetadata,
    pub data: Vec<u8>,
}

/// Storage-specific errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Reject keys that could escape the storage root
pub fn validate_key_part(part: &str) -> StorageResult<()> {
    let invalid = part.is_empty()
        || part == "."
        || part == ".."
        || part.contains('/')
        || part.contains('\\')
        || part.contains('\0');
    if invalid {
        return Err(StorageError::InvalidKey(part.to_string()));
    }
    Ok(())
}
