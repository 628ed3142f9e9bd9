//! Error types for the Docmask server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::masking::BakeError;
use crate::ocr::OcrError;
use crate::raster::RasterizeError;
use crate::restrictions::{RestrictionError, TemplateError};
use crate::session::SessionError;
use crate::storage::StorageError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Restriction error: {0}")]
    Restriction(#[from] RestrictionError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Rasterize error: {0}")]
    Raster(#[from] RasterizeError),

    #[error("Bake error: {0}")]
    Bake(#[from] BakeError),

    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    #[error("Session error: {0}")]
    Session(SessionError),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Raster(e) => AppError::Raster(e),
            SessionError::Restriction(e) => AppError::Restriction(e),
            SessionError::Bake(e) => AppError::Bake(e),
            SessionError::Ocr(e) => AppError::Ocr(e),
            SessionError::Storage(e) => AppError::Storage(e),
            other => AppError::Session(other),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    fn classify(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Restriction(e) => match e {
                RestrictionError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
                }
                RestrictionError::NotFound(msg) => {
                    (StatusCode::NOT_FOUND, "not_found", msg.clone())
                }
                RestrictionError::Backend(msg) => {
                    tracing::error!("Restriction backend error: {}", msg);
                    (
                        StatusCode::BAD_GATEWAY,
                        "backend_error",
                        "Restriction service unavailable".to_string(),
                    )
                }
                RestrictionError::Database(e) => {
                    tracing::error!("Database error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "database_error",
                        "Database error".to_string(),
                    )
                }
            },
            AppError::Template(e) => match e {
                TemplateError::NotFound(id) => {
                    (StatusCode::NOT_FOUND, "not_found", format!("Template not found: {}", id))
                }
                other => {
                    tracing::error!("Template error: {}", other);
                    (StatusCode::BAD_GATEWAY, "backend_error", other.to_string())
                }
            },
            AppError::Storage(e) => match e {
                StorageError::ObjectNotFound(key) => {
                    (StatusCode::NOT_FOUND, "not_found", format!("Document not found: {}", key))
                }
                StorageError::InvalidKey(key) => (
                    StatusCode::BAD_REQUEST,
                    "bad_request",
                    format!("Invalid document key: {}", key),
                ),
                StorageError::Io(e) => {
                    tracing::error!("Storage error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "storage_error",
                        "Storage error".to_string(),
                    )
                }
            },
            AppError::Raster(e) => match e {
                RasterizeError::PageOutOfRange { .. } => {
                    (StatusCode::NOT_FOUND, "page_out_of_range", e.to_string())
                }
                RasterizeError::UnsupportedFormat(_) => {
                    (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_format", e.to_string())
                }
                RasterizeError::Decode(_) | RasterizeError::Fetch(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "decode_error", e.to_string())
                }
                RasterizeError::Cancelled | RasterizeError::Closed => {
                    (StatusCode::CONFLICT, "cancelled", e.to_string())
                }
                RasterizeError::Timeout(_) => {
                    tracing::error!("Render error: {}", e);
                    (StatusCode::GATEWAY_TIMEOUT, "render_timeout", e.to_string())
                }
                RasterizeError::Render(_) => {
                    tracing::error!("Render error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "render_error",
                        "Failed to render page".to_string(),
                    )
                }
            },
            AppError::Bake(e) => match e {
                BakeError::NoMaskableRestrictions => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "no_maskable_restrictions",
                    e.to_string(),
                ),
                other => {
                    tracing::error!("Bake error: {}", other);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "bake_error",
                        "Failed to bake export".to_string(),
                    )
                }
            },
            AppError::Ocr(e) => match e {
                OcrError::ProviderNotAvailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "ocr_unavailable", e.to_string())
                }
                OcrError::InvalidRegion(_) => {
                    (StatusCode::BAD_REQUEST, "bad_request", e.to_string())
                }
                OcrError::Cancelled => (StatusCode::CONFLICT, "cancelled", e.to_string()),
                other => {
                    tracing::error!("OCR error: {}", other);
                    (StatusCode::BAD_GATEWAY, "ocr_error", other.to_string())
                }
            },
            AppError::Session(e) => match e {
                SessionError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", e.to_string()),
                SessionError::Closed | SessionError::Superseded { .. } => {
                    (StatusCode::CONFLICT, "conflict", e.to_string())
                }
                SessionError::NoPageShown => (StatusCode::CONFLICT, "no_page_shown", e.to_string()),
                SessionError::InvalidRequest(_) => {
                    (StatusCode::BAD_REQUEST, "bad_request", e.to_string())
                }
                SessionError::UnsupportedExport(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "unsupported_export", e.to_string())
                }
                other => {
                    tracing::error!("Session error: {}", other);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal_error",
                        "An internal error occurred".to_string(),
                    )
                }
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.classify().0
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = self.classify();

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::from(RestrictionError::Validation("reason".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(RestrictionError::Backend("down".into())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(RestrictionError::NotFound("r1".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(BakeError::NoMaskableRestrictions).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_session_error_unwraps_inner_cause() {
        let err = AppError::from(SessionError::Bake(BakeError::NoMaskableRestrictions));
        assert!(matches!(err, AppError::Bake(_)));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = AppError::from(SessionError::NotFound("s".into()));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
