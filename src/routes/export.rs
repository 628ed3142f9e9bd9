//! Redacted export route

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    routing::post,
    Router,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:session_id/export", post(export))
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Pdf,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
    pub page: Option<u32>,
}

/// Bake the viewer's restrictions and return the artifact as an attachment
async fn export(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response> {
    let session = state.sessions().get(&session_id)?;

    let artifact = match query.format {
        ExportFormat::Png => session.export_png(query.page).await?,
        ExportFormat::Pdf => session.export_pdf().await?,
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, artifact.mime_type)
        .header(header::CONTENT_LENGTH, artifact.data.len())
        .header(header::CONTENT_DISPOSITION, content_disposition(&artifact.file_name))
        .header("x-masks-applied", artifact.applied)
        .header("x-masks-skipped", artifact.skipped)
        .body(Body::from(artifact.data))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Attachment header with an ASCII `filename` for old clients and the exact
/// name as RFC 5987 `filename*`
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}
