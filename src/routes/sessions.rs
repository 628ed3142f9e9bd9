//! Viewer session routes: open, navigate, capture

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::geometry::Size;
use crate::masking::{composite_overlays, OverlayRect};
use crate::raster::encode_png;
use crate::restrictions::Restriction;
use crate::session::{CaptureAreaRequest, OpenSessionRequest, SessionSummary};
use crate::state::AppState;

/// Create the sessions router, nested under `/api/v1/sessions`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(open_session))
        .route("/:session_id", get(get_session).delete(close_session))
        .route("/:session_id/pages/:page", get(show_page))
        .route("/:session_id/restrictions/area", post(capture_area))
}

async fn open_session(
    State(state): State<AppState>,
    Json(request): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<SessionSummary>)> {
    let session = state.sessions().open(request).await?;
    Ok((StatusCode::CREATED, Json(session.summary())))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSummary>> {
    let session = state.sessions().get(&session_id)?;
    Ok(Json(session.summary()))
}

async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode> {
    state.sessions().close(&session_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Query parameters for page rendering
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Paint the overlays into the returned image
    #[serde(default)]
    pub masked: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub page_number: u32,
    pub page_count: u32,
    pub natural: Size,
    pub display: Size,
    pub render_scale: f64,
    pub masked: bool,
    pub overlays: Vec<OverlayRect>,
    pub mime_type: &'static str,
    /// Display-sized page bitmap, base64 PNG
    pub image: String,
}

/// Navigate to a page and return it with the viewer's overlays
async fn show_page(
    State(state): State<AppState>,
    Path((session_id, page)): Path<(String, u32)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse>> {
    let session = state.sessions().get(&session_id)?;
    let view = session.show_page(page).await?;

    let masked = query.masked;
    let rendered = view.page.clone();
    let overlays = view.overlays.clone();
    let png = tokio::task::spawn_blocking(move || {
        let bitmap = if masked {
            composite_overlays(&rendered, &overlays)
        } else {
            rendered.display_bitmap()
        };
        encode_png(&bitmap)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    Ok(Json(PageResponse {
        page_number: view.page.page_number,
        page_count: session.page_count(),
        natural: view.page.natural,
        display: view.page.display,
        render_scale: view.page.raster_scale,
        masked,
        overlays: view.overlays,
        mime_type: "image/png",
        image: base64::engine::general_purpose::STANDARD.encode(png),
    }))
}

/// Save a rectangle drawn on the current page as an area restriction
async fn capture_area(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<CaptureAreaRequest>,
) -> Result<(StatusCode, Json<Restriction>)> {
    let session = state.sessions().get(&session_id)?;
    let restriction = session.capture_area(request).await?;
    Ok((StatusCode::CREATED, Json(restriction)))
}
