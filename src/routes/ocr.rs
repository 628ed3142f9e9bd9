//! OCR routes for viewer sessions

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::{Rect, Size};
use crate::ocr::{OcrWord, RegionText, WordSource};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:session_id/ocr", post(recognize_page))
        .route("/:session_id/ocr/region", post(region_text))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizeResponse {
    pub page_number: u32,
    pub source: Option<WordSource>,
    pub word_count: usize,
    /// Pixel size the word boxes are measured in
    pub image_size: Size,
    pub words: Vec<OcrWord>,
}

/// Recognize the session's current page
async fn recognize_page(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<RecognizeResponse>> {
    let session = state.sessions().get(&session_id)?;
    let index = session.recognize_current_page().await?;
    let page_number = session.current_page().map(|p| p.page_number).unwrap_or(0);

    Ok(Json(RecognizeResponse {
        page_number,
        source: index.source(),
        word_count: index.len(),
        image_size: index.image_size(),
        words: index.words().to_vec(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct RegionRequest {
    /// Rectangle in display space
    pub rect: Rect,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionResponse {
    pub text: String,
    pub no_word_data: bool,
}

/// Text under a rectangle drawn on the current page
async fn region_text(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<RegionRequest>,
) -> Result<Json<RegionResponse>> {
    let session = state.sessions().get(&session_id)?;
    let response = match session.region_text(request.rect).await? {
        RegionText::NoWordData => RegionResponse {
            text: String::new(),
            no_word_data: true,
        },
        RegionText::Text(text) => RegionResponse {
            text,
            no_word_data: false,
        },
    };
    Ok(Json(response))
}
