//! Health check endpoints

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::ocr::OcrProvider;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub restriction_backend: &'static str,
    pub ocr_provider: OcrProvider,
    pub open_sessions: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "docmask-server",
        restriction_backend: state.restrictions().backend_name(),
        ocr_provider: state.ocr().provider_type(),
        open_sessions: state.sessions().len(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}
