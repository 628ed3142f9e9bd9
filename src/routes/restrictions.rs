//! Restriction API routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;

use crate::error::Result;
use crate::restrictions::{restrictions_for_view, NewRestriction, Restriction, Viewer};
use crate::state::AppState;

/// Create the restrictions router, nested under `/api/v1/documents`
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/:document_id/restrictions",
            get(list_restrictions).post(create_restriction),
        )
        .route(
            "/:document_id/restrictions/:restriction_id",
            delete(delete_restriction),
        )
}

/// Optional viewer filter for listing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub user_id: Option<String>,
    pub role: Option<String>,
    pub page: Option<u32>,
}

/// List restrictions for a document, optionally as a given viewer sees them
async fn list_restrictions(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Restriction>>> {
    let all = state.restrictions().list(&document_id).await?;

    let filtered = if query.user_id.is_some() || query.role.is_some() || query.page.is_some() {
        let viewer = Viewer {
            user_id: query.user_id,
            role: query.role,
        };
        match query.page {
            Some(page) => restrictions_for_view(&all, &viewer, page),
            None => all.into_iter().filter(|r| r.applies_to(&viewer)).collect(),
        }
    } else {
        all
    };

    Ok(Json(filtered))
}

async fn create_restriction(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    Json(payload): Json<NewRestriction>,
) -> Result<(StatusCode, Json<Restriction>)> {
    let restriction = state.restrictions().create(&document_id, payload).await?;
    Ok((StatusCode::CREATED, Json(restriction)))
}

async fn delete_restriction(
    State(state): State<AppState>,
    Path((document_id, restriction_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    state.restrictions().delete(&document_id, &restriction_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
