//! Route modules for Docmask Server

pub mod export;
pub mod health;
pub mod ocr;
pub mod restrictions;
pub mod sessions;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1/health", health::router())
        .nest("/api/v1/documents", restrictions::router())
        .nest(
            "/api/v1/sessions",
            sessions::router()
                .merge(export::router())
                .merge(ocr::router()),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use base64::Engine;
    use serde_json::{json, Value};

    use super::*;
    use crate::config::Config;
    use crate::ocr::{RawBox, RawWord, RecognitionResult};
    use crate::test_support::{blank_pdf, solid_png, test_services_with_ocr};

    async fn create_test_server() -> TestServer {
        let services = test_services_with_ocr(RecognitionResult {
            words: vec![
                RawWord {
                    text: "Jane".into(),
                    bbox: Some(RawBox::Corners {
                        x0: 30.0,
                        y0: 30.0,
                        x1: 90.0,
                        y1: 60.0,
                    }),
                    confidence: Some(92.0),
                },
                RawWord {
                    text: "Doe".into(),
                    bbox: Some(RawBox::Extent {
                        left: 100.0,
                        top: 30.0,
                        width: 50.0,
                        height: 30.0,
                    }),
                    confidence: Some(88.0),
                },
            ],
            ..Default::default()
        })
        .await;
        services
            .documents
            .put("doc-1", "contract.pdf", blank_pdf(&[(200.0, 100.0), (200.0, 100.0)]))
            .await
            .unwrap();
        services
            .documents
            .put("doc-2", "scan.png", solid_png(40, 20, [255, 255, 255, 255]))
            .await
            .unwrap();

        let state = AppState::new(Config::default(), services);
        TestServer::new(app(state)).unwrap()
    }

    async fn open_session(server: &TestServer, document_id: &str, file_name: &str) -> String {
        let response = server
            .post("/api/v1/sessions")
            .json(&json!({
                "documentId": document_id,
                "fileName": file_name,
                "viewer": { "userId": "bob", "role": "clerk" }
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_returns_200() {
        let server = create_test_server().await;
        let response = server.get("/health").await;
        response.assert_status_ok();

        let json = response.json::<Value>();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "docmask-server");
        assert_eq!(json["restrictionBackend"], "sqlite");
        assert_eq!(json["openSessions"], 0);
    }

    #[tokio::test]
    async fn test_restriction_crud() {
        let server = create_test_server().await;

        let response = server
            .post("/api/v1/documents/doc-1/restrictions")
            .json(&json!({
                "kind": "fieldMask",
                "field": "ssn",
                "rect": { "x": 10, "y": 10, "width": 50, "height": 10 },
                "reason": "PII"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let id = response.json::<Value>()["id"].as_str().unwrap().to_string();

        let listed = server.get("/api/v1/documents/doc-1/restrictions").await;
        listed.assert_status_ok();
        assert_eq!(listed.json::<Value>().as_array().unwrap().len(), 1);

        server
            .delete(&format!("/api/v1/documents/doc-1/restrictions/{}", id))
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let listed = server.get("/api/v1/documents/doc-1/restrictions").await;
        assert!(listed.json::<Value>().as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_restriction_is_400() {
        let server = create_test_server().await;
        let response = server
            .post("/api/v1/documents/doc-1/restrictions")
            .json(&json!({
                "kind": "areaMask",
                "rect": { "x": 10, "y": 10, "width": 50, "height": 10 },
                "reason": "no subject"
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_list_filters_by_viewer() {
        let server = create_test_server().await;
        for user in ["alice", "bob"] {
            server
                .post("/api/v1/documents/doc-1/restrictions")
                .json(&json!({
                    "kind": "areaMask",
                    "rect": { "x": 0, "y": 0, "width": 30, "height": 30 },
                    "subjectUser": user,
                    "reason": "privacy"
                }))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let response = server
            .get("/api/v1/documents/doc-1/restrictions")
            .add_query_param("userId", "bob")
            .await;
        let list = response.json::<Value>();
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["subjectUser"], "bob");
    }

    #[tokio::test]
    async fn test_session_page_capture_and_export() {
        let server = create_test_server().await;
        let session_id = open_session(&server, "doc-1", "contract.pdf").await;

        let summary = server.get(&format!("/api/v1/sessions/{}", session_id)).await;
        summary.assert_status_ok();
        assert_eq!(summary.json::<Value>()["pageCount"], 2);

        let page = server
            .get(&format!("/api/v1/sessions/{}/pages/1", session_id))
            .await;
        page.assert_status_ok();
        let page = page.json::<Value>();
        assert_eq!(page["display"]["width"], 300.0);
        let png = base64::engine::general_purpose::STANDARD
            .decode(page["image"].as_str().unwrap())
            .unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));

        server
            .post(&format!("/api/v1/sessions/{}/restrictions/area", session_id))
            .json(&json!({
                "rect": { "x": 30, "y": 15, "width": 60, "height": 30 },
                "reason": "privacy",
                "subjectRole": "clerk"
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let masked = server
            .get(&format!("/api/v1/sessions/{}/pages/1", session_id))
            .add_query_param("masked", "true")
            .await;
        assert_eq!(masked.json::<Value>()["overlays"].as_array().unwrap().len(), 1);

        let export = server
            .post(&format!("/api/v1/sessions/{}/export", session_id))
            .add_query_param("format", "pdf")
            .await;
        export.assert_status_ok();
        assert_eq!(export.header("content-type"), "application/pdf");
        assert_eq!(
            export.header("content-disposition"),
            "attachment; filename=\"contract_masked.pdf\"; filename*=UTF-8''contract_masked.pdf"
        );
        assert!(export.as_bytes().starts_with(b"%PDF"));

        let export = server
            .post(&format!("/api/v1/sessions/{}/export", session_id))
            .add_query_param("format", "png")
            .await;
        export.assert_status_ok();
        assert_eq!(
            export.header("content-disposition"),
            "attachment; filename=\"contract_masked_page1.png\"; filename*=UTF-8''contract_masked_page1.png"
        );
    }

    #[tokio::test]
    async fn test_export_without_restrictions_is_422() {
        let server = create_test_server().await;
        let session_id = open_session(&server, "doc-1", "contract.pdf").await;

        let response = server
            .post(&format!("/api/v1/sessions/{}/export", session_id))
            .add_query_param("format", "pdf")
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.json::<Value>()["error"], "no_maskable_restrictions");
    }

    #[tokio::test]
    async fn test_page_out_of_range_is_404() {
        let server = create_test_server().await;
        let session_id = open_session(&server, "doc-2", "scan.png").await;
        server
            .get(&format!("/api/v1/sessions/{}/pages/2", session_id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_ocr_region() {
        let server = create_test_server().await;
        let session_id = open_session(&server, "doc-1", "contract.pdf").await;

        // OCR before any page is shown
        server
            .post(&format!("/api/v1/sessions/{}/ocr", session_id))
            .await
            .assert_status(StatusCode::CONFLICT);

        server
            .get(&format!("/api/v1/sessions/{}/pages/1", session_id))
            .await
            .assert_status_ok();

        let recognized = server
            .post(&format!("/api/v1/sessions/{}/ocr", session_id))
            .await;
        recognized.assert_status_ok();
        let recognized = recognized.json::<Value>();
        assert_eq!(recognized["wordCount"], 2);
        assert_eq!(recognized["source"], "words");

        // Display equals bitmap here (300x150)
        let region = server
            .post(&format!("/api/v1/sessions/{}/ocr/region", session_id))
            .json(&json!({ "rect": { "x": 20, "y": 20, "width": 140, "height": 30 } }))
            .await;
        region.assert_status_ok();
        let region = region.json::<Value>();
        assert_eq!(region["text"], "Jane Doe");
        assert_eq!(region["noWordData"], false);
    }

    #[tokio::test]
    async fn test_close_session() {
        let server = create_test_server().await;
        let session_id = open_session(&server, "doc-2", "scan.png").await;

        server
            .delete(&format!("/api/v1/sessions/{}", session_id))
            .await
            .assert_status(StatusCode::NO_CONTENT);
        server
            .get(&format!("/api/v1/sessions/{}", session_id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_open_missing_document_is_404() {
        let server = create_test_server().await;
        server
            .post("/api/v1/sessions")
            .json(&json!({ "documentId": "doc-1", "fileName": "nope.pdf" }))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
