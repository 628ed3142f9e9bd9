//! Restriction persistence backends

use async_trait::async_trait;
use reqwest::StatusCode;

use super::error::{RestrictionError, RestrictionResult};
use super::types::{parse_persisted_list, PersistedRestriction};

/// Where restrictions are persisted
#[async_trait]
pub trait RestrictionBackend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// All restrictions stored against a document
    async fn list(&self, document_id: &str) -> RestrictionResult<Vec<PersistedRestriction>>;

    /// Persist a new record; returns it with backend-assigned fields
    async fn create(
        &self,
        document_id: &str,
        record: PersistedRestriction,
    ) -> RestrictionResult<PersistedRestriction>;

    async fn delete(&self, document_id: &str, restriction_id: &str) -> RestrictionResult<()>;
}

/// REST backing service
///
/// `GET/POST {base}/documents/{doc}/restrictions`,
/// `DELETE {base}/documents/{doc}/restrictions/{id}`
pub struct HttpRestrictionBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRestrictionBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn collection_url(&self, document_id: &str) -> String {
        format!(
            "{}/documents/{}/restrictions",
            self.base_url,
            urlencoding::encode(document_id)
        )
    }
}

#[async_trait]
impl RestrictionBackend for HttpRestrictionBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn list(&self, document_id: &str) -> RestrictionResult<Vec<PersistedRestriction>> {
        let response = self.client.get(self.collection_url(document_id)).send().await?;

        match response.status() {
            // No restrictions recorded yet
            StatusCode::NOT_FOUND => return Ok(Vec::new()),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(RestrictionError::Backend(format!(
                    "list returned {}: {}",
                    status, body
                )));
            }
            _ => {}
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| {
                RestrictionError::Backend(format!("Failed to parse list response: {}", e))
            })?;
        Ok(parse_persisted_list(body))
    }

    async fn create(
        &self,
        document_id: &str,
        record: PersistedRestriction,
    ) -> RestrictionResult<PersistedRestriction> {
        let response = self
            .client
            .post(self.collection_url(document_id))
            .json(&record)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RestrictionError::Backend(format!(
                "create returned {}: {}",
                status, body
            )));
        }

        // Services that answer with an empty body keep the submitted record
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(record);
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| {
                RestrictionError::Backend(format!("Failed to parse create response: {}", e))
            })
    }

    async fn delete(&self, document_id: &str, restriction_id: &str) -> RestrictionResult<()> {
        let url = format!(
            "{}/{}",
            self.collection_url(document_id),
            urlencoding::encode(restriction_id)
        );
        let response = self.client.delete(url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(RestrictionError::NotFound(restriction_id.to_string())),
            status if status.is_success() => Ok(()),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(RestrictionError::Backend(format!(
                    "delete returned {}: {}",
                    status, body
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        extract::{Path, State},
        http::StatusCode as AxumStatus,
        routing::{delete, get},
        Json, Router,
    };
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    type Records = Arc<Mutex<Vec<Value>>>;

    async fn list_handler(State(records): State<Records>, Path(_doc): Path<String>) -> Json<Value> {
        Json(Value::Array(records.lock().clone()))
    }

    async fn create_handler(
        State(records): State<Records>,
        Path(_doc): Path<String>,
        Json(mut body): Json<Value>,
    ) -> Json<Value> {
        body["ID"] = json!(records.lock().len() + 1);
        body["CreatedDate"] = json!("2026-01-01T00:00:00Z");
        records.lock().push(body.clone());
        Json(body)
    }

    async fn delete_handler(
        State(records): State<Records>,
        Path((_doc, id)): Path<(String, String)>,
    ) -> AxumStatus {
        let mut records = records.lock();
        let before = records.len();
        records.retain(|r| r["ID"].to_string().trim_matches('"') != id);
        if records.len() == before {
            AxumStatus::NOT_FOUND
        } else {
            AxumStatus::NO_CONTENT
        }
    }

    /// Serve a fake backing service on an ephemeral port
    async fn spawn_service(records: Records) -> String {
        let app = Router::new()
            .route(
                "/documents/:doc/restrictions",
                get(list_handler).post(create_handler),
            )
            .route("/documents/:doc/restrictions/:id", delete(delete_handler))
            .with_state(records);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_http_backend_roundtrip() {
        let records: Records = Arc::new(Mutex::new(vec![json!({
            "ID": "legacy",
            "Field": "ssn",
            "Reason": "PII",
            "xaxis": "10", "yaxis": "10", "width": "50", "height": "10"
        })]));
        let base = spawn_service(records.clone()).await;
        let backend = HttpRestrictionBackend::new(&format!("{}/", base));

        let listed = backend.list("doc 1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].xaxis, Some(10.0));

        let created = backend
            .create(
                "doc 1",
                PersistedRestriction {
                    reason: Some("privacy".into()),
                    restricted_type: Some("open".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(created.id.as_deref(), Some("2"));
        assert_eq!(backend.list("doc 1").await.unwrap().len(), 2);

        backend.delete("doc 1", "2").await.unwrap();
        assert!(matches!(
            backend.delete("doc 1", "2").await,
            Err(RestrictionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_http_backend_unreachable() {
        let backend = HttpRestrictionBackend::new("http://127.0.0.1:9");
        assert!(matches!(
            backend.list("doc").await,
            Err(RestrictionError::Backend(_))
        ));
    }
}
