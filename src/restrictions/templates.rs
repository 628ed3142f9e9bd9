//! Template image dimensions for field-mask projection

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::geometry::Size;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template lookup failed: {0}")]
    Lookup(String),

    #[error("Template has invalid dimensions: {0}x{1}")]
    InvalidDimensions(f64, f64),
}

/// Source of template dimensions
#[async_trait]
pub trait TemplateDirectory: Send + Sync {
    async fn dimensions(&self, template_id: &str) -> Result<Size, TemplateError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateDimensionsResponse {
    #[serde(alias = "ImageWidth", alias = "image_width")]
    image_width: f64,
    #[serde(alias = "ImageHeight", alias = "image_height")]
    image_height: f64,
}

/// `GET {base}/templates/{id} -> { imageWidth, imageHeight }`
pub struct HttpTemplateDirectory {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTemplateDirectory {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TemplateDirectory for HttpTemplateDirectory {
    async fn dimensions(&self, template_id: &str) -> Result<Size, TemplateError> {
        let url = format!("{}/templates/{}", self.base_url, urlencoding::encode(template_id));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TemplateError::Lookup(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(TemplateError::NotFound(template_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(TemplateError::Lookup(format!(
                "template service returned {}",
                response.status()
            )));
        }

        let body: TemplateDimensionsResponse = response
            .json()
            .await
            .map_err(|e| TemplateError::Lookup(format!("Failed to parse response: {}", e)))?;

        let size = Size::new(body.image_width, body.image_height);
        if size.is_degenerate() {
            return Err(TemplateError::InvalidDimensions(size.width, size.height));
        }
        Ok(size)
    }
}

/// Fixed template sizes, used when no template service is configured
#[derive(Default)]
pub struct StaticTemplateDirectory {
    templates: std::collections::HashMap<String, Size>,
}

impl StaticTemplateDirectory {
    pub fn with_template(mut self, template_id: &str, size: Size) -> Self {
        self.templates.insert(template_id.to_string(), size);
        self
    }
}

#[async_trait]
impl TemplateDirectory for StaticTemplateDirectory {
    async fn dimensions(&self, template_id: &str) -> Result<Size, TemplateError> {
        self.templates
            .get(template_id)
            .copied()
            .ok_or_else(|| TemplateError::NotFound(template_id.to_string()))
    }
}

/// Session-scoped template lookup, resolved at most once
///
/// A missing template id or failed lookup resolves to `None`, meaning field
/// rects are already in page space.
pub struct TemplateCache {
    template_id: Option<String>,
    directory: Arc<dyn TemplateDirectory>,
    resolved: OnceCell<Option<Size>>,
}

impl TemplateCache {
    pub fn new(template_id: Option<String>, directory: Arc<dyn TemplateDirectory>) -> Self {
        Self {
            template_id: template_id.filter(|id| !id.trim().is_empty()),
            directory,
            resolved: OnceCell::new(),
        }
    }

    pub fn template_id(&self) -> Option<&str> {
        self.template_id.as_deref()
    }

    pub async fn get(&self) -> Option<Size> {
        *self
            .resolved
            .get_or_init(|| async {
                let template_id = self.template_id.as_deref()?;
                match self.directory.dimensions(template_id).await {
                    Ok(size) => {
                        tracing::debug!(
                            "Template {} is {}x{}",
                            template_id,
                            size.width,
                            size.height
                        );
                        Some(size)
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Template {} unavailable, treating field masks as page space: {}",
                            template_id,
                            e
                        );
                        None
                    }
                }
            })
            .await
    }
}
