//! Configuration management for Docmask Server

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::geometry::{Size, DEFAULT_RENDER_SCALE};
use crate::ocr::{OcrProvider, OcrServiceConfig};
use crate::raster::RasterConfig;
use crate::session::SessionLimits;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub restrictions: RestrictionsConfig,
    pub templates: TemplatesConfig,
    pub storage: StorageConfig,
    pub render: RenderConfig,
    pub sessions: SessionsConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Where restrictions live: a backing REST service when `service_url` is
/// set, the local SQLite database otherwise
#[derive(Debug, Clone, Deserialize)]
pub struct RestrictionsConfig {
    pub service_url: Option<String>,
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplatesConfig {
    pub service_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub document_root: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    pub render_scale: f64,
    pub max_display_width: f64,
    pub max_display_height: f64,
}

/// Viewer session lifetime
#[derive(Debug, Clone, Deserialize)]
pub struct SessionsConfig {
    pub idle_timeout_secs: u64,
    pub max_sessions: usize,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    pub provider: OcrProvider,
    pub tesseract_path: String,
    pub language: String,
    pub ollama_url: String,
    pub ollama_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            restrictions: RestrictionsConfig {
                service_url: None,
                database_url: "sqlite:./docmask.db".to_string(),
            },
            templates: TemplatesConfig { service_url: None },
            storage: StorageConfig {
                document_root: "./documents".to_string(),
            },
            render: RenderConfig {
                render_scale: DEFAULT_RENDER_SCALE,
                max_display_width: 1200.0,
                max_display_height: 1600.0,
            },
            sessions: SessionsConfig {
                idle_timeout_secs: 30 * 60,
                max_sessions: 256,
                sweep_interval_secs: 60,
            },
            ocr: OcrConfig {
                provider: OcrProvider::Tesseract,
                tesseract_path: "tesseract".to_string(),
                language: "eng".to_string(),
                ollama_url: "http://localhost:11434".to_string(),
                ollama_model: "llava".to_string(),
            },
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        let defaults = Config::default();

        let render_scale = parse_or("RENDER_SCALE", DEFAULT_RENDER_SCALE);
        let provider = match env::var("OCR_PROVIDER") {
            Ok(value) => value.parse().unwrap_or_else(|e| {
                tracing::warn!("{}, falling back to tesseract", e);
                OcrProvider::Tesseract
            }),
            Err(_) => OcrProvider::Tesseract,
        };

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_or("SERVER_PORT", 3000),
            },
            restrictions: RestrictionsConfig {
                service_url: non_empty("RESTRICTIONS_URL"),
                database_url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| defaults.restrictions.database_url.clone()),
            },
            templates: TemplatesConfig {
                service_url: non_empty("TEMPLATES_URL"),
            },
            storage: StorageConfig {
                document_root: env::var("DOCUMENT_ROOT")
                    .unwrap_or_else(|_| defaults.storage.document_root.clone()),
            },
            render: RenderConfig {
                render_scale: if render_scale.is_finite() && render_scale > 0.0 {
                    render_scale
                } else {
                    DEFAULT_RENDER_SCALE
                },
                max_display_width: parse_or("MAX_DISPLAY_WIDTH", defaults.render.max_display_width),
                max_display_height: parse_or(
                    "MAX_DISPLAY_HEIGHT",
                    defaults.render.max_display_height,
                ),
            },
            sessions: SessionsConfig {
                idle_timeout_secs: parse_or(
                    "SESSION_IDLE_TIMEOUT_SECS",
                    defaults.sessions.idle_timeout_secs,
                ),
                max_sessions: parse_or("MAX_SESSIONS", defaults.sessions.max_sessions),
                sweep_interval_secs: parse_or(
                    "SESSION_SWEEP_INTERVAL_SECS",
                    defaults.sessions.sweep_interval_secs,
                ),
            },
            ocr: OcrConfig {
                provider,
                tesseract_path: env::var("TESSERACT_PATH")
                    .unwrap_or_else(|_| defaults.ocr.tesseract_path.clone()),
                language: env::var("OCR_LANGUAGE")
                    .unwrap_or_else(|_| defaults.ocr.language.clone()),
                ollama_url: env::var("OLLAMA_URL")
                    .unwrap_or_else(|_| defaults.ocr.ollama_url.clone()),
                ollama_model: env::var("OLLAMA_MODEL")
                    .unwrap_or_else(|_| defaults.ocr.ollama_model.clone()),
            },
        })
    }

    pub fn raster(&self) -> RasterConfig {
        RasterConfig {
            render_scale: self.render.render_scale,
            max_display: Size::new(self.render.max_display_width, self.render.max_display_height),
        }
    }

    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits {
            idle_timeout: Duration::from_secs(self.sessions.idle_timeout_secs),
            max_sessions: self.sessions.max_sessions.max(1),
        }
    }

    pub fn ocr_service(&self) -> OcrServiceConfig {
        OcrServiceConfig {
            provider: self.ocr.provider,
            tesseract_path: self.ocr.tesseract_path.clone(),
            ollama_url: self.ocr.ollama_url.clone(),
            ollama_model: self.ocr.ollama_model.clone(),
            default_language: self.ocr.language.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.render.render_scale, 1.5);
        assert!(config.restrictions.service_url.is_none());
        assert_eq!(config.raster().max_display, Size::new(1200.0, 1600.0));
        assert_eq!(config.ocr_service().default_language, "eng");
        assert_eq!(config.session_limits().idle_timeout, Duration::from_secs(1800));
        assert_eq!(config.session_limits().max_sessions, 256);
    }
}
