//! Application state management

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::ocr::OcrWorker;
use crate::restrictions::{
    HttpRestrictionBackend, HttpTemplateDirectory, RestrictionBackend, RestrictionError,
    RestrictionStore, SqliteRestrictionBackend, StaticTemplateDirectory, TemplateDirectory,
};
use crate::session::{SessionRegistry, SessionServices};
use crate::storage::{DocumentStore, FsDocumentStore};

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to initialize restriction backend: {0}")]
    RestrictionBackend(#[from] RestrictionError),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    sessions: SessionRegistry,
    shutdown: CancellationToken,
}

impl AppState {
    /// Build collaborators from configuration.
    ///
    /// This starts the OCR worker, so it must run inside the tokio runtime.
    pub async fn from_config(config: Config) -> Result<Self, StateError> {
        let backend: Arc<dyn RestrictionBackend> = match &config.restrictions.service_url {
            Some(url) => {
                tracing::info!("Restrictions backed by service at {}", url);
                Arc::new(HttpRestrictionBackend::new(url))
            }
            None => {
                tracing::info!(
                    "Restrictions stored locally at {}",
                    config.restrictions.database_url
                );
                Arc::new(
                    SqliteRestrictionBackend::connect(&config.restrictions.database_url).await?,
                )
            }
        };

        let templates: Arc<dyn TemplateDirectory> = match &config.templates.service_url {
            Some(url) => Arc::new(HttpTemplateDirectory::new(url)),
            None => {
                tracing::warn!("TEMPLATES_URL not set, field masks are treated as page space");
                Arc::new(StaticTemplateDirectory::default())
            }
        };

        let documents: Arc<dyn DocumentStore> =
            Arc::new(FsDocumentStore::new(&config.storage.document_root));

        let ocr_config = config.ocr_service();
        let ocr = OcrWorker::spawn(ocr_config.build_provider());

        let services = SessionServices {
            documents,
            restrictions: RestrictionStore::new(backend),
            templates,
            ocr,
            raster: config.raster(),
        };

        Ok(Self::new(config, services))
    }

    pub fn new(config: Config, services: SessionServices) -> Self {
        let limits = config.session_limits();
        Self {
            inner: Arc::new(AppStateInner {
                config,
                sessions: SessionRegistry::with_limits(services, limits),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Periodically close idle sessions until shutdown
    pub fn spawn_session_sweeper(&self) -> JoinHandle<()> {
        let state = self.clone();
        let period = Duration::from_secs(self.inner.config.sessions.sweep_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let closed = state.sessions().evict_idle();
                        if closed > 0 {
                            tracing::info!("Session sweep closed {} idle sessions", closed);
                        }
                    }
                    _ = state.inner.shutdown.cancelled() => {
                        tracing::debug!("Session sweeper stopped");
                        break;
                    }
                }
            }
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the open viewer sessions
    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }

    /// Get the restriction store
    pub fn restrictions(&self) -> &RestrictionStore {
        &self.inner.sessions.services().restrictions
    }

    /// Get the OCR worker
    pub fn ocr(&self) -> &OcrWorker {
        &self.inner.sessions.services().ocr
    }

    /// Close every open session before exit
    pub fn shutdown(&self) {
        tracing::info!("Shutting down application state...");
        self.inner.shutdown.cancel();
        self.inner.sessions.close_all();
    }
}
