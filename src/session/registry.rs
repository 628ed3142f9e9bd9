//! Process-wide map of open viewer sessions
//!
//! Sessions are kept in access order. A session nobody has touched for the
//! idle timeout is closed by [`SessionRegistry::evict_idle`], and opening a
//! session beyond the capacity closes the least recently used one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::ocr::OcrWorker;
use crate::raster::RasterConfig;
use crate::restrictions::{RestrictionStore, TemplateDirectory};
use crate::storage::DocumentStore;

use super::error::{SessionError, SessionResult};
use super::viewer::{OpenSessionRequest, ViewerSession};

/// Collaborators every session uses
#[derive(Clone)]
pub struct SessionServices {
    pub documents: Arc<dyn DocumentStore>,
    pub restrictions: RestrictionStore,
    pub templates: Arc<dyn TemplateDirectory>,
    pub ocr: OcrWorker,
    pub raster: RasterConfig,
}

/// Bounds on how long and how many sessions stay open
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionLimits {
    pub idle_timeout: Duration,
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30 * 60),
            max_sessions: 256,
        }
    }
}

struct SessionEntry {
    session: Arc<ViewerSession>,
    last_access: Instant,
}

pub struct SessionRegistry {
    services: SessionServices,
    limits: SessionLimits,
    sessions: Mutex<LruCache<String, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new(services: SessionServices) -> Self {
        Self::with_limits(services, SessionLimits::default())
    }

    pub fn with_limits(services: SessionServices, limits: SessionLimits) -> Self {
        Self {
            services,
            limits,
            sessions: Mutex::new(LruCache::unbounded()),
        }
    }

    pub fn services(&self) -> &SessionServices {
        &self.services
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// Open a document for a viewer and register the session
    pub async fn open(&self, request: OpenSessionRequest) -> SessionResult<Arc<ViewerSession>> {
        let id = Uuid::new_v4().to_string();
        let session =
            Arc::new(ViewerSession::open(id.clone(), request, self.services.clone()).await?);

        let evicted = {
            let mut sessions = self.sessions.lock();
            sessions.put(
                id,
                SessionEntry {
                    session: session.clone(),
                    last_access: Instant::now(),
                },
            );
            let mut evicted = Vec::new();
            while sessions.len() > self.limits.max_sessions.max(1) {
                match sessions.pop_lru() {
                    Some((_, entry)) => evicted.push(entry.session),
                    None => break,
                }
            }
            evicted
        };

        for old in evicted {
            tracing::info!("Session limit reached, closing least recent session {}", old.id());
            old.close();
        }
        Ok(session)
    }

    /// Look up a session and mark it as used
    pub fn get(&self, id: &str) -> SessionResult<Arc<ViewerSession>> {
        let mut sessions = self.sessions.lock();
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        entry.last_access = Instant::now();
        Ok(entry.session.clone())
    }

    /// Remove and close a session
    pub fn close(&self, id: &str) -> SessionResult<()> {
        let entry = self
            .sessions
            .lock()
            .pop(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        entry.session.close();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Close sessions idle for longer than the timeout. Returns how many
    /// were closed.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    fn evict_idle_at(&self, now: Instant) -> usize {
        let idle = {
            let mut sessions = self.sessions.lock();
            let mut idle = Vec::new();
            // Least recently used first, so the first active entry ends the scan
            while let Some((_, entry)) = sessions.peek_lru() {
                if now.saturating_duration_since(entry.last_access) <= self.limits.idle_timeout {
                    break;
                }
                match sessions.pop_lru() {
                    Some((_, entry)) => idle.push(entry.session),
                    None => break,
                }
            }
            idle
        };

        for session in &idle {
            tracing::info!("Closing idle session {}", session.id());
            session.close();
        }
        idle.len()
    }

    /// Close every session, used on shutdown
    pub fn close_all(&self) {
        let sessions: Vec<_> = {
            let mut sessions = self.sessions.lock();
            std::iter::from_fn(|| sessions.pop_lru().map(|(_, entry)| entry.session)).collect()
        };
        if !sessions.is_empty() {
            tracing::info!("Closing {} open sessions", sessions.len());
        }
        for session in sessions {
            session.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restrictions::Viewer;
    use crate::test_support::{blank_pdf, test_services};

    fn request(file_name: &str) -> OpenSessionRequest {
        OpenSessionRequest {
            document_id: "doc".into(),
            file_name: file_name.into(),
            template_id: None,
            viewer: Viewer::default(),
            max_display_width: None,
            max_display_height: None,
            language: None,
        }
    }

    #[tokio::test]
    async fn test_open_get_close() {
        let services = test_services().await;
        services
            .documents
            .put("doc", "a.pdf", blank_pdf(&[(200.0, 100.0)]))
            .await
            .unwrap();
        let registry = SessionRegistry::new(services);

        let session = registry.open(request("a.pdf")).await.unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(session.id()).unwrap().page_count(), 1);

        registry.close(session.id()).unwrap();
        assert!(session.is_closed());
        assert!(registry.is_empty());
        assert!(matches!(registry.get(session.id()), Err(SessionError::NotFound(_))));
        assert!(matches!(registry.close(session.id()), Err(SessionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_open_missing_document() {
        let registry = SessionRegistry::new(test_services().await);
        let err = registry.open(request("missing.pdf")).await.unwrap_err();
        assert!(matches!(err, SessionError::Storage(_)));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_close_all() {
        let services = test_services().await;
        services
            .documents
            .put("doc", "a.png", crate::test_support::solid_png(4, 4, [255, 0, 0, 255]))
            .await
            .unwrap();
        let registry = SessionRegistry::new(services);
        let a = registry.open(request("a.png")).await.unwrap();
        let b = registry.open(request("a.png")).await.unwrap();

        registry.close_all();
        assert!(a.is_closed() && b.is_closed());
        assert!(registry.is_empty());
    }

    async fn png_services() -> SessionServices {
        let services = test_services().await;
        services
            .documents
            .put("doc", "a.png", crate::test_support::solid_png(4, 4, [255, 0, 0, 255]))
            .await
            .unwrap();
        services
    }

    #[tokio::test]
    async fn test_idle_sessions_are_closed() {
        let limits = SessionLimits {
            idle_timeout: Duration::from_secs(60),
            max_sessions: 8,
        };
        let registry = SessionRegistry::with_limits(png_services().await, limits);
        let active = registry.open(request("a.png")).await.unwrap();
        let abandoned = registry.open(request("a.png")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let marker = Instant::now();
        registry.get(active.id()).unwrap();

        assert_eq!(registry.evict_idle(), 0);
        assert_eq!(registry.evict_idle_at(marker + limits.idle_timeout), 1);
        assert!(abandoned.is_closed());
        assert!(!active.is_closed());
        assert!(matches!(registry.get(abandoned.id()), Err(SessionError::NotFound(_))));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_capacity_closes_least_recent_session() {
        let limits = SessionLimits {
            idle_timeout: Duration::from_secs(60),
            max_sessions: 2,
        };
        let registry = SessionRegistry::with_limits(png_services().await, limits);
        let first = registry.open(request("a.png")).await.unwrap();
        let second = registry.open(request("a.png")).await.unwrap();
        // Touching the first makes the second the eviction candidate
        registry.get(first.id()).unwrap();
        let third = registry.open(request("a.png")).await.unwrap();

        assert_eq!(registry.len(), 2);
        assert!(second.is_closed());
        assert!(!first.is_closed() && !third.is_closed());
    }
}
