//! Per-viewer document session

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::geometry::{capture_area_mask, Rect, Size};
use crate::masking::{overlay_rects, BakedArtifact, MaskBaker, OverlayRect};
use crate::ocr::{extract_region_text, OcrWordIndex, RegionText};
use crate::raster::{
    LoadedDocument, PageRasterizer, RasterConfig, RasterizeError, RenderedPage, SourceKind,
};
use crate::restrictions::{
    restrictions_for_view, NewRestriction, Restriction, RestrictionKind, TemplateCache, Viewer,
};

use super::error::{SessionError, SessionResult};
use super::registry::SessionServices;

/// Pages whose OCR index is kept per session
const OCR_CACHE_PAGES: usize = 8;

/// Request to open a document for a viewer
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSessionRequest {
    pub document_id: String,
    pub file_name: String,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub viewer: Viewer,
    #[serde(default)]
    pub max_display_width: Option<f64>,
    #[serde(default)]
    pub max_display_height: Option<f64>,
    /// OCR language override for this session
    #[serde(default)]
    pub language: Option<String>,
}

/// A user-drawn area on the current page
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureAreaRequest {
    /// Rectangle in display space
    pub rect: Rect,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub subject_role: Option<String>,
    #[serde(default)]
    pub subject_user: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// A page ready to show, with the masks the viewer must see over it
#[derive(Debug, Clone)]
pub struct PageView {
    pub page: RenderedPage,
    pub overlays: Vec<OverlayRect>,
    pub generation: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub document_id: String,
    pub file_name: String,
    pub kind: SourceKind,
    pub page_count: u32,
    pub current_page: Option<u32>,
    pub viewer: Viewer,
    pub template_id: Option<String>,
    pub render_scale: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct SessionState {
    current: Option<RenderedPage>,
    in_flight: Option<CancellationToken>,
}

/// Everything one viewer has open: document handle, current page, template
/// lookup, OCR results and the cancellation scope for in-flight work.
pub struct ViewerSession {
    id: String,
    document_id: String,
    viewer: Viewer,
    language: Option<String>,
    created_at: DateTime<Utc>,
    document: LoadedDocument,
    templates: TemplateCache,
    services: SessionServices,
    state: Mutex<SessionState>,
    generation: AtomicU64,
    ocr_cache: Mutex<LruCache<u32, Arc<OcrWordIndex>>>,
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl ViewerSession {
    /// Fetch the document bytes and load them for rendering
    pub async fn open(
        id: String,
        request: OpenSessionRequest,
        services: SessionServices,
    ) -> SessionResult<Self> {
        if request.document_id.trim().is_empty() || request.file_name.trim().is_empty() {
            return Err(SessionError::InvalidRequest(
                "documentId and fileName are required".to_string(),
            ));
        }

        let object = services
            .documents
            .get(&request.document_id, &request.file_name)
            .await?;

        let max_display = Size::new(
            request
                .max_display_width
                .filter(|w| *w > 0.0)
                .unwrap_or(services.raster.max_display.width),
            request
                .max_display_height
                .filter(|h| *h > 0.0)
                .unwrap_or(services.raster.max_display.height),
        );
        let rasterizer = PageRasterizer::new(RasterConfig {
            max_display,
            ..services.raster
        });
        let document = rasterizer.load(&request.file_name, object.data).await?;

        let templates = TemplateCache::new(request.template_id.clone(), services.templates.clone());
        let cache_size = NonZeroUsize::new(OCR_CACHE_PAGES).unwrap_or(NonZeroUsize::MIN);

        tracing::info!(
            "Opened session {} for {}/{} ({} pages)",
            id,
            request.document_id,
            request.file_name,
            document.page_count()
        );

        Ok(Self {
            id,
            document_id: request.document_id,
            viewer: request.viewer,
            language: request.language,
            created_at: Utc::now(),
            document,
            templates,
            services,
            state: Mutex::new(SessionState::default()),
            generation: AtomicU64::new(0),
            ocr_cache: Mutex::new(LruCache::new(cache_size)),
            cancel: CancellationToken::new(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn page_count(&self) -> u32 {
        self.document.page_count()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn current_page(&self) -> Option<RenderedPage> {
        self.state.lock().current.clone()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            document_id: self.document_id.clone(),
            file_name: self.document.file_name().to_string(),
            kind: self.document.kind(),
            page_count: self.document.page_count(),
            current_page: self.current_page().map(|p| p.page_number),
            viewer: self.viewer.clone(),
            template_id: self.templates.template_id().map(str::to_string),
            render_scale: self.document.render_scale(),
            created_at: self.created_at,
        }
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        Ok(())
    }

    fn current_or_err(&self) -> SessionResult<RenderedPage> {
        self.current_page().ok_or(SessionError::NoPageShown)
    }

    /// Restrictions on `page_number` that apply to this viewer
    pub async fn visible_restrictions(&self, page_number: u32) -> SessionResult<Vec<Restriction>> {
        let all = self.services.restrictions.list(&self.document_id).await?;
        Ok(restrictions_for_view(&all, &self.viewer, page_number))
    }

    /// Render `page_number` and make it current.
    ///
    /// Starting a new navigation cancels the previous one; a render that
    /// finishes after a newer navigation began returns `Superseded` and
    /// leaves the current page untouched.
    pub async fn show_page(&self, page_number: u32) -> SessionResult<PageView> {
        self.ensure_open()?;

        let token = self.cancel.child_token();
        let generation = {
            let mut state = self.state.lock();
            if let Some(previous) = state.in_flight.replace(token.clone()) {
                previous.cancel();
            }
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        let is_stale = || self.generation.load(Ordering::SeqCst) != generation;

        let page = match self.document.render_page(page_number, &token).await {
            Ok(page) => page,
            Err(RasterizeError::Cancelled) if is_stale() => {
                return Err(SessionError::Superseded { page: page_number });
            }
            Err(e) => return Err(e.into()),
        };

        let restrictions = self.visible_restrictions(page_number).await?;
        let template = self.templates.get().await;
        let overlays = overlay_rects(
            &restrictions,
            page.natural,
            page.display,
            template,
            self.document.render_scale(),
        );

        {
            let mut state = self.state.lock();
            if is_stale() {
                tracing::debug!("Session {}: page {} render superseded", self.id, page_number);
                return Err(SessionError::Superseded { page: page_number });
            }
            state.in_flight = None;
            state.current = Some(page.clone());
        }

        tracing::debug!(
            "Session {}: showing page {} with {} overlays",
            self.id,
            page_number,
            overlays.len()
        );
        Ok(PageView {
            page,
            overlays,
            generation,
        })
    }

    /// Store a display-space rectangle on the current page as an area mask
    pub async fn capture_area(&self, request: CaptureAreaRequest) -> SessionResult<Restriction> {
        self.ensure_open()?;
        let page = self.current_or_err()?;

        let rect = capture_area_mask(
            request.rect,
            page.natural,
            page.display,
            self.document.render_scale(),
        );
        let payload = NewRestriction {
            kind: RestrictionKind::AreaMask,
            field: None,
            rect,
            page_number: page.page_number,
            subject_role: request.subject_role,
            subject_user: request.subject_user,
            reason: request.reason,
            created_by: request.created_by,
        };

        Ok(self.services.restrictions.create(&self.document_id, payload).await?)
    }

    /// Bake the viewer's restrictions into a PNG of one page
    pub async fn export_png(&self, page_number: Option<u32>) -> SessionResult<BakedArtifact> {
        self.ensure_open()?;

        let current = self.current_page();
        let page = match (page_number, current) {
            (None, Some(current)) => current,
            (Some(n), Some(current)) if current.page_number == n => current,
            (requested, _) => {
                let n = requested.unwrap_or(1);
                self.document.render_page(n, &self.cancel.child_token()).await?
            }
        };

        let restrictions = self.visible_restrictions(page.page_number).await?;
        let template = self.templates.get().await;
        let baker = MaskBaker::new(self.document.render_scale());
        let artifact = baker
            .bake_png(
                self.document.file_name(),
                page,
                self.document.page_count(),
                restrictions,
                template,
            )
            .await?;

        tracing::info!(
            "Session {}: exported {} ({} masks)",
            self.id,
            artifact.file_name,
            artifact.applied
        );
        Ok(artifact)
    }

    /// Bake the viewer's restrictions on every page into the source PDF
    pub async fn export_pdf(&self) -> SessionResult<BakedArtifact> {
        self.ensure_open()?;
        if self.document.kind() != SourceKind::Pdf {
            return Err(SessionError::UnsupportedExport(
                "PDF export requires a PDF source".to_string(),
            ));
        }

        let restrictions: Vec<Restriction> = self
            .services
            .restrictions
            .list(&self.document_id)
            .await?
            .into_iter()
            .filter(|r| r.applies_to(&self.viewer))
            .collect();
        let template = self.templates.get().await;
        let baker = MaskBaker::new(self.document.render_scale());
        let artifact = baker
            .bake_pdf(self.document.file_name(), self.document.bytes(), restrictions, template)
            .await?;

        tracing::info!(
            "Session {}: exported {} ({} masks, {} skipped)",
            self.id,
            artifact.file_name,
            artifact.applied,
            artifact.skipped
        );
        Ok(artifact)
    }

    /// Word index for the current page, recognizing it on first use
    pub async fn recognize_current_page(&self) -> SessionResult<Arc<OcrWordIndex>> {
        self.ensure_open()?;
        let page = self.current_or_err()?;
        self.word_index(&page).await
    }

    async fn word_index(&self, page: &RenderedPage) -> SessionResult<Arc<OcrWordIndex>> {
        if let Some(index) = self.ocr_cache.lock().get(&page.page_number).cloned() {
            return Ok(index);
        }

        let png = {
            let bitmap = page.bitmap.clone();
            tokio::task::spawn_blocking(move || crate::raster::encode_png(&bitmap))
                .await
                .map_err(|e| RasterizeError::Render(format!("Task join error: {}", e)))??
        };

        let result = self
            .services
            .ocr
            .recognize(png, self.language.clone(), &self.cancel.child_token())
            .await?;
        let index = Arc::new(OcrWordIndex::build(&result, page.bitmap_size()));

        tracing::debug!(
            "Session {}: page {} recognized, {} words",
            self.id,
            page.page_number,
            index.len()
        );
        self.ocr_cache.lock().put(page.page_number, index.clone());
        Ok(index)
    }

    /// Text under a display-space rectangle on the current page
    pub async fn region_text(&self, display_rect: Rect) -> SessionResult<RegionText> {
        self.ensure_open()?;
        let page = self.current_or_err()?;
        let index = self.word_index(&page).await?;
        Ok(extract_region_text(
            &index,
            display_rect,
            page.bitmap_size(),
            page.display,
        ))
    }

    /// Cancel in-flight work and release the document
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();
        {
            let mut state = self.state.lock();
            state.in_flight = None;
            state.current = None;
        }
        self.ocr_cache.lock().clear();
        self.document.close();
        tracing::info!("Closed session {}", self.id);
    }
}

impl Drop for ViewerSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ViewerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerSession")
            .field("id", &self.id)
            .field("document_id", &self.document_id)
            .field("document", &self.document)
            .field("closed", &self.is_closed())
            .finish()
    }
}
