//! Page rasterization for PDF and raster image sources
//!
//! A `LoadedDocument` is opened once per viewer session. PDF pages are
//! rendered on a dedicated MuPDF thread at the configured render scale;
//! raster images are decoded once and served as a single page.

mod bitmap;
mod error;
mod page;
mod pdf;

use std::sync::Arc;

use image::RgbaImage;
use tokio_util::sync::CancellationToken;

use crate::geometry::{Size, DEFAULT_RENDER_SCALE};

pub use error::{RasterResult, RasterizeError};
pub use page::{encode_png, RenderedPage, SourceKind};
pub use pdf::PdfRenderThread;

/// Rasterizer settings
#[derive(Debug, Clone, Copy)]
pub struct RasterConfig {
    /// Scale PDF pages are rendered at
    pub render_scale: f64,
    /// Largest size a page is displayed at
    pub max_display: Size,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            render_scale: DEFAULT_RENDER_SCALE,
            max_display: Size::new(1200.0, 1600.0),
        }
    }
}

/// Detect whether bytes are a PDF or a decodable raster image
pub fn detect_source(data: &[u8]) -> RasterResult<SourceKind> {
    if data.starts_with(b"%PDF") {
        return Ok(SourceKind::Pdf);
    }
    match image::guess_format(data) {
        Ok(_) => Ok(SourceKind::Image),
        Err(_) => Err(RasterizeError::UnsupportedFormat(
            "content is neither a PDF nor a known image format".to_string(),
        )),
    }
}

enum Backend {
    Pdf(PdfRenderThread),
    Image(Arc<RgbaImage>),
}

/// An open document ready to rasterize pages
pub struct LoadedDocument {
    file_name: String,
    data: Arc<Vec<u8>>,
    backend: Backend,
    config: RasterConfig,
}

impl std::fmt::Debug for LoadedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedDocument")
            .field("file_name", &self.file_name)
            .field("kind", &self.kind())
            .field("page_count", &self.page_count())
            .finish()
    }
}

impl LoadedDocument {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn kind(&self) -> SourceKind {
        match self.backend {
            Backend::Pdf(_) => SourceKind::Pdf,
            Backend::Image(_) => SourceKind::Image,
        }
    }

    pub fn page_count(&self) -> u32 {
        match &self.backend {
            Backend::Pdf(thread) => thread.page_count(),
            Backend::Image(_) => 1,
        }
    }

    /// Original source bytes
    pub fn bytes(&self) -> Arc<Vec<u8>> {
        self.data.clone()
    }

    pub fn render_scale(&self) -> f64 {
        self.config.render_scale
    }

    /// Rasterize a 1-based page
    pub async fn render_page(
        &self,
        page_number: u32,
        cancel: &CancellationToken,
    ) -> RasterResult<RenderedPage> {
        let page_count = self.page_count();
        if page_number == 0 || page_number > page_count {
            return Err(RasterizeError::PageOutOfRange {
                page: page_number,
                page_count,
            });
        }
        if cancel.is_cancelled() {
            return Err(RasterizeError::Cancelled);
        }

        let (bitmap, natural, raster_scale) = match &self.backend {
            Backend::Pdf(thread) => {
                let raster = thread
                    .render(page_number - 1, self.config.render_scale, cancel)
                    .await?;
                (Arc::new(raster.bitmap), raster.natural, self.config.render_scale)
            }
            Backend::Image(bitmap) => {
                let natural = Size::new(bitmap.width() as f64, bitmap.height() as f64);
                (bitmap.clone(), natural, 1.0)
            }
        };

        let display = natural
            .scale(raster_scale)
            .fit_within(self.config.max_display);

        tracing::debug!(
            "Rendered page {}/{} of {} ({}x{} px)",
            page_number,
            page_count,
            self.file_name,
            bitmap.width(),
            bitmap.height()
        );

        Ok(RenderedPage {
            page_number,
            bitmap,
            natural,
            display,
            raster_scale,
        })
    }

    /// Release native resources. Later renders fail with `Closed`.
    pub fn close(&self) {
        if let Backend::Pdf(thread) = &self.backend {
            thread.close();
        }
    }
}

/// Opens documents according to a `RasterConfig`
#[derive(Debug, Clone, Default)]
pub struct PageRasterizer {
    config: RasterConfig,
}

impl PageRasterizer {
    pub fn new(config: RasterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    /// Detect the format of `data` and open it. Parsing runs on the blocking pool.
    pub async fn load(&self, file_name: &str, data: Vec<u8>) -> RasterResult<LoadedDocument> {
        let kind = detect_source(&data)?;
        let data = Arc::new(data);
        let source = data.clone();

        let backend = tokio::task::spawn_blocking(move || match kind {
            SourceKind::Pdf => PdfRenderThread::spawn(source).map(Backend::Pdf),
            SourceKind::Image => bitmap::decode_image(&source).map(Backend::Image),
        })
        .await
        .map_err(|e| RasterizeError::Decode(format!("Task join error: {}", e)))??;

        tracing::info!("Loaded {} as {:?}", file_name, kind);

        Ok(LoadedDocument {
            file_name: file_name.to_string(),
            data,
            backend,
            config: self.config,
        })
    }
}
