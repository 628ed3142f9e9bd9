//! Dedicated MuPDF render thread
//!
//! MuPDF documents are not thread-safe, so each loaded PDF is owned by a
//! single worker thread that opens it once and serves render commands over a
//! channel. Dropping the handle shuts the thread down and frees the document.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use image::RgbaImage;
use mupdf::{Colorspace, Document, Matrix};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;

use crate::geometry::Size;

use super::error::{RasterResult, RasterizeError};

/// Timeout for a single page render
const RENDER_TIMEOUT_SECS: u64 = 30;

/// Raw output of one page render
#[derive(Debug)]
pub(crate) struct PdfPageRaster {
    pub bitmap: RgbaImage,
    /// Page size in points
    pub natural: Size,
}

enum RenderCommand {
    Render {
        page_index: i32,
        scale: f32,
        cancel: CancellationToken,
        reply: oneshot::Sender<RasterResult<PdfPageRaster>>,
    },
    Shutdown,
}

/// Handle to a render thread owning one open PDF
pub struct PdfRenderThread {
    sender: mpsc::Sender<RenderCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
    page_count: u32,
    closed: AtomicBool,
}

impl PdfRenderThread {
    /// Open `data` on a new thread. Blocks until the document is parsed.
    pub fn spawn(data: Arc<Vec<u8>>) -> RasterResult<Self> {
        let (command_tx, command_rx) = mpsc::channel::<RenderCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<RasterResult<u32>>();

        let worker = thread::Builder::new()
            .name("docmask-render".into())
            .spawn(move || {
                let document = match open_document(&data) {
                    Ok((document, page_count)) => {
                        if ready_tx.send(Ok(page_count)).is_err() {
                            return;
                        }
                        document
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                while let Ok(command) = command_rx.recv() {
                    match command {
                        RenderCommand::Render {
                            page_index,
                            scale,
                            cancel,
                            reply,
                        } => {
                            let result = if cancel.is_cancelled() {
                                Err(RasterizeError::Cancelled)
                            } else {
                                match render_page(&document, page_index, scale) {
                                    Ok(_) if cancel.is_cancelled() => {
                                        Err(RasterizeError::Cancelled)
                                    }
                                    other => other,
                                }
                            };
                            if reply.send(result).is_err() {
                                tracing::debug!(
                                    "Render caller dropped before page {} completed",
                                    page_index + 1
                                );
                            }
                        }
                        RenderCommand::Shutdown => break,
                    }
                }

                drop(document);
                tracing::debug!("Render thread released document");
            })
            .map_err(|e| RasterizeError::Render(format!("Failed to spawn render thread: {}", e)))?;

        let page_count = ready_rx
            .recv()
            .map_err(|_| RasterizeError::Decode("Render thread exited during load".to_string()))??;

        Ok(Self {
            sender: command_tx,
            worker: Mutex::new(Some(worker)),
            page_count,
            closed: AtomicBool::new(false),
        })
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Render a zero-based page at `scale`
    pub(crate) async fn render(
        &self,
        page_index: u32,
        scale: f64,
        cancel: &CancellationToken,
    ) -> RasterResult<PdfPageRaster> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RasterizeError::Closed);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RenderCommand::Render {
                page_index: page_index as i32,
                scale: scale as f32,
                cancel: cancel.clone(),
                reply: reply_tx,
            })
            .map_err(|_| RasterizeError::Closed)?;

        tokio::select! {
            _ = cancel.cancelled() => Err(RasterizeError::Cancelled),
            reply = timeout(Duration::from_secs(RENDER_TIMEOUT_SECS), reply_rx) => match reply {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(RasterizeError::Closed),
                Err(_) => {
                    tracing::warn!("Page {} render timed out", page_index + 1);
                    Err(RasterizeError::Timeout(RENDER_TIMEOUT_SECS))
                }
            },
        }
    }

    /// Stop the thread. Queued renders resolve to `Closed`; the document is
    /// freed once any in-progress render finishes.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.sender.send(RenderCommand::Shutdown);
        // Detached: the thread exits once it drains the queue
        self.worker.lock().take();
    }
}

impl Drop for PdfRenderThread {
    fn drop(&mut self) {
        self.close();
    }
}

fn open_document(data: &[u8]) -> RasterResult<(Document, u32)> {
    let document = Document::from_bytes(data, "application/pdf")
        .map_err(|e| RasterizeError::Decode(format!("Failed to open PDF: {}", e)))?;
    let page_count = document
        .page_count()
        .map_err(|e| RasterizeError::Decode(format!("Failed to count pages: {}", e)))?;
    if page_count <= 0 {
        return Err(RasterizeError::Decode("PDF has no pages".to_string()));
    }
    Ok((document, page_count as u32))
}

fn render_page(document: &Document, page_index: i32, scale: f32) -> RasterResult<PdfPageRaster> {
    let page = document.load_page(page_index)?;
    let bounds = page.bounds()?;
    let natural = Size::new((bounds.x1 - bounds.x0) as f64, (bounds.y1 - bounds.y0) as f64);

    let matrix = Matrix::new_scale(scale, scale);
    let colorspace = Colorspace::device_rgb();
    // No alpha: pages render onto an opaque white background
    let pixmap = page.to_pixmap(&matrix, &colorspace, false, true)?;

    Ok(PdfPageRaster {
        bitmap: pixmap_to_rgba(&pixmap)?,
        natural,
    })
}

/// Convert a MuPDF pixmap (RGB or RGBA samples) to an RGBA buffer
fn pixmap_to_rgba(pixmap: &mupdf::Pixmap) -> RasterResult<RgbaImage> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(255);
            let g = samples.get(offset + 1).copied().unwrap_or(255);
            let b = samples.get(offset + 2).copied().unwrap_or(255);
            let a = if n >= 4 {
                samples.get(offset + 3).copied().unwrap_or(255)
            } else {
                255
            };
            rgba.extend_from_slice(&[r, g, b, a]);
        }
    }

    RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| RasterizeError::Render("Failed to create image buffer".to_string()))
}
