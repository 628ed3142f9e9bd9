//! Serialized OCR worker
//!
//! One worker per process. Requests queue on an mpsc channel and are handed
//! to the engine one at a time; each carries its own cancellation token.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::provider::OcrProviderTrait;
use super::types::{OcrError, OcrProvider, RecognitionResult};

const QUEUE_DEPTH: usize = 32;

struct OcrJob {
    image: Vec<u8>,
    language: Option<String>,
    cancel: CancellationToken,
    reply: oneshot::Sender<Result<RecognitionResult, OcrError>>,
}

/// Handle to the OCR actor task
#[derive(Clone)]
pub struct OcrWorker {
    sender: mpsc::Sender<OcrJob>,
    provider: Arc<dyn OcrProviderTrait>,
}

impl OcrWorker {
    /// Start the actor on the current tokio runtime
    pub fn spawn(provider: Arc<dyn OcrProviderTrait>) -> Self {
        let (sender, mut receiver) = mpsc::channel::<OcrJob>(QUEUE_DEPTH);
        let engine = Arc::clone(&provider);

        tokio::spawn(async move {
            tracing::info!("OCR worker started ({:?})", engine.provider_type());

            while let Some(job) = receiver.recv().await {
                if job.cancel.is_cancelled() || job.reply.is_closed() {
                    let _ = job.reply.send(Err(OcrError::Cancelled));
                    continue;
                }

                let result = tokio::select! {
                    _ = job.cancel.cancelled() => Err(OcrError::Cancelled),
                    result = engine.recognize(&job.image, job.language.as_deref()) => result,
                };

                if let Err(e) = &result {
                    tracing::debug!("OCR job finished with error: {}", e);
                }
                let _ = job.reply.send(result);
            }

            tracing::info!("OCR worker stopped");
        });

        Self { sender, provider }
    }

    pub fn provider_type(&self) -> OcrProvider {
        self.provider.provider_type()
    }

    pub async fn is_available(&self) -> bool {
        self.provider.is_available().await
    }

    /// Queue a recognition and wait for it, or for `cancel`
    pub async fn recognize(
        &self,
        image: Vec<u8>,
        language: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<RecognitionResult, OcrError> {
        let (reply, response) = oneshot::channel();
        let job = OcrJob {
            image,
            language,
            cancel: cancel.clone(),
            reply,
        };

        self.sender
            .send(job)
            .await
            .map_err(|_| OcrError::WorkerClosed)?;

        tokio::select! {
            _ = cancel.cancelled() => Err(OcrError::Cancelled),
            result = response => result.map_err(|_| OcrError::WorkerClosed)?,
        }
    }
}

impl std::fmt::Debug for OcrWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrWorker")
            .field("provider", &self.provider.provider_type())
            .finish()
    }
}
