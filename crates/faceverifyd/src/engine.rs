use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use faceverify_core::{EncodeError, FaceEncoder, FaceEncoding};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Requests queued ahead of the engine thread before senders wait.
const ENGINE_QUEUE_DEPTH: usize = 16;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("encoder error: {0}")]
    Encode(#[from] EncodeError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
    #[error("encoder panicked: {0}")]
    Panicked(String),
}

/// Messages sent from request handlers to the engine thread.
enum EngineRequest {
    Encode {
        image: Vec<u8>,
        reply: oneshot::Sender<Result<Vec<FaceEncoding>, EngineError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Decode a photo and encode every face in it, most confident first.
    pub async fn encode(&self, image: Vec<u8>) -> Result<Vec<FaceEncoding>, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Encode {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// True while the engine thread is still receiving requests.
    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// Loads both ONNX models synchronously so the daemon fails fast at startup
/// when they are missing, then serves requests one at a time.
pub fn spawn_engine(model_dir: &Path) -> Result<EngineHandle, EngineError> {
    let mut encoder = FaceEncoder::load(model_dir)?;
    tracing::info!(model_dir = %model_dir.display(), "face models loaded");

    let (tx, mut rx) = mpsc::channel::<EngineRequest>(ENGINE_QUEUE_DEPTH);

    std::thread::Builder::new()
        .name("faceverify-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Encode { image, reply } => {
                        let started = std::time::Instant::now();
                        let result = guarded(|| encoder.encode(&image));
                        tracing::debug!(
                            bytes = image.len(),
                            faces = result.as_ref().map(|f| f.len()).unwrap_or(0),
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "encode finished"
                        );
                        // The requester may have gone away; nothing to do then.
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .map_err(EngineError::Spawn)?;

    Ok(EngineHandle { tx })
}

/// Run one encode, turning a panic into an error for that request only so
/// the engine thread keeps serving.
fn guarded<F>(encode: F) -> Result<Vec<FaceEncoding>, EngineError>
where
    F: FnOnce() -> Result<Vec<FaceEncoding>, EncodeError>,
{
    match panic::catch_unwind(AssertUnwindSafe(encode)) {
        Ok(result) => result.map_err(EngineError::from),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(%message, "encoder panicked");
            Err(EngineError::Panicked(message))
        }
    }
}
