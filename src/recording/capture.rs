use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audio::{AudioBackend, AudioBlob, AudioFrame, FrameResult, WavEncoder};
use crate::error::CaptureError;

/// Owns the input stream and the chunk buffer of one recording attempt
///
/// Frames are drained by a collector task in arrival order; `finish()` joins
/// that task and encodes whatever it gathered into one blob. The input
/// device is released on every exit path.
pub struct MediaCaptureSession {
    backend: Box<dyn AudioBackend>,
    encoder: WavEncoder,
    collector: Option<JoinHandle<Result<Vec<AudioFrame>, CaptureError>>>,
}

impl MediaCaptureSession {
    pub fn new(backend: Box<dyn AudioBackend>, encoder: WavEncoder) -> Self {
        Self {
            backend,
            encoder,
            collector: None,
        }
    }

    /// Acquire the input device. Nothing stays open if this fails.
    pub async fn open(&mut self) -> Result<(), CaptureError> {
        info!("Opening {} capture", self.backend.name());

        if let Err(e) = self.backend.open().await {
            warn!("Failed to open {} capture: {}", self.backend.name(), e);
            self.backend.close().await;
            return Err(e);
        }

        Ok(())
    }

    /// Start buffering frames from the opened device
    pub async fn begin_encoding(&mut self) -> Result<(), CaptureError> {
        if self.collector.is_some() {
            return Err(CaptureError::DeviceUnavailable("already capturing".into()));
        }

        let rx = match self.backend.start().await {
            Ok(rx) => rx,
            Err(e) => {
                warn!("Failed to start {} capture: {}", self.backend.name(), e);
                self.backend.close().await;
                return Err(e);
            }
        };

        self.collector = Some(tokio::spawn(collect_frames(rx)));
        debug!("Frame collector started");
        Ok(())
    }

    /// Stop capture, release the device and encode the buffered frames
    ///
    /// Returns `Ok(None)` when nothing was being captured.
    pub async fn finish(&mut self) -> Result<Option<AudioBlob>, CaptureError> {
        let collector = match self.collector.take() {
            Some(collector) => collector,
            None => {
                self.backend.close().await;
                return Ok(None);
            }
        };

        // Closing drops the backend's senders, which ends the collector
        self.backend.close().await;

        let frames = collector
            .await
            .map_err(|e| CaptureError::Runtime(format!("Frame collector failed: {}", e)))??;

        info!("Capture finished: {} frames", frames.len());
        self.encoder.encode(&frames).map(Some)
    }

    /// Drop any buffered audio and release the device
    pub async fn release(&mut self) {
        if let Some(collector) = self.collector.take() {
            collector.abort();
            debug!("Discarded in-progress capture");
        }
        self.backend.close().await;
    }

    /// Whether frames are currently being collected
    pub fn is_capturing(&self) -> bool {
        self.collector.is_some()
    }

    /// The frame stream ended on its own while capturing
    pub fn has_failed(&self) -> bool {
        self.collector
            .as_ref()
            .map(|collector| collector.is_finished())
            .unwrap_or(false)
    }

    /// Whether the underlying input device is held
    pub fn is_stream_open(&self) -> bool {
        self.backend.is_open()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

async fn collect_frames(
    mut rx: mpsc::UnboundedReceiver<FrameResult>,
) -> Result<Vec<AudioFrame>, CaptureError> {
    let mut frames = Vec::new();

    while let Some(item) = rx.recv().await {
        match item {
            Ok(frame) => frames.push(frame),
            Err(e) => {
                warn!("Capture stream failed after {} frames: {}", frames.len(), e);
                return Err(e);
            }
        }
    }

    Ok(frames)
}
