// Shared fixtures for integration tests: a scripted capture backend that
// records how often the input device was acquired and released.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use voice_widget::audio::{AudioBackend, AudioFrame, FrameResult, WavEncoder};
use voice_widget::config::RecordingConfig;
use voice_widget::{CaptureError, MediaCaptureSession, RecordingController, WidgetEvent};

/// Observes a [`StubBackend`] after it has been boxed and moved away
#[derive(Clone, Default)]
pub struct BackendProbe {
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    open_now: Arc<AtomicBool>,
}

impl BackendProbe {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Whether the stub currently holds its "device"
    pub fn is_open(&self) -> bool {
        self.open_now.load(Ordering::SeqCst)
    }
}

/// Capture backend that replays scripted frames instantly on `start()`
///
/// The frame sender is kept until `close()`, like a live device.
pub struct StubBackend {
    probe: BackendProbe,
    fail_open: Option<CaptureError>,
    fail_start: Option<CaptureError>,
    script: Vec<FrameResult>,
    sender: Option<mpsc::UnboundedSender<FrameResult>>,
    open: bool,
}

impl StubBackend {
    pub fn new(probe: BackendProbe) -> Self {
        Self {
            probe,
            fail_open: None,
            fail_start: None,
            script: frames(5),
            sender: None,
            open: false,
        }
    }

    pub fn failing_open(probe: BackendProbe, error: CaptureError) -> Self {
        Self {
            fail_open: Some(error),
            ..Self::new(probe)
        }
    }

    pub fn failing_start(probe: BackendProbe, error: CaptureError) -> Self {
        Self {
            fail_start: Some(error),
            ..Self::new(probe)
        }
    }

    pub fn with_script(probe: BackendProbe, script: Vec<FrameResult>) -> Self {
        Self {
            script,
            ..Self::new(probe)
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for StubBackend {
    async fn open(&mut self) -> Result<(), CaptureError> {
        if let Some(error) = self.fail_open.clone() {
            return Err(error);
        }
        self.open = true;
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        self.probe.open_now.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<FrameResult>, CaptureError> {
        if let Some(error) = self.fail_start.clone() {
            return Err(error);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        for item in self.script.clone() {
            let _ = tx.send(item);
        }
        self.sender = Some(tx);
        Ok(rx)
    }

    async fn close(&mut self) {
        self.sender = None;
        if self.open {
            self.open = false;
            self.probe.closes.fetch_add(1, Ordering::SeqCst);
            self.probe.open_now.store(false, Ordering::SeqCst);
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// `count` consecutive 100ms frames of 16kHz mono audio, each filled with its index
pub fn frames(count: usize) -> Vec<FrameResult> {
    (0..count)
        .map(|i| {
            Ok(AudioFrame {
                samples: vec![i as i16; 1600],
                sample_rate: 16000,
                channels: 1,
                timestamp_ms: i as u64 * 100,
            })
        })
        .collect()
}

pub fn recording_config(min: u32, max: u32) -> RecordingConfig {
    RecordingConfig {
        min_duration_secs: min,
        max_duration_secs: max,
        too_short_notice_ms: 2000,
    }
}

pub fn controller_with(
    backend: StubBackend,
    config: RecordingConfig,
) -> (RecordingController, broadcast::Receiver<WidgetEvent>) {
    let (events, rx) = broadcast::channel(256);
    let capture = MediaCaptureSession::new(Box::new(backend), WavEncoder::new(16000, 1));
    (RecordingController::new(config, capture, events), rx)
}

/// Every event currently queued on the receiver
pub fn drain(rx: &mut broadcast::Receiver<WidgetEvent>) -> Vec<WidgetEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
