// Microphone backend using cpal (default input device)
//
// cpal streams are not `Send` on every platform, so the stream lives on a
// dedicated thread for the duration of one capture and is dropped there.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame, FrameResult};
use crate::error::CaptureError;

pub struct MicrophoneBackend {
    config: AudioBackendConfig,
    opened: bool,
    worker: Option<StreamWorker>,
}

struct StreamWorker {
    stop_tx: std::sync::mpsc::Sender<()>,
    thread: std::thread::JoinHandle<()>,
}

impl MicrophoneBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self {
            config,
            opened: false,
            worker: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn open(&mut self) -> Result<(), CaptureError> {
        if self.opened {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(CaptureError::DeviceNotFound)?;
        let name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let supported = device
            .default_input_config()
            .map_err(map_default_config_error)?;

        info!(
            "Microphone acquired: {} ({}Hz, {} channels, {:?})",
            name,
            supported.sample_rate().0,
            supported.channels(),
            supported.sample_format()
        );

        if supported.sample_rate().0 != self.config.sample_rate
            || supported.channels() != self.config.channels
        {
            debug!(
                "Device format differs from requested {}Hz/{}ch, capturing at native format",
                self.config.sample_rate, self.config.channels
            );
        }

        debug!(
            "Input processing requested: echo_cancellation={}, noise_suppression={}, auto_gain_control={}",
            self.config.echo_cancellation,
            self.config.noise_suppression,
            self.config.auto_gain_control
        );

        self.opened = true;
        Ok(())
    }

    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<FrameResult>, CaptureError> {
        if !self.opened {
            return Err(CaptureError::DeviceUnavailable("microphone not open".into()));
        }
        if self.worker.is_some() {
            return Err(CaptureError::DeviceUnavailable("already capturing".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
        let config = self.config.clone();

        let thread = std::thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || {
                let stream = match build_stream(&config, tx) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable(e.to_string())));
                    return;
                }

                let _ = ready_tx.send(Ok(()));

                // Runs until close() signals or drops the sender
                let _ = stop_rx.recv();
                drop(stream);
                debug!("Microphone stream dropped");
            })
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

        match ready_rx.await {
            Ok(Ok(())) => {
                self.worker = Some(StreamWorker { stop_tx, thread });
                info!("Microphone capture started");
                Ok(rx)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CaptureError::Runtime("capture thread exited".into())),
        }
    }

    async fn close(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            match tokio::task::spawn_blocking(move || worker.thread.join()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => warn!("Microphone capture thread panicked"),
                Err(e) => warn!("Failed to join microphone capture thread: {}", e),
            }
        }
        if self.opened {
            self.opened = false;
            info!("Microphone released");
        }
    }

    fn is_open(&self) -> bool {
        self.opened
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

fn build_stream(
    config: &AudioBackendConfig,
    tx: mpsc::UnboundedSender<FrameResult>,
) -> Result<cpal::Stream, CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(CaptureError::DeviceNotFound)?;
    let supported = device
        .default_input_config()
        .map_err(map_default_config_error)?;

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let stream_config: cpal::StreamConfig = supported.config();
    let chunk_len = config.samples_per_chunk(sample_rate, channels);

    let mut chunker = FrameChunker::new(sample_rate, channels, chunk_len, tx.clone());
    let err_tx = tx;
    let err_fn = move |err: cpal::StreamError| {
        let _ = err_tx.send(Err(CaptureError::Runtime(err.to_string())));
    };

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                chunker.push(data.iter().map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| chunker.push(data.iter().copied()),
            err_fn,
            None,
        ),
        cpal::SampleFormat::U16 => device.build_input_stream(
            &stream_config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                chunker.push(data.iter().map(|&s| (s as i32 - 32768) as i16))
            },
            err_fn,
            None,
        ),
        other => {
            return Err(CaptureError::ConstraintsUnsupported(format!(
                "sample format {:?}",
                other
            )))
        }
    };

    stream.map_err(map_build_error)
}

/// Regroups device callbacks of arbitrary size into fixed chunk-interval frames
struct FrameChunker {
    buffer: Vec<i16>,
    chunk_len: usize,
    sample_rate: u32,
    channels: u16,
    emitted_samples: u64,
    tx: mpsc::UnboundedSender<FrameResult>,
}

impl FrameChunker {
    fn new(
        sample_rate: u32,
        channels: u16,
        chunk_len: usize,
        tx: mpsc::UnboundedSender<FrameResult>,
    ) -> Self {
        Self {
            buffer: Vec::with_capacity(chunk_len * 2),
            chunk_len,
            sample_rate,
            channels,
            emitted_samples: 0,
            tx,
        }
    }

    fn push(&mut self, samples: impl Iterator<Item = i16>) {
        self.buffer.extend(samples);
        while self.buffer.len() >= self.chunk_len {
            let chunk: Vec<i16> = self.buffer.drain(..self.chunk_len).collect();
            self.emit(chunk);
        }
    }

    fn emit(&mut self, samples: Vec<i16>) {
        let per_second = self.sample_rate as u64 * self.channels as u64;
        let timestamp_ms = self.emitted_samples * 1000 / per_second.max(1);
        self.emitted_samples += samples.len() as u64;

        let _ = self.tx.send(Ok(AudioFrame {
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
            timestamp_ms,
        }));
    }
}

impl Drop for FrameChunker {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.emit(rest);
        }
    }
}

fn backend_error(description: String) -> CaptureError {
    if description.to_lowercase().contains("permission") {
        CaptureError::PermissionDenied
    } else {
        CaptureError::DeviceUnavailable(description)
    }
}

fn map_default_config_error(err: cpal::DefaultStreamConfigError) -> CaptureError {
    match err {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => {
            CaptureError::DeviceUnavailable("device not available".into())
        }
        cpal::DefaultStreamConfigError::StreamTypeNotSupported => {
            CaptureError::ConstraintsUnsupported("input stream type not supported".into())
        }
        cpal::DefaultStreamConfigError::BackendSpecific { err } => backend_error(err.description),
        #[allow(unreachable_patterns)]
        other => CaptureError::DeviceUnavailable(other.to_string()),
    }
}

fn map_build_error(err: cpal::BuildStreamError) -> CaptureError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => {
            CaptureError::DeviceUnavailable("device not available".into())
        }
        cpal::BuildStreamError::StreamConfigNotSupported => {
            CaptureError::ConstraintsUnsupported("stream config not supported".into())
        }
        cpal::BuildStreamError::InvalidArgument => {
            CaptureError::ConstraintsUnsupported("invalid stream argument".into())
        }
        cpal::BuildStreamError::BackendSpecific { err } => backend_error(err.description),
        other => CaptureError::DeviceUnavailable(other.to_string()),
    }
}
