use anyhow::{Context, Result};
use hound::WavReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame, FrameResult};
use crate::error::CaptureError;

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .context("Failed to open WAV file")?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 /
            (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }
}

/// Replays a WAV file as a live capture stream
///
/// Frames are paced at the configured chunk interval. Once the file runs
/// out, the stream stays open and silent until `close()`, like a microphone
/// in a quiet room.
pub struct FileBackend {
    path: PathBuf,
    config: AudioBackendConfig,
    audio: Option<AudioFile>,
    producer: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>, config: AudioBackendConfig) -> Self {
        Self {
            path: path.into(),
            config,
            audio: None,
            producer: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn open(&mut self) -> Result<(), CaptureError> {
        if self.audio.is_some() {
            return Ok(());
        }

        if !self.path.exists() {
            return Err(CaptureError::DeviceNotFound);
        }

        let audio = AudioFile::open(&self.path)
            .map_err(|e| CaptureError::ConstraintsUnsupported(format!("{:#}", e)))?;

        if audio.sample_rate == 0 || audio.channels == 0 {
            return Err(CaptureError::ConstraintsUnsupported(format!(
                "{}Hz, {} channels",
                audio.sample_rate, audio.channels
            )));
        }

        self.audio = Some(audio);
        Ok(())
    }

    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<FrameResult>, CaptureError> {
        let audio = self
            .audio
            .as_ref()
            .ok_or_else(|| CaptureError::DeviceUnavailable("file source not open".into()))?;

        if self.producer.is_some() {
            return Err(CaptureError::DeviceUnavailable("already capturing".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let sample_rate = audio.sample_rate;
        let channels = audio.channels;
        let frame_len = self.config.samples_per_chunk(sample_rate, channels);
        let period = Duration::from_millis(self.config.chunk_interval_ms.max(1));
        let samples = audio.samples.clone();

        info!(
            "Replaying {} ({}Hz, {} channels, {} samples per frame)",
            audio.path, sample_rate, channels, frame_len
        );

        let producer = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            let mut timestamp_ms = 0;

            for chunk in samples.chunks(frame_len) {
                interval.tick().await;

                let frame = AudioFrame {
                    samples: chunk.to_vec(),
                    sample_rate,
                    channels,
                    timestamp_ms,
                };
                timestamp_ms += frame.duration_ms();

                if tx.send(Ok(frame)).is_err() {
                    return;
                }
            }

            debug!("File replay exhausted, holding stream open");
            tx.closed().await;
        });

        self.producer = Some(producer);
        Ok(rx)
    }

    async fn close(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
        if self.audio.take().is_some() {
            debug!("File source released: {}", self.path.display());
        }
    }

    fn is_open(&self) -> bool {
        self.audio.is_some()
    }

    fn name(&self) -> &str {
        "file"
    }
}
