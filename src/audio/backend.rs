use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::error::CaptureError;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Duration of this frame in milliseconds
    pub fn duration_ms(&self) -> u64 {
        let per_second = self.sample_rate as u64 * self.channels.max(1) as u64;
        if per_second == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / per_second
    }
}

/// One item delivered by a capture backend: a frame, or the error that ended capture
pub type FrameResult = Result<AudioFrame, CaptureError>;

/// Configuration for audio backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Requested sample rate in Hz
    pub sample_rate: u32,
    /// Requested channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Interval at which frames are delivered
    pub chunk_interval_ms: u64,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            chunk_interval_ms: 100, // 100ms frames
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

impl AudioBackendConfig {
    /// Number of interleaved samples in one chunk interval
    pub fn samples_per_chunk(&self, sample_rate: u32, channels: u16) -> usize {
        let samples = sample_rate as u64 * channels as u64 * self.chunk_interval_ms / 1000;
        samples.max(1) as usize
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - File: replay a WAV file at real-time pace (testing, demos, batch use)
/// - Microphone: default input device via cpal (`microphone` feature)
///
/// `close()` must drop every frame sender handed out by `start()`, so the
/// receiving side observes the end of the stream.
#[async_trait::async_trait]
pub trait AudioBackend: Send {
    /// Acquire the input device
    async fn open(&mut self) -> Result<(), CaptureError>;

    /// Start delivering frames, one per chunk interval
    async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<FrameResult>, CaptureError>;

    /// Release the input device. Safe to call when nothing is held.
    async fn close(&mut self);

    /// Whether the input device is currently held
    fn is_open(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio source type
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Default microphone (requires the `microphone` feature)
    Microphone,
    /// WAV file replayed as a live stream
    File(PathBuf),
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create audio backend for the given source
    pub fn create(
        source: AudioSource,
        config: AudioBackendConfig,
    ) -> anyhow::Result<Box<dyn AudioBackend>> {
        match source {
            AudioSource::Microphone => {
                #[cfg(feature = "microphone")]
                {
                    use super::microphone::MicrophoneBackend;
                    Ok(Box::new(MicrophoneBackend::new(config)))
                }

                #[cfg(not(feature = "microphone"))]
                {
                    let _ = config;
                    anyhow::bail!("Microphone capture requires the `microphone` feature")
                }
            }

            AudioSource::File(path) => {
                use super::file::FileBackend;
                Ok(Box::new(FileBackend::new(path, config)))
            }
        }
    }
}
