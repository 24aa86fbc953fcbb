use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::audio::AudioBackendConfig;

/// Prefix for environment overrides, e.g. `VOICE_WIDGET_SUBMISSION__ENDPOINT`
pub const ENV_PREFIX: &str = "VOICE_WIDGET";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub submission: SubmissionConfig,
    pub recording: RecordingConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Endpoint receiving the multipart upload
    pub endpoint: String,
    /// Multipart field name carrying the audio blob
    pub audio_field: String,
    /// JSON field of the reply holding the assistant's text
    pub response_field: String,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/api/voice".to_string(),
            audio_field: "audio".to_string(),
            response_field: "response".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub min_duration_secs: u32,
    pub max_duration_secs: u32,
    /// How long the "too short" notice stays visible
    pub too_short_notice_ms: u64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            min_duration_secs: 1,
            max_duration_secs: 30,
            too_short_notice_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub chunk_interval_ms: u64,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let backend = AudioBackendConfig::default();
        Self {
            sample_rate: backend.sample_rate,
            channels: backend.channels,
            chunk_interval_ms: backend.chunk_interval_ms,
            echo_cancellation: backend.echo_cancellation,
            noise_suppression: backend.noise_suppression,
            auto_gain_control: backend.auto_gain_control,
        }
    }
}

impl From<&AudioConfig> for AudioBackendConfig {
    fn from(audio: &AudioConfig) -> Self {
        Self {
            sample_rate: audio.sample_rate,
            channels: audio.channels,
            chunk_interval_ms: audio.chunk_interval_ms,
            echo_cancellation: audio.echo_cancellation,
            noise_suppression: audio.noise_suppression,
            auto_gain_control: audio.auto_gain_control,
        }
    }
}

impl Config {
    /// Load from an optional config file, then apply `VOICE_WIDGET_*` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Config = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.submission.endpoint.trim().is_empty(),
            "submission.endpoint must not be empty"
        );
        ensure!(
            !self.submission.audio_field.is_empty(),
            "submission.audio_field must not be empty"
        );
        ensure!(
            !self.submission.response_field.is_empty(),
            "submission.response_field must not be empty"
        );
        ensure!(
            self.recording.max_duration_secs > 0,
            "recording.max_duration_secs must be greater than zero"
        );
        ensure!(
            self.recording.min_duration_secs <= self.recording.max_duration_secs,
            "recording.min_duration_secs ({}) must not exceed recording.max_duration_secs ({})",
            self.recording.min_duration_secs,
            self.recording.max_duration_secs
        );
        ensure!(self.audio.sample_rate > 0, "audio.sample_rate must be greater than zero");
        ensure!(self.audio.channels > 0, "audio.channels must be greater than zero");
        ensure!(
            self.audio.chunk_interval_ms > 0,
            "audio.chunk_interval_ms must be greater than zero"
        );
        Ok(())
    }

    pub fn backend_config(&self) -> AudioBackendConfig {
        AudioBackendConfig::from(&self.audio)
    }
}
