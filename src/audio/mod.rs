pub mod backend;
pub mod encoder;
pub mod file;

#[cfg(feature = "microphone")]
pub mod microphone;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource, FrameResult};
pub use encoder::{AudioBlob, WavEncoder, WAV_CONTENT_TYPE, WAV_FILE_NAME};
pub use file::{AudioFile, FileBackend};

#[cfg(feature = "microphone")]
pub use microphone::MicrophoneBackend;
