//! Error taxonomy for capture, submission and widget operations
//!
//! Every error carries a detailed `Display` for logs, but the text shown to a
//! user always comes from a fixed string per category.

/// Shown when the microphone permission was refused
pub const PERMISSION_DENIED_MESSAGE: &str =
    "Microphone access was denied. Please allow microphone access and try again.";
/// Shown when no input device exists
pub const DEVICE_NOT_FOUND_MESSAGE: &str =
    "No microphone was found. Please connect a microphone and try again.";
/// Shown when the device exists but cannot be opened
pub const DEVICE_UNAVAILABLE_MESSAGE: &str =
    "The microphone is in use by another application or is not responding.";
/// Shown when the device rejects the requested audio settings
pub const CONSTRAINTS_UNSUPPORTED_MESSAGE: &str =
    "Your microphone does not support the required audio settings.";
/// Shown when capture fails after recording started
pub const CAPTURE_FAILED_MESSAGE: &str = "Recording failed. Please try again.";

/// Failures while acquiring or running the audio capture pipeline
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("No audio input device found")]
    DeviceNotFound,

    #[error("Audio input device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Audio constraints unsupported: {0}")]
    ConstraintsUnsupported(String),

    #[error("Audio capture failed: {0}")]
    Runtime(String),
}

impl CaptureError {
    /// Static, user-facing description of this failure category
    pub fn user_message(&self) -> &'static str {
        match self {
            CaptureError::PermissionDenied => PERMISSION_DENIED_MESSAGE,
            CaptureError::DeviceNotFound => DEVICE_NOT_FOUND_MESSAGE,
            CaptureError::DeviceUnavailable(_) => DEVICE_UNAVAILABLE_MESSAGE,
            CaptureError::ConstraintsUnsupported(_) => CONSTRAINTS_UNSUPPORTED_MESSAGE,
            CaptureError::Runtime(_) => CAPTURE_FAILED_MESSAGE,
        }
    }

    /// Whether the failure happened while acquiring the device (as opposed to mid-recording)
    pub fn is_acquisition(&self) -> bool {
        !matches!(self, CaptureError::Runtime(_))
    }
}

/// Failures of a single submission attempt
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("Server returned HTTP {status}")]
    Status { status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Rejected widget operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WidgetError {
    #[error("A recording is already in progress or waiting to be sent")]
    NotIdle,

    #[error("No recording in progress")]
    NotRecording,

    #[error("No recording ready to send")]
    NothingToSend,

    #[error("A submission is already in flight")]
    SendInFlight,

    #[error(transparent)]
    Capture(#[from] CaptureError),
}
