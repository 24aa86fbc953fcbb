pub mod audio;
pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod recording;
pub mod submission;
pub mod widget;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioBlob, AudioFile, AudioFrame,
    AudioSource, FileBackend, FrameResult, WavEncoder,
};
pub use config::Config;
pub use conversation::{ConversationLog, Message, Role};
pub use error::{CaptureError, SubmissionError, WidgetError};
pub use events::WidgetEvent;
pub use recording::{MediaCaptureSession, RecordingController, RecordingState, RecordingStatus};
pub use submission::{SubmissionClient, SubmissionOutcome};
pub use widget::{spawn, VoiceWidget, WidgetCommand, WidgetHandle};
