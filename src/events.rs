use serde::Serialize;
use uuid::Uuid;

/// Notifications emitted to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WidgetEvent {
    RecordingStarted { attempt_id: Uuid },
    Tick { elapsed_secs: u32 },
    RecordingStopped { duration_secs: u32, auto_stopped: bool },
    RecordingTooShort { duration_secs: u32 },
    SendStarted { duration_secs: u32 },
    SendCompleted { duration_secs: u32, success: bool },
    ConversationCleared,
    Error { message: String },
}
