use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Recording life cycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingState {
    /// Nothing captured, ready to start
    Idle,
    /// Capturing audio, ticking once per second
    Recording,
    /// A usable blob is held, waiting to be sent
    Stopped,
    /// The last attempt failed; `start()` may be called again
    Error,
}

impl Default for RecordingState {
    fn default() -> Self {
        Self::Idle
    }
}

pub const LISTENING_TEXT: &str = "Listening...";
pub const TOO_SHORT_TEXT: &str = "Recording too short. Please hold on a little longer.";
pub const READY_TEXT: &str = "Recording ready to send.";
pub const SENDING_TEXT: &str = "Sending...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Listening,
    TooShort,
    ReadyToSend,
    Sending,
    Error,
}

/// Status text for the presentation layer, optionally transient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: &'static str,
    expires_at: Option<Instant>,
}

impl Notice {
    pub fn persistent(kind: NoticeKind, text: &'static str) -> Self {
        Self {
            kind,
            text,
            expires_at: None,
        }
    }

    pub fn transient(kind: NoticeKind, text: &'static str, ttl: Duration) -> Self {
        Self {
            kind,
            text,
            expires_at: Some(Instant::now() + ttl),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|expires_at| Instant::now() >= expires_at)
            .unwrap_or(false)
    }
}

/// Point-in-time view of the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingStatus {
    pub state: RecordingState,
    pub elapsed_secs: u32,
    pub min_duration_secs: u32,
    pub max_duration_secs: u32,
    pub has_blob: bool,
    pub notice: Option<NoticeKind>,
    pub notice_text: Option<String>,
}
