use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audio::{AudioBackend, AudioBlob, WavEncoder};
use crate::config::Config;
use crate::conversation::{ConversationLog, Message};
use crate::error::WidgetError;
use crate::events::WidgetEvent;
use crate::recording::{
    MediaCaptureSession, Notice, NoticeKind, RecordingController, RecordingState,
    RecordingStatus, READY_TEXT, SENDING_TEXT,
};
use crate::submission::{SubmissionClient, SubmissionOutcome};

const EVENT_CAPACITY: usize = 64;

/// Coordinates recording, submission and the conversation log
///
/// At most one submission is in flight at a time; the recording's user turn
/// is logged before the request goes out and the assistant turn when it
/// resolves.
pub struct VoiceWidget {
    controller: RecordingController,
    client: SubmissionClient,
    log: ConversationLog,
    in_flight: bool,
    events: broadcast::Sender<WidgetEvent>,
}

/// A submission that has been logged and marked in flight
pub struct PendingSubmission {
    client: SubmissionClient,
    blob: AudioBlob,
    duration_secs: u32,
    attempt_id: Option<Uuid>,
}

/// Everything the presentation layer renders, captured at one instant
#[derive(Debug, Clone)]
pub struct WidgetSnapshot {
    pub status: RecordingStatus,
    pub messages: Vec<Message>,
    pub sending: bool,
    pub recording: Option<AudioBlob>,
}

/// A resolved submission, ready to be applied with [`VoiceWidget::complete_send`]
#[derive(Debug, Clone)]
pub struct SubmissionResult {
    pub duration_secs: u32,
    pub attempt_id: Option<Uuid>,
    pub outcome: SubmissionOutcome,
}

impl PendingSubmission {
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    pub async fn submit(self) -> SubmissionResult {
        let outcome = self.client.send(&self.blob, self.duration_secs).await;
        SubmissionResult {
            duration_secs: self.duration_secs,
            attempt_id: self.attempt_id,
            outcome,
        }
    }
}

impl VoiceWidget {
    pub fn new(config: &Config, backend: Box<dyn AudioBackend>) -> Result<Self> {
        config.validate()?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let encoder = WavEncoder::new(config.audio.sample_rate, config.audio.channels);
        let capture = MediaCaptureSession::new(backend, encoder);
        let controller = RecordingController::new(config.recording.clone(), capture, events.clone());
        let client = SubmissionClient::new(&config.submission)?;

        info!(
            "Voice widget ready (endpoint {}, {}-{}s recordings)",
            client.endpoint(),
            config.recording.min_duration_secs,
            config.recording.max_duration_secs
        );

        Ok(Self {
            controller,
            client,
            log: ConversationLog::new(),
            in_flight: false,
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<WidgetEvent> {
        self.events.clone()
    }

    pub fn controller(&self) -> &RecordingController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut RecordingController {
        &mut self.controller
    }

    pub fn status(&self) -> RecordingStatus {
        self.controller.status()
    }

    pub fn conversation(&self) -> &ConversationLog {
        &self.log
    }

    pub fn messages(&self) -> Vec<Message> {
        self.log.all()
    }

    pub fn is_sending(&self) -> bool {
        self.in_flight
    }

    pub fn snapshot(&self) -> WidgetSnapshot {
        WidgetSnapshot {
            status: self.controller.status(),
            messages: self.log.all(),
            sending: self.in_flight,
            recording: self.controller.blob().cloned(),
        }
    }

    pub async fn start_recording(&mut self) -> Result<(), WidgetError> {
        self.controller.start().await
    }

    pub async fn stop_recording(&mut self) -> Result<(), WidgetError> {
        self.controller.stop().await
    }

    pub async fn abort(&mut self) {
        self.controller.abort_to_idle().await;
    }

    /// Send the stopped recording and wait for the reply
    pub async fn send_recording(&mut self) -> Result<SubmissionOutcome, WidgetError> {
        let pending = self.begin_send()?;
        let result = pending.submit().await;
        let outcome = result.outcome.clone();
        self.complete_send(result).await;
        Ok(outcome)
    }

    /// Log the user turn and hand out the submission to perform
    pub fn begin_send(&mut self) -> Result<PendingSubmission, WidgetError> {
        if self.in_flight {
            return Err(WidgetError::SendInFlight);
        }

        let blob = match (self.controller.state(), self.controller.blob()) {
            (RecordingState::Stopped, Some(blob)) => blob.clone(),
            _ => return Err(WidgetError::NothingToSend),
        };
        let duration_secs = self.controller.elapsed_secs();

        self.log.append(Message::voice_note(duration_secs));
        self.in_flight = true;
        self.controller
            .show_notice(Notice::persistent(NoticeKind::Sending, SENDING_TEXT));
        self.emit(WidgetEvent::SendStarted { duration_secs });

        Ok(PendingSubmission {
            client: self.client.clone(),
            blob,
            duration_secs,
            attempt_id: self.controller.attempt_id(),
        })
    }

    /// Record the assistant turn for a resolved submission
    ///
    /// On success the recording is cleared; on failure it is kept so the
    /// user can send it again. A recording started after this submission
    /// began is left alone either way.
    pub async fn complete_send(&mut self, result: SubmissionResult) {
        self.in_flight = false;

        let success = result.outcome.is_success();
        self.log.append(Message::assistant(result.outcome.text()));
        self.emit(WidgetEvent::SendCompleted {
            duration_secs: result.duration_secs,
            success,
        });

        let same_attempt = self.controller.attempt_id() == result.attempt_id;

        if success {
            if same_attempt {
                self.controller.abort_to_idle().await;
            }
        } else {
            warn!("Keeping {}s recording for retry", result.duration_secs);
            if same_attempt && self.controller.state() == RecordingState::Stopped {
                self.controller
                    .show_notice(Notice::persistent(NoticeKind::ReadyToSend, READY_TEXT));
            }
            self.emit(WidgetEvent::Error {
                message: result.outcome.text().to_string(),
            });
        }
    }

    pub fn clear_conversation(&mut self) {
        self.log.clear();
        self.emit(WidgetEvent::ConversationCleared);
    }

    /// Release every resource held by the widget
    pub async fn shutdown(&mut self) {
        info!("Shutting down voice widget");
        self.controller.abort_to_idle().await;
    }

    fn emit(&self, event: WidgetEvent) {
        let _ = self.events.send(event);
    }
}
