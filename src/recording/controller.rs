use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::capture::MediaCaptureSession;
use super::state::{
    Notice, NoticeKind, RecordingState, RecordingStatus, LISTENING_TEXT, READY_TEXT,
    TOO_SHORT_TEXT,
};
use super::timer::TickTimer;
use crate::audio::AudioBlob;
use crate::config::RecordingConfig;
use crate::error::{CaptureError, WidgetError};
use crate::events::WidgetEvent;

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Recording life cycle state machine
///
/// `Idle -> Recording -> Stopped -> Idle` on the happy path, with
/// `Recording -> Error` on capture failures and `Recording -> Idle` when the
/// recording is shorter than the configured minimum. A usable blob exists
/// only in `Stopped`.
///
/// The one-second timer reports into a channel owned by the controller; the
/// owner forwards each tick through [`on_timer_tick`](Self::on_timer_tick),
/// which drops ticks from cancelled timers.
pub struct RecordingController {
    config: RecordingConfig,
    capture: MediaCaptureSession,
    state: RecordingState,
    elapsed_secs: u32,
    blob: Option<AudioBlob>,
    notice: Option<Notice>,
    attempt_id: Option<Uuid>,
    timer: Option<TickTimer>,
    timer_generation: u64,
    tick_tx: mpsc::UnboundedSender<u64>,
    tick_rx: mpsc::UnboundedReceiver<u64>,
    events: broadcast::Sender<WidgetEvent>,
}

impl RecordingController {
    pub fn new(
        config: RecordingConfig,
        capture: MediaCaptureSession,
        events: broadcast::Sender<WidgetEvent>,
    ) -> Self {
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();

        Self {
            config,
            capture,
            state: RecordingState::Idle,
            elapsed_secs: 0,
            blob: None,
            notice: None,
            attempt_id: None,
            timer: None,
            timer_generation: 0,
            tick_tx,
            tick_rx,
            events,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Seconds recorded in the current (or last stopped) attempt
    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    pub fn blob(&self) -> Option<&AudioBlob> {
        self.blob.as_ref()
    }

    pub fn has_blob(&self) -> bool {
        self.blob.is_some()
    }

    pub fn attempt_id(&self) -> Option<Uuid> {
        self.attempt_id
    }

    pub fn config(&self) -> &RecordingConfig {
        &self.config
    }

    /// Current notice, unless it has expired
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref().filter(|notice| !notice.is_expired())
    }

    /// Generation of the running tick timer, if any
    pub fn active_timer(&self) -> Option<u64> {
        self.timer.as_ref().map(|timer| timer.generation())
    }

    pub fn is_stream_open(&self) -> bool {
        self.capture.is_stream_open()
    }

    pub fn status(&self) -> RecordingStatus {
        let notice = self.notice();

        RecordingStatus {
            state: self.state,
            elapsed_secs: self.elapsed_secs,
            min_duration_secs: self.config.min_duration_secs,
            max_duration_secs: self.config.max_duration_secs,
            has_blob: self.has_blob(),
            notice: notice.map(|n| n.kind),
            notice_text: notice.map(|n| n.text.to_string()),
        }
    }

    pub(crate) fn show_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    /// Begin a new recording attempt
    ///
    /// Accepted from `Idle`, and from `Error` after clearing the failed attempt.
    pub async fn start(&mut self) -> Result<(), WidgetError> {
        match self.state {
            RecordingState::Idle => {}
            RecordingState::Error => self.abort_to_idle().await,
            RecordingState::Recording | RecordingState::Stopped => {
                return Err(WidgetError::NotIdle);
            }
        }

        let attempt_id = Uuid::new_v4();
        self.elapsed_secs = 0;
        self.blob = None;
        self.attempt_id = Some(attempt_id);

        info!(
            %attempt_id,
            "Starting recording via {} (min {}s, max {}s)",
            self.capture.backend_name(),
            self.config.min_duration_secs,
            self.config.max_duration_secs
        );

        if let Err(e) = self.capture.open().await {
            return Err(self.fail_attempt(e).await);
        }
        if let Err(e) = self.capture.begin_encoding().await {
            return Err(self.fail_attempt(e).await);
        }

        self.state = RecordingState::Recording;
        self.timer_generation += 1;
        self.timer = Some(TickTimer::spawn(
            self.timer_generation,
            TICK_PERIOD,
            self.tick_tx.clone(),
        ));
        self.notice = Some(Notice::persistent(NoticeKind::Listening, LISTENING_TEXT));
        self.emit(WidgetEvent::RecordingStarted { attempt_id });

        Ok(())
    }

    /// Advance the recording by one second, stopping automatically at the maximum
    pub async fn tick(&mut self) {
        if self.state != RecordingState::Recording {
            debug!("Ignoring tick while {:?}", self.state);
            return;
        }

        if self.capture.has_failed() {
            let _ = self.finish_recording(false).await;
            return;
        }

        self.elapsed_secs += 1;
        debug!(elapsed_secs = self.elapsed_secs, "Recording tick");
        self.emit(WidgetEvent::Tick {
            elapsed_secs: self.elapsed_secs,
        });

        if self.elapsed_secs >= self.config.max_duration_secs {
            info!(
                "Maximum duration of {}s reached, stopping automatically",
                self.config.max_duration_secs
            );
            let _ = self.finish_recording(true).await;
        }
    }

    /// Handle a tick delivered by the timer with the given generation
    pub async fn on_timer_tick(&mut self, generation: u64) {
        if self.active_timer() != Some(generation) {
            debug!(generation, "Ignoring tick from cancelled timer");
            return;
        }
        self.tick().await;
    }

    /// Wait for the next timer tick
    pub async fn next_timer_tick(&mut self) -> Option<u64> {
        self.tick_rx.recv().await
    }

    /// Stop the current recording
    pub async fn stop(&mut self) -> Result<(), WidgetError> {
        if self.state != RecordingState::Recording {
            return Err(WidgetError::NotRecording);
        }

        self.finish_recording(false).await?;
        Ok(())
    }

    /// Release capture, discard any blob and return to `Idle`. Always safe to call.
    pub async fn abort_to_idle(&mut self) {
        self.cancel_timer();
        self.capture.release().await;

        if self.state != RecordingState::Idle || self.blob.is_some() {
            info!(attempt_id = ?self.attempt_id, "Recording reset from {:?} to idle", self.state);
        }

        self.state = RecordingState::Idle;
        self.elapsed_secs = 0;
        self.blob = None;
        self.attempt_id = None;
        self.notice = None;
    }

    async fn finish_recording(&mut self, auto_stopped: bool) -> Result<(), CaptureError> {
        self.cancel_timer();

        let duration_secs = self.elapsed_secs;
        let failed_early = self.capture.has_failed();

        let blob = match self.capture.finish().await {
            Ok(_) if failed_early => {
                let error = CaptureError::Runtime("capture stream ended unexpectedly".into());
                self.fail_attempt(error.clone()).await;
                return Err(error);
            }
            Ok(blob) => blob,
            Err(e) => {
                self.fail_attempt(e.clone()).await;
                return Err(e);
            }
        };

        if duration_secs < self.config.min_duration_secs {
            info!(
                duration_secs,
                "Recording shorter than {}s, discarding",
                self.config.min_duration_secs
            );
            self.blob = None;
            self.state = RecordingState::Idle;
            self.notice = Some(Notice::transient(
                NoticeKind::TooShort,
                TOO_SHORT_TEXT,
                Duration::from_millis(self.config.too_short_notice_ms),
            ));
            self.emit(WidgetEvent::RecordingTooShort { duration_secs });
            return Ok(());
        }

        match blob {
            Some(blob) => {
                info!(
                    duration_secs,
                    bytes = blob.len(),
                    auto_stopped,
                    "Recording ready to send"
                );
                self.blob = Some(blob);
                self.state = RecordingState::Stopped;
                self.notice = Some(Notice::persistent(NoticeKind::ReadyToSend, READY_TEXT));
                self.emit(WidgetEvent::RecordingStopped {
                    duration_secs,
                    auto_stopped,
                });
                Ok(())
            }
            None => {
                let error = CaptureError::Runtime("no audio captured".into());
                self.fail_attempt(error.clone()).await;
                Err(error)
            }
        }
    }

    async fn fail_attempt(&mut self, error: CaptureError) -> WidgetError {
        warn!(attempt_id = ?self.attempt_id, "Recording attempt failed: {}", error);

        self.cancel_timer();
        self.capture.release().await;
        self.blob = None;
        self.state = RecordingState::Error;

        let message = error.user_message();
        self.notice = Some(Notice::persistent(NoticeKind::Error, message));
        self.emit(WidgetEvent::Error {
            message: message.to_string(),
        });

        WidgetError::Capture(error)
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            debug!(generation = timer.generation(), "Tick timer cancelled");
        }
    }

    fn emit(&self, event: WidgetEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
