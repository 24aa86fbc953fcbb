use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::widget::{SubmissionResult, VoiceWidget, WidgetSnapshot};
use crate::error::WidgetError;
use crate::events::WidgetEvent;

/// User gestures forwarded to the widget's event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetCommand {
    StartRecording,
    StopRecording,
    Send,
    Abort,
    ClearConversation,
    Shutdown,
}

/// Cloneable handle for driving a spawned widget
#[derive(Clone)]
pub struct WidgetHandle {
    commands: mpsc::UnboundedSender<WidgetCommand>,
    queries: mpsc::UnboundedSender<oneshot::Sender<WidgetSnapshot>>,
    events: broadcast::Sender<WidgetEvent>,
}

impl WidgetHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.events.subscribe()
    }

    /// Queue a command; returns false once the event loop has exited
    pub fn send(&self, command: WidgetCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn start_recording(&self) -> bool {
        self.send(WidgetCommand::StartRecording)
    }

    pub fn stop_recording(&self) -> bool {
        self.send(WidgetCommand::StopRecording)
    }

    pub fn send_recording(&self) -> bool {
        self.send(WidgetCommand::Send)
    }

    pub fn abort(&self) -> bool {
        self.send(WidgetCommand::Abort)
    }

    pub fn clear_conversation(&self) -> bool {
        self.send(WidgetCommand::ClearConversation)
    }

    pub fn shutdown(&self) -> bool {
        self.send(WidgetCommand::Shutdown)
    }

    /// Current status, conversation and held recording; `None` once the loop has exited
    pub async fn snapshot(&self) -> Option<WidgetSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.queries.send(reply_tx).ok()?;
        reply_rx.await.ok()
    }
}

/// Run the widget on its own task
///
/// Commands, timer ticks and submission completions are handled one at a
/// time, each to completion. The network request runs on a separate task so
/// the loop stays responsive while it is outstanding. The task returns the
/// widget after `Shutdown` (or once every handle is dropped), with all
/// capture resources released.
pub fn spawn(widget: VoiceWidget) -> (WidgetHandle, JoinHandle<VoiceWidget>) {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (queries_tx, queries_rx) = mpsc::unbounded_channel();
    let handle = WidgetHandle {
        commands: commands_tx,
        queries: queries_tx,
        events: widget.event_sender(),
    };

    let task = tokio::spawn(run(widget, commands_rx, queries_rx));
    (handle, task)
}

async fn run(
    mut widget: VoiceWidget,
    mut commands: mpsc::UnboundedReceiver<WidgetCommand>,
    mut queries: mpsc::UnboundedReceiver<oneshot::Sender<WidgetSnapshot>>,
) -> VoiceWidget {
    info!("Widget event loop started");

    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<SubmissionResult>();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                None | Some(WidgetCommand::Shutdown) => break,
                Some(command) => handle_command(&mut widget, command, &done_tx).await,
            },
            Some(generation) = widget.controller_mut().next_timer_tick() => {
                widget.controller_mut().on_timer_tick(generation).await;
            }
            Some(result) = done_rx.recv() => {
                widget.complete_send(result).await;
            }
            Some(reply) = queries.recv() => {
                let _ = reply.send(widget.snapshot());
            }
        }
    }

    widget.shutdown().await;
    info!("Widget event loop stopped");
    widget
}

async fn handle_command(
    widget: &mut VoiceWidget,
    command: WidgetCommand,
    done_tx: &mpsc::UnboundedSender<SubmissionResult>,
) {
    debug!(?command, "Handling widget command");

    let result = match command {
        WidgetCommand::StartRecording => widget.start_recording().await,
        WidgetCommand::StopRecording => widget.stop_recording().await,
        WidgetCommand::Send => widget.begin_send().map(|pending| {
            let done_tx = done_tx.clone();
            tokio::spawn(async move {
                let result = pending.submit().await;
                let _ = done_tx.send(result);
            });
        }),
        WidgetCommand::Abort => {
            widget.abort().await;
            Ok(())
        }
        WidgetCommand::ClearConversation => {
            widget.clear_conversation();
            Ok(())
        }
        WidgetCommand::Shutdown => Ok(()),
    };

    match result {
        Ok(()) => {}
        // Already surfaced to the presentation layer by the controller
        Err(WidgetError::Capture(_)) => {}
        Err(e) => warn!(?command, "Command rejected: {}", e),
    }
}
