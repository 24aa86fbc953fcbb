use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};
use voice_widget::{
    spawn, AudioBackendFactory, AudioBlob, AudioSource, Config, VoiceWidget, WidgetEvent,
    WidgetHandle,
};

/// Record a voice message, send it to the configured endpoint and print the conversation
#[derive(Debug, Parser)]
#[command(name = "voice-widget", version)]
struct Args {
    /// Config file (any format supported by the `config` crate, extension optional)
    #[arg(long, default_value = "config/voice-widget")]
    config: String,

    /// WAV file replayed as the microphone
    #[arg(long, conflicts_with = "microphone")]
    input: Option<PathBuf>,

    /// Capture from the default microphone
    #[arg(long)]
    microphone: bool,

    /// Stop manually after this many seconds (default: wait for auto-stop)
    #[arg(long)]
    seconds: Option<u64>,

    /// Override the submission endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Record only, do not submit
    #[arg(long)]
    no_send: bool,

    /// Write the captured recording to this WAV file
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut cfg = Config::load(&args.config)?;
    if let Some(endpoint) = &args.endpoint {
        cfg.submission.endpoint = endpoint.clone();
        cfg.validate()?;
    }

    let source = match (&args.input, args.microphone) {
        (Some(path), _) => AudioSource::File(path.clone()),
        (None, true) => AudioSource::Microphone,
        (None, false) => bail!("Choose an audio source with --input <wav> or --microphone"),
    };

    info!("Voice widget v{}", env!("CARGO_PKG_VERSION"));
    info!("Submission endpoint: {}", cfg.submission.endpoint);

    let backend = AudioBackendFactory::create(source, cfg.backend_config())?;
    let widget = VoiceWidget::new(&cfg, backend)?;
    let (handle, task) = spawn(widget);
    let mut events = handle.subscribe();

    let recorded = record(&handle, &mut events, args.seconds).await?;

    if let Some(output) = &args.output {
        let snapshot = handle
            .snapshot()
            .await
            .context("Widget stopped before the recording could be read")?;
        write_output(snapshot.recording.as_ref(), output)?;
    }

    if recorded && !args.no_send {
        handle.send_recording();
        wait_for(&mut events, |event| {
            matches!(event, WidgetEvent::SendCompleted { .. })
        })
        .await?;
    }

    handle.shutdown();
    let widget = task.await.context("Widget task panicked")?;
    let json = serde_json::to_string_pretty(&widget.messages())?;
    println!("{}", json);

    Ok(())
}

/// Drive one recording; true when a usable recording is held
async fn record(
    handle: &WidgetHandle,
    events: &mut broadcast::Receiver<WidgetEvent>,
    seconds: Option<u64>,
) -> Result<bool> {
    handle.start_recording();

    match wait_for(events, |event| {
        matches!(
            event,
            WidgetEvent::RecordingStarted { .. } | WidgetEvent::Error { .. }
        )
    })
    .await?
    {
        WidgetEvent::RecordingStarted { attempt_id } => info!(%attempt_id, "Recording..."),
        other => {
            warn!("Could not start recording: {:?}", other);
            return Ok(false);
        }
    }

    if let Some(seconds) = seconds {
        let stop_at = tokio::time::sleep(Duration::from_secs(seconds));
        tokio::pin!(stop_at);

        loop {
            tokio::select! {
                _ = &mut stop_at => {
                    handle.stop_recording();
                    break;
                }
                event = events.recv() => {
                    if let Some(done) = finished(event?) {
                        return Ok(done);
                    }
                }
            }
        }
    }

    loop {
        if let Some(done) = finished(events.recv().await?) {
            return Ok(done);
        }
    }
}

fn finished(event: WidgetEvent) -> Option<bool> {
    match event {
        WidgetEvent::Tick { elapsed_secs } => {
            info!("{}s", elapsed_secs);
            None
        }
        WidgetEvent::RecordingStopped {
            duration_secs,
            auto_stopped,
        } => {
            info!(auto_stopped, "Recorded {}s", duration_secs);
            Some(true)
        }
        WidgetEvent::RecordingTooShort { duration_secs } => {
            warn!("Recording too short ({}s), nothing to send", duration_secs);
            Some(false)
        }
        WidgetEvent::Error { message } => {
            warn!("{}", message);
            Some(false)
        }
        _ => None,
    }
}

async fn wait_for(
    events: &mut broadcast::Receiver<WidgetEvent>,
    matches: impl Fn(&WidgetEvent) -> bool,
) -> Result<WidgetEvent> {
    loop {
        let event = events.recv().await?;
        if matches(&event) {
            return Ok(event);
        }
    }
}

fn write_output(recording: Option<&AudioBlob>, output: &Path) -> Result<()> {
    match recording {
        Some(blob) => {
            std::fs::write(output, blob.data())
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Recording written to {}", output.display());
        }
        None => warn!("No recording to write"),
    }
    Ok(())
}
