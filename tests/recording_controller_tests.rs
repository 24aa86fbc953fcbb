// Tests for the recording life cycle state machine
//
// Time is advanced by calling `tick()` directly (one call = one second),
// except where the real timer is exercised under a paused tokio clock.

mod common;

use std::io::Cursor;
use std::time::Duration;

use common::{controller_with, drain, frames, recording_config, BackendProbe, StubBackend};
use voice_widget::error::{
    CONSTRAINTS_UNSUPPORTED_MESSAGE, DEVICE_NOT_FOUND_MESSAGE, DEVICE_UNAVAILABLE_MESSAGE,
    PERMISSION_DENIED_MESSAGE,
};
use voice_widget::recording::{NoticeKind, READY_TEXT, TOO_SHORT_TEXT};
use voice_widget::{CaptureError, RecordingController, RecordingState, WidgetError, WidgetEvent};

async fn advance(controller: &mut RecordingController, seconds: u32) {
    for _ in 0..seconds {
        controller.tick().await;
    }
}

#[tokio::test]
async fn test_stop_immediately_is_too_short() {
    let probe = BackendProbe::default();
    let (mut controller, mut events) =
        controller_with(StubBackend::new(probe.clone()), recording_config(1, 30));

    controller.start().await.unwrap();
    assert_eq!(controller.state(), RecordingState::Recording);
    assert!(probe.is_open());

    controller.stop().await.unwrap();

    assert_eq!(controller.state(), RecordingState::Idle);
    assert!(controller.blob().is_none());
    let notice = controller.notice().expect("too short notice should be visible");
    assert_eq!(notice.kind, NoticeKind::TooShort);
    assert_eq!(notice.text, TOO_SHORT_TEXT);
    assert!(!probe.is_open(), "Stream must be released after stop");

    let events = drain(&mut events);
    assert!(events.contains(&WidgetEvent::RecordingTooShort { duration_secs: 0 }));
}

#[tokio::test]
async fn test_five_seconds_yields_blob() {
    let probe = BackendProbe::default();
    let (mut controller, mut events) =
        controller_with(StubBackend::new(probe.clone()), recording_config(1, 30));

    controller.start().await.unwrap();
    advance(&mut controller, 5).await;
    controller.stop().await.unwrap();

    assert_eq!(controller.state(), RecordingState::Stopped);
    assert_eq!(controller.elapsed_secs(), 5);
    let blob = controller.blob().expect("blob should be present");
    assert_eq!(blob.content_type(), "audio/wav");
    assert_eq!(controller.notice().map(|n| n.text), Some(READY_TEXT));
    assert!(!probe.is_open());

    let events = drain(&mut events);
    assert!(events.contains(&WidgetEvent::RecordingStopped {
        duration_secs: 5,
        auto_stopped: false
    }));
}

#[tokio::test]
async fn test_blob_preserves_frame_order() {
    let probe = BackendProbe::default();
    let (mut controller, _events) =
        controller_with(StubBackend::with_script(probe, frames(8)), recording_config(1, 30));

    controller.start().await.unwrap();
    advance(&mut controller, 2).await;
    controller.stop().await.unwrap();

    let blob = controller.blob().unwrap();
    let reader = hound::WavReader::new(Cursor::new(blob.data().to_vec())).unwrap();
    let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();

    assert_eq!(samples.len(), 8 * 1600);
    for (index, chunk) in samples.chunks(1600).enumerate() {
        assert!(chunk.iter().all(|&s| s == index as i16), "Chunk {} out of order", index);
    }
}

#[tokio::test]
async fn test_auto_stop_at_maximum() {
    let probe = BackendProbe::default();
    let (mut controller, mut events) =
        controller_with(StubBackend::new(probe.clone()), recording_config(1, 30));

    controller.start().await.unwrap();
    advance(&mut controller, 29).await;
    assert_eq!(controller.state(), RecordingState::Recording);

    controller.tick().await;

    assert_eq!(controller.state(), RecordingState::Stopped);
    assert_eq!(controller.elapsed_secs(), 30);
    assert!(controller.blob().is_some());
    assert!(controller.active_timer().is_none());
    assert!(!probe.is_open());

    let events = drain(&mut events);
    assert!(events.contains(&WidgetEvent::RecordingStopped {
        duration_secs: 30,
        auto_stopped: true
    }));
}

#[tokio::test]
async fn test_elapsed_never_exceeds_maximum() {
    let (mut controller, _events) =
        controller_with(StubBackend::new(BackendProbe::default()), recording_config(1, 3));

    controller.start().await.unwrap();
    advance(&mut controller, 10).await;

    assert_eq!(controller.elapsed_secs(), 3);
    assert_eq!(controller.state(), RecordingState::Stopped);
}

#[tokio::test]
async fn test_short_durations_never_leave_blob() {
    for duration in 0..3 {
        let probe = BackendProbe::default();
        let (mut controller, _events) =
            controller_with(StubBackend::new(probe.clone()), recording_config(3, 6));

        controller.start().await.unwrap();
        advance(&mut controller, duration).await;
        controller.stop().await.unwrap();

        assert_eq!(controller.state(), RecordingState::Idle, "duration {}", duration);
        assert!(!controller.has_blob(), "duration {}", duration);
        assert!(!probe.is_open(), "duration {}", duration);
    }
}

#[tokio::test]
async fn test_valid_durations_always_yield_blob() {
    for duration in 3..=6 {
        let (mut controller, _events) =
            controller_with(StubBackend::new(BackendProbe::default()), recording_config(3, 6));

        controller.start().await.unwrap();
        advance(&mut controller, duration).await;
        if controller.state() == RecordingState::Recording {
            controller.stop().await.unwrap();
        }

        assert_eq!(controller.state(), RecordingState::Stopped, "duration {}", duration);
        assert!(controller.has_blob(), "duration {}", duration);
        assert_eq!(controller.elapsed_secs(), duration);
    }
}

#[tokio::test]
async fn test_abort_to_idle_is_idempotent() {
    let probe = BackendProbe::default();
    let (mut controller, _events) =
        controller_with(StubBackend::new(probe.clone()), recording_config(1, 30));

    // Nothing to release yet
    controller.abort_to_idle().await;
    assert_eq!(controller.state(), RecordingState::Idle);
    assert_eq!(probe.closes(), 0);

    controller.start().await.unwrap();
    advance(&mut controller, 4).await;

    controller.abort_to_idle().await;
    let first = controller.status();
    controller.abort_to_idle().await;
    let second = controller.status();

    assert_eq!(first, second);
    assert_eq!(second.state, RecordingState::Idle);
    assert_eq!(second.elapsed_secs, 0);
    assert!(!second.has_blob);
    assert!(controller.active_timer().is_none());
    assert!(!probe.is_open());
    assert_eq!(probe.opens(), 1);
    assert_eq!(probe.closes(), 1);
}

#[tokio::test]
async fn test_abort_discards_stopped_blob() {
    let (mut controller, _events) =
        controller_with(StubBackend::new(BackendProbe::default()), recording_config(1, 30));

    controller.start().await.unwrap();
    advance(&mut controller, 2).await;
    controller.stop().await.unwrap();
    assert!(controller.has_blob());

    controller.abort_to_idle().await;

    assert_eq!(controller.state(), RecordingState::Idle);
    assert!(!controller.has_blob());
    assert!(controller.notice().is_none());
}

#[tokio::test]
async fn test_acquisition_failures_map_to_static_messages() {
    let cases = [
        (CaptureError::PermissionDenied, PERMISSION_DENIED_MESSAGE),
        (CaptureError::DeviceNotFound, DEVICE_NOT_FOUND_MESSAGE),
        (
            CaptureError::DeviceUnavailable("busy".into()),
            DEVICE_UNAVAILABLE_MESSAGE,
        ),
        (
            CaptureError::ConstraintsUnsupported("48kHz only".into()),
            CONSTRAINTS_UNSUPPORTED_MESSAGE,
        ),
    ];

    for (error, message) in cases {
        let probe = BackendProbe::default();
        let (mut controller, mut events) = controller_with(
            StubBackend::failing_open(probe.clone(), error.clone()),
            recording_config(1, 30),
        );

        let result = controller.start().await;

        assert_eq!(result, Err(WidgetError::Capture(error.clone())));
        assert_eq!(controller.state(), RecordingState::Error);
        assert!(!controller.has_blob());
        assert!(controller.active_timer().is_none());
        assert!(!probe.is_open());
        assert_eq!(controller.notice().map(|n| n.text), Some(message));
        assert!(drain(&mut events).contains(&WidgetEvent::Error {
            message: message.to_string()
        }));
    }
}

#[tokio::test]
async fn test_start_failure_releases_opened_stream() {
    let probe = BackendProbe::default();
    let (mut controller, _events) = controller_with(
        StubBackend::failing_start(probe.clone(), CaptureError::DeviceUnavailable("gone".into())),
        recording_config(1, 30),
    );

    assert!(controller.start().await.is_err());

    assert_eq!(probe.opens(), 1);
    assert_eq!(probe.closes(), 1);
    assert!(!probe.is_open());
    assert_eq!(controller.state(), RecordingState::Error);
}

#[tokio::test]
async fn test_start_allowed_again_after_error() {
    let probe = BackendProbe::default();
    let script = vec![Err(CaptureError::Runtime("device unplugged".into()))];
    let (mut controller, _events) =
        controller_with(StubBackend::with_script(probe.clone(), script), recording_config(1, 30));

    controller.start().await.unwrap();
    advance(&mut controller, 2).await;
    let _ = controller.stop().await;
    assert_eq!(controller.state(), RecordingState::Error);

    // The stub replays the same script, so the retry starts cleanly
    controller.start().await.unwrap();
    assert_eq!(controller.state(), RecordingState::Recording);
    assert_eq!(controller.elapsed_secs(), 0);
    assert!(probe.is_open());
}

#[tokio::test]
async fn test_start_rejected_unless_idle() {
    let (mut controller, _events) =
        controller_with(StubBackend::new(BackendProbe::default()), recording_config(1, 30));

    controller.start().await.unwrap();
    assert_eq!(controller.start().await, Err(WidgetError::NotIdle));

    advance(&mut controller, 2).await;
    controller.stop().await.unwrap();
    assert_eq!(controller.start().await, Err(WidgetError::NotIdle));
}

#[tokio::test]
async fn test_stop_rejected_unless_recording() {
    let (mut controller, _events) =
        controller_with(StubBackend::new(BackendProbe::default()), recording_config(1, 30));

    assert_eq!(controller.stop().await, Err(WidgetError::NotRecording));
    assert_eq!(controller.state(), RecordingState::Idle);
}

#[tokio::test]
async fn test_tick_outside_recording_is_ignored() {
    let (mut controller, _events) =
        controller_with(StubBackend::new(BackendProbe::default()), recording_config(1, 30));

    controller.tick().await;
    assert_eq!(controller.elapsed_secs(), 0);

    controller.start().await.unwrap();
    advance(&mut controller, 3).await;
    controller.stop().await.unwrap();

    controller.tick().await;
    assert_eq!(controller.elapsed_secs(), 3);
    assert_eq!(controller.state(), RecordingState::Stopped);
}

#[tokio::test]
async fn test_tick_from_cancelled_timer_is_ignored() {
    let (mut controller, _events) =
        controller_with(StubBackend::new(BackendProbe::default()), recording_config(1, 30));

    controller.start().await.unwrap();
    let stale = controller.active_timer().expect("timer should run while recording");
    advance(&mut controller, 2).await;
    controller.stop().await.unwrap();

    // Abort and start a fresh attempt; the old generation must not advance it
    controller.abort_to_idle().await;
    controller.start().await.unwrap();
    controller.on_timer_tick(stale).await;

    assert_eq!(controller.elapsed_secs(), 0);
    assert_ne!(controller.active_timer(), Some(stale));

    let current = controller.active_timer().unwrap();
    controller.on_timer_tick(current).await;
    assert_eq!(controller.elapsed_secs(), 1);
}

#[tokio::test]
async fn test_runtime_failure_surfaces_on_stop() {
    let probe = BackendProbe::default();
    let mut script = frames(3);
    script.push(Err(CaptureError::Runtime("encoder crashed".into())));
    let (mut controller, mut events) =
        controller_with(StubBackend::with_script(probe.clone(), script), recording_config(1, 30));

    controller.start().await.unwrap();
    let result = controller.stop().await;

    assert!(matches!(
        result,
        Err(WidgetError::Capture(CaptureError::Runtime(_)))
    ));
    assert_eq!(controller.state(), RecordingState::Error);
    assert!(!controller.has_blob());
    assert!(!probe.is_open());
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, WidgetEvent::Error { .. })));
}

#[tokio::test]
async fn test_runtime_failure_detected_on_tick() {
    let probe = BackendProbe::default();
    let script = vec![Err(CaptureError::Runtime("device unplugged".into()))];
    let (mut controller, _events) =
        controller_with(StubBackend::with_script(probe.clone(), script), recording_config(1, 30));

    controller.start().await.unwrap();

    // Let the collector observe the failure
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    controller.tick().await;

    assert_eq!(controller.state(), RecordingState::Error);
    assert_eq!(controller.elapsed_secs(), 0);
    assert!(controller.active_timer().is_none());
    assert!(!probe.is_open());
}

#[tokio::test(start_paused = true)]
async fn test_timer_drives_auto_stop() {
    let probe = BackendProbe::default();
    let (mut controller, mut events) =
        controller_with(StubBackend::new(probe.clone()), recording_config(1, 30));

    controller.start().await.unwrap();

    while controller.state() == RecordingState::Recording {
        let generation = controller
            .next_timer_tick()
            .await
            .expect("tick channel stays open");
        controller.on_timer_tick(generation).await;
    }

    assert_eq!(controller.state(), RecordingState::Stopped);
    assert_eq!(controller.elapsed_secs(), 30);
    assert!(!probe.is_open());

    let ticks = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, WidgetEvent::Tick { .. }))
        .count();
    assert_eq!(ticks, 30);
}

#[tokio::test(start_paused = true)]
async fn test_too_short_notice_expires() {
    let (mut controller, _events) =
        controller_with(StubBackend::new(BackendProbe::default()), recording_config(1, 30));

    controller.start().await.unwrap();
    controller.stop().await.unwrap();
    assert_eq!(controller.status().notice, Some(NoticeKind::TooShort));

    tokio::time::advance(Duration::from_millis(2100)).await;

    assert!(controller.notice().is_none());
    assert_eq!(controller.status().notice_text, None);
    assert_eq!(controller.state(), RecordingState::Idle);
}
