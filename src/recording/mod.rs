//! Voice recording life cycle
//!
//! This module provides:
//! - `MediaCaptureSession`: input stream ownership and frame buffering
//! - `RecordingController`: start/tick/stop/abort state machine with
//!   min/max duration enforcement
//! - Status and notice types consumed by the presentation layer

mod capture;
mod controller;
mod state;
mod timer;

pub use capture::MediaCaptureSession;
pub use controller::RecordingController;
pub use state::{
    Notice, NoticeKind, RecordingState, RecordingStatus, LISTENING_TEXT, READY_TEXT,
    SENDING_TEXT, TOO_SHORT_TEXT,
};
