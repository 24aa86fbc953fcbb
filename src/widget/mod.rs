//! Widget coordinator for the presentation layer
//!
//! - `VoiceWidget`: recording controller + submission client + conversation log
//! - `spawn` / `WidgetHandle`: single-task event loop driven by commands

mod runtime;
#[allow(clippy::module_inception)]
mod widget;

pub use runtime::{spawn, WidgetCommand, WidgetHandle};
pub use widget::{PendingSubmission, SubmissionResult, VoiceWidget, WidgetSnapshot};
