//! Conversation history shown by the widget
//!
//! User turns are appended when a recording is sent, assistant turns when the
//! submission resolves (successfully or not).

mod log;
mod message;

pub use log::ConversationLog;
pub use message::{Message, Role};
