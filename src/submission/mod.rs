pub mod client;
pub mod messages;

pub use client::SubmissionClient;
pub use messages::{extract_reply, SubmissionOutcome, MISSING_REPLY_TEXT, SUBMISSION_FAILED_TEXT};
