use serde::Serialize;

/// Assistant text used when the reply lacks the configured field
pub const MISSING_REPLY_TEXT: &str = "No response received.";
/// Assistant text recorded for any failed submission
pub const SUBMISSION_FAILED_TEXT: &str = "Sorry, I couldn't process your message. Please try again.";

/// Result of one submission attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Success { reply_text: String },
    Failure { error_text: String },
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Success { .. })
    }

    /// Text to record as the assistant's turn
    pub fn text(&self) -> &str {
        match self {
            SubmissionOutcome::Success { reply_text } => reply_text,
            SubmissionOutcome::Failure { error_text } => error_text,
        }
    }
}

/// Pull the assistant's text out of a JSON reply
///
/// Strings are used as is; other non-null values are rendered as JSON.
/// Missing, null or empty values fall back to [`MISSING_REPLY_TEXT`].
pub fn extract_reply(body: &serde_json::Value, field: &str) -> String {
    match body.get(field) {
        Some(serde_json::Value::String(text)) if !text.is_empty() => text.clone(),
        Some(serde_json::Value::String(_)) | Some(serde_json::Value::Null) | None => {
            MISSING_REPLY_TEXT.to_string()
        }
        Some(other) => other.to_string(),
    }
}
