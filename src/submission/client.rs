use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{info, warn};

use super::messages::{extract_reply, SubmissionOutcome, SUBMISSION_FAILED_TEXT};
use crate::audio::AudioBlob;
use crate::config::SubmissionConfig;
use crate::error::SubmissionError;

/// Posts recorded audio to the configured endpoint
///
/// One multipart POST per call, no automatic retry. Cheap to clone; clones
/// share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct SubmissionClient {
    client: reqwest::Client,
    endpoint: String,
    audio_field: String,
    response_field: String,
    timeout: Duration,
}

impl SubmissionClient {
    pub fn new(config: &SubmissionConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            audio_field: config.audio_field.clone(),
            response_field: config.response_field.clone(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Upload a recording and turn the reply into an outcome
    pub async fn send(&self, blob: &AudioBlob, duration_secs: u32) -> SubmissionOutcome {
        info!(
            "Submitting {}s recording ({} bytes) to {}",
            duration_secs,
            blob.len(),
            self.endpoint
        );

        match self.post(blob).await {
            Ok(reply_text) => {
                info!("Submission succeeded ({} chars)", reply_text.len());
                SubmissionOutcome::Success { reply_text }
            }
            Err(e) => {
                warn!("Submission failed: {}", e);
                SubmissionOutcome::Failure {
                    error_text: SUBMISSION_FAILED_TEXT.to_string(),
                }
            }
        }
    }

    /// Perform the POST and extract the reply text
    pub async fn post(&self, blob: &AudioBlob) -> Result<String, SubmissionError> {
        let part = Part::bytes(blob.data().to_vec())
            .file_name(blob.file_name())
            .mime_str(blob.content_type())
            .map_err(|e| SubmissionError::Network(e.to_string()))?;
        let form = Form::new().part(self.audio_field.clone(), part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SubmissionError::Timeout(self.timeout.as_secs())
                } else {
                    SubmissionError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubmissionError::Status {
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                SubmissionError::Timeout(self.timeout.as_secs())
            } else {
                SubmissionError::MalformedResponse(e.to_string())
            }
        })?;

        Ok(extract_reply(&body, &self.response_field))
    }
}
