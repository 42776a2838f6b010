use super::{BackendKind, TranscriptionBackend, TranscriptionOutcome, TranscriptionRequest};
use crate::config::CloudBackendConfig;
use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::debug;

/// HTTP adapter for the hosted transcription API.
///
/// Speaks the OpenAI-compatible contract: multipart file + model name,
/// bearer-authenticated, JSON `{"text": ...}` on success.
pub struct CloudBackend {
    client: reqwest::Client,
    config: CloudBackendConfig,
}

impl CloudBackend {
    pub fn new(config: CloudBackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build cloud backend client")?;

        Ok(Self { client, config })
    }

    fn build_form(&self, request: &TranscriptionRequest) -> Result<Form> {
        let part = Part::bytes(request.audio.clone())
            .file_name(request.file_name.clone())
            .mime_str("application/octet-stream")
            .context("Invalid mime type for audio part")?;

        let mut form = Form::new()
            .part("file", part)
            .text("model", request.options.model.clone());

        if request.options.srt_format {
            form = form.text("response_format", "srt");
        }

        Ok(form)
    }
}

#[async_trait::async_trait]
impl TranscriptionBackend for CloudBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Cloud
    }

    async fn transcribe(&self, request: &TranscriptionRequest) -> TranscriptionOutcome {
        let form = match self.build_form(request) {
            Ok(form) => form,
            Err(e) => {
                return TranscriptionOutcome::Failed {
                    reason: format!("cloud request build failed: {e}"),
                }
            }
        };

        let response = match self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return TranscriptionOutcome::Failed {
                    reason: format!("cloud request failed: {e}"),
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return TranscriptionOutcome::Failed {
                reason: format!("cloud API error {status}: {body}"),
            };
        }

        let json: serde_json::Value = match response.json().await {
            Ok(json) => json,
            Err(e) => {
                return TranscriptionOutcome::Failed {
                    reason: format!("cloud response parse failed: {e}"),
                }
            }
        };

        debug!("Cloud API replied");

        parse_transcription(&json)
    }
}

/// Pull the transcript text out of a successful cloud reply.
fn parse_transcription(json: &serde_json::Value) -> TranscriptionOutcome {
    match json.get("text").and_then(|t| t.as_str()) {
        Some(text) if !text.trim().is_empty() => TranscriptionOutcome::Success {
            text: text.trim().to_string(),
        },
        _ => TranscriptionOutcome::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_body_yields_text() {
        let outcome = parse_transcription(&json!({"text": " Hello there. "}));
        assert_eq!(
            outcome,
            TranscriptionOutcome::Success {
                text: "Hello there.".to_string()
            }
        );
    }

    #[test]
    fn blank_text_is_empty_not_success() {
        assert_eq!(
            parse_transcription(&json!({"text": "   "})),
            TranscriptionOutcome::Empty
        );
    }

    #[test]
    fn missing_text_field_is_empty() {
        assert_eq!(
            parse_transcription(&json!({"status": "ok"})),
            TranscriptionOutcome::Empty
        );
    }
}
