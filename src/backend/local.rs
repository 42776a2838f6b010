use super::{BackendKind, TranscriptionBackend, TranscriptionOutcome, TranscriptionRequest};
use crate::config::LocalBackendConfig;
use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::debug;

/// Number of leading metadata lines in the engine's reply. Anything past
/// them is transcript text.
const METADATA_LINES: usize = 5;

/// HTTP adapter for the self-hosted transcription engine.
///
/// The engine takes a multipart upload plus an inference parameter bag and
/// replies with multi-line text: run metadata first, transcript after.
pub struct LocalBackend {
    client: reqwest::Client,
    config: LocalBackendConfig,
}

impl LocalBackend {
    pub fn new(config: LocalBackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build local backend client")?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/transcribe_file",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn build_form(&self, request: &TranscriptionRequest) -> Result<Form> {
        let part = Part::bytes(request.audio.clone())
            .file_name(request.file_name.clone())
            .mime_str("application/octet-stream")
            .context("Invalid mime type for audio part")?;

        let file_format = if request.options.srt_format { "srt" } else { "txt" };

        Ok(Form::new()
            .part("files", part)
            .text("model_size", self.config.model.clone())
            .text("lang", self.config.language.clone())
            .text("beam_size", self.config.beam_size.to_string())
            .text("vad_filter", self.config.vad_filter.to_string())
            .text("threshold", self.config.vad_threshold.to_string())
            .text("compute_type", self.config.compute_type.clone())
            .text("file_format", file_format.to_string()))
    }
}

#[async_trait::async_trait]
impl TranscriptionBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn transcribe(&self, request: &TranscriptionRequest) -> TranscriptionOutcome {
        let form = match self.build_form(request) {
            Ok(form) => form,
            Err(e) => {
                return TranscriptionOutcome::Failed {
                    reason: format!("local request build failed: {e}"),
                }
            }
        };

        let response = match self.client.post(self.endpoint()).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => {
                return TranscriptionOutcome::Failed {
                    reason: format!("local backend unreachable: {e}"),
                }
            }
        };

        if !response.status().is_success() {
            return TranscriptionOutcome::Failed {
                reason: format!("local backend returned HTTP {}", response.status()),
            };
        }

        let raw = match response.text().await {
            Ok(raw) => raw,
            Err(e) => {
                return TranscriptionOutcome::Failed {
                    reason: format!("local backend body read failed: {e}"),
                }
            }
        };

        debug!("Local engine replied with {} bytes", raw.len());

        let text = clean_transcript(&raw);
        if text.is_empty() {
            TranscriptionOutcome::Empty
        } else {
            TranscriptionOutcome::Success { text }
        }
    }
}

/// Strip the engine's leading metadata lines and flatten the transcript to a
/// single line.
fn clean_transcript(raw: &str) -> String {
    let lines: Vec<&str> = raw.split('\n').collect();

    let body: Vec<&str> = if lines.len() > METADATA_LINES {
        lines[METADATA_LINES..].to_vec()
    } else {
        lines
    };

    body.join(" ")
        .replace('\r', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
