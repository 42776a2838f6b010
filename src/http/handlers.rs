use super::state::AppState;
use crate::audio::AudioFile;
use crate::backend::{TranscriptionOptions, TranscriptionRequest};
use crate::error::RelayError;
use crate::recording::RecordingStore;
use anyhow::{anyhow, Context};
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap};
use axum::response::Json;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TranscriptionResponse {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct UsageEntry {
    pub local_api_usage: u64,
    pub openai_api_usage: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/audio/transcriptions
/// Authenticate, stage the upload, route it through the backends.
pub async fn transcribe_audio(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<TranscriptionResponse>, RelayError> {
    let token = bearer_token(&headers)?;
    let policy = state.authenticator.verify(token)?.clone();

    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut options = TranscriptionOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RelayError::Internal(anyhow!("multipart read failed: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| RelayError::Internal(anyhow!("upload read failed: {e}")))?;
                upload = Some((file_name, data.to_vec()));
            }
            Some("model") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| RelayError::Internal(anyhow!("multipart read failed: {e}")))?;
                if !value.is_empty() {
                    options.model = value;
                }
            }
            Some("srt_format") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| RelayError::Internal(anyhow!("multipart read failed: {e}")))?;
                options.srt_format = parse_flag(&value);
            }
            _ => {}
        }
    }

    let (file_name, audio) = upload.ok_or(RelayError::MissingFile)?;
    if file_name.is_empty() {
        return Err(RelayError::EmptyFilename);
    }
    if audio.is_empty() {
        return Err(RelayError::MissingFile);
    }

    // Stage the upload in a request-scoped temp file; the file is removed on
    // drop on every exit path, including early error returns.
    let mut staged = NamedTempFile::new()
        .context("Failed to create staging file")
        .map_err(RelayError::Internal)?;
    staged
        .write_all(&audio)
        .context("Failed to stage upload")
        .map_err(RelayError::Internal)?;

    let extension = Path::new(&file_name).extension().and_then(|e| e.to_str());
    let decoded =
        AudioFile::from_bytes(&audio, extension).map_err(|_| RelayError::UnreadableAudio)?;

    info!(
        "Transcription request from {}: {} ({:.1}s)",
        policy.client_id, file_name, decoded.duration_seconds
    );

    let request = TranscriptionRequest {
        audio,
        file_name,
        client_id: policy.client_id.clone(),
        options,
    };

    let result = state
        .router
        .route(&policy, &request, decoded.duration_seconds)
        .await?;

    // Archival is best-effort: a failed write is audited, never surfaced.
    if policy.save_recordings {
        let base = RecordingStore::base_name(&policy.client_id);
        if let Err(e) = state.recordings.save_audio(&base, staged.path()).await {
            state
                .audit
                .record(&policy.client_id, &format!("recording archive failed: {e:#}"));
        }
        if let Err(e) = state.recordings.save_transcript(&base, &result.text) {
            state
                .audit
                .record(&policy.client_id, &format!("transcript archive failed: {e:#}"));
        }
    }

    Ok(Json(TranscriptionResponse { text: result.text }))
}

/// GET /v1/local_service_status
/// Authenticated view of the health belief.
pub async fn local_service_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse>, RelayError> {
    let token = bearer_token(&headers)?;
    state.authenticator.verify(token)?;

    let status = if state.health.is_available() {
        "available"
    } else {
        "unavailable"
    };

    Ok(Json(StatusResponse {
        status: status.to_string(),
    }))
}

/// GET /usage
/// Per-client usage counters for the current day.
pub async fn usage(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, UsageEntry>>, RelayError> {
    let today = Utc::now().date_naive();
    let usage = state.ledger.usage_for(today)?;

    let body = usage
        .into_iter()
        .map(|(client_id, day)| {
            (
                client_id,
                UsageEntry {
                    local_api_usage: day.local_seconds,
                    openai_api_usage: day.cloud_seconds,
                },
            )
        })
        .collect();

    Ok(Json(body))
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, RelayError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or(RelayError::InvalidCredential)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1")
}
