use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub type RelayResult<T> = Result<T, RelayError>;

/// Request-path errors and their HTTP mapping.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Invalid API Key")]
    InvalidCredential,

    #[error("No file provided")]
    MissingFile,

    #[error("No selected file")]
    EmptyFilename,

    #[error("Could not decode audio file")]
    UnreadableAudio,

    #[error("Cloud transcription is forbidden for this client")]
    CloudForbidden,

    #[error("Transcription failed")]
    TranscriptionFailed,

    #[error("No usage data for today")]
    NoUsageData,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::InvalidCredential => StatusCode::UNAUTHORIZED,
            RelayError::MissingFile
            | RelayError::EmptyFilename
            | RelayError::UnreadableAudio => StatusCode::BAD_REQUEST,
            RelayError::CloudForbidden => StatusCode::FORBIDDEN,
            RelayError::TranscriptionFailed | RelayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            RelayError::NoUsageData => StatusCode::NOT_FOUND,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal details go to the process log, not to the client.
        if let RelayError::Internal(err) = &self {
            error!("internal error: {:#}", err);
            return (
                status,
                Json(ErrorResponse {
                    error: "Internal server error".to_string(),
                }),
            )
                .into_response();
        }

        // The usage endpoint reports "no data" as a message, not an error.
        if matches!(self, RelayError::NoUsageData) {
            return (
                status,
                Json(MessageResponse {
                    message: self.to_string(),
                }),
            )
                .into_response();
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
