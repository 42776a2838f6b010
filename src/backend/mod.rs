pub mod cloud;
pub mod local;

pub use cloud::CloudBackend;
pub use local::LocalBackend;

/// Which transcription engine handled (or is asked to handle) a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Self-hosted engine tracked by the health monitor.
    Local,
    /// Hosted fallback API.
    Cloud,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Cloud => "cloud",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request transcription options taken from the multipart form.
#[derive(Debug, Clone)]
pub struct TranscriptionOptions {
    pub model: String,
    pub srt_format: bool,
}

impl Default for TranscriptionOptions {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            srt_format: false,
        }
    }
}

/// One upload on its way to a backend. Owned by a single request; never
/// shared across requests.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio: Vec<u8>,
    pub file_name: String,
    pub client_id: String,
    pub options: TranscriptionOptions,
}

/// What a backend call produced.
///
/// "Returned nothing" and "call failed" are distinct outcomes and drive
/// different fallback decisions; neither may collapse into the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionOutcome {
    Success { text: String },
    Empty,
    Failed { reason: String },
}

/// Contract implemented by transcription engines.
#[async_trait::async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Backend identity used for usage tagging and logging.
    fn kind(&self) -> BackendKind;

    /// Run one transcription. Transport and engine failures are folded into
    /// [`TranscriptionOutcome::Failed`]; this call itself never errors.
    async fn transcribe(&self, request: &TranscriptionRequest) -> TranscriptionOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_tags() {
        assert_eq!(BackendKind::Local.as_str(), "local");
        assert_eq!(BackendKind::Cloud.to_string(), "cloud");
    }

    #[test]
    fn default_options() {
        let options = TranscriptionOptions::default();
        assert_eq!(options.model, "whisper-1");
        assert!(!options.srt_format);
    }
}
