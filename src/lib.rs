pub mod audio;
pub mod audit;
pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod ledger;
pub mod recording;
pub mod router;

pub use audio::AudioFile;
pub use audit::AuditLogger;
pub use auth::Authenticator;
pub use backend::{
    BackendKind, CloudBackend, LocalBackend, TranscriptionBackend, TranscriptionOptions,
    TranscriptionOutcome, TranscriptionRequest,
};
pub use config::{ClientPolicy, Config};
pub use error::{RelayError, RelayResult};
pub use health::{HealthMonitor, ServiceHealth};
pub use http::{create_router, AppState};
pub use ledger::{DayUsage, UsageLedger};
pub use recording::RecordingStore;
pub use router::{RouteResult, TranscriptionRouter};
