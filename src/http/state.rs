use crate::audit::AuditLogger;
use crate::auth::Authenticator;
use crate::health::ServiceHealth;
use crate::ledger::UsageLedger;
use crate::recording::RecordingStore;
use crate::router::TranscriptionRouter;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    pub health: Arc<ServiceHealth>,
    pub router: Arc<TranscriptionRouter>,
    pub ledger: Arc<UsageLedger>,
    pub recordings: Arc<RecordingStore>,
    pub audit: Arc<AuditLogger>,
}
