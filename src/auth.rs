use crate::audit::AuditLogger;
use crate::config::ClientPolicy;
use crate::error::RelayError;
use std::sync::Arc;

/// How many characters of a rejected credential end up in the audit log.
const TOKEN_PREFIX_LEN: usize = 8;

/// Maps bearer credentials to client policies.
///
/// The registry is small and static, so lookup is an exact-match linear scan.
pub struct Authenticator {
    clients: Vec<ClientPolicy>,
    audit: Arc<AuditLogger>,
}

impl Authenticator {
    pub fn new(clients: Vec<ClientPolicy>, audit: Arc<AuditLogger>) -> Self {
        Self { clients, audit }
    }

    /// Resolve a bearer token to its client policy.
    ///
    /// Unknown tokens are audited with a truncated prefix only; the full
    /// secret never reaches the log. The error is the same for every unknown
    /// token.
    pub fn verify(&self, token: &str) -> Result<&ClientPolicy, RelayError> {
        for policy in &self.clients {
            if policy.api_key == token {
                return Ok(policy);
            }
        }

        self.audit.record(
            "unknown",
            &format!(
                "rejected credential with prefix '{}'",
                token_prefix(token)
            ),
        );

        Err(RelayError::InvalidCredential)
    }
}

fn token_prefix(token: &str) -> String {
    token.chars().take(TOKEN_PREFIX_LEN).collect()
}
