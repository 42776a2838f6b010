use crate::audit::AuditLogger;
use crate::backend::{
    BackendKind, TranscriptionBackend, TranscriptionOutcome, TranscriptionRequest,
};
use crate::config::ClientPolicy;
use crate::error::RelayError;
use crate::health::ServiceHealth;
use crate::ledger::UsageLedger;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Terminal result of a successfully routed request.
#[derive(Debug)]
pub struct RouteResult {
    pub text: String,
    pub backend: BackendKind,
}

/// The failover state machine.
///
/// Per request: attempt the local backend while the health belief says it is
/// reachable; on an empty or failed local attempt (or when health says
/// unreachable) fall back to the cloud backend if the client's policy allows
/// it. Exactly one fallback, no retries.
///
/// The ledger is credited only for a backend that actually produced usable
/// output: failed or empty attempts are not billed, and a request rejected by
/// policy credits nothing.
pub struct TranscriptionRouter {
    health: Arc<ServiceHealth>,
    local: Arc<dyn TranscriptionBackend>,
    cloud: Arc<dyn TranscriptionBackend>,
    ledger: Arc<UsageLedger>,
    audit: Arc<AuditLogger>,
}

impl TranscriptionRouter {
    pub fn new(
        health: Arc<ServiceHealth>,
        local: Arc<dyn TranscriptionBackend>,
        cloud: Arc<dyn TranscriptionBackend>,
        ledger: Arc<UsageLedger>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            health,
            local,
            cloud,
            ledger,
            audit,
        }
    }

    /// Route one request through the backends and credit the ledger.
    pub async fn route(
        &self,
        policy: &ClientPolicy,
        request: &TranscriptionRequest,
        duration_seconds: f64,
    ) -> Result<RouteResult, RelayError> {
        if self.health.is_available() {
            match self.local.transcribe(request).await {
                TranscriptionOutcome::Success { text } => {
                    info!(
                        "Transcribed {:.1}s for {} on local backend",
                        duration_seconds, policy.client_id
                    );
                    self.credit(&policy.client_id, duration_seconds, BackendKind::Local)
                        .await;
                    return Ok(RouteResult {
                        text,
                        backend: BackendKind::Local,
                    });
                }
                TranscriptionOutcome::Empty => {
                    self.audit
                        .record(&policy.client_id, "local backend returned no transcript");
                }
                TranscriptionOutcome::Failed { reason } => {
                    self.audit.record(&policy.client_id, &reason);
                }
            }
        }

        if !policy.allow_cloud {
            self.audit.record(
                &policy.client_id,
                "cloud transcription forbidden; request rejected",
            );
            return Err(RelayError::CloudForbidden);
        }

        match self.cloud.transcribe(request).await {
            TranscriptionOutcome::Success { text } => {
                info!(
                    "Transcribed {:.1}s for {} on cloud backend",
                    duration_seconds, policy.client_id
                );
                self.credit(&policy.client_id, duration_seconds, BackendKind::Cloud)
                    .await;
                Ok(RouteResult {
                    text,
                    backend: BackendKind::Cloud,
                })
            }
            TranscriptionOutcome::Empty => {
                self.audit
                    .record(&policy.client_id, "cloud backend returned no transcript");
                Err(RelayError::TranscriptionFailed)
            }
            TranscriptionOutcome::Failed { reason } => {
                self.audit.record(&policy.client_id, &reason);
                Err(RelayError::TranscriptionFailed)
            }
        }
    }

    /// Ledger durability is best-effort relative to response delivery: a
    /// failed write is audited, never surfaced to the caller.
    async fn credit(&self, client_id: &str, duration_seconds: f64, backend: BackendKind) {
        let today = Utc::now().date_naive();
        if let Err(e) = self
            .ledger
            .record(client_id, today, duration_seconds, backend)
            .await
        {
            self.audit
                .record(client_id, &format!("usage ledger update failed: {e:#}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that plays a fixed outcome and counts invocations.
    struct ScriptedBackend {
        kind: BackendKind,
        outcome: TranscriptionOutcome,
        calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(kind: BackendKind, outcome: TranscriptionOutcome) -> Arc<Self> {
            Arc::new(Self {
                kind,
                outcome,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl TranscriptionBackend for ScriptedBackend {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        async fn transcribe(&self, _request: &TranscriptionRequest) -> TranscriptionOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        health: Arc<ServiceHealth>,
        ledger: Arc<UsageLedger>,
        local: Arc<ScriptedBackend>,
        cloud: Arc<ScriptedBackend>,
        router: TranscriptionRouter,
    }

    fn harness(local: Arc<ScriptedBackend>, cloud: Arc<ScriptedBackend>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let health = Arc::new(ServiceHealth::new());
        let ledger = Arc::new(UsageLedger::new(dir.path().join("ledger")).unwrap());
        let audit = Arc::new(AuditLogger::new(dir.path().join("error.log")));
        let router = TranscriptionRouter::new(
            Arc::clone(&health),
            local.clone() as Arc<dyn TranscriptionBackend>,
            cloud.clone() as Arc<dyn TranscriptionBackend>,
            Arc::clone(&ledger),
            audit,
        );

        Harness {
            _dir: dir,
            health,
            ledger,
            local,
            cloud,
            router,
        }
    }

    fn policy(client_id: &str, allow_cloud: bool) -> ClientPolicy {
        ClientPolicy {
            client_id: client_id.to_string(),
            api_key: format!("sk-{client_id}"),
            save_recordings: false,
            allow_cloud,
        }
    }

    fn request(client_id: &str) -> TranscriptionRequest {
        TranscriptionRequest {
            audio: vec![0u8; 16],
            file_name: "audio.wav".to_string(),
            client_id: client_id.to_string(),
            options: Default::default(),
        }
    }

    fn success(text: &str) -> TranscriptionOutcome {
        TranscriptionOutcome::Success {
            text: text.to_string(),
        }
    }

    fn usage(h: &Harness, client_id: &str) -> crate::ledger::DayUsage {
        h.ledger
            .usage_for(Utc::now().date_naive())
            .map(|m| m.get(client_id).copied().unwrap_or_default())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn healthy_local_success_credits_local_only() {
        let h = harness(
            ScriptedBackend::new(BackendKind::Local, success("hello")),
            ScriptedBackend::new(BackendKind::Cloud, success("unused")),
        );
        h.health.update(true);

        let result = h
            .router
            .route(&policy("felix_test", true), &request("felix_test"), 12.7)
            .await
            .unwrap();

        assert_eq!(result.backend, BackendKind::Local);
        assert_eq!(result.text, "hello");
        assert_eq!(h.local.calls(), 1);
        assert_eq!(h.cloud.calls(), 0);

        let u = usage(&h, "felix_test");
        assert_eq!(u.local_seconds, 12);
        assert_eq!(u.cloud_seconds, 0);
    }

    #[tokio::test]
    async fn empty_local_falls_back_to_cloud_once() {
        let h = harness(
            ScriptedBackend::new(BackendKind::Local, TranscriptionOutcome::Empty),
            ScriptedBackend::new(BackendKind::Cloud, success("from the cloud")),
        );
        h.health.update(true);

        let result = h
            .router
            .route(&policy("felix_test", true), &request("felix_test"), 8.0)
            .await
            .unwrap();

        assert_eq!(result.backend, BackendKind::Cloud);
        assert_eq!(h.local.calls(), 1);
        assert_eq!(h.cloud.calls(), 1);

        // The failed local attempt is not billed.
        let u = usage(&h, "felix_test");
        assert_eq!(u.local_seconds, 0);
        assert_eq!(u.cloud_seconds, 8);
    }

    #[tokio::test]
    async fn failed_local_falls_back_to_cloud() {
        let h = harness(
            ScriptedBackend::new(
                BackendKind::Local,
                TranscriptionOutcome::Failed {
                    reason: "local backend unreachable: connection refused".to_string(),
                },
            ),
            ScriptedBackend::new(BackendKind::Cloud, success("fallback")),
        );
        h.health.update(true);

        let result = h
            .router
            .route(&policy("felix_test", true), &request("felix_test"), 5.0)
            .await
            .unwrap();

        assert_eq!(result.backend, BackendKind::Cloud);
        assert_eq!(usage(&h, "felix_test").cloud_seconds, 5);
    }

    #[tokio::test]
    async fn local_failure_without_cloud_permission_is_forbidden() {
        let h = harness(
            ScriptedBackend::new(BackendKind::Local, TranscriptionOutcome::Empty),
            ScriptedBackend::new(BackendKind::Cloud, success("unused")),
        );
        h.health.update(true);

        let err = h
            .router
            .route(&policy("alice456", false), &request("alice456"), 6.0)
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::CloudForbidden));
        assert_eq!(h.cloud.calls(), 0);

        // No ledger mutation on the forbidden path.
        assert!(matches!(
            h.ledger.usage_for(Utc::now().date_naive()),
            Err(RelayError::NoUsageData)
        ));
    }

    #[tokio::test]
    async fn unhealthy_skips_local_entirely() {
        let h = harness(
            ScriptedBackend::new(BackendKind::Local, success("unused")),
            ScriptedBackend::new(BackendKind::Cloud, success("cloud text")),
        );
        // Health belief stays unavailable.

        let result = h
            .router
            .route(&policy("felix_test", true), &request("felix_test"), 10.4)
            .await
            .unwrap();

        assert_eq!(result.backend, BackendKind::Cloud);
        assert_eq!(h.local.calls(), 0);
        assert_eq!(h.cloud.calls(), 1);

        // 10.4s of audio bills as 10 whole seconds against the cloud counter.
        let u = usage(&h, "felix_test");
        assert_eq!(u.local_seconds, 0);
        assert_eq!(u.cloud_seconds, 10);
    }

    #[tokio::test]
    async fn unhealthy_without_cloud_permission_is_forbidden() {
        let h = harness(
            ScriptedBackend::new(BackendKind::Local, success("unused")),
            ScriptedBackend::new(BackendKind::Cloud, success("unused")),
        );

        let err = h
            .router
            .route(&policy("alice456", false), &request("alice456"), 6.0)
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::CloudForbidden));
        assert_eq!(h.local.calls(), 0);
        assert_eq!(h.cloud.calls(), 0);
        assert!(matches!(
            h.ledger.usage_for(Utc::now().date_naive()),
            Err(RelayError::NoUsageData)
        ));
    }

    #[tokio::test]
    async fn cloud_failure_is_terminal_and_unbilled() {
        let h = harness(
            ScriptedBackend::new(BackendKind::Local, TranscriptionOutcome::Empty),
            ScriptedBackend::new(
                BackendKind::Cloud,
                TranscriptionOutcome::Failed {
                    reason: "cloud API error 500: upstream".to_string(),
                },
            ),
        );
        h.health.update(true);

        let err = h
            .router
            .route(&policy("felix_test", true), &request("felix_test"), 9.0)
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::TranscriptionFailed));
        assert!(matches!(
            h.ledger.usage_for(Utc::now().date_naive()),
            Err(RelayError::NoUsageData)
        ));
    }

    #[tokio::test]
    async fn cloud_empty_is_terminal_failure() {
        let h = harness(
            ScriptedBackend::new(BackendKind::Local, TranscriptionOutcome::Empty),
            ScriptedBackend::new(BackendKind::Cloud, TranscriptionOutcome::Empty),
        );
        h.health.update(true);

        let err = h
            .router
            .route(&policy("felix_test", true), &request("felix_test"), 4.0)
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::TranscriptionFailed));
    }

    #[tokio::test]
    async fn concurrent_routes_for_same_client_sum_exactly() {
        let h = harness(
            ScriptedBackend::new(BackendKind::Local, success("text")),
            ScriptedBackend::new(BackendKind::Cloud, success("unused")),
        );
        h.health.update(true);

        let router = Arc::new(h.router);
        let mut handles = Vec::new();
        for _ in 0..10 {
            let router = Arc::clone(&router);
            handles.push(tokio::spawn(async move {
                router
                    .route(&policy("felix_test", true), &request("felix_test"), 7.0)
                    .await
                    .map(|r| r.backend)
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), BackendKind::Local);
        }

        let u = h
            .ledger
            .usage_for(Utc::now().date_naive())
            .unwrap()["felix_test"];
        assert_eq!(u.local_seconds, 70);
    }
}
