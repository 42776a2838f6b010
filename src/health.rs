use crate::config::HealthConfig;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Process-wide belief about local-backend reachability.
///
/// The monitor task is the only writer; every other component reads without
/// blocking. The value may lag reality by up to one probe interval.
pub struct ServiceHealth {
    available: AtomicBool,
    last_checked: RwLock<Option<DateTime<Utc>>>,
}

impl ServiceHealth {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(false),
            last_checked: RwLock::new(None),
        }
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        *self.last_checked.read().expect("health cell poisoned")
    }

    pub(crate) fn update(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
        *self.last_checked.write().expect("health cell poisoned") = Some(Utc::now());
    }
}

impl Default for ServiceHealth {
    fn default() -> Self {
        Self::new()
    }
}

/// Background task that keeps [`ServiceHealth`] current.
///
/// Probes the local backend on a fixed cadence with a bounded timeout. A
/// probe error of any kind marks the backend unavailable; the loop itself
/// never exits.
pub struct HealthMonitor {
    health: Arc<ServiceHealth>,
    probe_url: String,
    interval: Duration,
    client: reqwest::Client,
}

impl HealthMonitor {
    pub fn new(config: &HealthConfig, probe_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.probe_timeout_secs))
            .build()
            .context("Failed to build health probe client")?;

        Ok(Self {
            health: Arc::new(ServiceHealth::new()),
            probe_url,
            interval: Duration::from_secs(config.probe_interval_secs),
            client,
        })
    }

    /// Shared handle to the health belief this monitor maintains.
    pub fn health(&self) -> Arc<ServiceHealth> {
        Arc::clone(&self.health)
    }

    /// Start the probe loop. Runs for the life of the process.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Health monitor started: probing {} every {}s",
                self.probe_url,
                self.interval.as_secs()
            );

            let mut ticker = tokio::time::interval(self.interval);

            loop {
                ticker.tick().await;

                let available = self.probe().await;
                let was_available = self.health.is_available();
                self.health.update(available);

                if available != was_available {
                    if available {
                        info!("Local transcription backend is reachable");
                    } else {
                        warn!("Local transcription backend is unreachable");
                    }
                }
            }
        })
    }

    async fn probe(&self) -> bool {
        match self.client.get(&self.probe_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
