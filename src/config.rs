use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub health: HealthConfig,
    pub backends: BackendsConfig,
    pub storage: StorageConfig,
    pub clients: Vec<ClientPolicy>,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,

    /// Upper bound on multipart upload size in MiB.
    #[serde(default = "default_max_upload_mib")]
    pub max_upload_mib: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    /// Seconds between reachability probes of the local backend.
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,

    /// Per-probe timeout in seconds.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct BackendsConfig {
    pub local: LocalBackendConfig,
    pub cloud: CloudBackendConfig,
}

/// Self-hosted transcription engine and its inference parameter bag.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalBackendConfig {
    /// Base URL of the engine, also used as the health-probe target.
    pub base_url: String,

    #[serde(default = "default_local_model")]
    pub model: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_beam_size")]
    pub beam_size: u32,

    #[serde(default = "default_vad_filter")]
    pub vad_filter: bool,

    #[serde(default = "default_vad_threshold")]
    pub vad_threshold: f32,

    #[serde(default = "default_compute_type")]
    pub compute_type: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Hosted fallback transcription API.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudBackendConfig {
    pub api_url: String,
    pub api_key: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Directory for archived recordings and transcripts.
    pub recordings_dir: String,

    /// Directory holding the per-client usage ledgers.
    pub ledger_dir: String,

    /// Flat audit log file.
    pub audit_log: String,
}

/// Per-credential policy controlling recording persistence and cloud fallback.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientPolicy {
    pub client_id: String,
    pub api_key: String,
    pub save_recordings: bool,
    pub allow_cloud: bool,
}

fn default_max_upload_mib() -> usize {
    100
}

fn default_probe_interval_secs() -> u64 {
    30
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_local_model() -> String {
    "large-v3-turbo".to_string()
}

fn default_language() -> String {
    "auto".to_string()
}

fn default_beam_size() -> u32 {
    5
}

fn default_vad_filter() -> bool {
    true
}

fn default_vad_threshold() -> f32 {
    0.5
}

fn default_compute_type() -> String {
    "float16".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_full_config() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("relay.toml");
        let mut file = std::fs::File::create(&path)?;
        write!(
            file,
            r#"
[service]
name = "whisper-relay"

[service.http]
bind = "127.0.0.1"
port = 8080

[health]
probe_interval_secs = 10

[backends.local]
base_url = "http://localhost:7860"

[backends.cloud]
api_url = "https://api.openai.com/v1/audio/transcriptions"
api_key = "sk-test"

[storage]
recordings_dir = "recordings"
ledger_dir = "client_logs"
audit_log = "error.log"

[[clients]]
client_id = "felix_test"
api_key = "sk-1234felix"
save_recordings = true
allow_cloud = true
"#
        )?;

        let cfg = Config::load(path.to_str().unwrap())?;
        assert_eq!(cfg.service.name, "whisper-relay");
        assert_eq!(cfg.health.probe_interval_secs, 10);
        // Defaults apply to fields the file omits.
        assert_eq!(cfg.health.probe_timeout_secs, 5);
        assert_eq!(cfg.backends.local.beam_size, 5);
        assert_eq!(cfg.service.http.max_upload_mib, 100);
        assert_eq!(cfg.clients.len(), 1);
        assert!(cfg.clients[0].allow_cloud);

        Ok(())
    }
}
