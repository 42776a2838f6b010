use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use whisper_relay::backend::{CloudBackend, LocalBackend, TranscriptionBackend};
use whisper_relay::{
    create_router, AppState, AuditLogger, Authenticator, Config, HealthMonitor, RecordingStore,
    TranscriptionRouter, UsageLedger,
};

#[derive(Parser)]
#[command(name = "whisper-relay", about = "Authenticating reverse proxy for speech-to-text")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/whisper-relay")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} starting", cfg.service.name);
    info!("Local backend: {}", cfg.backends.local.base_url);
    info!("{} clients in the policy registry", cfg.clients.len());

    let audit = Arc::new(AuditLogger::new(&cfg.storage.audit_log));
    let ledger = Arc::new(UsageLedger::new(&cfg.storage.ledger_dir)?);
    let recordings = Arc::new(RecordingStore::new(&cfg.storage.recordings_dir)?);
    let authenticator = Arc::new(Authenticator::new(cfg.clients.clone(), Arc::clone(&audit)));

    let monitor = HealthMonitor::new(&cfg.health, cfg.backends.local.base_url.clone())?;
    let health = monitor.health();
    let _monitor_task = monitor.spawn();

    let local: Arc<dyn TranscriptionBackend> =
        Arc::new(LocalBackend::new(cfg.backends.local.clone())?);
    let cloud: Arc<dyn TranscriptionBackend> =
        Arc::new(CloudBackend::new(cfg.backends.cloud.clone())?);

    let router = Arc::new(TranscriptionRouter::new(
        Arc::clone(&health),
        local,
        cloud,
        Arc::clone(&ledger),
        Arc::clone(&audit),
    ));

    let state = AppState {
        authenticator,
        health,
        router,
        ledger,
        recordings,
        audit,
    };

    let max_upload_bytes = cfg.service.http.max_upload_mib * 1024 * 1024;
    let app = create_router(state, max_upload_bytes);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
