//! Glasswing Telemetry Ingestion Engine
//!
//! Batch ingestion backbone for the Glasswing LLM observability platform:
//! - Structural validation of SDK telemetry batches
//! - Idempotent claim protocol (moka cache + SQLite ledger)
//! - Downstream dispatch with per-event outcome reporting
//! - Background workers for claim expiry sweeps and health probes

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::info;

use api::{router, AppState};
use claims::CacheClaimStore;
use dedup::{DedupCoordinator, DedupStatsRegistry};
use ledger::{DedupLedger, LedgerConfig};
use pipeline::{BatchOrchestrator, OrchestratorConfig};
use sink::{EventSink, HttpSink, SinkConfig};
use telemetry::init_tracing_from_env;
use worker::{probe_components, WorkerConfig, WorkerScheduler};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    /// Claim cache capacity (entries).
    #[serde(default = "default_cache_capacity")]
    cache_capacity: u64,

    #[serde(default)]
    ledger: LedgerConfig,

    #[serde(default)]
    sink: SinkConfig,

    #[serde(default)]
    orchestrator: OrchestratorConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cache_capacity() -> u64 {
    1_000_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cache_capacity: default_cache_capacity(),
            ledger: LedgerConfig::default(),
            sink: SinkConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing_from_env();

    info!("Starting Glasswing Ingestion Engine v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = load_config()?;
    info!(
        ledger_path = %config.ledger.path,
        sink_url = %config.sink.url,
        batch_timeout_ms = config.orchestrator.batch_timeout_ms,
        "Loaded configuration"
    );

    // Claim tiers
    let cache = Arc::new(CacheClaimStore::with_capacity(config.cache_capacity));
    let ledger = DedupLedger::open(&config.ledger).context("Failed to open dedup ledger")?;

    // Coordinator with an explicitly-scoped stats registry
    let stats = Arc::new(DedupStatsRegistry::new());
    let coordinator = DedupCoordinator::new(cache, ledger, stats);

    // Downstream sink
    let sink: Arc<dyn EventSink> = Arc::new(HttpSink::new(&config.sink));

    // Orchestrator
    let orchestrator = Arc::new(BatchOrchestrator::new(
        coordinator.clone(),
        sink.clone(),
        config.orchestrator.clone(),
    ));

    // Startup health probes so the first readiness check is honest
    probe_components(&coordinator, sink.as_ref()).await;

    // Background workers: cleanup sweeps, periodic probes, metrics logging
    let scheduler = Arc::new(WorkerScheduler::new(
        WorkerConfig::default(),
        coordinator.clone(),
        sink.clone(),
    ));
    let _worker_handles = scheduler.start();

    // Create application state and router
    let state = AppState::new(orchestrator, coordinator);
    let app = router(state);

    // Start HTTP server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("INGEST")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Manual overrides for nested config from environment; the config
    // crate's nested parsing does not handle underscored field names well
    if let Ok(path) = std::env::var("INGEST_LEDGER_PATH") {
        config.ledger.path = path;
    }
    if let Ok(url) = std::env::var("INGEST_SINK_URL") {
        config.sink.url = url;
    }
    if let Ok(timeout) = std::env::var("INGEST_BATCH_TIMEOUT_MS") {
        if let Ok(ms) = timeout.parse() {
            config.orchestrator.batch_timeout_ms = ms;
        }
    }

    Ok(config)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
