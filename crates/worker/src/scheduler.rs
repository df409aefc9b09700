//! Worker scheduler for background tasks.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

use dedup::DedupCoordinator;
use sink::EventSink;
use telemetry::{health, metrics};

use crate::cleanup::CleanupWorker;

/// Worker scheduler configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Expired-claim sweep interval
    pub cleanup_interval: Duration,
    /// Rows removed per cleanup pass
    pub cleanup_batch_size: usize,
    /// Component health probe interval
    pub probe_interval: Duration,
    /// Metrics snapshot log interval
    pub metrics_log_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: Duration::from_secs(300),   // 5 minutes
            cleanup_batch_size: 1_000,
            probe_interval: Duration::from_secs(30),
            metrics_log_interval: Duration::from_secs(60), // 1 minute
        }
    }
}

/// Background worker scheduler.
pub struct WorkerScheduler {
    config: WorkerConfig,
    coordinator: DedupCoordinator,
    sink: Arc<dyn EventSink>,
}

impl WorkerScheduler {
    pub fn new(config: WorkerConfig, coordinator: DedupCoordinator, sink: Arc<dyn EventSink>) -> Self {
        Self {
            config,
            coordinator,
            sink,
        }
    }

    /// Starts all background workers.
    pub fn start(self: Arc<Self>) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        // Cleanup worker
        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_cleanup_worker().await;
        }));

        // Health probe worker
        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_health_probes().await;
        }));

        // Metrics log worker
        let scheduler = self.clone();
        handles.push(tokio::spawn(async move {
            scheduler.run_metrics_log().await;
        }));

        info!("Background workers started");
        handles
    }

    async fn run_cleanup_worker(&self) {
        let worker = CleanupWorker::new(self.coordinator.clone(), self.config.cleanup_batch_size);
        let mut ticker = interval(self.config.cleanup_interval);

        loop {
            ticker.tick().await;

            if let Err(e) = worker.run().await {
                error!("Cleanup worker error: {}", e);
            }
        }
    }

    async fn run_health_probes(&self) {
        let mut ticker = interval(self.config.probe_interval);

        loop {
            ticker.tick().await;
            probe_components(&self.coordinator, self.sink.as_ref()).await;
        }
    }

    async fn run_metrics_log(&self) {
        let mut ticker = interval(self.config.metrics_log_interval);

        loop {
            ticker.tick().await;

            let snapshot = metrics().snapshot();
            info!(
                batches = snapshot.batches_received,
                events = snapshot.events_received,
                processed = snapshot.events_processed,
                duplicates = snapshot.events_duplicate,
                failed = snapshot.events_failed,
                ingest_latency_mean_ms = snapshot.ingest_latency_mean_ms,
                active_batches = snapshot.active_batches,
                "Metrics snapshot"
            );
        }
    }
}

/// Probes every component once and updates the health registry.
///
/// Also used at startup so the first readiness check reflects reality.
pub async fn probe_components(coordinator: &DedupCoordinator, sink: &dyn EventSink) {
    match coordinator.probe_ledger() {
        Ok(()) => health().ledger.set_healthy(),
        Err(e) => health().ledger.set_unhealthy(e.to_string()),
    }

    match coordinator.probe_cache().await {
        Ok(latency) => {
            health().claim_cache.set_healthy();
            metrics()
                .cache_probe_latency_ms
                .set(latency.as_millis() as u64);
        }
        Err(e) => health().claim_cache.set_unhealthy(e.to_string()),
    }

    if sink.is_healthy() {
        health().sink.set_healthy();
    } else {
        health().sink.set_unhealthy("last dispatch failed");
    }
}
