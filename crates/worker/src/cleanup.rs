//! Cleanup worker for expired dedup claims.
//!
//! Expiry is already observable lazily (an expired row loses to the next
//! claim attempt); the sweep only keeps the ledger from growing without
//! bound. Each pass is capped at `batch_size` rows so no invocation holds
//! the ledger for long.

use chrono::Utc;
use tracing::{debug, info};

use dedup::DedupCoordinator;
use ingest_core::Result;
use telemetry::metrics;

/// Worker that sweeps expired ledger rows in bounded passes.
pub struct CleanupWorker {
    coordinator: DedupCoordinator,
    batch_size: usize,
}

impl CleanupWorker {
    pub fn new(coordinator: DedupCoordinator, batch_size: usize) -> Self {
        Self {
            coordinator,
            batch_size,
        }
    }

    /// Runs one full sweep. Returns rows removed; zero when nothing expired.
    pub async fn run(&self) -> Result<usize> {
        let cutoff = Utc::now();
        let mut total = 0;

        loop {
            let removed = self.coordinator.batch_cleanup(cutoff, self.batch_size)?;
            total += removed;
            metrics().cleanup_rows_removed.inc_by(removed as u64);

            if removed < self.batch_size {
                break;
            }
            debug!(removed, "cleanup pass complete, continuing sweep");
            // Let batch traffic interleave between passes.
            tokio::task::yield_now().await;
        }

        metrics().cleanup_runs.inc();
        if total > 0 {
            info!(removed = total, "Expired dedup claims swept");
        }
        Ok(total)
    }
}
