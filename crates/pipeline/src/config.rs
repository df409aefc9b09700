//! Orchestrator configuration.

use ingest_core::DeduplicationConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Batch orchestrator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Budget for claiming plus dispatching one batch, in milliseconds.
    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,
    /// Dedup settings applied when a request carries no overrides.
    #[serde(default)]
    pub dedup: DeduplicationConfig,
}

fn default_batch_timeout_ms() -> u64 {
    30_000
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            batch_timeout_ms: default_batch_timeout_ms(),
            dedup: DeduplicationConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Per-batch processing budget.
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }
}
