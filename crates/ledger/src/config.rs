//! Ledger configuration.

use serde::{Deserialize, Serialize};

/// Dedup ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// SQLite database path; `:memory:` for an ephemeral ledger.
    #[serde(default = "default_path")]
    pub path: String,
    /// How long a writer waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_path() -> String {
    "glasswing-dedup.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl LedgerConfig {
    /// Config for an in-memory ledger (tests, local development).
    pub fn in_memory() -> Self {
        Self {
            path: ":memory:".to_string(),
            ..Self::default()
        }
    }
}
