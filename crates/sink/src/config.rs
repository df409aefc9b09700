//! Sink configuration.

use serde::{Deserialize, Serialize};

/// HTTP sink configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Downstream writer URL (e.g. "http://storage-writer:9000").
    /// Empty or "mock" accepts every event without a network call.
    #[serde(default = "default_url")]
    pub url: String,
    /// Per-dispatch request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_url() -> String {
    "mock".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
