//! Downstream event sink for the ingestion engine.
//!
//! The sink owns storage mapping and derived-field materialization; this
//! crate only defines the dispatch seam and an HTTP forwarding client. The
//! sink classifies its own failures; the orchestrator copies that
//! classification into per-event outcomes verbatim.

pub mod config;
pub mod http;

pub use config::SinkConfig;
pub use http::HttpSink;

use async_trait::async_trait;
use ingest_core::TelemetryEvent;
use thiserror::Error;

/// A sink failure, classified by the sink itself.
#[derive(Debug, Clone, Error)]
#[error("[{error_code}] {message}")]
pub struct SinkError {
    pub error_code: String,
    pub message: String,
    pub retryable: bool,
}

impl SinkError {
    /// The sink refused the event; retrying the same event will not help.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            error_code: "SINK_001".into(),
            message: message.into(),
            retryable: false,
        }
    }

    /// The sink could not be reached or answered with a server error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            error_code: "SINK_002".into(),
            message: message.into(),
            retryable: true,
        }
    }

    /// The sink did not answer within its deadline.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            error_code: "SINK_003".into(),
            message: message.into(),
            retryable: true,
        }
    }
}

/// Durably persists one accepted event.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Processes one claimed event. `Err` carries the sink's own error code
    /// and retryability.
    async fn process(&self, project_id: &str, event: &TelemetryEvent) -> Result<(), SinkError>;

    /// Whether the sink considers itself able to accept events.
    fn is_healthy(&self) -> bool;
}
