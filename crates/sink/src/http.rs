//! HTTP forwarding sink.
//!
//! Forwards accepted envelopes to the downstream storage writer and maps its
//! answers onto the sink error taxonomy: client errors are final, server and
//! transport errors are retryable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use ingest_core::TelemetryEvent;

use crate::config::SinkConfig;
use crate::{EventSink, SinkError};

/// Envelope posted to the downstream writer.
#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    project_id: &'a str,
    #[serde(flatten)]
    event: &'a TelemetryEvent,
}

/// Sink client forwarding events over HTTP.
///
/// In mock mode (empty URL or "mock") every event is accepted locally; tests
/// and local development run without a downstream writer.
pub struct HttpSink {
    base_url: String,
    http_client: reqwest::Client,
    mock_mode: bool,
    healthy: AtomicBool,
}

impl HttpSink {
    /// Creates a new sink client.
    pub fn new(config: &SinkConfig) -> Self {
        let mock_mode = config.url.is_empty() || config.url == "mock";

        Self {
            base_url: config.url.clone(),
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .expect("Failed to create HTTP client"),
            mock_mode,
            healthy: AtomicBool::new(true),
        }
    }

    async fn forward(&self, project_id: &str, event: &TelemetryEvent) -> Result<(), SinkError> {
        let url = format!("{}/v1/events", self.base_url);
        let request = WriteRequest { project_id, event };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                self.healthy.store(false, Ordering::Relaxed);
                if e.is_timeout() {
                    SinkError::timeout(format!("writer timed out: {}", e))
                } else {
                    SinkError::unavailable(format!("writer unreachable: {}", e))
                }
            })?;

        let status = response.status();
        if status.is_success() {
            self.healthy.store(true, Ordering::Relaxed);
            debug!(event_id = %event.event_id, "event forwarded to writer");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(event_id = %event.event_id, status = %status, body = %body, "writer rejected event");

        if status.is_client_error() {
            Err(SinkError::rejected(format!("writer returned {}: {}", status, body)))
        } else {
            self.healthy.store(false, Ordering::Relaxed);
            Err(SinkError::unavailable(format!("writer returned {}: {}", status, body)))
        }
    }
}

#[async_trait]
impl EventSink for HttpSink {
    async fn process(&self, project_id: &str, event: &TelemetryEvent) -> Result<(), SinkError> {
        if self.mock_mode {
            debug!(event_id = %event.event_id, "mock sink accepted event");
            return Ok(());
        }
        self.forward(project_id, event).await
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }
}
