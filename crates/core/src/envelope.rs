//! Telemetry event envelopes and the inbound batch request.
//!
//! Wire decoding is handled upstream; by the time a request reaches the
//! orchestrator every event is a typed envelope with an opaque JSON payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

use crate::limits::{MAX_BATCH_EVENTS, MAX_EVENT_PAYLOAD_BYTES};

/// Telemetry event kinds accepted by the ingestion path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// A trace span.
    Span,
    /// A model generation (span-typed, carries usage in its payload).
    Generation,
    /// A quality score attached to a trace or span.
    Score,
    /// A log record correlated to a trace.
    Log,
}

impl EventType {
    /// Returns the event type as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Span => "span",
            Self::Generation => "generation",
            Self::Score => "score",
            Self::Log => "log",
        }
    }

    /// Span-typed events must carry a span identifier.
    pub fn is_span_typed(&self) -> bool {
        matches!(self, Self::Span | Self::Generation)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validates the opaque payload size.
fn validate_payload_size(payload: &Value) -> Result<(), ValidationError> {
    if payload.is_null() {
        return Ok(());
    }

    let size = serde_json::to_vec(payload).map(|v| v.len()).unwrap_or(0);

    if size > MAX_EVENT_PAYLOAD_BYTES {
        let mut err = ValidationError::new("payload_too_large");
        err.message = Some(
            format!(
                "payload {}KB exceeds {}KB limit",
                size / 1024,
                MAX_EVENT_PAYLOAD_BYTES / 1024
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// One telemetry event as submitted by an SDK.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TelemetryEvent {
    /// Client-supplied event ID, stable across retries of the same event.
    #[validate(length(min = 1, max = 128))]
    pub event_id: String,
    /// Event kind.
    pub event_type: EventType,
    /// Opaque decoded payload; storage mapping happens downstream.
    #[validate(custom(function = "validate_payload_size"))]
    pub payload: Value,
    /// Trace the event belongs to.
    #[validate(length(max = 128))]
    pub trace_id: String,
    /// Span within the trace; required for span-typed events.
    #[validate(length(max = 128))]
    pub span_id: Option<String>,
    /// Client event time; server receive time is used when absent.
    pub timestamp: Option<DateTime<Utc>>,
}

impl TelemetryEvent {
    /// Event time, falling back to the given receive time.
    pub fn effective_timestamp(&self, received_at: DateTime<Utc>) -> DateTime<Utc> {
        self.timestamp.unwrap_or(received_at)
    }
}

/// Per-request deduplication knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeduplicationConfig {
    /// `false` bypasses the coordinator entirely; every event is treated as claimed.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Claim lifetime in seconds.
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    /// `false` skips the cache tier and claims against the ledger directly.
    #[serde(default = "default_true")]
    pub use_cache: bool,
    /// `true` turns any duplicate into a whole-batch failure.
    #[serde(default)]
    pub fail_on_duplicate: bool,
}

fn default_true() -> bool {
    true
}

fn default_ttl_seconds() -> u64 {
    3600
}

impl Default for DeduplicationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_ttl_seconds(),
            use_cache: true,
            fail_on_duplicate: false,
        }
    }
}

impl DeduplicationConfig {
    /// Claim TTL as a duration.
    pub fn ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.ttl_seconds)
    }
}

/// One client-submitted batch of telemetry events.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestRequest {
    /// Tenant project the events belong to.
    #[validate(length(max = 128))]
    pub project_id: String,
    /// Deployment environment label (e.g. "production", "staging").
    #[validate(length(max = 64))]
    pub environment: Option<String>,
    /// Events in this batch.
    #[validate(length(min = 1, max = 1000))]
    pub events: Vec<TelemetryEvent>,
    /// Optional per-request dedup overrides.
    pub deduplication_config: Option<DeduplicationConfig>,
}

impl IngestRequest {
    /// Environment label, defaulting to "production".
    pub fn environment(&self) -> &str {
        self.environment.as_deref().unwrap_or("production")
    }

    /// Effective dedup config for this request.
    pub fn dedup_config(&self) -> DeduplicationConfig {
        self.deduplication_config.clone().unwrap_or_default()
    }

    /// Whether the batch exceeds the event count limit.
    pub fn exceeds_event_limit(&self) -> bool {
        self.events.len() > MAX_BATCH_EVENTS
    }
}
