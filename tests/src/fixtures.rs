//! Test fixtures and event generators.

use uuid::Uuid;

/// A valid span event with unique identifiers.
pub fn span_event() -> serde_json::Value {
    span_event_for(&Uuid::new_v4().to_string(), &Uuid::new_v4().to_string())
}

/// A valid span event with fixed trace/span identity.
pub fn span_event_for(trace_id: &str, span_id: &str) -> serde_json::Value {
    serde_json::json!({
        "event_id": Uuid::new_v4().to_string(),
        "event_type": "span",
        "payload": {"name": "llm-call", "model": "gpt-4o", "latency_ms": 812},
        "trace_id": trace_id,
        "span_id": span_id,
    })
}

/// A valid score event (not span-typed, keyed by its event id).
pub fn score_event(event_id: &str) -> serde_json::Value {
    serde_json::json!({
        "event_id": event_id,
        "event_type": "score",
        "payload": {"name": "helpfulness", "value": 0.92},
        "trace_id": Uuid::new_v4().to_string(),
    })
}

/// A valid log event.
pub fn log_event() -> serde_json::Value {
    serde_json::json!({
        "event_id": Uuid::new_v4().to_string(),
        "event_type": "log",
        "payload": {"level": "warn", "body": "token budget 90% consumed"},
        "trace_id": Uuid::new_v4().to_string(),
    })
}

/// N valid span events.
pub fn span_events(n: usize) -> Vec<serde_json::Value> {
    (0..n).map(|_| span_event()).collect()
}

/// A full ingest request payload.
pub fn ingest_payload(project_id: &str, events: Vec<serde_json::Value>) -> String {
    serde_json::json!({
        "project_id": project_id,
        "events": events,
    })
    .to_string()
}

/// An ingest request with dedup overrides.
pub fn ingest_payload_with_config(
    project_id: &str,
    events: Vec<serde_json::Value>,
    dedup_config: serde_json::Value,
) -> String {
    serde_json::json!({
        "project_id": project_id,
        "events": events,
        "deduplication_config": dedup_config,
    })
    .to_string()
}

/// The default test project.
pub fn test_project_id() -> String {
    "proj-itest".to_string()
}
