//! Event fingerprint derivation.
//!
//! The fingerprint is the dedup key: a deterministic identifier of one
//! logical event, stable across client retries. Derivation is injected so
//! deployments can swap the rule without touching the claim protocol.

use std::sync::Arc;

use crate::envelope::TelemetryEvent;

/// Injected fingerprint derivation, `(project_id, event) -> fingerprint`.
pub type FingerprintFn = Arc<dyn Fn(&str, &TelemetryEvent) -> String + Send + Sync>;

/// Default derivation: trace+span composite for span-typed events, the
/// client-supplied event id otherwise. Prefixed with the project so equal
/// client ids in different tenants never collide.
pub fn default_fingerprint(project_id: &str, event: &TelemetryEvent) -> String {
    match event.span_id.as_deref() {
        Some(span_id) if event.event_type.is_span_typed() => {
            format!("{}:{}:{}", project_id, event.trace_id, span_id)
        }
        _ => format!("{}:{}:{}", project_id, event.event_type, event.event_id),
    }
}

/// The default derivation as an injectable function.
pub fn default_fingerprint_fn() -> FingerprintFn {
    Arc::new(|project_id, event| default_fingerprint(project_id, event))
}
