//! Structural validation of inbound batches.
//!
//! Batch-shape problems (missing project, oversized batch) reject the whole
//! request; per-event problems reject only the event, as a non-retryable
//! outcome that never reaches the coordinator.

use ingest_core::{
    limits::{MAX_BATCH_EVENTS, MAX_EVENT_PAYLOAD_BYTES},
    Error, EventOutcome, FingerprintFn, Result, TelemetryEvent, ValidationErrorCode,
};

/// Checks request-level structure before any event is looked at.
pub fn validate_request(project_id: &str, event_count: usize) -> Result<()> {
    if project_id.trim().is_empty() {
        return Err(Error::validation(
            ValidationErrorCode::MissingProjectId,
            "project_id must be non-empty",
        ));
    }
    if event_count > MAX_BATCH_EVENTS {
        return Err(Error::validation(
            ValidationErrorCode::BatchTooLarge,
            format!("batch has {} events, exceeds {} limit", event_count, MAX_BATCH_EVENTS),
        ));
    }
    Ok(())
}

/// Splits events into the valid set and rejection outcomes, preserving order.
pub fn partition_events(
    project_id: &str,
    events: Vec<TelemetryEvent>,
    fingerprint: &FingerprintFn,
) -> (Vec<TelemetryEvent>, Vec<EventOutcome>) {
    let mut valid = Vec::with_capacity(events.len());
    let mut rejects = Vec::new();

    for event in events {
        match check_event(&event) {
            Ok(()) => valid.push(event),
            Err(code) => {
                let fp = fingerprint(project_id, &event);
                rejects.push(EventOutcome::failed(
                    event.event_id.clone(),
                    event.event_type,
                    fp,
                    code.code(),
                    rejection_message(code, &event),
                    false,
                ));
            }
        }
    }

    (valid, rejects)
}

fn check_event(event: &TelemetryEvent) -> std::result::Result<(), ValidationErrorCode> {
    if event.trace_id.trim().is_empty() {
        return Err(ValidationErrorCode::MissingTraceId);
    }

    if event.event_type.is_span_typed()
        && event.span_id.as_deref().map_or(true, |s| s.trim().is_empty())
    {
        return Err(ValidationErrorCode::MissingSpanId);
    }

    let payload_size = serde_json::to_vec(&event.payload).map(|v| v.len()).unwrap_or(0);
    if payload_size > MAX_EVENT_PAYLOAD_BYTES {
        return Err(ValidationErrorCode::PayloadTooLarge);
    }

    Ok(())
}

fn rejection_message(code: ValidationErrorCode, event: &TelemetryEvent) -> String {
    match code {
        ValidationErrorCode::MissingTraceId => {
            format!("event {} carries no trace_id", event.event_id)
        }
        ValidationErrorCode::MissingSpanId => format!(
            "{} event {} carries no span_id",
            event.event_type, event.event_id
        ),
        ValidationErrorCode::PayloadTooLarge => format!(
            "event {} payload exceeds {}KB",
            event.event_id,
            MAX_EVENT_PAYLOAD_BYTES / 1024
        ),
        _ => format!("event {} failed validation", event.event_id),
    }
}
