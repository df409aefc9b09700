//! Batch bookkeeping: records, per-event outcomes, and the response shape.
//!
//! A batch is a bookkeeping unit, not a transaction: the record is mutated
//! only by the orchestrator and is append-only once the response goes out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::envelope::EventType;

/// Terminal and in-flight batch states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Processing,
    Completed,
    Failed,
    Partial,
}

/// What happened to one event within one batch. Produced once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Processed,
    Duplicate,
    Failed,
}

/// Per-event outcome within one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventOutcome {
    pub event_id: String,
    pub event_type: EventType,
    pub fingerprint: String,
    pub kind: OutcomeKind,
    pub error_code: Option<String>,
    pub message: Option<String>,
    pub retryable: Option<bool>,
}

impl EventOutcome {
    pub fn processed(event_id: impl Into<String>, event_type: EventType, fingerprint: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            event_type,
            fingerprint: fingerprint.into(),
            kind: OutcomeKind::Processed,
            error_code: None,
            message: None,
            retryable: None,
        }
    }

    pub fn duplicate(event_id: impl Into<String>, event_type: EventType, fingerprint: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            event_type,
            fingerprint: fingerprint.into(),
            kind: OutcomeKind::Duplicate,
            error_code: None,
            message: None,
            retryable: None,
        }
    }

    pub fn failed(
        event_id: impl Into<String>,
        event_type: EventType,
        fingerprint: impl Into<String>,
        error_code: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type,
            fingerprint: fingerprint.into(),
            kind: OutcomeKind::Failed,
            error_code: Some(error_code.into()),
            message: Some(message.into()),
            retryable: Some(retryable),
        }
    }
}

/// One client-submitted batch as tracked by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRecord {
    pub batch_id: Uuid,
    pub project_id: String,
    pub environment: String,
    pub submitted_at: DateTime<Utc>,
    pub total_events: usize,
    pub processed_events: usize,
    pub duplicate_events: usize,
    pub failed_events: usize,
    pub status: BatchStatus,
}

impl BatchRecord {
    /// Opens a new batch in the `processing` state.
    pub fn open(project_id: impl Into<String>, environment: impl Into<String>, total_events: usize) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            project_id: project_id.into(),
            environment: environment.into(),
            submitted_at: Utc::now(),
            total_events,
            processed_events: 0,
            duplicate_events: 0,
            failed_events: 0,
            status: BatchStatus::Processing,
        }
    }

    /// Folds outcomes into counts and settles the terminal status.
    ///
    /// Duplicates are not failures: a batch of only duplicates completes.
    pub fn finalize(&mut self, outcomes: &[EventOutcome]) {
        self.processed_events = outcomes.iter().filter(|o| o.kind == OutcomeKind::Processed).count();
        self.duplicate_events = outcomes.iter().filter(|o| o.kind == OutcomeKind::Duplicate).count();
        self.failed_events = outcomes.iter().filter(|o| o.kind == OutcomeKind::Failed).count();

        self.status = if self.failed_events == 0 {
            BatchStatus::Completed
        } else if self.processed_events == 0 && self.duplicate_events == 0 {
            BatchStatus::Failed
        } else {
            BatchStatus::Partial
        };
    }
}

/// Per-event error entry in the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    pub event_id: String,
    pub event_type: EventType,
    pub error_code: String,
    pub message: String,
    pub retryable: bool,
}

/// Response returned for one processed batch.
///
/// Counts plus the explicit per-event error list let the caller retry only
/// the failed, retryable subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub batch_id: Uuid,
    pub status: BatchStatus,
    pub processed_events: usize,
    pub duplicate_events: usize,
    pub failed_events: usize,
    pub processing_time_ms: u64,
    pub errors: Vec<BatchError>,
    pub duplicate_event_ids: Vec<String>,
}

impl BatchResponse {
    /// Builds the response from a finalized record and its outcomes.
    pub fn from_outcomes(record: &BatchRecord, outcomes: &[EventOutcome], processing_time_ms: u64) -> Self {
        let errors = outcomes
            .iter()
            .filter(|o| o.kind == OutcomeKind::Failed)
            .map(|o| BatchError {
                event_id: o.event_id.clone(),
                event_type: o.event_type,
                error_code: o.error_code.clone().unwrap_or_else(|| "UNKNOWN".into()),
                message: o.message.clone().unwrap_or_default(),
                retryable: o.retryable.unwrap_or(false),
            })
            .collect();

        let duplicate_event_ids = outcomes
            .iter()
            .filter(|o| o.kind == OutcomeKind::Duplicate)
            .map(|o| o.event_id.clone())
            .collect();

        Self {
            batch_id: record.batch_id,
            status: record.status,
            processed_events: record.processed_events,
            duplicate_events: record.duplicate_events,
            failed_events: record.failed_events,
            processing_time_ms,
            errors,
            duplicate_event_ids,
        }
    }
}
