//! Size limits for the ingestion path.
//!
//! Limits bound the working set per request: a full batch of max-size
//! payloads stays under ~16MB of decoded JSON.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so field limits are duplicated there. Keep both in sync when modifying.

// === Batch Limits ===

/// Maximum raw batch payload size in bytes (8MB).
///
/// LLM spans carry prompts and completions; batches run far larger than
/// clickstream analytics.
pub const MAX_BATCH_SIZE_BYTES: usize = 8 * 1024 * 1024;

/// Maximum events per batch.
pub const MAX_BATCH_EVENTS: usize = 1000;

// === Event Limits ===

/// Maximum single event payload size in bytes (256KB).
///
/// Large enough for a full prompt/completion pair; oversized payloads are
/// rejected per event, not per batch.
pub const MAX_EVENT_PAYLOAD_BYTES: usize = 256 * 1024;

// === Identifier Limits (chars) ===

/// Project id max length.
pub const MAX_PROJECT_ID_LEN: usize = 128;

/// Client event id max length.
pub const MAX_EVENT_ID_LEN: usize = 128;

/// Trace/span identifier max length. W3C trace ids are 32 hex chars;
/// client-generated ids can be longer.
pub const MAX_CORRELATION_ID_LEN: usize = 128;

/// Environment label max length.
pub const MAX_ENVIRONMENT_LEN: usize = 64;
