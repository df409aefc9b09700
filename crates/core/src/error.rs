//! Unified error types for the ingestion engine.
//!
//! Error codes:
//! - VALID_001-005: Structural validation errors (never retryable)
//! - STORE_001: Claim store and ledger both unreachable
//! - TIMEOUT_001: Batch exceeded its processing budget
//! - LEDGER_001: Ledger operation failed

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Validation error codes.
///
/// Validation failures are terminal for the event: the caller must fix the
/// envelope, a retry of the same bytes will fail the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// VALID_001: Project id is missing or empty
    MissingProjectId,
    /// VALID_002: Event carries no trace identifier
    MissingTraceId,
    /// VALID_003: Span-typed event carries no span identifier
    MissingSpanId,
    /// VALID_004: Batch exceeds the event count limit
    BatchTooLarge,
    /// VALID_005: Event payload exceeds the size limit
    PayloadTooLarge,
}

impl ValidationErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingProjectId => "VALID_001",
            Self::MissingTraceId => "VALID_002",
            Self::MissingSpanId => "VALID_003",
            Self::BatchTooLarge => "VALID_004",
            Self::PayloadTooLarge => "VALID_005",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        400
    }
}

/// Unified error type for the ingestion engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Structural validation error with code.
    #[error("[{code}] {message}")]
    Validation { code: &'static str, message: String },

    /// Both claim tiers unreachable; the whole claim call fails rather than
    /// guessing at claimed/duplicate.
    #[error("[STORE_001] {0}")]
    StoreUnavailable(String),

    /// Ledger read/write failed.
    #[error("[LEDGER_001] {0}")]
    Ledger(String),

    /// Batch exceeded its claiming+dispatching budget.
    #[error("[TIMEOUT_001] {0}")]
    Timeout(String),

    /// Duplicates found while the request demanded none.
    #[error("[DUP_001] {0}")]
    DuplicateRejected(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error with code.
    pub fn validation(code: ValidationErrorCode, msg: impl Into<String>) -> Self {
        Self::Validation {
            code: code.code(),
            message: msg.into(),
        }
    }

    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    pub fn ledger(msg: impl Into<String>) -> Self {
        Self::Ledger(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn duplicate_rejected(msg: impl Into<String>) -> Self {
        Self::DuplicateRejected(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Validation { code, .. } => Some(code),
            Self::StoreUnavailable(_) => Some("STORE_001"),
            Self::Ledger(_) => Some("LEDGER_001"),
            Self::Timeout(_) => Some("TIMEOUT_001"),
            Self::DuplicateRejected(_) => Some("DUP_001"),
            _ => None,
        }
    }

    /// Whether the caller may retry the whole batch.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::Ledger(_) | Self::Timeout(_)
        )
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::DuplicateRejected(_) => 409,
            Self::StoreUnavailable(_) => 503,
            Self::Ledger(_) => 500,
            Self::Timeout(_) => 504,
            Self::Serialization(_) => 400,
            Self::Config(_) => 500,
            Self::Internal(_) => 500,
        }
    }
}
