//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub ledger_connected: bool,
    pub claim_cache_connected: bool,
    pub sink_connected: bool,
    pub cache_probe_latency_ms: u64,
    pub queue_depth: u64,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub retryable: bool,
}

/// API error type carrying the engine's error codes.
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, msg: impl Into<String>, retryable: bool) -> Self {
        Self {
            status,
            response: ErrorResponse {
                error: msg.into(),
                code: code.into(),
                retryable,
            },
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALID_001", msg, false)
    }

    pub fn payload_too_large(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, "VALID_004", msg, false)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", msg, false)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<ingest_core::Error> for ApiError {
    fn from(err: ingest_core::Error) -> Self {
        let status = StatusCode::from_u16(err.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = err.error_code().unwrap_or("INTERNAL").to_string();
        let retryable = err.retryable();
        ApiError::new(status, code, err.to_string(), retryable)
    }
}
