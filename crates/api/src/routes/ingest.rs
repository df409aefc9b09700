//! Ingestion endpoint handler.

use axum::{body::Bytes, extract::State, Json};
use ingest_core::{limits::MAX_BATCH_SIZE_BYTES, BatchResponse, IngestRequest};
use tracing::{debug, error};

use crate::response::ApiError;
use crate::state::AppState;

/// POST /ingest - Primary SDK ingestion endpoint.
///
/// Accepts one batch of typed telemetry envelopes, runs the dedup/claim
/// protocol, dispatches accepted events downstream, and returns per-event
/// outcomes. Duplicates are reported, not failed; only whole-batch
/// infrastructure failures map to error statuses.
pub async fn ingest_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<BatchResponse>, ApiError> {
    // Check payload size before parsing
    if body.len() > MAX_BATCH_SIZE_BYTES {
        return Err(ApiError::payload_too_large(format!(
            "Payload size {}KB exceeds {}KB limit",
            body.len() / 1024,
            MAX_BATCH_SIZE_BYTES / 1024
        )));
    }

    let request: IngestRequest = serde_json::from_slice(&body).map_err(|e| {
        error!("Failed to parse ingest request: {}", e);
        ApiError::bad_request(e.to_string())
    })?;

    debug!(
        project_id = %request.project_id,
        events = request.events.len(),
        payload_size = body.len(),
        "Received telemetry batch"
    );

    let response = state.orchestrator.process_batch(request).await?;
    Ok(Json(response))
}
