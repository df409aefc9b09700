//! Read-only metrics endpoints.

use axum::{extract::State, Json};
use dedup::DeduplicationStats;
use telemetry::{metrics, MetricsSnapshot};

use crate::state::AppState;

/// GET /metrics - Process counters snapshot.
pub async fn metrics_handler() -> Json<MetricsSnapshot> {
    Json(metrics().snapshot())
}

/// GET /metrics/dedup - Per-project deduplication counters.
pub async fn dedup_stats_handler(State(state): State<AppState>) -> Json<Vec<DeduplicationStats>> {
    Json(state.coordinator.stats())
}
