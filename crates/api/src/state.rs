//! Application state shared across handlers.

use std::sync::Arc;

use dedup::DedupCoordinator;
use pipeline::BatchOrchestrator;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Batch orchestrator, the write path entry point.
    pub orchestrator: Arc<BatchOrchestrator>,
    /// Coordinator handle for the read-only dedup stats endpoints.
    pub coordinator: DedupCoordinator,
}

impl AppState {
    pub fn new(orchestrator: Arc<BatchOrchestrator>, coordinator: DedupCoordinator) -> Self {
        Self {
            orchestrator,
            coordinator,
        }
    }
}
