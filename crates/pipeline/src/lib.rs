//! Batch ingestion orchestration.
//!
//! The entry point of the write path: validate a batch, claim fingerprints
//! through the dedup coordinator, dispatch claimed events to the downstream
//! sink, aggregate outcomes into the batch response.

pub mod config;
pub mod orchestrator;
pub mod validate;

pub use config::OrchestratorConfig;
pub use orchestrator::BatchOrchestrator;
