//! Internal telemetry for the Glasswing ingestion engine.
//!
//! Metrics are collected in-memory and exposed over the read-only metrics
//! endpoint; nothing here sits on the write path.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
