//! Deduplication coordinator for the ingestion engine.
//!
//! Composes the claim cache and the durable ledger into one atomic
//! claim/release protocol: cache fast path, ledger fallback, per-fingerprint
//! TTL, and per-project hit/fallback statistics.

pub mod coordinator;
pub mod stats;
pub mod ttl;

pub use coordinator::{ClaimDecision, ClaimPartition, DedupCoordinator};
pub use stats::{DedupStatsRegistry, DeduplicationStats};
pub use ttl::{ConstantTtl, TtlPolicy};
