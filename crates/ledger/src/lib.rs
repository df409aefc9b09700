//! Durable dedup ledger for the ingestion engine.
//!
//! The authoritative record of claimed fingerprints: fallback when the cache
//! tier degrades, and the long-term audit trail. A uniqueness constraint on
//! the fingerprint column gives the same claim atomicity as the cache,
//! without one.

pub mod config;
pub mod schema;
pub mod store;

pub use config::LedgerConfig;
pub use store::DedupLedger;
