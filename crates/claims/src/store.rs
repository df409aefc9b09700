//! The claim store trait and its failure semantics.

use async_trait::async_trait;
use thiserror::Error;

use crate::entry::DedupEntry;

/// Claim store failures.
///
/// An unreachable store must fail fast with `Unavailable` — it never answers
/// "not claimed", which would let a duplicate through.
#[derive(Debug, Error)]
pub enum ClaimStoreError {
    /// The store cannot be reached; the caller should fall back or fail.
    #[error("claim store unavailable: {0}")]
    Unavailable(String),

    /// The store answered but the operation failed.
    #[error("claim store error: {0}")]
    Internal(String),
}

impl ClaimStoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Atomic claim-if-absent over fingerprints.
#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Atomically inserts the entry iff no live (non-expired) claim exists
    /// for its fingerprint, in a single round trip. Returns `true` when this
    /// call won the claim.
    async fn try_claim(&self, entry: &DedupEntry) -> Result<bool, ClaimStoreError>;

    /// Removes any claim for the fingerprint. Idempotent.
    async fn release(&self, fingerprint: &str) -> Result<(), ClaimStoreError>;

    /// Whether a live claim exists for the fingerprint.
    async fn exists(&self, fingerprint: &str) -> Result<bool, ClaimStoreError>;
}
