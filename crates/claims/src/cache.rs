//! Fast cache tier for claims.
//!
//! Backed by a moka cache with per-entry expiration derived from the claim
//! TTL. `entry().or_insert()` gives the atomic claim-if-absent in a single
//! call: whoever inserts the entry owns the claim.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use tracing::debug;

use crate::entry::DedupEntry;
use crate::store::{ClaimStore, ClaimStoreError};

/// Default maximum claims held in the cache tier.
const DEFAULT_MAX_CAPACITY: u64 = 1_000_000;

/// Cached claim token; the TTL drives per-entry expiration.
#[derive(Debug, Clone)]
struct ClaimToken {
    ttl: Duration,
}

/// Expires each token after its own claim TTL.
struct ClaimExpiry;

impl Expiry<String, ClaimToken> for ClaimExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &ClaimToken,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process claim cache.
///
/// Eviction under capacity pressure is safe: a lost cache entry degrades to
/// a ledger lookup, never to duplicate processing.
#[derive(Clone)]
pub struct CacheClaimStore {
    cache: Cache<String, ClaimToken>,
}

impl CacheClaimStore {
    /// Creates a cache tier with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }

    /// Creates a cache tier bounded to `max_capacity` claims.
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(ClaimExpiry)
                .build(),
        }
    }

    /// Number of live entries (approximate, for observability).
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for CacheClaimStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClaimStore for CacheClaimStore {
    async fn try_claim(&self, entry: &DedupEntry) -> Result<bool, ClaimStoreError> {
        let token = ClaimToken {
            ttl: entry.remaining_ttl().max(Duration::from_millis(1)),
        };

        let claimed = self
            .cache
            .entry(entry.fingerprint.clone())
            .or_insert(token)
            .await
            .is_fresh();

        debug!(fingerprint = %entry.fingerprint, claimed, "cache claim attempt");
        Ok(claimed)
    }

    async fn release(&self, fingerprint: &str) -> Result<(), ClaimStoreError> {
        self.cache.invalidate(fingerprint).await;
        Ok(())
    }

    async fn exists(&self, fingerprint: &str) -> Result<bool, ClaimStoreError> {
        Ok(self.cache.contains_key(fingerprint))
    }
}
