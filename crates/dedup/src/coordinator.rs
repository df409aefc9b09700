//! The deduplication coordinator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use claims::{ClaimStore, ClaimStoreError, DedupEntry};
use ingest_core::{Error, Result};
use ledger::DedupLedger;

use crate::stats::{DedupStatsRegistry, DeduplicationStats};
use crate::ttl::{ConstantTtl, TtlPolicy};

/// Sentinel key used to probe cache availability and latency.
const CACHE_PROBE_KEY: &str = "__probe__";

/// Ledger rows removed per pass during a full expiry sweep.
const SWEEP_BATCH_SIZE: usize = 1_000;

/// One fingerprint's claim decision, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimDecision {
    pub fingerprint: String,
    pub claimed: bool,
}

/// Result of one `claim_events` call.
///
/// Decisions keep submission order, so a fingerprint appearing twice in one
/// batch yields one claimed and one duplicate decision at its two positions.
#[derive(Debug, Default)]
pub struct ClaimPartition {
    pub decisions: Vec<ClaimDecision>,
}

impl ClaimPartition {
    pub fn claimed(&self) -> Vec<String> {
        self.decisions
            .iter()
            .filter(|d| d.claimed)
            .map(|d| d.fingerprint.clone())
            .collect()
    }

    pub fn duplicates(&self) -> Vec<String> {
        self.decisions
            .iter()
            .filter(|d| !d.claimed)
            .map(|d| d.fingerprint.clone())
            .collect()
    }

    pub fn claimed_count(&self) -> usize {
        self.decisions.iter().filter(|d| d.claimed).count()
    }

    pub fn duplicate_count(&self) -> usize {
        self.decisions.len() - self.claimed_count()
    }
}

/// Composes the claim cache and the durable ledger into one claim/release
/// protocol.
///
/// Coordination happens entirely through the atomicity of the two stores'
/// single-key operations; the coordinator itself holds no locks across
/// fingerprints, so any number of coordinators can share the same tiers.
#[derive(Clone)]
pub struct DedupCoordinator {
    cache: Arc<dyn ClaimStore>,
    ledger: DedupLedger,
    ttl_policy: Arc<dyn TtlPolicy>,
    stats: Arc<DedupStatsRegistry>,
}

impl DedupCoordinator {
    pub fn new(cache: Arc<dyn ClaimStore>, ledger: DedupLedger, stats: Arc<DedupStatsRegistry>) -> Self {
        Self {
            cache,
            ledger,
            ttl_policy: Arc::new(ConstantTtl),
            stats,
        }
    }

    /// Replaces the TTL policy (constant by default).
    pub fn with_ttl_policy(mut self, policy: Arc<dyn TtlPolicy>) -> Self {
        self.ttl_policy = policy;
        self
    }

    /// Claims each fingerprint in submission order.
    ///
    /// Fast path is the cache tier; on cache unavailability the ledger is
    /// claimed directly. A cache-side claim is acknowledged only once the
    /// ledger write lands, so it survives cache eviction. If neither tier
    /// can answer, the whole call fails and every fingerprint this call
    /// already claimed is released, keeping a batch retry safe.
    pub async fn claim_events(
        &self,
        project_id: &str,
        batch_id: Uuid,
        fingerprints: &[String],
        default_ttl: Duration,
        use_cache: bool,
    ) -> Result<ClaimPartition> {
        let counters = self.stats.project(project_id);
        let mut partition = ClaimPartition::default();

        for fingerprint in fingerprints {
            let ttl = self.ttl_policy.ttl_for(fingerprint, default_ttl);
            let entry = DedupEntry::new(fingerprint.clone(), batch_id, project_id, ttl);
            counters.total_checks.inc();

            let claimed = if use_cache {
                match self.cache.try_claim(&entry).await {
                    Ok(true) => {
                        counters.cache_misses.inc();
                        // The claim is final only once it is durable.
                        match self.ledger.try_insert(&entry) {
                            Ok(true) => true,
                            Ok(false) => {
                                // The ledger already holds a live claim the
                                // cache had lost; the fresh cache entry now
                                // mirrors it.
                                false
                            }
                            Err(e) => {
                                let _ = self.cache.release(fingerprint).await;
                                self.rollback(&partition).await;
                                return Err(Error::store_unavailable(format!(
                                    "ledger write failed while claiming {}: {}",
                                    fingerprint, e
                                )));
                            }
                        }
                    }
                    Ok(false) => {
                        counters.cache_hits.inc();
                        false
                    }
                    Err(ClaimStoreError::Unavailable(reason)) => {
                        counters.database_fallbacks.inc();
                        debug!(%fingerprint, %reason, "claim cache unavailable, falling back to ledger");
                        match self.ledger.try_insert(&entry) {
                            Ok(claimed) => claimed,
                            Err(e) => {
                                self.rollback(&partition).await;
                                return Err(Error::store_unavailable(format!(
                                    "claim store and ledger both unavailable: {}",
                                    e
                                )));
                            }
                        }
                    }
                    Err(ClaimStoreError::Internal(reason)) => {
                        self.rollback(&partition).await;
                        return Err(Error::internal(format!("claim store error: {}", reason)));
                    }
                }
            } else {
                match self.ledger.try_insert(&entry) {
                    Ok(claimed) => claimed,
                    Err(e) => {
                        self.rollback(&partition).await;
                        return Err(Error::store_unavailable(format!("ledger unavailable: {}", e)));
                    }
                }
            };

            if !claimed {
                counters.duplicates_found.inc();
            }
            partition.decisions.push(ClaimDecision {
                fingerprint: fingerprint.clone(),
                claimed,
            });
        }

        debug!(
            project_id,
            %batch_id,
            claimed = partition.claimed_count(),
            duplicates = partition.duplicate_count(),
            "claim partition settled"
        );

        Ok(partition)
    }

    /// Releases claims so a legitimate retry is not misclassified as a
    /// duplicate. Removes entries from both tiers; cache removal is
    /// best-effort (the entry expires on its own), ledger removal must
    /// succeed.
    pub async fn release_events(&self, fingerprints: &[String]) -> Result<()> {
        for fingerprint in fingerprints {
            if let Err(e) = self.cache.release(fingerprint).await {
                warn!(%fingerprint, error = %e, "cache release failed; entry will expire by TTL");
            }
            self.ledger.delete(fingerprint)?;
        }
        Ok(())
    }

    /// Undoes the claims a partially-failed `claim_events` call made.
    async fn rollback(&self, partition: &ClaimPartition) {
        let claimed = partition.claimed();
        if claimed.is_empty() {
            return;
        }
        if let Err(e) = self.release_events(&claimed).await {
            warn!(error = %e, count = claimed.len(), "rollback of partial claims failed");
        }
    }

    /// Removes every ledger row past its expiry. Sweeps in bounded passes;
    /// returns the total removed. Idempotent.
    pub fn cleanup_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut total = 0;
        loop {
            let removed = self.ledger.delete_expired(now, SWEEP_BATCH_SIZE)?;
            total += removed;
            if removed < SWEEP_BATCH_SIZE {
                break;
            }
        }
        Ok(total)
    }

    /// Removes one project's expired rows older than the given instant.
    pub fn cleanup_by_project(&self, project_id: &str, older_than: DateTime<Utc>) -> Result<usize> {
        self.ledger.delete_expired_for_project(project_id, older_than)
    }

    /// One bounded cleanup pass; returns rows removed. Callers repeat until
    /// zero to resume a sweep without a long-running scan.
    pub fn batch_cleanup(&self, older_than: DateTime<Utc>, batch_size: usize) -> Result<usize> {
        self.ledger.delete_expired(older_than, batch_size)
    }

    /// Per-project stats snapshots.
    pub fn stats(&self) -> Vec<DeduplicationStats> {
        self.stats.snapshot()
    }

    pub fn project_stats(&self, project_id: &str) -> Option<DeduplicationStats> {
        self.stats.project_stats(project_id)
    }

    pub fn cache_hit_rate(&self, project_id: &str) -> f64 {
        self.stats.cache_hit_rate(project_id)
    }

    pub fn fallback_rate(&self, project_id: &str) -> f64 {
        self.stats.fallback_rate(project_id)
    }

    /// Measures cache availability and round-trip latency.
    pub async fn probe_cache(&self) -> std::result::Result<Duration, ClaimStoreError> {
        let start = Instant::now();
        self.cache.exists(CACHE_PROBE_KEY).await?;
        Ok(start.elapsed())
    }

    /// Checks ledger connectivity.
    pub fn probe_ledger(&self) -> Result<()> {
        self.ledger.probe()
    }
}
