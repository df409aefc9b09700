//! Per-project deduplication statistics.
//!
//! An explicitly-scoped registry injected into the coordinator rather than
//! process-global state. Counters are derived data: they reset on restart
//! and that loss is acceptable.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use telemetry::Counter;

/// Rolling counters for one project.
#[derive(Debug, Default)]
pub struct ProjectCounters {
    pub total_checks: Counter,
    pub cache_hits: Counter,
    pub cache_misses: Counter,
    pub database_fallbacks: Counter,
    pub duplicates_found: Counter,
}

/// Snapshot of one project's counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeduplicationStats {
    pub project_id: String,
    pub total_checks: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub database_fallbacks: u64,
    pub duplicates_found: u64,
}

/// Registry of per-project dedup counters.
#[derive(Debug, Default)]
pub struct DedupStatsRegistry {
    projects: RwLock<HashMap<String, Arc<ProjectCounters>>>,
}

impl DedupStatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters for a project, created on first use.
    pub fn project(&self, project_id: &str) -> Arc<ProjectCounters> {
        if let Some(counters) = self.projects.read().get(project_id) {
            return counters.clone();
        }
        self.projects
            .write()
            .entry(project_id.to_string())
            .or_default()
            .clone()
    }

    /// Snapshot of one project's counters, if it has been seen.
    pub fn project_stats(&self, project_id: &str) -> Option<DeduplicationStats> {
        self.projects
            .read()
            .get(project_id)
            .map(|c| snapshot(project_id, c))
    }

    /// Snapshot of every project's counters.
    pub fn snapshot(&self) -> Vec<DeduplicationStats> {
        let mut stats: Vec<_> = self
            .projects
            .read()
            .iter()
            .map(|(project_id, c)| snapshot(project_id, c))
            .collect();
        stats.sort_by(|a, b| a.project_id.cmp(&b.project_id));
        stats
    }

    /// Fraction of cache-path checks answered by the cache tier.
    pub fn cache_hit_rate(&self, project_id: &str) -> f64 {
        match self.project_stats(project_id) {
            Some(s) if s.cache_hits + s.cache_misses > 0 => {
                s.cache_hits as f64 / (s.cache_hits + s.cache_misses) as f64
            }
            _ => 0.0,
        }
    }

    /// Fraction of checks that went to the ledger because the cache tier
    /// was unreachable.
    pub fn fallback_rate(&self, project_id: &str) -> f64 {
        match self.project_stats(project_id) {
            Some(s) if s.total_checks > 0 => s.database_fallbacks as f64 / s.total_checks as f64,
            _ => 0.0,
        }
    }
}

fn snapshot(project_id: &str, c: &ProjectCounters) -> DeduplicationStats {
    DeduplicationStats {
        project_id: project_id.to_string(),
        total_checks: c.total_checks.get(),
        cache_hits: c.cache_hits.get(),
        cache_misses: c.cache_misses.get(),
        database_fallbacks: c.database_fallbacks.get(),
        duplicates_found: c.duplicates_found.get(),
    }
}
