//! Internal metrics collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (i, &bound) in Self::BUCKET_BOUNDS.iter().enumerate() {
            if ms <= bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        // Value exceeds all buckets, add to last
        self.buckets[10].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the ingestion engine.
#[derive(Debug, Default)]
pub struct Metrics {
    // Ingestion metrics
    pub batches_received: Counter,
    pub events_received: Counter,
    pub events_validated: Counter,
    pub events_failed_validation: Counter,

    // Outcome metrics
    pub events_processed: Counter,
    pub events_duplicate: Counter,
    pub events_failed: Counter,
    pub events_released: Counter,

    // Sink metrics
    pub sink_dispatches: Counter,
    pub sink_errors: Counter,

    // Cleanup metrics
    pub cleanup_runs: Counter,
    pub cleanup_rows_removed: Counter,

    // Latency histograms
    pub ingest_latency_ms: Histogram,
    pub claim_latency_ms: Histogram,
    pub dispatch_latency_ms: Histogram,

    // Gauges
    pub active_batches: Gauge,
    pub cache_probe_latency_ms: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub batches_received: u64,
    pub events_received: u64,
    pub events_validated: u64,
    pub events_failed_validation: u64,
    pub events_processed: u64,
    pub events_duplicate: u64,
    pub events_failed: u64,
    pub events_released: u64,
    pub sink_dispatches: u64,
    pub sink_errors: u64,
    pub cleanup_runs: u64,
    pub cleanup_rows_removed: u64,
    pub ingest_latency_mean_ms: f64,
    pub claim_latency_mean_ms: f64,
    pub dispatch_latency_mean_ms: f64,
    pub active_batches: u64,
    pub cache_probe_latency_ms: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            batches_received: self.batches_received.get(),
            events_received: self.events_received.get(),
            events_validated: self.events_validated.get(),
            events_failed_validation: self.events_failed_validation.get(),
            events_processed: self.events_processed.get(),
            events_duplicate: self.events_duplicate.get(),
            events_failed: self.events_failed.get(),
            events_released: self.events_released.get(),
            sink_dispatches: self.sink_dispatches.get(),
            sink_errors: self.sink_errors.get(),
            cleanup_runs: self.cleanup_runs.get(),
            cleanup_rows_removed: self.cleanup_rows_removed.get(),
            ingest_latency_mean_ms: self.ingest_latency_ms.mean(),
            claim_latency_mean_ms: self.claim_latency_ms.mean(),
            dispatch_latency_mean_ms: self.dispatch_latency_ms.mean(),
            active_batches: self.active_batches.get(),
            cache_probe_latency_ms: self.cache_probe_latency_ms.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
