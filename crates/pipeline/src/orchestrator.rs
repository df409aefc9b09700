//! The batch ingestion orchestrator.
//!
//! One orchestrator instance serves any number of concurrent batches; steps
//! within one batch are sequential, batches interleave freely. Coordination
//! across batches happens entirely inside the claim stores.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use dedup::{ClaimDecision, DedupCoordinator};
use ingest_core::{
    default_fingerprint_fn, BatchRecord, BatchResponse, DeduplicationConfig, Error, EventOutcome,
    FingerprintFn, IngestRequest, Result, TelemetryEvent,
};
use sink::EventSink;
use telemetry::metrics;

use crate::config::OrchestratorConfig;
use crate::validate::{partition_events, validate_request};

/// Entry point of the write path.
pub struct BatchOrchestrator {
    coordinator: DedupCoordinator,
    sink: Arc<dyn EventSink>,
    fingerprint: FingerprintFn,
    config: OrchestratorConfig,
}

impl BatchOrchestrator {
    pub fn new(coordinator: DedupCoordinator, sink: Arc<dyn EventSink>, config: OrchestratorConfig) -> Self {
        Self {
            coordinator,
            sink,
            fingerprint: default_fingerprint_fn(),
            config,
        }
    }

    /// Replaces the fingerprint derivation (composite trace+span by default).
    pub fn with_fingerprint(mut self, fingerprint: FingerprintFn) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    /// Processes one batch: validate, claim, dispatch, aggregate.
    ///
    /// Per-event failures land in the response; only whole-batch failures
    /// (invalid request shape, both stores down, budget exceeded) return
    /// `Err`. The orchestrator never retries internally.
    pub async fn process_batch(&self, request: IngestRequest) -> Result<BatchResponse> {
        let start = Instant::now();
        metrics().batches_received.inc();
        metrics().events_received.inc_by(request.events.len() as u64);
        metrics().active_batches.inc();

        let result = self.run(request, start).await;
        metrics().active_batches.dec();

        match &result {
            Ok(response) => info!(
                batch_id = %response.batch_id,
                status = ?response.status,
                processed = response.processed_events,
                duplicates = response.duplicate_events,
                failed = response.failed_events,
                latency_ms = response.processing_time_ms,
                "Batch processed"
            ),
            Err(e) => warn!(error = %e, "Batch failed"),
        }

        result
    }

    async fn run(&self, request: IngestRequest, start: Instant) -> Result<BatchResponse> {
        // received → validating
        validate_request(&request.project_id, request.events.len())?;

        let mut record = BatchRecord::open(
            request.project_id.as_str(),
            request.environment(),
            request.events.len(),
        );
        let dedup_cfg = request
            .deduplication_config
            .clone()
            .unwrap_or_else(|| self.config.dedup.clone());

        let (valid, mut outcomes) =
            partition_events(&request.project_id, request.events, &self.fingerprint);
        metrics().events_validated.inc_by(valid.len() as u64);
        metrics().events_failed_validation.inc_by(outcomes.len() as u64);

        // claiming → dispatching, bounded by the batch budget. The deadline
        // is checked between store calls rather than by cancelling them, so
        // every claimed-but-undispatched fingerprint can be released.
        let deadline = start + self.config.batch_timeout();
        let mut dispatched = self
            .claim_and_dispatch(&record, &valid, &dedup_cfg, deadline)
            .await?;
        outcomes.append(&mut dispatched);

        // aggregating
        record.finalize(&outcomes);
        let elapsed = start.elapsed().as_millis() as u64;
        metrics().ingest_latency_ms.observe(elapsed);

        Ok(BatchResponse::from_outcomes(&record, &outcomes, elapsed))
    }

    async fn claim_and_dispatch(
        &self,
        record: &BatchRecord,
        valid: &[TelemetryEvent],
        cfg: &DeduplicationConfig,
        deadline: Instant,
    ) -> Result<Vec<EventOutcome>> {
        let project_id = record.project_id.as_str();
        let fingerprints: Vec<String> = valid
            .iter()
            .map(|event| (self.fingerprint)(project_id, event))
            .collect();

        let decisions: Vec<ClaimDecision> = if cfg.enabled {
            let claim_start = Instant::now();
            let partition = self
                .coordinator
                .claim_events(project_id, record.batch_id, &fingerprints, cfg.ttl(), cfg.use_cache)
                .await?;
            metrics()
                .claim_latency_ms
                .observe(claim_start.elapsed().as_millis() as u64);

            if cfg.fail_on_duplicate && partition.duplicate_count() > 0 {
                self.release(&partition.claimed()).await;
                return Err(Error::duplicate_rejected(format!(
                    "batch {} contains {} duplicate events",
                    record.batch_id,
                    partition.duplicate_count()
                )));
            }

            partition.decisions
        } else {
            // Dedup bypassed: every event proceeds, nothing is claimed.
            fingerprints
                .iter()
                .map(|fingerprint| ClaimDecision {
                    fingerprint: fingerprint.clone(),
                    claimed: true,
                })
                .collect()
        };

        // Claims this batch owns that have not reached the sink yet. On a
        // blown budget these are exactly the claims that must be released.
        let mut outstanding: Vec<String> = decisions
            .iter()
            .filter(|d| d.claimed)
            .map(|d| d.fingerprint.clone())
            .collect();
        if cfg.enabled && Instant::now() >= deadline {
            return self.fail_on_timeout(record, outstanding).await;
        }

        let mut outcomes = Vec::with_capacity(valid.len());
        for (event, decision) in valid.iter().zip(decisions) {
            if !decision.claimed {
                metrics().events_duplicate.inc();
                outcomes.push(EventOutcome::duplicate(
                    event.event_id.clone(),
                    event.event_type,
                    decision.fingerprint,
                ));
                continue;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return self.fail_on_timeout(record, outstanding).await;
            }

            let dispatch_start = Instant::now();
            metrics().sink_dispatches.inc();

            let dispatch = tokio::time::timeout(remaining, self.sink.process(project_id, event));
            match dispatch.await {
                Ok(Ok(())) => {
                    metrics()
                        .dispatch_latency_ms
                        .observe(dispatch_start.elapsed().as_millis() as u64);
                    metrics().events_processed.inc();
                    outstanding.retain(|f| f != &decision.fingerprint);
                    outcomes.push(EventOutcome::processed(
                        event.event_id.clone(),
                        event.event_type,
                        decision.fingerprint,
                    ));
                }
                Ok(Err(sink_err)) => {
                    metrics().sink_errors.inc();
                    metrics().events_failed.inc();

                    if cfg.enabled {
                        // Undo the claim so a legitimate retry is not
                        // misclassified as a duplicate.
                        self.release(std::slice::from_ref(&decision.fingerprint)).await;
                    }
                    outstanding.retain(|f| f != &decision.fingerprint);

                    outcomes.push(EventOutcome::failed(
                        event.event_id.clone(),
                        event.event_type,
                        decision.fingerprint,
                        sink_err.error_code.clone(),
                        sink_err.message.clone(),
                        sink_err.retryable,
                    ));
                }
                Err(_elapsed) => {
                    return self.fail_on_timeout(record, outstanding).await;
                }
            }
        }

        Ok(outcomes)
    }

    /// Releases every claim the batch still owns and surfaces the timeout.
    async fn fail_on_timeout(&self, record: &BatchRecord, outstanding: Vec<String>) -> Result<Vec<EventOutcome>> {
        self.release(&outstanding).await;
        Err(Error::timeout(format!(
            "batch {} exceeded {}ms budget",
            record.batch_id, self.config.batch_timeout_ms
        )))
    }

    async fn release(&self, fingerprints: &[String]) {
        if fingerprints.is_empty() {
            return;
        }
        match self.coordinator.release_events(fingerprints).await {
            Ok(()) => metrics().events_released.inc_by(fingerprints.len() as u64),
            Err(e) => warn!(
                count = fingerprints.len(),
                error = %e,
                "failed to release claims; they expire by TTL"
            ),
        }
    }
}
