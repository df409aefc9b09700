//! Health and metrics endpoint tests.

use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};
use worker::probe_components;

#[tokio::test]
async fn health_reports_component_status() {
    let ctx = TestContext::new();
    probe_components(&ctx.coordinator, ctx.mock_sink.as_ref()).await;

    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["ledger_connected"], true);
    assert_eq!(body["claim_cache_connected"], true);
    assert_eq!(body["sink_connected"], true);
    assert!(body["queue_depth"].as_u64().is_some());
    assert!(body["cache_probe_latency_ms"].as_u64().is_some());
}

#[tokio::test]
async fn readiness_follows_the_ledger() {
    let ctx = TestContext::new();
    probe_components(&ctx.coordinator, ctx.mock_sink.as_ref()).await;

    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    server.get("/health/ready").await.assert_status_ok();
    server.get("/health/live").await.assert_status_ok();
}

#[tokio::test]
async fn metrics_snapshot_is_exposed() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    // Generate some traffic first.
    let payload = fixtures::ingest_payload(&fixtures::test_project_id(), fixtures::span_events(2));
    server
        .post("/ingest")
        .content_type("application/json")
        .bytes(payload.into())
        .await
        .assert_status_ok();

    let response = server.get("/metrics").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    // Metrics are process-global, so other tests contribute; assert floor.
    assert!(body["batches_received"].as_u64().unwrap() >= 1);
    assert!(body["events_received"].as_u64().unwrap() >= 2);
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn dedup_stats_are_exposed_per_project() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let payload = fixtures::ingest_payload("proj-stats", fixtures::span_events(3));
    server
        .post("/ingest")
        .content_type("application/json")
        .bytes(payload.into())
        .await
        .assert_status_ok();

    let response = server.get("/metrics/dedup").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let entry = body
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["project_id"] == "proj-stats")
        .expect("stats for proj-stats");
    assert_eq!(entry["total_checks"], 3);
    assert_eq!(entry["duplicates_found"], 0);
}
