//! End-to-end tests for the ingest pipeline.
//!
//! POST /ingest → orchestrator → coordinator (moka cache + SQLite ledger)
//! → MockSink (captures events). The MockSink implements the same
//! `EventSink` trait as the real HTTP sink, so every production code path
//! runs except the network transport.

use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};

#[tokio::test]
async fn batch_of_new_events_is_fully_processed() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let payload = fixtures::ingest_payload(&fixtures::test_project_id(), fixtures::span_events(5));

    let response = server
        .post("/ingest")
        .content_type("application/json")
        .bytes(payload.into())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "completed");
    assert_eq!(body["processed_events"], 5);
    assert_eq!(body["duplicate_events"], 0);
    assert_eq!(body["failed_events"], 0);
    assert!(body["batch_id"].as_str().is_some());
    assert!(body["processing_time_ms"].as_u64().is_some());

    assert_eq!(ctx.captured_event_count(), 5, "sink should see all 5 events");
}

#[tokio::test]
async fn intra_batch_duplicate_reports_first_occurrence_wins() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    // [A, B, A]: two occurrences of the same span identity.
    let a1 = fixtures::span_event_for("tr-1", "sp-a");
    let b = fixtures::span_event_for("tr-1", "sp-b");
    let a2 = fixtures::span_event_for("tr-1", "sp-a");
    let duplicate_id = a2["event_id"].as_str().unwrap().to_string();

    let payload = fixtures::ingest_payload(&fixtures::test_project_id(), vec![a1, b, a2]);

    let response = server
        .post("/ingest")
        .content_type("application/json")
        .bytes(payload.into())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["processed_events"], 2);
    assert_eq!(body["duplicate_events"], 1);
    assert_eq!(body["duplicate_event_ids"][0], duplicate_id.as_str());

    assert_eq!(ctx.captured_event_count(), 2, "the duplicate must not reach the sink");
}

#[tokio::test]
async fn client_retry_across_batches_is_deduplicated() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    let project = fixtures::test_project_id();

    let event = fixtures::span_event_for("tr-7", "sp-7");

    let first = server
        .post("/ingest")
        .content_type("application/json")
        .bytes(fixtures::ingest_payload(&project, vec![event.clone()]).into())
        .await;
    first.assert_status_ok();
    let body: serde_json::Value = first.json();
    assert_eq!(body["processed_events"], 1);

    // Network-level retry of the same batch.
    let second = server
        .post("/ingest")
        .content_type("application/json")
        .bytes(fixtures::ingest_payload(&project, vec![event]).into())
        .await;
    second.assert_status_ok();
    let body: serde_json::Value = second.json();
    assert_eq!(body["processed_events"], 0);
    assert_eq!(body["duplicate_events"], 1);
    assert_eq!(body["status"], "completed", "duplicates are not failures");

    assert_eq!(ctx.captured_event_count(), 1, "exactly one durable write");
}

#[tokio::test]
async fn mixed_event_types_flow_through() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let events = vec![
        fixtures::span_event(),
        fixtures::score_event("score-1"),
        fixtures::log_event(),
    ];
    let payload = fixtures::ingest_payload(&fixtures::test_project_id(), events);

    let response = server
        .post("/ingest")
        .content_type("application/json")
        .bytes(payload.into())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["processed_events"], 3);

    let captured = ctx.captured_events();
    let types: std::collections::HashSet<_> =
        captured.iter().map(|e| e.event_type.as_str()).collect();
    assert!(types.contains("span"));
    assert!(types.contains("score"));
    assert!(types.contains("log"));
}

#[tokio::test]
async fn dedup_disabled_processes_everything() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let event = fixtures::span_event_for("tr-1", "sp-a");
    let payload = fixtures::ingest_payload_with_config(
        &fixtures::test_project_id(),
        vec![event.clone(), event],
        serde_json::json!({"enabled": false}),
    );

    let response = server
        .post("/ingest")
        .content_type("application/json")
        .bytes(payload.into())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["processed_events"], 2, "bypass treats every event as claimed");
    assert_eq!(body["duplicate_events"], 0);
}

#[tokio::test]
async fn projects_do_not_share_fingerprints() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let event = fixtures::span_event_for("tr-1", "sp-a");

    let first = server
        .post("/ingest")
        .content_type("application/json")
        .bytes(fixtures::ingest_payload("proj-one", vec![event.clone()]).into())
        .await;
    first.assert_status_ok();

    let second = server
        .post("/ingest")
        .content_type("application/json")
        .bytes(fixtures::ingest_payload("proj-two", vec![event]).into())
        .await;
    second.assert_status_ok();
    let body: serde_json::Value = second.json();
    assert_eq!(
        body["processed_events"], 1,
        "same span identity in another tenant is a distinct event"
    );
}
