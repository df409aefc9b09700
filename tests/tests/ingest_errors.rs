//! Error handling tests for the ingest endpoint.

use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};

#[tokio::test]
async fn malformed_json_is_rejected() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server
        .post("/ingest")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(ctx.captured_event_count(), 0);
}

#[tokio::test]
async fn empty_project_id_is_a_batch_level_error() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let payload = fixtures::ingest_payload("", fixtures::span_events(1));
    let response = server
        .post("/ingest")
        .content_type("application/json")
        .bytes(payload.into())
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn oversized_batch_is_rejected() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let payload = fixtures::ingest_payload(&fixtures::test_project_id(), fixtures::span_events(1001));
    let response = server
        .post("/ingest")
        .content_type("application/json")
        .bytes(payload.into())
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_004");
}

#[tokio::test]
async fn invalid_events_fail_without_blocking_the_rest() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let valid = fixtures::span_event();
    let missing_trace = serde_json::json!({
        "event_id": "bad-1",
        "event_type": "log",
        "payload": {},
        "trace_id": "",
    });
    let missing_span = serde_json::json!({
        "event_id": "bad-2",
        "event_type": "span",
        "payload": {},
        "trace_id": "tr-1",
    });

    let payload = fixtures::ingest_payload(
        &fixtures::test_project_id(),
        vec![valid, missing_trace, missing_span],
    );
    let response = server
        .post("/ingest")
        .content_type("application/json")
        .bytes(payload.into())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "partial");
    assert_eq!(body["processed_events"], 1);
    assert_eq!(body["failed_events"], 2);

    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    let codes: Vec<&str> = errors.iter().map(|e| e["error_code"].as_str().unwrap()).collect();
    assert!(codes.contains(&"VALID_002"));
    assert!(codes.contains(&"VALID_003"));
    assert!(errors.iter().all(|e| e["retryable"] == false));

    assert_eq!(ctx.captured_event_count(), 1, "invalid events never reach the sink");
}

#[tokio::test]
async fn sink_failure_is_partial_and_retryable() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let failing = fixtures::span_event_for("tr-1", "sp-fail");
    let failing_id = failing["event_id"].as_str().unwrap().to_string();
    ctx.mock_sink.fail_event(&failing_id);

    let payload = fixtures::ingest_payload(
        &fixtures::test_project_id(),
        vec![failing, fixtures::span_event_for("tr-1", "sp-ok")],
    );
    let response = server
        .post("/ingest")
        .content_type("application/json")
        .bytes(payload.into())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "partial");
    assert_eq!(body["processed_events"], 1);
    assert_eq!(body["failed_events"], 1);
    assert_eq!(body["errors"][0]["event_id"], failing_id.as_str());
    assert_eq!(body["errors"][0]["error_code"], "SINK_002");
    assert_eq!(body["errors"][0]["retryable"], true);
}

#[tokio::test]
async fn sink_failure_releases_the_claim_for_retry() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    let project = fixtures::test_project_id();

    let event = fixtures::span_event_for("tr-z", "sp-z");
    let event_id = event["event_id"].as_str().unwrap().to_string();
    ctx.mock_sink.fail_event(&event_id);

    let first = server
        .post("/ingest")
        .content_type("application/json")
        .bytes(fixtures::ingest_payload(&project, vec![event]).into())
        .await;
    first.assert_status_ok();
    let body: serde_json::Value = first.json();
    assert_eq!(body["failed_events"], 1);

    // The failure released the claim: the retry must process, not skip.
    let retry_event = fixtures::span_event_for("tr-z", "sp-z");
    let retry = server
        .post("/ingest")
        .content_type("application/json")
        .bytes(fixtures::ingest_payload(&project, vec![retry_event]).into())
        .await;
    retry.assert_status_ok();
    let body: serde_json::Value = retry.json();
    assert_eq!(body["processed_events"], 1);
    assert_eq!(body["duplicate_events"], 0, "release-on-failure must reopen the claim");
}

#[tokio::test]
async fn fail_on_duplicate_turns_duplicates_into_batch_failure() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    let project = fixtures::test_project_id();

    let event = fixtures::span_event_for("tr-9", "sp-9");
    server
        .post("/ingest")
        .content_type("application/json")
        .bytes(fixtures::ingest_payload(&project, vec![event.clone()]).into())
        .await
        .assert_status_ok();

    let payload = fixtures::ingest_payload_with_config(
        &project,
        vec![event],
        serde_json::json!({"fail_on_duplicate": true}),
    );
    let response = server
        .post("/ingest")
        .content_type("application/json")
        .bytes(payload.into())
        .await;

    response.assert_status(axum::http::StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "DUP_001");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn whole_batch_sink_outage_fails_every_event() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    ctx.set_sink_failure(true);

    let payload = fixtures::ingest_payload(&fixtures::test_project_id(), fixtures::span_events(3));
    let response = server
        .post("/ingest")
        .content_type("application/json")
        .bytes(payload.into())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "failed");
    assert_eq!(body["failed_events"], 3);
    assert!(body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .all(|e| e["retryable"] == true));
}
