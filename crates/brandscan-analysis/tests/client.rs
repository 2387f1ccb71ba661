//! Integration tests for `AnalysisClient` using wiremock HTTP mocks.

use brandscan_analysis::{AnalysisClient, AnalysisError, RunStatus};
use brandscan_core::JobHandle;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> AnalysisClient {
    AnalysisClient::with_base_url("test-key", "asst_123", &format!("{base_url}/v1"))
        .expect("client construction should not fail")
        .with_retry_policy(2, 0)
}

fn handle() -> JobHandle {
    JobHandle {
        thread_id: "thread_abc".to_owned(),
        run_id: "run_xyz".to_owned(),
    }
}

#[tokio::test]
async fn submit_creates_thread_and_run() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/threads/runs"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("openai-beta", "assistants=v2"))
        .and(body_partial_json(json!({ "assistant_id": "asst_123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_xyz",
            "thread_id": "thread_abc",
            "status": "queued"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let handle = client
        .submit(&json!({ "brand_name": "Acme" }))
        .await
        .expect("submission should succeed");

    assert_eq!(handle.thread_id, "thread_abc");
    assert_eq!(handle.run_id, "run_xyz");
}

#[tokio::test]
async fn submit_is_not_resent_after_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/threads/runs"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "message": "internal error" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .submit(&json!({}))
        .await
        .unwrap_err();

    match err {
        AnalysisError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "internal error");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn run_status_maps_remote_states() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/threads/thread_abc/runs/run_xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_xyz",
            "thread_id": "thread_abc",
            "status": "failed",
            "last_error": { "code": "rate_limit_exceeded", "message": "quota exhausted" }
        })))
        .mount(&server)
        .await;

    let status = test_client(&server.uri())
        .run_status(&handle())
        .await
        .expect("status should parse");
    assert_eq!(status, RunStatus::Failed("quota exhausted".to_owned()));
}

#[tokio::test]
async fn run_status_retries_transient_failures() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/threads/thread_abc/runs/run_xyz"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/threads/thread_abc/runs/run_xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_xyz",
            "thread_id": "thread_abc",
            "status": "in_progress"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let status = test_client(&server.uri())
        .run_status(&handle())
        .await
        .expect("second attempt should succeed");
    assert_eq!(status, RunStatus::Running);
}

#[tokio::test]
async fn fetch_output_parses_fenced_assistant_reply() {
    let server = MockServer::start().await;

    let reply = "```json\n{\"search_visibility_score\": 81, \"summary\": \"Strong.\"}\n```";
    Mock::given(method("GET"))
        .and(path("/v1/threads/thread_abc/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "role": "assistant", "content": [{ "type": "text", "text": { "value": reply } }] },
                { "role": "user", "content": [{ "type": "text", "text": { "value": "{}" } }] }
            ]
        })))
        .mount(&server)
        .await;

    let output = test_client(&server.uri())
        .fetch_output(&handle())
        .await
        .expect("output should parse");
    assert_eq!(output["search_visibility_score"], 81);
    assert_eq!(output["summary"], "Strong.");
}

#[tokio::test]
async fn fetch_output_without_assistant_message_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/threads/thread_abc/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .fetch_output(&handle())
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::EmptyOutput));
}

#[tokio::test]
async fn fetch_output_rejects_prose_reply() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/threads/thread_abc/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "role": "assistant", "content": [
                { "type": "text", "text": { "value": "Sorry, I cannot help with that." } }
            ] }]
        })))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .fetch_output(&handle())
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::UnparseableOutput(_)));
}
