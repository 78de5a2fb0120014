//! Integration tests for HttpClient.
//!
//! Uses wiremock for HTTP mocking. Covers request shapes for every API
//! operation and the status mapping (401/403/404/5xx, upload timeout).

use std::time::Duration;

use casesync_reporter::{
    ApiError, CaseResult, HttpClient, NewRun, ReporterConfig, ResultStatus, RunId, TestOpsApi,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(mock_server: &MockServer) -> ReporterConfig {
    ReporterConfig::new("test-token", "DEMO", "Nightly").with_api_url(mock_server.uri())
}

fn client(mock_server: &MockServer) -> HttpClient {
    HttpClient::new(&config(mock_server)).expect("failed to create client")
}

fn new_run() -> NewRun {
    NewRun {
        title: "Nightly".into(),
        is_autotest: true,
        tags: vec!["ci".into()],
    }
}

#[tokio::test]
async fn test_get_project_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/project/DEMO"))
        .and(header("token", "test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "result": { "code": "DEMO", "title": "Demo project" }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let project = client(&mock_server).get_project("DEMO").await.expect("lookup failed");
    assert_eq!(project.code, "DEMO");
    assert_eq!(project.title, "Demo project");
}

#[tokio::test]
async fn test_get_project_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/project/NOPE"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": false,
            "errorMessage": "Project not found"
        })))
        .mount(&mock_server)
        .await;

    let result = client(&mock_server).get_project("NOPE").await;
    assert!(matches!(result, Err(ApiError::NotFound { .. })));
}

#[tokio::test]
async fn test_unauthorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/project/DEMO"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status": false,
            "errorMessage": "Unauthenticated."
        })))
        .mount(&mock_server)
        .await;

    match client(&mock_server).get_project("DEMO").await {
        Err(ApiError::Unauthorized { message }) => assert_eq!(message, "Unauthenticated."),
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_run_request_shape() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/run/DEMO"))
        .and(body_json(json!({
            "title": "Nightly",
            "is_autotest": true,
            "tags": ["ci"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "result": { "id": 17 }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let run_id = client(&mock_server).create_run("DEMO", &new_run()).await.expect("create failed");
    assert_eq!(run_id, RunId(17));
}

#[tokio::test]
async fn test_create_run_active_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/run/DEMO"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "status": false,
            "errorMessage": "You have reached the limit of active runs for your plan"
        })))
        .mount(&mock_server)
        .await;

    let result = client(&mock_server).create_run("DEMO", &new_run()).await;
    assert!(matches!(result, Err(ApiError::ActiveRunLimit { .. })));
}

#[tokio::test]
async fn test_forbidden_without_limit_marker() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/run/DEMO"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden for this token"))
        .mount(&mock_server)
        .await;

    match client(&mock_server).create_run("DEMO", &new_run()).await {
        Err(ApiError::Status { status, message }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "Forbidden for this token");
        }
        other => panic!("expected Status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_list_active_runs() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/run/DEMO"))
        .and(query_param("status", "active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "result": {
                "total": 2,
                "entities": [
                    { "id": 3, "title": "stale one" },
                    { "id": 4, "title": "stale two" }
                ]
            }
        })))
        .mount(&mock_server)
        .await;

    let runs = client(&mock_server).list_active_runs("DEMO").await.expect("list failed");
    let ids: Vec<RunId> = runs.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![RunId(3), RunId(4)]);
}

#[tokio::test]
async fn test_upload_results_bulk_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/result/DEMO/9/bulk"))
        .and(body_json(json!({
            "cases": [
                { "case_title": "math adds", "suite_title": "math", "status": "passed", "time_ms": 3 },
                { "case_title": "math divides", "status": "failed", "stacktrace": "boom" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": true })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let results = vec![
        CaseResult {
            case_title: "math adds".into(),
            suite_title: Some("math".into()),
            status: ResultStatus::Passed,
            time_ms: Some(3),
            stacktrace: None,
        },
        CaseResult {
            case_title: "math divides".into(),
            suite_title: None,
            status: ResultStatus::Failed,
            time_ms: None,
            stacktrace: Some("boom".into()),
        },
    ];

    client(&mock_server)
        .upload_results("DEMO", RunId(9), &results)
        .await
        .expect("upload failed");
}

#[tokio::test]
async fn test_upload_uses_upload_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/result/DEMO/9/bulk"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let config = config(&mock_server).with_upload_timeout(Duration::from_millis(100));
    let client = HttpClient::new(&config).expect("failed to create client");
    let result = client.upload_results("DEMO", RunId(9), &[]).await;

    assert!(matches!(result, Err(ApiError::Network(_))));
}

#[tokio::test]
async fn test_complete_run_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/run/DEMO/9/complete"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "database down" })))
        .mount(&mock_server)
        .await;

    match client(&mock_server).complete_run("DEMO", RunId(9)).await {
        Err(ApiError::Status { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "database down");
        }
        other => panic!("expected Status error, got {other:?}"),
    }
}
