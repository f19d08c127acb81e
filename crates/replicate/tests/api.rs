//! Integration tests for [`PredictionApi`] against an in-process HTTP
//! service bound to an ephemeral port.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use imagegen_core::config::ServiceConfig;
use imagegen_core::outcome::FailureKind;
use imagegen_replicate::api::{JobClientError, PredictionApi};
use imagegen_replicate::messages::JobState;
use imagegen_replicate::service::JobService;

type Captured = Arc<Mutex<Vec<Value>>>;

async fn spawn_service(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}")
}

fn api_for(base_url: String) -> PredictionApi {
    let config = ServiceConfig {
        base_url,
        model: "black-forest-labs/flux-schnell".into(),
        version: "v1".into(),
        request_timeout: Duration::from_secs(5),
    };
    PredictionApi::new(&config).expect("client should build")
}

fn submit_router(response: Value, captured: Captured) -> Router {
    Router::new()
        .route(
            "/api/prediction",
            post(
                move |State(captured): State<Captured>, Json(body): Json<Value>| async move {
                    captured.lock().unwrap().push(body);
                    Json(response)
                },
            ),
        )
        .with_state(captured)
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_sends_model_version_and_prompt() {
    let captured: Captured = Arc::default();
    let url = spawn_service(submit_router(json!({"id": "abc"}), captured.clone())).await;
    let api = api_for(url);

    let id = api.submit_prediction("a \"cat\" on a mat").await.unwrap();

    assert_eq!(id, "abc");
    let bodies = captured.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["model"], "black-forest-labs/flux-schnell");
    assert_eq!(bodies[0]["version"], "v1");
    assert_eq!(bodies[0]["input"]["prompt"], "a \"cat\" on a mat");
}

#[tokio::test]
async fn blank_id_is_empty_id_error() {
    let url = spawn_service(submit_router(json!({"id": "  "}), Arc::default())).await;
    let api = api_for(url);

    let err = api.submit_prediction("a cat").await.unwrap_err();

    assert_matches!(err, JobClientError::EmptyId);
    assert_eq!(err.kind(), FailureKind::EmptyId);
}

#[tokio::test]
async fn missing_id_field_is_empty_id_error() {
    let url = spawn_service(submit_router(json!({"detail": "accepted"}), Arc::default())).await;
    let api = api_for(url);

    let err = api.submit_prediction("a cat").await.unwrap_err();
    assert_matches!(err, JobClientError::EmptyId);
}

#[tokio::test]
async fn non_json_body_is_decode_error() {
    let router = Router::new().route("/api/prediction", post(|| async { "<html>oops</html>" }));
    let api = api_for(spawn_service(router).await);

    let err = api.submit_prediction("a cat").await.unwrap_err();

    assert_matches!(err, JobClientError::Decode { ref body, .. } if body.contains("oops"));
    assert_eq!(err.kind(), FailureKind::Transport);
}

#[tokio::test]
async fn error_status_is_api_error_with_body() {
    let router = Router::new().route(
        "/api/prediction",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    );
    let api = api_for(spawn_service(router).await);

    let err = api.submit_prediction("a cat").await.unwrap_err();

    assert_matches!(err, JobClientError::Api { status: 429, ref body } if body == "slow down");
    assert_eq!(err.kind(), FailureKind::Transport);
}

#[tokio::test]
async fn connection_refused_is_request_error() {
    // Bind then drop to obtain a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = api_for(format!("http://{addr}"));
    let err = api.submit_prediction("a cat").await.unwrap_err();

    assert_matches!(err, JobClientError::Request(_));
    assert_eq!(err.kind(), FailureKind::Transport);
}

// ---------------------------------------------------------------------------
// Fetch status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_status_passes_id_and_decodes_outputs() {
    let router = Router::new().route(
        "/api/poll",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            match params.get("id").map(String::as_str) {
                Some("abc") => Json(json!({
                    "status": "succeeded",
                    "output": ["http://x/1.png", "http://x/2.png"],
                })),
                _ => Json(json!({"status": "failed", "error": "unknown id"})),
            }
        }),
    );
    let api = api_for(spawn_service(router).await);

    let status = JobService::fetch_status(&api, "abc").await.unwrap();

    assert_eq!(status.state, JobState::Succeeded);
    assert_eq!(status.outputs, vec!["http://x/1.png", "http://x/2.png"]);
    assert!(status.error.is_none());
}

#[tokio::test]
async fn fetch_status_decodes_failure_text() {
    let router = Router::new().route(
        "/api/poll",
        get(|| async { Json(json!({"status": "failed", "output": [], "error": "quota exceeded"})) }),
    );
    let api = api_for(spawn_service(router).await);

    let status = api.fetch_status("abc").await.unwrap();

    assert_eq!(status.state, JobState::Failed);
    assert_eq!(status.error.as_deref(), Some("quota exceeded"));
}

#[tokio::test]
async fn fetch_status_without_status_field_is_decode_error() {
    let router = Router::new().route("/api/poll", get(|| async { Json(json!({"output": []})) }));
    let api = api_for(spawn_service(router).await);

    let err = api.fetch_status("abc").await.unwrap_err();
    assert_matches!(err, JobClientError::Decode { .. });
}

#[tokio::test]
async fn trailing_slash_in_base_url_is_ignored() {
    let captured: Captured = Arc::default();
    let url = spawn_service(submit_router(json!({"id": "xyz"}), captured)).await;
    let api = api_for(format!("{url}/"));

    assert_eq!(api.base_url(), url);
    assert_eq!(JobService::submit(&api, "a cat").await.unwrap(), "xyz");
}
