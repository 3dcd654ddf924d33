//! Router tests against deterministic fakes, driven with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use relay_server::{build_router, AppState};
use relay_tool_runtime::testing::{descriptor, FakeConnector, FakeToolSession, ScriptedModel};
use relay_tool_runtime::{ContentBlock, SessionError, SessionLifecycle};

async fn app(session: FakeToolSession, model: ScriptedModel, connect: bool) -> (Router, Arc<AppState>) {
    let connector = Arc::new(FakeConnector::new(Arc::new(session)));
    let mut lifecycle = SessionLifecycle::new(connector);
    if connect {
        lifecycle.connect("servers/files.py").await.unwrap();
    }
    let state = Arc::new(
        AppState::new(lifecycle, Arc::new(model), Some(4))
            .with_config_summary(json!({"profile": "default"})),
    );
    (build_router(state.clone()), state)
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_query(query: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/query")
        .header("content-type", "application/json")
        .body(Body::from(json!({"query": query}).to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_session_status() {
    let (router, _) = app(
        FakeToolSession::new().with_tool(descriptor("list_files")),
        ScriptedModel::new(),
        true,
    )
    .await;

    let (status, body) = send(router, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connected"], true);
    assert_eq!(body["tools"], 1);
}

#[tokio::test]
async fn tools_lists_catalog_in_order() {
    let (router, _) = app(
        FakeToolSession::new()
            .with_tool(descriptor("list_files"))
            .with_tool(descriptor("read_file")),
        ScriptedModel::new(),
        true,
    )
    .await;

    let (status, body) = send(router, get("/tools")).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["list_files", "read_file"]);
}

#[tokio::test]
async fn tools_without_session_is_unavailable() {
    let (router, _) = app(FakeToolSession::new(), ScriptedModel::new(), false).await;

    let (status, body) = send(router, get("/tools")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("Not connected"));
}

#[tokio::test]
async fn query_returns_whole_conversation() {
    let (router, _) = app(
        FakeToolSession::new()
            .with_tool(descriptor("list_files"))
            .with_output("list_files", json!([{"type": "text", "text": "a.txt"}])),
        ScriptedModel::new()
            .then_blocks(vec![ContentBlock::invocation("toolu_1", "list_files", json!({}))])
            .then_text("You have 1 file: a.txt"),
        true,
    )
    .await;

    let (status, body) = send(router, post_query("list my files")).await;

    assert_eq!(status, StatusCode::OK);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0], json!({"role": "user", "content": "list my files"}));
    assert_eq!(messages[1]["content"][0]["type"], "tool_invocation");
    assert_eq!(messages[2]["role"], "tool");
    assert_eq!(messages[2]["content"][0]["tool_use_id"], "toolu_1");
    assert_eq!(messages[3], json!({"role": "assistant", "content": "You have 1 file: a.txt"}));
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let (router, _) = app(FakeToolSession::new(), ScriptedModel::new(), true).await;

    let (status, body) = send(router, post_query("   ")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn query_without_session_is_unavailable() {
    let (router, _) = app(FakeToolSession::new(), ScriptedModel::new().then_text("x"), false).await;

    let (status, _) = send(router, post_query("hi")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn model_failure_is_bad_gateway() {
    let (router, _) = app(FakeToolSession::new(), ScriptedModel::new().then_fail("overloaded"), true).await;

    let (status, body) = send(router, post_query("hi")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.get("messages").is_none());
}

#[tokio::test]
async fn tool_failure_is_internal_error() {
    let (router, _) = app(
        FakeToolSession::new().with_failure("list_files", SessionError::Transport("broken pipe".into())),
        ScriptedModel::new().then_blocks(vec![ContentBlock::invocation("t1", "list_files", json!({}))]),
        true,
    )
    .await;

    let (status, body) = send(router, post_query("list my files")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("list_files"));
}

#[tokio::test]
async fn cycle_limit_applies_to_http_resolutions() {
    let mut model = ScriptedModel::new();
    for i in 0..10 {
        model = model.then_blocks(vec![ContentBlock::invocation(format!("t{i}"), "ping", json!({}))]);
    }
    let (router, _) = app(FakeToolSession::new().with_output("ping", json!("pong")), model, true).await;

    let (status, body) = send(router, post_query("loop forever")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains('4'));
}

#[tokio::test]
async fn config_is_served_redacted() {
    let (router, _) = app(FakeToolSession::new(), ScriptedModel::new(), true).await;

    let (status, body) = send(router, get("/config")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"profile": "default"}));
}

#[tokio::test]
async fn cleanup_flips_health() {
    let (router, state) = app(FakeToolSession::new(), ScriptedModel::new(), true).await;
    state.lifecycle.lock().await.cleanup().await;

    let (_, body) = send(router, get("/health")).await;

    assert_eq!(body["connected"], false);
    assert_eq!(body["tools"], 0);
}
