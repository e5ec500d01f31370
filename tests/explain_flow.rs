//! End-to-end routing tests against a mock explanation backend

use clarity_assistant::config::BackendConfig;
use clarity_assistant::explain::cache::DEFAULT_TTL;
use clarity_assistant::explain::{
    ExplainBackend, HttpBackend, MemoryStore, MessageRouter, ResultCache,
};
use mockito::Matcher;
use serde_json::{json, Value};
use std::sync::Arc;

fn router_for(url: String) -> MessageRouter {
    let backend = HttpBackend::new(&BackendConfig { url, timeout_ms: None }).unwrap();
    let cache = ResultCache::new(Arc::new(MemoryStore::new()), DEFAULT_TTL);
    MessageRouter::new(Arc::new(backend), cache)
}

async fn route(router: &MessageRouter, message: Value) -> Value {
    serde_json::to_value(router.handle(message).await).unwrap()
}

#[tokio::test]
async fn test_explain_miss_then_cache_hit() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/explain")
        .match_body(Matcher::PartialJson(json!({
            "text": "def f(): pass",
            "mode": "code",
            "action": "analyze"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"type":"code","summary":"Defines an empty function.","actions":[],"followups":[]}"#)
        .expect(1)
        .create_async()
        .await;

    let router = router_for(format!("{}/api/explain", server.url()));
    let message = json!({"type": "EXPLAIN_REQUEST", "text": "def f(): pass", "action": "explain"});

    let first = route(&router, message.clone()).await;
    assert_eq!(first["ok"], json!(true));
    assert_eq!(first["summary"], json!("Defines an empty function."));
    assert!(first.get("fromCache").is_none());
    assert!(router
        .cache()
        .get("explain:def f(): pass:mode:code:analyze")
        .await
        .is_some());

    let second = route(&router, message).await;
    assert_eq!(second["ok"], json!(true));
    assert_eq!(second["fromCache"], json!(true));
    assert_eq!(second["summary"], json!("Defines an empty function."));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_followups_are_flattened() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/explain")
        .with_status(200)
        .with_body(r#"{"summary":"s","followups":[{"question":"Why?"},"Because"]}"#)
        .create_async()
        .await;

    let router = router_for(format!("{}/api/explain", server.url()));
    let reply = route(
        &router,
        json!({"type": "EXPLAIN_REQUEST", "text": "The sky is blue", "context": {"url": "https://a.example", "title": "A"}}),
    )
    .await;

    assert_eq!(reply["ok"], json!(true));
    assert_eq!(reply["followups"], json!(["Why?", "Because"]));
    assert_eq!(reply["original_text"], json!("The sky is blue"));
    assert_eq!(reply["original_url"], json!("https://a.example"));
    assert_eq!(reply["original_title"], json!("A"));
}

#[tokio::test]
async fn test_non_json_response_is_reported_and_not_cached() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/explain")
        .with_status(500)
        .with_body("Internal Server Error")
        .expect(2)
        .create_async()
        .await;

    let router = router_for(format!("{}/api/explain", server.url()));
    let message = json!({"type": "EXPLAIN_REQUEST", "text": "anything"});

    let reply = route(&router, message.clone()).await;
    assert_eq!(
        reply,
        json!({"ok": false, "error": "non-json-response", "trace": "Internal Server Error"})
    );

    // not cached: the second request reaches the backend again
    let reply = route(&router, message).await;
    assert_eq!(reply["ok"], json!(false));
    assert_eq!(router.cache().len().await, 0);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_backend_reported_error_passes_through() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/explain")
        .with_status(200)
        .with_body(r#"{"error":"model_call_failed","trace":"HTTP 401","summary":"fallback"}"#)
        .create_async()
        .await;

    let router = router_for(format!("{}/api/explain", server.url()));
    let reply = route(&router, json!({"type": "EXPLAIN_REQUEST", "text": "x"})).await;

    assert_eq!(reply, json!({"ok": false, "error": "model_call_failed", "trace": "HTTP 401"}));
}

#[tokio::test]
async fn test_network_error() {
    let router = router_for("http://127.0.0.1:1/api/explain".to_string());
    let reply = route(&router, json!({"type": "EXPLAIN_REQUEST", "text": "x"})).await;

    assert_eq!(reply["ok"], json!(false));
    assert_eq!(reply["error"], json!("network_error"));
    assert!(reply["trace"].is_string());
}

#[tokio::test]
async fn test_action_invoke_brainstorm() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/explain")
        .match_body(Matcher::Regex("Brainstorm 3 short ideas".to_string()))
        .with_status(200)
        .with_body(r#"{"ideas":["Try A","Try B","Try C"]}"#)
        .create_async()
        .await;

    let router = router_for(format!("{}/api/explain", server.url()));
    let reply = route(
        &router,
        json!({
            "type": "ACTION_INVOKE",
            "idx": 0,
            "actions": [{"title": "Brainstorm", "importance": 3, "cmd": "brainstorm:3"}],
            "original_text": "Plan a team offsite",
            "action_cmd": "brainstorm:3"
        }),
    )
    .await;

    assert_eq!(
        reply,
        json!({
            "ok": true,
            "followup_answer": "Try A\nTry B\nTry C",
            "message": "Try A\nTry B\nTry C"
        })
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_raw_backend_call() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/explain")
        .match_header("content-type", "application/json")
        .with_status(200)
        .with_body(r#""just a string""#)
        .create_async()
        .await;

    let backend = HttpBackend::new(&BackendConfig {
        url: format!("{}/api/explain", server.url()),
        timeout_ms: Some(5_000),
    })
    .unwrap();

    let payload = clarity_assistant::explain::BackendPayload {
        text: "t".to_string(),
        mode: clarity_assistant::explain::Mode::General,
        action: None,
        followup: None,
        context: None,
    };
    let reply = backend.call(&payload).await;
    assert_eq!(
        reply,
        clarity_assistant::explain::BackendReply::Unstructured(json!("just a string"))
    );
}
