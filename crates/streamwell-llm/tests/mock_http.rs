//! Mock HTTP server tests for the streaming client.
//!
//! Uses [`wiremock`] to serve OpenAI-compatible `text/event-stream`
//! bodies, exercising the full path from `reqwest` through decoding,
//! failover, and resume.
//!
//! Coverage:
//! - Reasoning then answer, end to end
//! - Auth and content headers sent
//! - 500 fails over to the next provider
//! - 401 is neither retried nor failed over
//! - 429 with a `retry-after` header
//! - Slow response headers hit the connect timeout
//! - Resume appends to saved text

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use streamwell_llm::{ResumableStateStore, StreamClient, StreamError, TimeoutKind};
use streamwell_platform::MemoryStore;
use streamwell_types::{
    ClientConfig, ConversationWindow, ProgressUpdate, ProviderConfig, ProviderId, StreamAggregate,
    Turn,
};

const CHAT_PATH: &str = "/v1/chat/completions";

/// A config with only the given providers carrying keys.
fn config(providers: &[(ProviderId, &MockServer)]) -> ClientConfig {
    let mut config = ClientConfig {
        providers: providers
            .iter()
            .map(|(id, server)| {
                ProviderConfig::new(*id, format!("{}{CHAT_PATH}", server.uri()), "test-model")
                    .with_api_key(format!("sk-{}", id.as_str()))
            })
            .collect(),
        ..ClientConfig::default()
    }
    .with_builtin_providers();
    for p in &mut config.providers {
        if !providers.iter().any(|(id, _)| *id == p.id) {
            p.api_key = Default::default();
        }
    }
    config.request.retry_times = 1;
    config.request.retry_delay_ms = 0;
    config.request.update_interval_ms = 10;
    config
}

fn client(config: ClientConfig) -> (StreamClient, Arc<MemoryStore>) {
    let kv = Arc::new(MemoryStore::new());
    (StreamClient::with_http(config, kv.clone()), kv)
}

fn sse(frames: &[serde_json::Value]) -> String {
    let mut body = String::new();
    for f in frames {
        body.push_str(&format!("data: {f}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn content(text: &str) -> serde_json::Value {
    json!({"choices": [{"delta": {"content": text}}]})
}

fn stream_ok(frames: &[serde_json::Value]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(sse(frames), "text/event-stream")
}

fn window(text: &str) -> ConversationWindow {
    ConversationWindow::new("s1", vec![Turn::user(text)], 10)
}

// ── Successful generation ──────────────────────────────────────────────

#[tokio::test]
async fn reasoning_then_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(header("Authorization", "Bearer sk-ark"))
        .and(header("Content-Type", "application/json"))
        .and(header("Accept", "text/event-stream"))
        .and(body_partial_json(json!({"stream": true, "model": "test-model"})))
        .respond_with(stream_ok(&[
            json!({"choices": [{"delta": {"reasoning_content": "thinking..."}}]}),
            content("4"),
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let (client, kv) = client(config(&[(ProviderId::Ark, &server)]));
    let mut updates: Vec<ProgressUpdate> = Vec::new();
    let out = client
        .generate(&window("2+2?"), |u| updates.push(u))
        .await
        .unwrap();

    assert_eq!(out.content, "4");
    assert_eq!(out.reasoning, "thinking...");
    assert_eq!(out.provider, ProviderId::Ark);
    assert!(updates.last().unwrap().done);
    assert_eq!(updates.iter().filter(|u| u.done).count(), 1);
    // Success leaves no saved state behind.
    assert!(kv.is_empty());
}

// ── Failover ───────────────────────────────────────────────────────────

#[tokio::test]
async fn server_error_fails_over() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_partial_json(json!({"stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&secondary)
        .await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(stream_ok(&[content("from backup")]))
        .expect(1)
        .mount(&secondary)
        .await;

    let (client, _) = client(config(&[
        (ProviderId::Ark, &primary),
        (ProviderId::SiliconFlow, &secondary),
    ]));
    let out = client.generate(&window("hi"), |_| {}).await.unwrap();
    assert_eq!(out.provider, ProviderId::SiliconFlow);
    assert_eq!(out.content, "from backup");

    let ark = client
        .health_snapshot()
        .into_iter()
        .find(|s| s.provider == ProviderId::Ark)
        .unwrap();
    assert!(ark.in_cooldown);
    assert_eq!(ark.failures, 1);
}

#[tokio::test]
async fn auth_failure_is_not_retried() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": {"message": "Invalid API key"}})),
        )
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("POST"))
        .respond_with(stream_ok(&[content("unused")]))
        .expect(0)
        .mount(&secondary)
        .await;

    let (client, _) = client(config(&[
        (ProviderId::Ark, &primary),
        (ProviderId::SiliconFlow, &secondary),
    ]));
    let err = client.generate(&window("hi"), |_| {}).await.unwrap_err();
    match err {
        StreamError::Auth { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid API key");
        }
        other => panic!("expected Auth, got {other:?}"),
    }
}

#[tokio::test]
async fn rate_limit_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "2")
                .set_body_string("slow down"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client(config(&[(ProviderId::Ark, &server)]));
    let err = client.generate(&window("hi"), |_| {}).await.unwrap_err();
    match err {
        StreamError::Exhausted { attempts, last } => {
            assert_eq!(attempts, 1);
            assert!(matches!(
                *last,
                StreamError::RateLimited {
                    retry_after_ms: 2000
                }
            ));
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_headers_hit_connect_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(stream_ok(&[content("late")]).set_delay(std::time::Duration::from_secs(2)))
        .mount(&server)
        .await;

    let mut config = config(&[(ProviderId::Ark, &server)]);
    config.request.timeout_ms = 200;
    let (client, _) = client(config);
    let err = client.generate(&window("hi"), |_| {}).await.unwrap_err();
    match err {
        StreamError::Exhausted { last, .. } => {
            assert!(matches!(*last, StreamError::Timeout(TimeoutKind::Connect)));
        }
        other => panic!("expected Exhausted, got {other:?}"),
    }
}

// ── Resume ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn resume_appends_to_saved_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"messages": [{"role": "user", "content": "greet"}]})))
        .respond_with(stream_ok(&[content(", world")]))
        .expect(1)
        .mount(&server)
        .await;

    let (client, kv) = client(config(&[(ProviderId::Ark, &server)]));
    let mut saved = StreamAggregate::new("s1");
    saved.content = "Hello".into();
    ResumableStateStore::new(kv.clone())
        .save("s1", &saved, &window("greet"))
        .await
        .unwrap();

    let mut updates: Vec<ProgressUpdate> = Vec::new();
    let out = client.resume("s1", |u| updates.push(u)).await.unwrap();
    assert_eq!(out.content, "Hello, world");
    assert_eq!(updates[0].content, "Hello");
    assert!(updates.iter().all(|u| u.content.matches("Hello").count() == 1));
    assert!(kv.is_empty());
}
