//! Provider client and background router against a `wiremock` endpoint.

use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sumpage::ai::{LlmBackend, MAX_CONTENT_CHARS, ProviderClient};
use sumpage::background::{Background, ChatPayload, SummarizePayload};
use sumpage::config::{ConfigStore, ProviderConfig, ProviderKind};
use sumpage::error::{Error, ErrorKind};
use sumpage::storage::Storage;
use sumpage::types::ChatMessage;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config_for(server: &MockServer) -> ProviderConfig {
    let mut config = ProviderConfig::new(ProviderKind::DeepSeek, "sk-test");
    config.base_url = server.uri();
    config
}

async fn storage_for(server: &MockServer) -> Storage {
    let storage = Storage::in_memory();
    ConfigStore::new(storage.clone())
        .save_provider_config(&config_for(server))
        .await
        .expect("valid config");
    storage
}

fn completion(content: &str) -> Value {
    json!({
        "id": "cmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })
}

async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .map(|request| request.body_json::<Value>().expect("json body"))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn summarize_posts_truncated_prompt_with_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("A short summary.\n\n- First point\n- Second point")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let background = Background::new(storage_for(&server).await);
    let summary = background
        .summarize(SummarizePayload {
            title: "Long page".into(),
            text_content: "a".repeat(15_000),
            prompt_id: None,
            prompt_template: None,
        })
        .await
        .expect("summary");

    assert!(summary.summary.starts_with("A short summary."));
    assert_eq!(summary.key_points, vec!["First point", "Second point"]);

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    let body = &bodies[0];
    assert_eq!(body["model"], "deepseek-chat");
    assert_eq!(body["max_tokens"], 2000);
    assert_eq!(body["temperature"], 0.7);
    assert_eq!(body["messages"][0]["role"], "user");

    let prompt = body["messages"][0]["content"].as_str().expect("prompt text");
    assert!(prompt.contains("Long page"));
    assert!(prompt.contains(&format!("{}...", "a".repeat(MAX_CONTENT_CHARS))));
    assert!(!prompt.contains(&"a".repeat(MAX_CONTENT_CHARS + 1)));
}

#[tokio::test]
async fn chat_sends_system_context_then_history() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Because of X.")))
        .mount(&server)
        .await;

    let background = Background::new(storage_for(&server).await);
    let reply = background
        .chat(ChatPayload {
            title: "Page".into(),
            text_content: "Body text".into(),
            message: "Why?".into(),
            history: vec![ChatMessage::assistant("Summary")],
            prompt_id: None,
            prompt_template: None,
        })
        .await
        .expect("reply");
    assert_eq!(reply.content, "Because of X.");

    let bodies = request_bodies(&server).await;
    let roles: Vec<&str> = bodies[0]["messages"]
        .as_array()
        .expect("messages")
        .iter()
        .map(|m| m["role"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(roles, vec!["system", "assistant", "user"]);
    assert_eq!(bodies[0]["messages"][2]["content"], "Why?");
}

#[tokio::test]
async fn provider_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "error": { "message": "Invalid API key" } })),
        )
        .mount(&server)
        .await;

    let client = ProviderClient::new(config_for(&server));
    let err = client
        .complete(&[ChatMessage::user("hi")])
        .await
        .expect_err("401 must fail");

    assert_eq!(err.to_string(), "Invalid API key");
    assert!(matches!(err, Error::Api { status: Some(401), .. }));
    assert_eq!(err.kind(), ErrorKind::Api);
}

#[tokio::test]
async fn api_status_survives_the_background_handle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({ "error": { "message": "Rate limit reached" } })),
        )
        .mount(&server)
        .await;

    let handle = Background::new(storage_for(&server).await).spawn();
    let err = handle
        .summarize(SummarizePayload {
            title: "Page".into(),
            text_content: "Body".into(),
            ..SummarizePayload::default()
        })
        .await
        .expect_err("429 must fail");

    assert_eq!(err.kind(), ErrorKind::Api);
    assert_eq!(err.status(), Some(429));
    assert_eq!(err.to_string(), "Rate limit reached");
}

#[tokio::test]
async fn unparseable_error_body_falls_back_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let client = ProviderClient::new(config_for(&server));
    let err = client
        .complete(&[ChatMessage::user("hi")])
        .await
        .expect_err("500 must fail");

    assert_eq!(err.to_string(), "API error: 500");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn empty_choices_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let client = ProviderClient::new(config_for(&server));
    let err = client
        .complete(&[ChatMessage::user("hi")])
        .await
        .expect_err("no content");
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[tokio::test]
async fn missing_api_key_never_reaches_the_network() {
    let server = MockServer::start().await;
    let mut config = config_for(&server);
    config.api_key = String::new();

    let err = ProviderClient::new(config)
        .complete(&[ChatMessage::user("hi")])
        .await
        .expect_err("no key");

    assert_eq!(err.kind(), ErrorKind::ConfigMissing);
    assert!(request_bodies(&server).await.is_empty());
}

#[tokio::test]
async fn unreachable_provider_is_a_network_error() {
    let server = MockServer::start().await;
    let config = config_for(&server);
    drop(server);

    let err = ProviderClient::new(config)
        .complete(&[ChatMessage::user("hi")])
        .await
        .expect_err("server is gone");
    assert_eq!(err.kind(), ErrorKind::Network);
}
