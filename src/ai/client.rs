use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::types::{ChatMessage, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Anything that turns a message list into one assistant reply.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Trim trailing slashes and append `/v1` unless a path segment already
/// names a `v1` API version (`/v1`, `/v1beta/openai`). The host is never
/// inspected.
pub fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    let versioned = url::Url::parse(trimmed)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .map(|mut segments| segments.any(|segment| segment.starts_with("v1")))
        })
        .unwrap_or(false);
    if versioned {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

// OpenAI-compatible wire types

#[derive(Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Message { message: String },
    Text(String),
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<ErrorDetail>,
    #[serde(default)]
    message: Option<String>,
}

fn api_error_message(status: u16, body: &str) -> String {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    parsed
        .and_then(|body| match body.error {
            Some(ErrorDetail::Message { message }) => Some(message),
            Some(ErrorDetail::Text(text)) => Some(text),
            None => body.message,
        })
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("API error: {status}"))
}

/// Client for one configured provider.
pub struct ProviderClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl ProviderClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            normalize_base_url(&self.config.base_url)
        )
    }
}

#[async_trait]
impl LlmBackend for ProviderClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        if self.config.api_key.trim().is_empty() {
            return Err(Error::ConfigMissing(format!(
                "no API key set for {}",
                self.config.provider.display_name()
            )));
        }

        let endpoint = self.endpoint();
        let body = CompletionRequest {
            model: &self.config.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        tracing::info!(
            provider = %self.config.provider,
            model = %self.config.model,
            messages = messages.len(),
            "sending chat completion"
        );

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = api_error_message(status.as_u16(), &text);
            tracing::warn!(status = status.as_u16(), %message, "provider returned an error");
            return Err(Error::Api {
                status: Some(status.as_u16()),
                message,
            });
        }

        let parsed: CompletionResponse = serde_json::from_str(&text)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| Error::Parse("response contained no message content".into()))
    }
}
