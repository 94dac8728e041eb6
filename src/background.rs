//! Background side of the UI boundary.
//!
//! Requests arrive as `{type, payload}` messages, get the active provider
//! config and prompt template from storage, and call the provider. The UI
//! talks to it through a [`BackgroundHandle`]; a dropped background surfaces
//! as [`Error::ContextInvalidated`] rather than a string to match on.

use crate::ai::{AiSummary, LlmBackend, ProviderClient, chat_with, summarize_with};
use crate::config::{ConfigStore, ProviderConfig};
use crate::error::{Error, ErrorKind, Result};
use crate::prompts::PromptStore;
use crate::storage::Storage;
use crate::types::ChatMessage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

const REQUEST_QUEUE_CAPACITY: usize = 16;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizePayload {
    pub title: String,
    pub text_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    pub title: String,
    pub text_content: String,
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum BackgroundRequest {
    #[serde(rename = "SUMMARIZE_WITH_DEEPSEEK")]
    Summarize(SummarizePayload),
    #[serde(rename = "CHAT_WITH_AI")]
    Chat(ChatPayload),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SummarizeResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AiSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// HTTP status of a provider failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// HTTP status of a provider failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackgroundResponse {
    Summary(SummarizeResponse),
    Chat(ChatResponse),
}

impl SummarizeResponse {
    fn from_result(result: Result<AiSummary>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
                error_kind: None,
                status: None,
            },
            Err(err) => Self {
                success: false,
                data: None,
                error: Some(err.to_string()),
                error_kind: Some(err.kind()),
                status: err.status(),
            },
        }
    }

    pub fn into_result(self) -> Result<AiSummary> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(rebuild_error(self.error, self.error_kind, self.status)),
        }
    }
}

impl ChatResponse {
    fn from_result(result: Result<ChatMessage>) -> Self {
        match result {
            Ok(message) => Self {
                success: true,
                message: Some(message),
                error: None,
                error_kind: None,
                status: None,
            },
            Err(err) => Self {
                success: false,
                message: None,
                error: Some(err.to_string()),
                error_kind: Some(err.kind()),
                status: err.status(),
            },
        }
    }

    pub fn into_result(self) -> Result<ChatMessage> {
        match (self.success, self.message) {
            (true, Some(message)) => Ok(message),
            _ => Err(rebuild_error(self.error, self.error_kind, self.status)),
        }
    }
}

fn rebuild_error(error: Option<String>, kind: Option<ErrorKind>, status: Option<u16>) -> Error {
    let message = error.unwrap_or_else(|| "Unknown error".to_string());
    Error::from_kind(kind.unwrap_or(ErrorKind::Parse), message, status)
}

/// Builds a backend for the active provider config.
pub type Connector = Arc<dyn Fn(ProviderConfig) -> Arc<dyn LlmBackend> + Send + Sync>;

#[derive(Clone)]
pub struct Background {
    config: ConfigStore,
    prompts: PromptStore,
    connector: Connector,
}

impl Background {
    pub fn new(storage: Storage) -> Self {
        Self::with_connector(
            storage,
            Arc::new(|config: ProviderConfig| {
                Arc::new(ProviderClient::new(config)) as Arc<dyn LlmBackend>
            }),
        )
    }

    pub fn with_connector(storage: Storage, connector: Connector) -> Self {
        Self {
            config: ConfigStore::new(storage.clone()),
            prompts: PromptStore::new(storage),
            connector,
        }
    }

    pub async fn handle(&self, request: BackgroundRequest) -> BackgroundResponse {
        match request {
            BackgroundRequest::Summarize(payload) => {
                BackgroundResponse::Summary(SummarizeResponse::from_result(
                    self.summarize(payload).await,
                ))
            }
            BackgroundRequest::Chat(payload) => {
                BackgroundResponse::Chat(ChatResponse::from_result(self.chat(payload).await))
            }
        }
    }

    async fn prepare(
        &self,
        prompt_id: Option<&str>,
        inline: Option<&str>,
    ) -> Result<(Arc<dyn LlmBackend>, String)> {
        let (config, template) = futures::try_join!(
            self.config.active_provider_config(),
            self.prompts.resolve_prompt_template(prompt_id, inline),
        )?;
        Ok(((self.connector)(config), template))
    }

    pub async fn summarize(&self, payload: SummarizePayload) -> Result<AiSummary> {
        let (backend, template) = self
            .prepare(payload.prompt_id.as_deref(), payload.prompt_template.as_deref())
            .await?;
        summarize_with(backend.as_ref(), &payload.title, &payload.text_content, &template).await
    }

    pub async fn chat(&self, payload: ChatPayload) -> Result<ChatMessage> {
        if payload.message.trim().is_empty() {
            return Err(Error::Validation("Message cannot be empty".into()));
        }
        let (backend, template) = self
            .prepare(payload.prompt_id.as_deref(), payload.prompt_template.as_deref())
            .await?;
        chat_with(
            backend.as_ref(),
            &payload.title,
            &payload.text_content,
            &template,
            &payload.history,
            &payload.message,
        )
        .await
    }

    /// Run on its own task; requests are handled concurrently.
    pub fn spawn(self) -> BackgroundHandle {
        let (tx, mut rx) = mpsc::channel::<Envelope>(REQUEST_QUEUE_CAPACITY);
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let background = self.clone();
                tokio::spawn(async move {
                    let response = background.handle(envelope.request).await;
                    // The sender gave up waiting.
                    let _ = envelope.reply.send(response);
                });
            }
            tracing::debug!("background channel closed");
        });
        BackgroundHandle { tx }
    }
}

struct Envelope {
    request: BackgroundRequest,
    reply: oneshot::Sender<BackgroundResponse>,
}

/// UI-side sender for background requests.
#[derive(Clone)]
pub struct BackgroundHandle {
    tx: mpsc::Sender<Envelope>,
}

impl BackgroundHandle {
    pub async fn send(&self, request: BackgroundRequest) -> Result<BackgroundResponse> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Envelope { request, reply })
            .await
            .map_err(|_| Error::ContextInvalidated("background is no longer running".into()))?;
        response
            .await
            .map_err(|_| Error::ContextInvalidated("background dropped the request".into()))
    }

    pub async fn summarize(&self, payload: SummarizePayload) -> Result<AiSummary> {
        match self.send(BackgroundRequest::Summarize(payload)).await? {
            BackgroundResponse::Summary(response) => response.into_result(),
            BackgroundResponse::Chat(_) => Err(Error::Parse("unexpected chat response".into())),
        }
    }

    pub async fn chat(&self, payload: ChatPayload) -> Result<ChatMessage> {
        match self.send(BackgroundRequest::Chat(payload)).await? {
            BackgroundResponse::Chat(response) => response.into_result(),
            BackgroundResponse::Summary(_) => {
                Err(Error::Parse("unexpected summary response".into()))
            }
        }
    }
}
