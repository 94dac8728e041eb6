//! AI module for SumPage
//!
//! Every provider (DeepSeek, OpenAI, Anthropic, MiniMax, Gemini) is spoken to
//! through the OpenAI-compatible chat-completions schema.
//!
//! # Architecture
//!
//! - `client` - HTTP client for `{baseUrl}/chat/completions`
//! - `request` - prompt building for summaries and chat continuation
//!
//! # Usage
//!
//! ```rust,no_run
//! use sumpage::ai::{LlmBackend, ProviderClient};
//! use sumpage::config::{ProviderConfig, ProviderKind};
//! use sumpage::types::ChatMessage;
//!
//! # async fn example() -> sumpage::error::Result<()> {
//! let client = ProviderClient::new(ProviderConfig::new(ProviderKind::DeepSeek, "sk-..."));
//! let reply = client.complete(&[ChatMessage::user("Hello!")]).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod request;

pub use client::{LlmBackend, ProviderClient, normalize_base_url};
pub use request::{
    AiSummary, CHAT_EXCERPT_CHARS, MAX_CONTENT_CHARS, build_chat_messages,
    build_summary_messages, chat_with, parse_key_points, summarize_with, truncate_content,
};
