//! Per-URL chat history.
//!
//! All records live in one map under `chatHistory`, keyed by the exact page
//! URL. Every save replaces the record for that URL wholesale.

use crate::error::Result;
use crate::storage::{Storage, keys};
use crate::types::{ChatMessage, now_millis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatHistoryRecord {
    pub url: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub last_updated: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    NoHistory,
    HistoryExists,
}

type HistoryMap = HashMap<String, ChatHistoryRecord>;

#[derive(Clone)]
pub struct ChatHistoryStore {
    storage: Storage,
}

impl ChatHistoryStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    async fn load_all(&self) -> Result<HistoryMap> {
        self.storage.get(keys::CHAT_HISTORY, HistoryMap::new()).await
    }

    pub async fn get_history(&self, url: &str) -> Result<Option<ChatHistoryRecord>> {
        Ok(self.load_all().await?.remove(url))
    }

    /// Replace the record for `url`. An empty message list removes it.
    pub async fn save_history(
        &self,
        url: &str,
        title: &str,
        messages: &[ChatMessage],
    ) -> Result<ChatHistoryRecord> {
        let mut all = self.load_all().await?;
        let record = ChatHistoryRecord {
            url: url.to_string(),
            title: title.to_string(),
            messages: messages.to_vec(),
            last_updated: now_millis(),
        };
        if messages.is_empty() {
            all.remove(url);
        } else {
            all.insert(url.to_string(), record.clone());
        }
        self.storage.set(keys::CHAT_HISTORY, &all).await?;
        tracing::debug!(url, messages = messages.len(), "saved chat history");
        Ok(record)
    }

    pub async fn clear_history(&self, url: &str) -> Result<bool> {
        let mut all = self.load_all().await?;
        let removed = all.remove(url).is_some();
        if removed {
            self.storage.set(keys::CHAT_HISTORY, &all).await?;
        }
        Ok(removed)
    }

    pub async fn session_state(&self, url: &str) -> Result<SessionState> {
        let has_messages = self
            .get_history(url)
            .await?
            .is_some_and(|record| !record.messages.is_empty());
        Ok(if has_messages {
            SessionState::HistoryExists
        } else {
            SessionState::NoHistory
        })
    }

    /// Every record, most recently updated first.
    pub async fn list_records(&self) -> Result<Vec<ChatHistoryRecord>> {
        let mut records: Vec<_> = self.load_all().await?.into_values().collect();
        records.sort_by(|a, b| b.last_updated.cmp(&a.last_updated).then(a.url.cmp(&b.url)));
        Ok(records)
    }

    pub async fn clear_all(&self) -> Result<()> {
        self.storage.remove(keys::CHAT_HISTORY).await
    }
}
