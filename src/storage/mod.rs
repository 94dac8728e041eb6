//! Persistent key-value storage.
//!
//! This module provides:
//! - the [`StorageArea`] seam over a host key-value area
//! - a file-backed area for native builds and an in-memory area for tests
//! - the typed [`Storage`] adapter with change notifications

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Flat key namespace shared by every store.
pub mod keys {
    pub const PROVIDER_CONFIGS: &str = "providerConfigs";
    /// Single-provider layout written by older releases.
    pub const LEGACY_DEEPSEEK_CONFIG: &str = "deepseekConfig";
    pub const PROMPT_TEMPLATES: &str = "promptTemplates";
    pub const SELECTED_PROMPT_ID: &str = "selectedPromptId";
    pub const CHAT_HISTORY: &str = "chatHistory";
    pub const GLOBAL_SETTINGS: &str = "globalSettings";
    pub const BUTTON_POSITION: &str = "sumpageButtonPos";
}

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Raw string storage provided by the host.
#[async_trait]
pub trait StorageArea: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;
    async fn set_raw(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
    async fn keys(&self) -> Result<Vec<String>>;
}

/// Emitted after every successful write, removal or clear.
#[derive(Clone, Debug, PartialEq)]
pub struct StorageChange {
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

/// Typed JSON view over a [`StorageArea`].
///
/// Cloning is cheap; clones share the area and the change channel.
#[derive(Clone)]
pub struct Storage {
    area: Arc<dyn StorageArea>,
    changes: broadcast::Sender<StorageChange>,
}

impl Storage {
    pub fn new(area: impl StorageArea + 'static) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            area: Arc::new(area),
            changes,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::default())
    }

    /// File-backed storage under the user data directory, or memory when
    /// no data directory can be determined.
    pub fn detect() -> Self {
        match FileStorage::default_dir() {
            Some(dir) => {
                tracing::debug!(dir = %dir.display(), "using file storage");
                Self::new(FileStorage::new(dir))
            }
            None => {
                tracing::warn!("no data directory available, falling back to in-memory storage");
                Self::in_memory()
            }
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.get_opt(key).await?.unwrap_or(default))
    }

    pub async fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.area.get_raw(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                tracing::warn!(key, error = %err, "ignoring unreadable stored value");
                Ok(None)
            }
        }
    }

    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let new_value = serde_json::to_value(value)?;
        let old_value = self.read_value(key).await;
        self.area.set_raw(key, &new_value.to_string()).await?;
        tracing::debug!(key, "stored value");
        self.notify(key, old_value, Some(new_value));
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        let old_value = self.read_value(key).await;
        self.area.remove(key).await?;
        if old_value.is_some() {
            self.notify(key, old_value, None);
        }
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        let keys = self.area.keys().await?;
        let mut previous = Vec::with_capacity(keys.len());
        for key in keys {
            let value = self.read_value(&key).await;
            previous.push((key, value));
        }
        self.area.clear().await?;
        for (key, old_value) in previous {
            self.notify(&key, old_value, None);
        }
        Ok(())
    }

    pub async fn keys(&self) -> Result<Vec<String>> {
        self.area.keys().await
    }

    /// Receive every change made through this adapter or its clones.
    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }

    async fn read_value(&self, key: &str) -> Option<Value> {
        self.area
            .get_raw(key)
            .await
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }

    fn notify(&self, key: &str, old_value: Option<Value>, new_value: Option<Value>) {
        // No receivers is fine.
        let _ = self.changes.send(StorageChange {
            key: key.to_string(),
            old_value,
            new_value,
        });
    }
}

/// Sanitize storage key for filesystem use
pub(crate) fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("chatHistory"), "chatHistory");
        assert_eq!(sanitize_key("user:preferences"), "user_preferences");
        assert_eq!(sanitize_key(&"k".repeat(100)).len(), 64);
    }

    #[tokio::test]
    async fn get_returns_default_for_missing_key() {
        let storage = Storage::in_memory();
        let value: Vec<String> = storage.get("missing", Vec::new()).await.unwrap();
        assert!(value.is_empty());
    }

    #[tokio::test]
    async fn typed_set_then_get() {
        let storage = Storage::in_memory();
        let sample = Sample {
            name: "test".into(),
            count: 42,
        };
        storage.set("sample", &sample).await.unwrap();
        let loaded: Option<Sample> = storage.get_opt("sample").await.unwrap();
        assert_eq!(loaded, Some(sample));
    }

    #[tokio::test]
    async fn unreadable_value_falls_back_to_default() {
        let area = MemoryStorage::default();
        area.set_raw("broken", "{not json").await.unwrap();
        let storage = Storage::new(area);
        let value: u32 = storage.get("broken", 7).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn subscribers_see_old_and_new_values() {
        let storage = Storage::in_memory();
        let mut changes = storage.subscribe();

        storage.set("count", &1).await.unwrap();
        storage.set("count", &2).await.unwrap();
        storage.remove("count").await.unwrap();

        let first = changes.recv().await.unwrap();
        assert_eq!(first.old_value, None);
        assert_eq!(first.new_value, Some(Value::from(1)));

        let second = changes.recv().await.unwrap();
        assert_eq!(second.old_value, Some(Value::from(1)));
        assert_eq!(second.new_value, Some(Value::from(2)));

        let removed = changes.recv().await.unwrap();
        assert_eq!(removed.key, "count");
        assert_eq!(removed.new_value, None);
    }

    #[tokio::test]
    async fn clear_drops_every_key() {
        let storage = Storage::in_memory();
        storage.set("a", &"x").await.unwrap();
        storage.set("b", &"y").await.unwrap();
        storage.clear().await.unwrap();
        assert!(storage.keys().await.unwrap().is_empty());
    }
}
