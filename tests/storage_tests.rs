//! File-backed storage and the stores layered on it.

use tempfile::TempDir;

use sumpage::config::{ConfigStore, ProviderConfig, ProviderKind};
use sumpage::error::ErrorKind;
use sumpage::history::ChatHistoryStore;
use sumpage::prompts::PromptStore;
use sumpage::sidebar::ButtonPosition;
use sumpage::storage::{FileStorage, Storage, keys};
use sumpage::types::ChatMessage;

fn file_storage(dir: &TempDir) -> Storage {
    Storage::new(FileStorage::new(dir.path()))
}

mod file_area {
    use super::*;

    #[tokio::test]
    async fn values_survive_a_new_adapter() {
        let dir = TempDir::new().unwrap();
        file_storage(&dir)
            .set("sample", &vec![1, 2, 3])
            .await
            .unwrap();

        let reopened = file_storage(&dir);
        let value: Vec<u32> = reopened.get("sample", Vec::new()).await.unwrap();
        assert_eq!(value, vec![1, 2, 3]);
        assert!(dir.path().join("sample.json").exists());
    }

    #[tokio::test]
    async fn missing_directory_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(FileStorage::new(dir.path().join("not-yet")));
        assert!(storage.keys().await.unwrap().is_empty());
        let value: Option<String> = storage.get_opt("anything").await.unwrap();
        assert_eq!(value, None);
        storage.remove("anything").await.unwrap();
    }

    #[tokio::test]
    async fn keys_remove_and_clear() {
        let dir = TempDir::new().unwrap();
        let storage = file_storage(&dir);
        for key in ["one", "two", "three"] {
            storage.set(key, key).await.unwrap();
        }

        let mut stored = storage.keys().await.unwrap();
        stored.sort();
        assert_eq!(stored, vec!["one", "three", "two"]);

        storage.remove("two").await.unwrap();
        assert_eq!(storage.keys().await.unwrap().len(), 2);

        storage.clear().await.unwrap();
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupted_value_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("chatHistory.json"), "{ not json").unwrap();

        let history = ChatHistoryStore::new(file_storage(&dir));
        assert!(history.list_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unwritable_directory_is_storage_unavailable() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();

        let storage = Storage::new(FileStorage::new(&blocker));
        let err = storage.set("key", "value").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
    }

    #[tokio::test]
    async fn changes_are_broadcast() {
        let dir = TempDir::new().unwrap();
        let storage = file_storage(&dir);
        let mut changes = storage.subscribe();

        storage.set("counter", &1).await.unwrap();
        storage.set("counter", &2).await.unwrap();
        storage.remove("counter").await.unwrap();

        let first = changes.recv().await.unwrap();
        assert_eq!(first.key, "counter");
        assert_eq!(first.old_value, None);
        assert_eq!(first.new_value, Some(serde_json::json!(1)));

        let second = changes.recv().await.unwrap();
        assert_eq!(second.old_value, Some(serde_json::json!(1)));
        assert_eq!(second.new_value, Some(serde_json::json!(2)));

        let removed = changes.recv().await.unwrap();
        assert_eq!(removed.new_value, None);
    }
}

mod persisted_layout {
    use super::*;

    #[tokio::test]
    async fn stores_use_the_flat_key_namespace() {
        let dir = TempDir::new().unwrap();
        let storage = file_storage(&dir);

        ConfigStore::new(storage.clone())
            .save_provider_config(&ProviderConfig::new(ProviderKind::OpenAI, "sk-openai"))
            .await
            .unwrap();
        ConfigStore::new(storage.clone())
            .save_button_position(ButtonPosition { x: 10.0, y: 20.0 })
            .await
            .unwrap();
        PromptStore::new(storage.clone())
            .create("Bullets", "Bullet points for {title}: {content}")
            .await
            .unwrap();
        ChatHistoryStore::new(storage.clone())
            .save_history(
                "https://example.com",
                "Example",
                &[ChatMessage::assistant("Summary")],
            )
            .await
            .unwrap();

        for key in [
            keys::PROVIDER_CONFIGS,
            keys::BUTTON_POSITION,
            keys::PROMPT_TEMPLATES,
            keys::CHAT_HISTORY,
        ] {
            assert!(
                dir.path().join(format!("{key}.json")).exists(),
                "missing {key}.json"
            );
        }

        let raw = std::fs::read_to_string(dir.path().join("providerConfigs.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["openai"]["apiKey"], "sk-openai");
        assert_eq!(value["openai"]["maxTokens"], 2000);
    }

    #[tokio::test]
    async fn legacy_single_provider_record_is_migrated() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("deepseekConfig.json"),
            r#"{"apiKey":"sk-legacy","model":"deepseek-reasoner"}"#,
        )
        .unwrap();

        let config = ConfigStore::new(file_storage(&dir))
            .provider_config(ProviderKind::DeepSeek)
            .await
            .unwrap()
            .expect("migrated");
        assert_eq!(config.api_key, "sk-legacy");
        assert_eq!(config.model, "deepseek-reasoner");
        assert_eq!(config.base_url, ProviderKind::DeepSeek.default_base_url());
    }

    #[tokio::test]
    async fn rejected_config_leaves_storage_untouched() {
        let dir = TempDir::new().unwrap();
        let storage = file_storage(&dir);
        let mut config = ProviderConfig::new(ProviderKind::DeepSeek, "sk-test");
        config.max_tokens = 40_000;

        let err = ConfigStore::new(storage.clone())
            .save_provider_config(&config)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("40000"));
        assert!(storage.keys().await.unwrap().is_empty());
    }
}
