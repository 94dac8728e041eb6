//! Provider configuration and global settings.
//!
//! One [`ProviderConfig`] is kept per [`ProviderKind`] in a single map under
//! `providerConfigs`; everything else lives in the [`GlobalSettings`] record.

use crate::error::{Error, Result};
use crate::sidebar::ButtonPosition;
use crate::storage::{Storage, keys};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::str::FromStr;

pub const MIN_MAX_TOKENS: u32 = 1;
pub const MAX_MAX_TOKENS: u32 = 32_000;
pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Picks the provider when no selection has been stored yet.
pub const PROVIDER_ENV: &str = "SUMPAGE_PROVIDER";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    DeepSeek,
    OpenAI,
    Anthropic,
    MiniMax,
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        ProviderKind::DeepSeek,
        ProviderKind::OpenAI,
        ProviderKind::Anthropic,
        ProviderKind::MiniMax,
        ProviderKind::Gemini,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::MiniMax => "minimax",
            ProviderKind::Gemini => "gemini",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ProviderKind::DeepSeek => "DeepSeek",
            ProviderKind::OpenAI => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::MiniMax => "MiniMax",
            ProviderKind::Gemini => "Gemini",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::DeepSeek => "https://api.deepseek.com",
            ProviderKind::OpenAI => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
            ProviderKind::MiniMax => "https://api.minimax.chat/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ProviderKind::DeepSeek => "deepseek-chat",
            ProviderKind::OpenAI => "gpt-4o-mini",
            ProviderKind::Anthropic => "claude-3-5-sonnet-20241022",
            ProviderKind::MiniMax => "abab6.5s-chat",
            ProviderKind::Gemini => "gemini-1.5-flash",
        }
    }

    fn env_prefix(self) -> &'static str {
        match self {
            ProviderKind::DeepSeek => "DEEPSEEK",
            ProviderKind::OpenAI => "OPENAI",
            ProviderKind::Anthropic => "ANTHROPIC",
            ProviderKind::MiniMax => "MINIMAX",
            ProviderKind::Gemini => "GEMINI",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.id() == needle)
            .ok_or_else(|| Error::Validation(format!("Unknown provider: '{s}'")))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl ProviderConfig {
    /// Defaults for `kind` with the given key.
    pub fn new(provider: ProviderKind, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            base_url: provider.default_base_url().to_string(),
            api_key: api_key.into(),
            model: provider.default_model().to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Build from `{PROVIDER}_API_KEY`, `{PROVIDER}_BASE_URL` and `{PROVIDER}_MODEL`.
    /// The result is not validated.
    pub fn from_env(provider: ProviderKind) -> Option<Self> {
        Self::from_vars(provider, |name| env::var(name).ok())
    }

    fn from_vars(provider: ProviderKind, var: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let prefix = provider.env_prefix();
        let api_key = var(&format!("{prefix}_API_KEY")).filter(|key| !key.trim().is_empty())?;
        let mut config = Self::new(provider, api_key);
        if let Some(base_url) = var(&format!("{prefix}_BASE_URL")) {
            config.base_url = base_url;
        }
        if let Some(model) = var(&format!("{prefix}_MODEL")) {
            config.model = model;
        }
        Some(config)
    }

    /// Validate a config read from the environment, naming its variables on failure.
    fn validated_from_env(self) -> Result<Self> {
        self.validate().map_err(|err| {
            Error::Validation(format!(
                "{} settings from {}_* environment variables are invalid: {err}",
                self.provider.display_name(),
                self.provider.env_prefix()
            ))
        })?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Validation("API key is required".into()));
        }
        if self.model.trim().is_empty() {
            return Err(Error::Validation("Model is required".into()));
        }
        match url::Url::parse(self.base_url.trim()) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => {
                return Err(Error::Validation(format!(
                    "Invalid base URL: '{}'",
                    self.base_url
                )));
            }
        }
        if !(MIN_MAX_TOKENS..=MAX_MAX_TOKENS).contains(&self.max_tokens) {
            return Err(Error::Validation(format!(
                "Max tokens must be between {MIN_MAX_TOKENS} and {MAX_MAX_TOKENS}, got {}",
                self.max_tokens
            )));
        }
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(Error::Validation(format!(
                "Temperature must be between {MIN_TEMPERATURE} and {MAX_TEMPERATURE}, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Layout of the single-provider record older releases stored.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyDeepseekConfig {
    api_key: String,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    temperature: Option<f64>,
}

impl From<LegacyDeepseekConfig> for ProviderConfig {
    fn from(legacy: LegacyDeepseekConfig) -> Self {
        let mut config = ProviderConfig::new(ProviderKind::DeepSeek, legacy.api_key);
        if let Some(base_url) = legacy.base_url {
            config.base_url = base_url;
        }
        if let Some(model) = legacy.model {
            config.model = model;
        }
        config.max_tokens = legacy.max_tokens.unwrap_or(config.max_tokens);
        config.temperature = legacy.temperature.unwrap_or(config.temperature);
        config
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    pub selected_provider: ProviderKind,
    #[serde(default)]
    pub selected_prompt_id: Option<String>,
    #[serde(default)]
    pub button_position: Option<ButtonPosition>,
}

pub type ProviderConfigs = BTreeMap<ProviderKind, ProviderConfig>;

/// Provider configs and global settings on top of [`Storage`].
#[derive(Clone)]
pub struct ConfigStore {
    storage: Storage,
}

impl ConfigStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub async fn provider_configs(&self) -> Result<ProviderConfigs> {
        let configs: ProviderConfigs = self
            .storage
            .get(keys::PROVIDER_CONFIGS, ProviderConfigs::new())
            .await?;
        if !configs.is_empty() {
            return Ok(configs);
        }
        self.migrate_legacy_config().await
    }

    async fn migrate_legacy_config(&self) -> Result<ProviderConfigs> {
        let mut configs = ProviderConfigs::new();
        let legacy: Option<LegacyDeepseekConfig> =
            self.storage.get_opt(keys::LEGACY_DEEPSEEK_CONFIG).await?;
        if let Some(legacy) = legacy {
            tracing::info!("migrating legacy deepseek config");
            configs.insert(ProviderKind::DeepSeek, legacy.into());
            self.storage.set(keys::PROVIDER_CONFIGS, &configs).await?;
            self.storage.remove(keys::LEGACY_DEEPSEEK_CONFIG).await?;
        }
        Ok(configs)
    }

    pub async fn provider_config(&self, kind: ProviderKind) -> Result<Option<ProviderConfig>> {
        Ok(self.provider_configs().await?.remove(&kind))
    }

    /// Validate, then replace the stored config for `config.provider`.
    pub async fn save_provider_config(&self, config: &ProviderConfig) -> Result<()> {
        config.validate()?;
        let mut configs = self.provider_configs().await?;
        configs.insert(config.provider, config.clone());
        self.storage.set(keys::PROVIDER_CONFIGS, &configs).await
    }

    pub async fn remove_provider_config(&self, kind: ProviderKind) -> Result<bool> {
        let mut configs = self.provider_configs().await?;
        let removed = configs.remove(&kind).is_some();
        if removed {
            self.storage.set(keys::PROVIDER_CONFIGS, &configs).await?;
        }
        Ok(removed)
    }

    pub async fn global_settings(&self) -> Result<GlobalSettings> {
        let stored: Option<GlobalSettings> =
            self.storage.get_opt(keys::GLOBAL_SETTINGS).await?;
        Ok(stored.unwrap_or_else(|| GlobalSettings {
            selected_provider: env_selected_provider().unwrap_or_default(),
            ..GlobalSettings::default()
        }))
    }

    pub async fn save_global_settings(&self, settings: &GlobalSettings) -> Result<()> {
        self.storage.set(keys::GLOBAL_SETTINGS, settings).await
    }

    pub async fn select_provider(&self, kind: ProviderKind) -> Result<()> {
        let mut settings = self.global_settings().await?;
        settings.selected_provider = kind;
        self.save_global_settings(&settings).await
    }

    pub async fn set_selected_prompt_id(&self, id: Option<&str>) -> Result<()> {
        let mut settings = self.global_settings().await?;
        settings.selected_prompt_id = id.map(str::to_string);
        self.save_global_settings(&settings).await
    }

    /// Config of the selected provider, falling back to the environment.
    pub async fn active_provider_config(&self) -> Result<ProviderConfig> {
        let settings = self.global_settings().await?;
        let kind = settings.selected_provider;
        if let Some(config) = self.provider_config(kind).await? {
            return Ok(config);
        }
        if let Some(config) = ProviderConfig::from_env(kind) {
            tracing::debug!(provider = %kind, "using provider config from environment");
            return config.validated_from_env();
        }
        Err(Error::ConfigMissing(format!(
            "configure an API key for {} in settings",
            kind.display_name()
        )))
    }

    pub async fn button_position(&self) -> Result<Option<ButtonPosition>> {
        self.storage.get_opt(keys::BUTTON_POSITION).await
    }

    pub async fn save_button_position(&self, position: ButtonPosition) -> Result<()> {
        self.storage.set(keys::BUTTON_POSITION, &position).await?;
        let mut settings = self.global_settings().await?;
        settings.button_position = Some(position);
        self.save_global_settings(&settings).await
    }
}

fn env_selected_provider() -> Option<ProviderKind> {
    env::var(PROVIDER_ENV).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn valid_config() -> ProviderConfig {
        ProviderConfig::new(ProviderKind::DeepSeek, "sk-test")
    }

    #[test]
    fn provider_kind_parses_ids() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAI);
        assert_eq!(" MiniMax ".parse::<ProviderKind>().unwrap(), ProviderKind::MiniMax);
        assert!("mistral".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn provider_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ProviderKind::DeepSeek).unwrap();
        assert_eq!(json, "\"deepseek\"");
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_numbers() {
        let mut config = valid_config();
        config.max_tokens = 0;
        assert!(config.validate().is_err());
        config.max_tokens = 32_000;
        assert!(config.validate().is_ok());

        config.temperature = 2.5;
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("Temperature"));
    }

    #[test]
    fn validate_rejects_malformed_url_and_missing_key() {
        let mut config = valid_config();
        config.base_url = "not a url".into();
        assert!(config.validate().is_err());

        config.base_url = "ftp://example.com".into();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.api_key = "  ".into();
        assert!(config.validate().unwrap_err().to_string().contains("API key"));
    }

    #[test]
    fn env_config_reads_prefixed_variables() {
        let vars = |name: &str| match name {
            "OPENAI_API_KEY" => Some("sk-env".to_string()),
            "OPENAI_MODEL" => Some("gpt-4o".to_string()),
            _ => None,
        };
        let config = ProviderConfig::from_vars(ProviderKind::OpenAI, vars).unwrap();
        assert_eq!(config.api_key, "sk-env");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert!(config.validated_from_env().is_ok());

        assert!(ProviderConfig::from_vars(ProviderKind::Gemini, vars).is_none());
    }

    #[test]
    fn invalid_env_config_is_a_validation_error() {
        let vars = |name: &str| match name {
            "DEEPSEEK_API_KEY" => Some("sk-env".to_string()),
            "DEEPSEEK_BASE_URL" => Some("api.deepseek.com".to_string()),
            _ => None,
        };
        let config = ProviderConfig::from_vars(ProviderKind::DeepSeek, vars).unwrap();
        let err = config.validated_from_env().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("DEEPSEEK_*"));
        assert!(err.to_string().contains("Invalid base URL"));
    }

    #[tokio::test]
    async fn rejected_config_never_reaches_storage() {
        let storage = Storage::in_memory();
        let store = ConfigStore::new(storage.clone());
        let mut config = valid_config();
        config.max_tokens = 40_000;

        let err = store.save_provider_config(&config).await.unwrap_err();
        assert!(err.to_string().contains("between 1 and 32000"));
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn configs_are_kept_per_provider() {
        let store = ConfigStore::new(Storage::in_memory());
        store.save_provider_config(&valid_config()).await.unwrap();
        let openai = ProviderConfig::new(ProviderKind::OpenAI, "sk-openai");
        store.save_provider_config(&openai).await.unwrap();

        let configs = store.provider_configs().await.unwrap();
        assert_eq!(configs.len(), 2);
        assert_eq!(
            store
                .provider_config(ProviderKind::OpenAI)
                .await
                .unwrap()
                .unwrap()
                .api_key,
            "sk-openai"
        );
        assert!(store.remove_provider_config(ProviderKind::OpenAI).await.unwrap());
        assert!(!store.remove_provider_config(ProviderKind::OpenAI).await.unwrap());
    }

    #[tokio::test]
    async fn legacy_deepseek_config_is_migrated() {
        let storage = Storage::in_memory();
        storage
            .set(
                keys::LEGACY_DEEPSEEK_CONFIG,
                &serde_json::json!({ "apiKey": "sk-old", "model": "deepseek-reasoner" }),
            )
            .await
            .unwrap();
        let store = ConfigStore::new(storage.clone());

        let config = store
            .provider_config(ProviderKind::DeepSeek)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(config.api_key, "sk-old");
        assert_eq!(config.model, "deepseek-reasoner");
        assert_eq!(config.base_url, "https://api.deepseek.com");

        let stored_keys = storage.keys().await.unwrap();
        assert!(stored_keys.contains(&keys::PROVIDER_CONFIGS.to_string()));
        assert!(!stored_keys.contains(&keys::LEGACY_DEEPSEEK_CONFIG.to_string()));
    }

    #[tokio::test]
    async fn active_config_follows_selected_provider() {
        let store = ConfigStore::new(Storage::in_memory());
        let gemini = ProviderConfig::new(ProviderKind::Gemini, "g-key");
        store.save_provider_config(&gemini).await.unwrap();
        store.select_provider(ProviderKind::Gemini).await.unwrap();

        let active = store.active_provider_config().await.unwrap();
        assert_eq!(active.provider, ProviderKind::Gemini);
    }

    #[tokio::test]
    async fn missing_config_is_reported_as_config_missing() {
        let store = ConfigStore::new(Storage::in_memory());
        store.select_provider(ProviderKind::MiniMax).await.unwrap();
        // Only fails when the environment carries no MINIMAX_API_KEY either.
        if std::env::var("MINIMAX_API_KEY").is_err() {
            let err = store.active_provider_config().await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigMissing);
        }
    }

    #[tokio::test]
    async fn button_position_is_mirrored_into_settings() {
        let store = ConfigStore::new(Storage::in_memory());
        let position = ButtonPosition { x: 12.0, y: 300.0 };
        store.save_button_position(position).await.unwrap();

        assert_eq!(store.button_position().await.unwrap(), Some(position));
        assert_eq!(
            store.global_settings().await.unwrap().button_position,
            Some(position)
        );
    }
}
