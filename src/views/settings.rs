use crate::config::{ConfigStore, ProviderConfig, ProviderKind};
use crate::error::{Error, Result};
use crate::theme::{ThemeMode, theme_definition};
use dioxus::prelude::*;

#[derive(Clone, Debug, PartialEq)]
enum FormStatus {
    Idle,
    Saved,
    Invalid(String),
}

/// Editable copy of a provider config; numbers stay text until save.
#[derive(Clone, Debug, PartialEq)]
struct ProviderForm {
    provider: ProviderKind,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: String,
    temperature: String,
}

impl From<ProviderConfig> for ProviderForm {
    fn from(config: ProviderConfig) -> Self {
        Self {
            provider: config.provider,
            base_url: config.base_url,
            api_key: config.api_key,
            model: config.model,
            max_tokens: config.max_tokens.to_string(),
            temperature: config.temperature.to_string(),
        }
    }
}

impl ProviderForm {
    fn to_config(&self) -> Result<ProviderConfig> {
        let max_tokens = self.max_tokens.trim().parse().map_err(|_| {
            Error::Validation(format!(
                "Max tokens must be a whole number, got '{}'",
                self.max_tokens
            ))
        })?;
        let temperature = self.temperature.trim().parse().map_err(|_| {
            Error::Validation(format!(
                "Temperature must be a number, got '{}'",
                self.temperature
            ))
        })?;
        Ok(ProviderConfig {
            provider: self.provider,
            base_url: self.base_url.trim().to_string(),
            api_key: self.api_key.trim().to_string(),
            model: self.model.trim().to_string(),
            max_tokens,
            temperature,
        })
    }
}

async fn load_form(config: &ConfigStore, kind: ProviderKind) -> ProviderForm {
    match config.provider_config(kind).await {
        Ok(Some(stored)) => stored.into(),
        Ok(None) => ProviderConfig::from_env(kind)
            .unwrap_or_else(|| ProviderConfig::new(kind, ""))
            .into(),
        Err(err) => {
            tracing::warn!(provider = %kind, error = %err, "could not load provider config");
            ProviderConfig::new(kind, "").into()
        }
    }
}

/// Validate, persist and make the provider active. Storage is untouched when
/// validation fails.
async fn save_form(config: &ConfigStore, draft: &ProviderForm) -> Result<()> {
    let provider_config = draft.to_config()?;
    config.save_provider_config(&provider_config).await?;
    config.select_provider(provider_config.provider).await
}

#[component]
pub fn SettingsView(theme: Signal<ThemeMode>) -> Element {
    let mut theme = theme;
    let config = use_context::<ConfigStore>();
    let mut form =
        use_signal(|| ProviderForm::from(ProviderConfig::new(ProviderKind::default(), "")));
    let mut status = use_signal(|| FormStatus::Idle);

    {
        let config = config.clone();
        use_future(move || {
            let config = config.clone();
            async move {
                let kind = match config.global_settings().await {
                    Ok(settings) => settings.selected_provider,
                    Err(_) => ProviderKind::default(),
                };
                form.set(load_form(&config, kind).await);
            }
        });
    }

    let switch_provider = {
        let config = config.clone();
        move |evt: FormEvent| {
            let Ok(kind) = evt.value().parse::<ProviderKind>() else {
                return;
            };
            let config = config.clone();
            status.set(FormStatus::Idle);
            spawn(async move {
                form.set(load_form(&config, kind).await);
            });
        }
    };

    let save = {
        let config = config.clone();
        move |_| {
            let config = config.clone();
            let draft = form();
            spawn(async move {
                match save_form(&config, &draft).await {
                    Ok(()) => status.set(FormStatus::Saved),
                    Err(err) => status.set(FormStatus::Invalid(err.to_string())),
                }
            });
        }
    };

    let current = form();

    rsx! {
        div { class: "panel-body",
            div { class: "settings-section",
                h3 { class: "section-title", "Provider" }
                label { class: "field",
                    "Service"
                    select {
                        value: "{current.provider.id()}",
                        onchange: switch_provider,
                        for kind in ProviderKind::ALL {
                            option { key: "{kind.id()}", value: "{kind.id()}", "{kind.display_name()}" }
                        }
                    }
                }
                label { class: "field",
                    "Base URL"
                    input {
                        r#type: "url", value: "{current.base_url}",
                        oninput: move |ev| form.with_mut(|f| f.base_url = ev.value()),
                    }
                }
                label { class: "field",
                    "API key"
                    input {
                        r#type: "password", value: "{current.api_key}",
                        oninput: move |ev| form.with_mut(|f| f.api_key = ev.value()),
                    }
                }
                label { class: "field",
                    "Model"
                    input {
                        r#type: "text", value: "{current.model}",
                        oninput: move |ev| form.with_mut(|f| f.model = ev.value()),
                    }
                }
                div { class: "hstack",
                    label { class: "field",
                        "Max tokens"
                        input {
                            r#type: "number", value: "{current.max_tokens}",
                            oninput: move |ev| form.with_mut(|f| f.max_tokens = ev.value()),
                        }
                    }
                    label { class: "field",
                        "Temperature"
                        input {
                            r#type: "number", step: "0.1", value: "{current.temperature}",
                            oninput: move |ev| form.with_mut(|f| f.temperature = ev.value()),
                        }
                    }
                }
                div { class: "hstack",
                    button { class: "btn btn-primary", r#type: "button", onclick: save, "Save" }
                    {match status() {
                        FormStatus::Idle => rsx! {},
                        FormStatus::Saved => rsx! { span { class: "form-status", "Saved" } },
                        FormStatus::Invalid(message) => rsx! {
                            span { class: "form-status error", role: "alert", "{message}" }
                        },
                    }}
                }
            }
            div { class: "settings-section",
                h3 { class: "section-title", "Display" }
                div { class: "theme-toggle",
                    for mode in [ThemeMode::Light, ThemeMode::Dark] {
                        button {
                            key: "{theme_definition(mode).label}",
                            class: format_args!(
                                "btn theme-option {}",
                                if theme() == mode { "active" } else { "" }
                            ),
                            r#type: "button",
                            onclick: move |_| theme.set(mode),
                            "{theme_definition(mode).label}"
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_rejects_non_numeric_fields() {
        let mut form = ProviderForm::from(ProviderConfig::new(ProviderKind::DeepSeek, "sk"));
        form.max_tokens = "lots".into();
        assert!(matches!(form.to_config(), Err(Error::Validation(_))));
    }

    #[test]
    fn form_round_trips_config() {
        let config = ProviderConfig::new(ProviderKind::OpenAI, "sk-test");
        let form = ProviderForm::from(config.clone());
        assert_eq!(form.to_config().unwrap(), config);
    }
}
