//! Prompt templates: storage, resolution and placeholder filling.

use crate::config::ConfigStore;
use crate::error::{Error, Result};
use crate::storage::{Storage, keys};
use crate::types::now_millis;
use serde::{Deserialize, Serialize};

pub const TITLE_PLACEHOLDER: &str = "{title}";
pub const CONTENT_PLACEHOLDER: &str = "{content}";
pub const DEFAULT_TEMPLATE_ID: &str = "default";

pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"Please summarize the following web page.

Title: {title}

Content:
{content}

Respond in markdown with:
1. A concise summary of two or three sentences
2. A "Key points" section with 3-5 bullet points
3. Any important conclusions or takeaways

Write the summary in the same language as the page content."#;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptTemplate {
    pub id: String,
    pub name: String,
    pub template: String,
    pub is_default: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PromptTemplate {
    fn builtin() -> Self {
        let now = now_millis();
        Self {
            id: DEFAULT_TEMPLATE_ID.to_string(),
            name: "Default summary".to_string(),
            template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            is_default: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Replace every `{title}` and `{content}` literally.
pub fn fill_template(template: &str, title: &str, content: &str) -> String {
    template
        .replace(TITLE_PLACEHOLDER, title)
        .replace(CONTENT_PLACEHOLDER, content)
}

pub fn validate_template(name: &str, template: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation("Template name is required".into()));
    }
    for placeholder in [TITLE_PLACEHOLDER, CONTENT_PLACEHOLDER] {
        if !template.contains(placeholder) {
            return Err(Error::Validation(format!(
                "Template must contain the {placeholder} placeholder"
            )));
        }
    }
    Ok(())
}

/// Template collection under `promptTemplates`, plus the selected id.
///
/// The selection lives under `selectedPromptId` and is mirrored into
/// `globalSettings`; both are written together.
#[derive(Clone)]
pub struct PromptStore {
    storage: Storage,
}

impl PromptStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// All templates; seeds the built-in default on first use.
    pub async fn list(&self) -> Result<Vec<PromptTemplate>> {
        let templates: Vec<PromptTemplate> =
            self.storage.get(keys::PROMPT_TEMPLATES, Vec::new()).await?;
        if !templates.is_empty() {
            return Ok(templates);
        }
        let seeded = vec![PromptTemplate::builtin()];
        self.save_all(&seeded).await?;
        Ok(seeded)
    }

    pub async fn get(&self, id: &str) -> Result<Option<PromptTemplate>> {
        Ok(self.list().await?.into_iter().find(|t| t.id == id))
    }

    pub async fn default_template(&self) -> Result<PromptTemplate> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|t| t.is_default)
            .unwrap_or_else(PromptTemplate::builtin))
    }

    pub async fn create(&self, name: &str, template: &str) -> Result<PromptTemplate> {
        validate_template(name, template)?;
        let mut templates = self.list().await?;
        let now = now_millis();
        let created = PromptTemplate {
            id: unique_id(&templates, now),
            name: name.trim().to_string(),
            template: template.to_string(),
            is_default: false,
            created_at: now,
            updated_at: now,
        };
        templates.push(created.clone());
        self.save_all(&templates).await?;
        Ok(created)
    }

    pub async fn update(
        &self,
        id: &str,
        name: Option<&str>,
        template: Option<&str>,
    ) -> Result<PromptTemplate> {
        let mut templates = self.list().await?;
        let existing = templates
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(format!("prompt template '{id}'")))?;

        let next_name = name.unwrap_or(&existing.name).trim().to_string();
        let next_template = template.unwrap_or(&existing.template).to_string();
        validate_template(&next_name, &next_template)?;

        existing.name = next_name;
        existing.template = next_template;
        existing.updated_at = now_millis();
        let updated = existing.clone();
        self.save_all(&templates).await?;
        Ok(updated)
    }

    /// Delete a template. The default template cannot be deleted.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut templates = self.list().await?;
        let index = templates
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(format!("prompt template '{id}'")))?;
        if templates[index].is_default {
            return Err(Error::Validation(
                "The default template cannot be deleted".into(),
            ));
        }
        templates.remove(index);
        self.save_all(&templates).await?;

        if self.selected_id().await?.as_deref() == Some(id) {
            self.storage.remove(keys::SELECTED_PROMPT_ID).await?;
            self.settings().set_selected_prompt_id(None).await?;
        }
        Ok(())
    }

    pub async fn set_default(&self, id: &str) -> Result<()> {
        let mut templates = self.list().await?;
        if !templates.iter().any(|t| t.id == id) {
            return Err(Error::NotFound(format!("prompt template '{id}'")));
        }
        for template in templates.iter_mut() {
            template.is_default = template.id == id;
        }
        self.save_all(&templates).await
    }

    pub async fn selected_id(&self) -> Result<Option<String>> {
        self.storage.get_opt(keys::SELECTED_PROMPT_ID).await
    }

    pub async fn select(&self, id: &str) -> Result<()> {
        if self.get(id).await?.is_none() {
            return Err(Error::NotFound(format!("prompt template '{id}'")));
        }
        self.storage.set(keys::SELECTED_PROMPT_ID, id).await?;
        self.settings().set_selected_prompt_id(Some(id)).await
    }

    /// Inline text wins over a stored template, which wins over the default one.
    pub async fn resolve_prompt_template(
        &self,
        prompt_id: Option<&str>,
        inline: Option<&str>,
    ) -> Result<String> {
        if let Some(inline) = inline.filter(|t| !t.trim().is_empty()) {
            return Ok(inline.to_string());
        }
        if let Some(id) = prompt_id {
            match self.get(id).await? {
                Some(template) => return Ok(template.template),
                None => tracing::warn!(prompt_id = id, "unknown prompt template, using default"),
            }
        }
        Ok(self.default_template().await?.template)
    }

    fn settings(&self) -> ConfigStore {
        ConfigStore::new(self.storage.clone())
    }

    async fn save_all(&self, templates: &[PromptTemplate]) -> Result<()> {
        self.storage.set(keys::PROMPT_TEMPLATES, templates).await
    }
}

fn unique_id(templates: &[PromptTemplate], now: i64) -> String {
    let mut stamp = now;
    loop {
        let candidate = format!("tpl-{stamp}");
        if !templates.iter().any(|t| t.id == candidate) {
            return candidate;
        }
        stamp += 1;
    }
}
