//! Completion settings persisted in the key-value store.
//!
//! Space `ApiSettings` holds:
//! - `CompletionType`: `0`/`chat` or `1`/`text`
//! - `textCompletionSettings`: JSON list of [`TextTemplate`]s
//! - `selectedTCS`: index of the active template
//!
//! Any missing or unreadable key falls back to [`CompletionConfig`].

use crate::{CompletionConfig, ConfigError};
use chatforge_core::error::StoreError;
use chatforge_core::kv::{KvStore, read_json};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

pub const API_SETTINGS_SPACE: &str = "ApiSettings";
pub const COMPLETION_TYPE_KEY: &str = "CompletionType";
pub const TEMPLATES_KEY: &str = "textCompletionSettings";
pub const SELECTED_TEMPLATE_KEY: &str = "selectedTCS";

/// Delimiter between a template's prefix and suffix.
pub const TEMPLATE_DELIMITER: &str = "<|>";

/// Whether generation talks to a chat endpoint (with tools) or renders a flat
/// text prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionMode {
    #[default]
    Chat,
    Text,
}

impl FromStr for CompletionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_matches('"').to_ascii_lowercase().as_str() {
            "0" | "chat" | "chatcompletion" => Ok(CompletionMode::Chat),
            "1" | "text" | "textcompletion" => Ok(CompletionMode::Text),
            other => Err(format!("unknown completion mode: {other:?}")),
        }
    }
}

impl fmt::Display for CompletionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionMode::Chat => f.write_str("chat"),
            CompletionMode::Text => f.write_str("text"),
        }
    }
}

/// Prefix/suffix markers wrapped around one role's text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerPair {
    pub prefix: String,
    pub suffix: String,
}

impl MarkerPair {
    pub fn wrap(&self, text: &str) -> String {
        format!("{}{}{}", self.prefix, text, self.suffix)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateMarkers {
    pub system: MarkerPair,
    pub user: MarkerPair,
    pub assistant: MarkerPair,
}

/// A named text-completion template. Each field is `prefix<|>suffix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextTemplate {
    pub name: String,
    #[serde(alias = "SystemMessageTemplate")]
    pub system: String,
    #[serde(alias = "UserMessageTemplate")]
    pub user: String,
    #[serde(alias = "CharMessageTemplate")]
    pub assistant: String,
}

impl TextTemplate {
    pub fn new(
        name: impl Into<String>,
        system: impl Into<String>,
        user: impl Into<String>,
        assistant: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            system: system.into(),
            user: user.into(),
            assistant: assistant.into(),
        }
    }

    /// Split every field on the first `<|>`.
    pub fn markers(&self) -> Result<TemplateMarkers, ConfigError> {
        let split = |field: &'static str, value: &str| {
            value
                .split_once(TEMPLATE_DELIMITER)
                .map(|(prefix, suffix)| MarkerPair {
                    prefix: prefix.to_string(),
                    suffix: suffix.to_string(),
                })
                .ok_or_else(|| ConfigError::InvalidTemplate {
                    name: self.name.clone(),
                    field,
                })
        };
        Ok(TemplateMarkers {
            system: split("system", &self.system)?,
            user: split("user", &self.user)?,
            assistant: split("assistant", &self.assistant)?,
        })
    }
}

/// The effective completion settings for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSettings {
    pub mode: CompletionMode,
    pub templates: Vec<TextTemplate>,
    pub selected_template: usize,
}

impl CompletionSettings {
    pub fn from_config(config: &CompletionConfig) -> Self {
        Self {
            mode: config.mode,
            templates: config.templates.clone(),
            selected_template: config.selected_template,
        }
    }

    /// Read persisted settings, falling back to `fallback` per key.
    pub async fn load(kv: &dyn KvStore, fallback: &CompletionConfig) -> Result<Self, StoreError> {
        let mut settings = Self::from_config(fallback);

        if let Some(raw) = kv.read(API_SETTINGS_SPACE, COMPLETION_TYPE_KEY).await? {
            match raw.parse() {
                Ok(mode) => settings.mode = mode,
                Err(e) => warn!(error = %e, "Ignoring persisted completion type"),
            }
        }

        if let Some(templates) = read_json::<Vec<TextTemplate>>(kv, API_SETTINGS_SPACE, TEMPLATES_KEY).await? {
            settings.templates = templates;
        }

        if let Some(raw) = kv.read(API_SETTINGS_SPACE, SELECTED_TEMPLATE_KEY).await? {
            match raw.trim().parse() {
                Ok(index) => settings.selected_template = index,
                Err(e) => warn!(value = %raw, error = %e, "Ignoring persisted template index"),
            }
        }

        Ok(settings)
    }

    /// Persist the completion mode.
    pub async fn save_mode(kv: &dyn KvStore, mode: CompletionMode) -> Result<(), StoreError> {
        let raw = match mode {
            CompletionMode::Chat => "0",
            CompletionMode::Text => "1",
        };
        kv.write(API_SETTINGS_SPACE, COMPLETION_TYPE_KEY, raw).await
    }

    /// The selected template's markers.
    pub fn active_markers(&self) -> Result<TemplateMarkers, ConfigError> {
        self.templates
            .get(self.selected_template)
            .ok_or(ConfigError::TemplateNotFound(self.selected_template))?
            .markers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatforge_store::InMemoryKvStore;

    #[test]
    fn mode_parses_labels_and_numbers() {
        assert_eq!("0".parse::<CompletionMode>().unwrap(), CompletionMode::Chat);
        assert_eq!("1".parse::<CompletionMode>().unwrap(), CompletionMode::Text);
        assert_eq!("Text".parse::<CompletionMode>().unwrap(), CompletionMode::Text);
        assert!("2".parse::<CompletionMode>().is_err());
    }

    #[test]
    fn markers_split_on_delimiter() {
        let t = TextTemplate::new("t", "[SYS]<|>[/SYS]", "<|>\n", "AI: <|>");
        let m = t.markers().unwrap();
        assert_eq!(m.system.prefix, "[SYS]");
        assert_eq!(m.system.suffix, "[/SYS]");
        assert_eq!(m.user.prefix, "");
        assert_eq!(m.user.suffix, "\n");
        assert_eq!(m.assistant.wrap("hi"), "AI: hi");
    }

    #[test]
    fn chatml_markers_keep_inner_pipes() {
        let t = TextTemplate::new(
            "ChatML",
            "<|im_start|>system\n<|><|im_end|>\n",
            "<|im_start|>user\n<|><|im_end|>\n",
            "<|im_start|>assistant\n<|><|im_end|>\n",
        );
        let m = t.markers().unwrap();
        assert_eq!(m.user.prefix, "<|im_start|>user\n");
        assert_eq!(m.user.suffix, "<|im_end|>\n");
    }

    #[test]
    fn legacy_field_names_accepted() {
        let json = r#"[{"name":"x","SystemMessageTemplate":"a<|>b","UserMessageTemplate":"c<|>d","CharMessageTemplate":"e<|>f"}]"#;
        let templates: Vec<TextTemplate> = serde_json::from_str(json).unwrap();
        assert_eq!(templates[0].assistant, "e<|>f");
    }

    #[tokio::test]
    async fn load_falls_back_to_config() {
        let kv = InMemoryKvStore::new();
        let settings = CompletionSettings::load(&kv, &CompletionConfig::default()).await.unwrap();
        assert_eq!(settings.mode, CompletionMode::Chat);
        assert_eq!(settings.selected_template, 0);
        assert_eq!(settings.active_markers().unwrap().assistant.prefix, "<|im_start|>assistant\n");
    }

    #[tokio::test]
    async fn load_prefers_persisted_values() {
        let kv = InMemoryKvStore::new();
        CompletionSettings::save_mode(&kv, CompletionMode::Text).await.unwrap();
        kv.write(
            API_SETTINGS_SPACE,
            TEMPLATES_KEY,
            r#"[{"name":"only","system":"S<|>","user":"U<|>","assistant":"A<|>"}]"#,
        )
        .await
        .unwrap();
        kv.write(API_SETTINGS_SPACE, SELECTED_TEMPLATE_KEY, "0").await.unwrap();

        let settings = CompletionSettings::load(&kv, &CompletionConfig::default()).await.unwrap();
        assert_eq!(settings.mode, CompletionMode::Text);
        assert_eq!(settings.templates.len(), 1);
        assert_eq!(settings.active_markers().unwrap().system.prefix, "S");
    }

    #[tokio::test]
    async fn bad_index_is_template_not_found() {
        let kv = InMemoryKvStore::new();
        kv.write(API_SETTINGS_SPACE, SELECTED_TEMPLATE_KEY, "7").await.unwrap();
        let settings = CompletionSettings::load(&kv, &CompletionConfig::default()).await.unwrap();
        assert!(matches!(settings.active_markers(), Err(ConfigError::TemplateNotFound(7))));
    }
}
