//! Configuration loading, validation, and management for chatforge.
//!
//! Loads configuration from `~/.chatforge/config.toml` with environment
//! variable overrides. Validates all settings at startup. Settings the user
//! changes at runtime (completion mode, text templates) live in the
//! key-value store instead; see [`settings`].

pub mod settings;

pub use settings::{CompletionMode, CompletionSettings, MarkerPair, TemplateMarkers, TextTemplate};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.chatforge/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root of the file-backed key-value store
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Completion mode and text-completion templates
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Tool loop settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// End-user identity
    #[serde(default)]
    pub user: UserConfig,

    /// Tokenizer vocabulary
    #[serde(default)]
    pub tokenizer: TokenizerConfig,
}

fn default_data_dir() -> PathBuf {
    AppConfig::config_dir().join("data")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Used when the store has no `ApiSettings/CompletionType`
    #[serde(default)]
    pub mode: CompletionMode,

    /// Used when the store has no `ApiSettings/textCompletionSettings`
    #[serde(default = "default_templates")]
    pub templates: Vec<TextTemplate>,

    #[serde(default)]
    pub selected_template: usize,
}

fn default_templates() -> Vec<TextTemplate> {
    vec![
        TextTemplate::new(
            "ChatML",
            "<|im_start|>system\n<|><|im_end|>\n",
            "<|im_start|>user\n<|><|im_end|>\n",
            "<|im_start|>assistant\n<|><|im_end|>\n",
        ),
        TextTemplate::new(
            "Alpaca",
            "<|>\n\n",
            "### Instruction:\n<|>\n\n",
            "### Response:\n<|>\n\n",
        ),
    ]
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            mode: CompletionMode::default(),
            templates: default_templates(),
            selected_template: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Upper bound on tool-loop rounds; unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<usize>,

    /// Text reported when a tool call produces no result
    #[serde(default = "default_missing_result_text")]
    pub missing_result_text: String,
}

fn default_missing_result_text() -> String {
    "[No result]".into()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_rounds: None,
            missing_result_text: default_missing_result_text(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// Fallback for `{{user}}` when the store has no `User/username`
    #[serde(default = "default_username")]
    pub username: String,
}

fn default_username() -> String {
    "User".into()
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// Fallback vocabulary path when the store has no `Tokenize/local_vocab_path`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocab_path: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.chatforge/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `CHATFORGE_DATA_DIR`
    /// - `CHATFORGE_COMPLETION_MODE` (`chat` or `text`)
    /// - `CHATFORGE_VOCAB_PATH`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(dir) = std::env::var("CHATFORGE_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(mode) = std::env::var("CHATFORGE_COMPLETION_MODE") {
            self.completion.mode = mode.parse().map_err(ConfigError::ValidationError)?;
        }
        if let Ok(path) = std::env::var("CHATFORGE_VOCAB_PATH") {
            self.tokenizer.vocab_path = Some(path);
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".chatforge")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.max_rounds == Some(0) {
            return Err(ConfigError::ValidationError(
                "generation.max_rounds must be at least 1".into(),
            ));
        }

        if self.user.username.trim().is_empty() {
            return Err(ConfigError::ValidationError("user.username must not be empty".into()));
        }

        for template in &self.completion.templates {
            template.markers()?;
        }

        if self.completion.mode == CompletionMode::Text
            && self.completion.selected_template >= self.completion.templates.len()
        {
            return Err(ConfigError::TemplateNotFound(self.completion.selected_template));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `init`).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            completion: CompletionConfig::default(),
            generation: GenerationConfig::default(),
            user: UserConfig::default(),
            tokenizer: TokenizerConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Text template {name:?} has no '<|>' delimiter in its {field} field")]
    InvalidTemplate { name: String, field: &'static str },

    #[error("No text completion template at index {0}")]
    TemplateNotFound(usize),
}
