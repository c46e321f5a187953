//! Context modifier pipeline.
//!
//! A modifier is a named transformation of the in-progress [`PromptBuffer`]
//! (trimming, rule-driven injection, macro substitution). The user activates
//! modifiers in an ordered, persisted list; [`ContextPipeline::apply`] runs
//! them in that order over a freshly built buffer.
//!
//! ```text
//! PromptBuffer ──▶ LatestN ──▶ DynPrompt ──▶ ST Style Macro ──▶ PromptBuffer
//!                  "20"        "fantasy"     ""
//! ```
//!
//! Entries naming a modifier that is not registered are skipped. Any error
//! from a modifier aborts the whole pipeline.
//!
//! [`PromptBuffer`]: chatforge_core::PromptBuffer

pub mod modifier;
pub mod modifiers;
pub mod pairing;
pub mod service;
pub mod tokenizer;

pub use modifier::{ContextModifier, ModifierInfo, ModifierRegistry};
pub use modifiers::builtin_registry;
pub use service::{ActivatedModifier, ContextPipeline};
pub use tokenizer::{TokenizerCache, TokenizerLoader};

use chatforge_core::error::{StoreError, TokenizerError};

/// Failure of a single modifier.
#[derive(Debug, thiserror::Error)]
pub enum ModifierError {
    #[error("invalid input {input:?}: {reason}")]
    InvalidInput { input: String, reason: String },

    #[error("{0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),

    #[error("{0}")]
    Other(String),
}

impl ModifierError {
    pub fn invalid_input(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors from managing or running the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("modifier '{name}' failed: {source}")]
    Modifier {
        name: String,
        #[source]
        source: ModifierError,
    },

    #[error("no modifier registered as '{0}'")]
    UnknownModifier(String),

    #[error("modifier name conflict: '{0}' is already registered")]
    DuplicateModifier(String),

    #[error("index {index} out of range for {len} activated modifiers")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
