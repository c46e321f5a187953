//! Built-in context modifiers.

pub mod debug;
pub mod dyn_prompt;
pub mod macros;
pub mod token_budget;
pub mod variables;
pub mod window;

pub use debug::{MessagePrint, Print};
pub use dyn_prompt::{DynPrompt, DynPromptLibrary, DynPromptSet, DynPromptTerm, InjectionMode};
pub use macros::StStyleMacro;
pub use token_budget::TokenLimit;
pub use variables::VariableInject;
pub use window::LatestN;

use crate::modifier::ModifierRegistry;
use crate::tokenizer::TokenizerCache;
use crate::PipelineError;
use chatforge_core::KvStore;
use chatforge_store::VariableStore;
use std::sync::Arc;

/// A registry with every built-in modifier.
pub fn builtin_registry(
    kv: Arc<dyn KvStore>,
    tokenizers: Arc<TokenizerCache>,
    default_username: impl Into<String>,
) -> Result<ModifierRegistry, PipelineError> {
    let mut registry = ModifierRegistry::new();
    registry.register(Arc::new(LatestN))?;
    registry.register(Arc::new(TokenLimit::new(tokenizers)))?;
    registry.register(Arc::new(DynPrompt::new(DynPromptLibrary::new(kv.clone()))))?;
    registry.register(Arc::new(StStyleMacro::new(kv.clone(), default_username)))?;
    registry.register(Arc::new(VariableInject::new(VariableStore::new(kv))))?;
    registry.register(Arc::new(Print))?;
    registry.register(Arc::new(MessagePrint))?;
    Ok(registry)
}
