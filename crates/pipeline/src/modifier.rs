//! Context modifier contract and registry.

use crate::{ModifierError, PipelineError};
use async_trait::async_trait;
use chatforge_core::{Agent, Chat, PromptBuffer};
use std::sync::Arc;

/// Name and description shown when listing modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifierInfo {
    pub name: &'static str,
    pub description: &'static str,
}

/// A named transformation of the prompt buffer.
///
/// `input` is the user-configured value of the activated entry; its format
/// is up to the modifier. Returning an error aborts the whole assembly.
#[async_trait]
pub trait ContextModifier: Send + Sync {
    fn info(&self) -> ModifierInfo;

    async fn apply(
        &self,
        buffer: &mut PromptBuffer,
        input: &str,
        chat: &Chat,
        agent: &Agent,
    ) -> Result<(), ModifierError>;
}

/// Explicit name → modifier map. Names compare case-insensitively.
#[derive(Default, Clone)]
pub struct ModifierRegistry {
    modifiers: Vec<Arc<dyn ContextModifier>>,
}

impl ModifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a modifier. A second modifier with the same name is an error.
    pub fn register(&mut self, modifier: Arc<dyn ContextModifier>) -> Result<(), PipelineError> {
        let name = modifier.info().name;
        if self.get(name).is_some() {
            return Err(PipelineError::DuplicateModifier(name.to_string()));
        }
        self.modifiers.push(modifier);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ContextModifier>> {
        self.modifiers
            .iter()
            .find(|m| m.info().name.eq_ignore_ascii_case(name))
    }

    /// Info of every registered modifier, in registration order.
    pub fn infos(&self) -> Vec<ModifierInfo> {
        self.modifiers.iter().map(|m| m.info()).collect()
    }

    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }
}
