//! The persisted activated-modifier list and the pipeline driver.

use crate::modifier::ModifierRegistry;
use crate::PipelineError;
use chatforge_core::kv::{read_json, read_json_strict, write_json};
use chatforge_core::{Agent, Chat, KvStore, PromptBuffer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

pub const SERVICE_SPACE: &str = "ContextModifierService";
pub const ACTIVATED_KEY: &str = "activated_modifiers";

/// One step of the pipeline: a modifier name and its configured input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivatedModifier {
    #[serde(alias = "Name")]
    pub name: String,

    #[serde(default, alias = "Value", alias = "value")]
    pub input: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ActivatedModifier {
    pub fn new(name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
            enabled: true,
        }
    }
}

/// Runs the activated modifiers over a prompt buffer and manages the list.
///
/// The list is read from the store on every call. Concurrent writers must
/// be serialized by the caller.
#[derive(Clone)]
pub struct ContextPipeline {
    registry: Arc<ModifierRegistry>,
    kv: Arc<dyn KvStore>,
}

impl ContextPipeline {
    pub fn new(registry: ModifierRegistry, kv: Arc<dyn KvStore>) -> Self {
        Self {
            registry: Arc::new(registry),
            kv,
        }
    }

    pub fn registry(&self) -> &ModifierRegistry {
        &self.registry
    }

    /// The persisted list. A miss or corrupt value is an empty list.
    pub async fn activated(&self) -> Result<Vec<ActivatedModifier>, PipelineError> {
        Ok(read_json(self.kv.as_ref(), SERVICE_SPACE, ACTIVATED_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn activated_for_update(&self) -> Result<Vec<ActivatedModifier>, PipelineError> {
        Ok(read_json_strict(self.kv.as_ref(), SERVICE_SPACE, ACTIVATED_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn save(&self, list: &[ActivatedModifier]) -> Result<(), PipelineError> {
        write_json(self.kv.as_ref(), SERVICE_SPACE, ACTIVATED_KEY, &list).await?;
        Ok(())
    }

    /// Append an entry. The name must be registered.
    pub async fn activate(&self, name: &str, input: &str) -> Result<(), PipelineError> {
        let modifier = self
            .registry
            .get(name)
            .ok_or_else(|| PipelineError::UnknownModifier(name.to_string()))?;
        let mut list = self.activated_for_update().await?;
        list.push(ActivatedModifier::new(modifier.info().name, input));
        self.save(&list).await?;
        info!(modifier = name, input, "Modifier activated");
        Ok(())
    }

    pub async fn remove(&self, index: usize) -> Result<ActivatedModifier, PipelineError> {
        let mut list = self.activated_for_update().await?;
        check_index(index, list.len())?;
        let removed = list.remove(index);
        self.save(&list).await?;
        Ok(removed)
    }

    /// Move the entry at `from` so that it ends up at `to`.
    pub async fn move_entry(&self, from: usize, to: usize) -> Result<(), PipelineError> {
        let mut list = self.activated_for_update().await?;
        check_index(from, list.len())?;
        check_index(to, list.len())?;
        let entry = list.remove(from);
        list.insert(to, entry);
        self.save(&list).await
    }

    pub async fn set_enabled(&self, index: usize, enabled: bool) -> Result<(), PipelineError> {
        let mut list = self.activated_for_update().await?;
        check_index(index, list.len())?;
        list[index].enabled = enabled;
        self.save(&list).await
    }

    pub async fn clear(&self) -> Result<(), PipelineError> {
        self.save(&[]).await
    }

    /// Run every enabled entry, in order, over `buffer`.
    ///
    /// Unregistered names are skipped. The first modifier error aborts the
    /// run and no buffer is returned.
    pub async fn apply(
        &self,
        mut buffer: PromptBuffer,
        chat: &Chat,
        agent: &Agent,
    ) -> Result<PromptBuffer, PipelineError> {
        let list = self.activated().await?;
        for entry in list.iter().filter(|e| e.enabled) {
            let Some(modifier) = self.registry.get(&entry.name) else {
                debug!(modifier = %entry.name, "Skipping unregistered modifier");
                continue;
            };
            modifier
                .apply(&mut buffer, &entry.input, chat, agent)
                .await
                .map_err(|source| PipelineError::Modifier {
                    name: entry.name.clone(),
                    source,
                })?;
            debug!(modifier = %entry.name, messages = buffer.messages.len(), "Modifier applied");
        }
        Ok(buffer)
    }
}

fn check_index(index: usize, len: usize) -> Result<(), PipelineError> {
    if index < len {
        Ok(())
    } else {
        Err(PipelineError::IndexOutOfRange { index, len })
    }
}
