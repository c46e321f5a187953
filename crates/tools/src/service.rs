//! The tool capability: registered tools gated by a persisted enabled list.

use async_trait::async_trait;
use chatforge_core::error::{StoreError, ToolError};
use chatforge_core::kv::{read_json, read_json_strict, write_json};
use chatforge_core::tool::{ToolContext, ToolDefinition, ToolRegistry, ToolService};
use chatforge_core::{Agent, Chat, KvStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub const TOOL_SERVICE_SPACE: &str = "ToolService";
pub const ENABLED_TOOLS_KEY: &str = "enabled_tools";

/// Serves the enabled subset of a [`ToolRegistry`].
///
/// Enabled names are stored as a JSON list. Names that no longer match a
/// registered tool are ignored.
pub struct RegistryToolService {
    registry: ToolRegistry,
    kv: Arc<dyn KvStore>,
}

impl RegistryToolService {
    pub fn new(registry: ToolRegistry, kv: Arc<dyn KvStore>) -> Self {
        Self { registry, kv }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    async fn stored_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(read_json(self.kv.as_ref(), TOOL_SERVICE_SPACE, ENABLED_TOOLS_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Registered names from the persisted list. Corrupt data is an error.
    async fn names_for_update(&self) -> Result<Vec<String>, StoreError> {
        let stored: Option<Vec<String>> =
            read_json_strict(self.kv.as_ref(), TOOL_SERVICE_SPACE, ENABLED_TOOLS_KEY).await?;
        let mut names = stored.unwrap_or_default();
        names.retain(|n| self.registry.get(n).is_some());
        Ok(names)
    }

    /// Enabled tool names that are registered, in enable order.
    pub async fn enabled_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names = self.stored_names().await?;
        names.retain(|n| self.registry.get(n).is_some());
        Ok(names)
    }

    pub async fn is_enabled(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.enabled_names().await?.iter().any(|n| n == name))
    }

    /// Enable a registered tool. Returns `false` if it already was.
    pub async fn enable(&self, name: &str) -> Result<bool, ToolError> {
        if self.registry.get(name).is_none() {
            return Err(ToolError::NotFound(name.to_string()));
        }
        let mut names = self.names_for_update().await?;
        if names.iter().any(|n| n == name) {
            return Ok(false);
        }
        names.push(name.to_string());
        write_json(self.kv.as_ref(), TOOL_SERVICE_SPACE, ENABLED_TOOLS_KEY, &names).await?;
        info!(tool = name, "Tool enabled");
        Ok(true)
    }

    /// Disable a tool. Returns `false` if it was not enabled.
    pub async fn disable(&self, name: &str) -> Result<bool, StoreError> {
        let mut names = self.names_for_update().await?;
        let before = names.len();
        names.retain(|n| n != name);
        if names.len() == before {
            return Ok(false);
        }
        write_json(self.kv.as_ref(), TOOL_SERVICE_SPACE, ENABLED_TOOLS_KEY, &names).await?;
        info!(tool = name, "Tool disabled");
        Ok(true)
    }
}

#[async_trait]
impl ToolService for RegistryToolService {
    async fn enabled_definitions(&self) -> Vec<ToolDefinition> {
        match self.enabled_names().await {
            Ok(names) => names
                .iter()
                .filter_map(|n| self.registry.get(n))
                .map(|t| t.definition())
                .collect(),
            Err(e) => {
                warn!(error = %e, "Cannot read enabled tools, offering none");
                Vec::new()
            }
        }
    }

    async fn execute(&self, name: &str, arguments: &str, chat: &Chat, agent: &Agent) -> Option<String> {
        match self.is_enabled(name).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(tool = name, "Call to unknown or disabled tool");
                return None;
            }
            Err(e) => {
                warn!(tool = name, error = %e, "Cannot read enabled tools");
                return None;
            }
        }
        let tool = self.registry.get(name)?;

        let ctx = ToolContext { chat, agent };
        let started = Instant::now();
        let result = tool.execute(arguments, &ctx).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(output) => {
                info!(tool = name, duration_ms, "Tool executed");
                Some(output)
            }
            Err(e) => {
                warn!(tool = name, duration_ms, error = %e, "Tool failed");
                Some(format!("Error: {e}"))
            }
        }
    }
}
