//! Tool traits: the abstraction over agent capabilities.
//!
//! A [`Tool`] is one callable capability. The [`ToolService`] is what the
//! orchestrator actually consumes: it lists the enabled definitions and
//! executes calls by name, answering `None` when no result is available.

use crate::agent::Agent;
use crate::error::ToolError;
use crate::message::Chat;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// Conversation context handed to a tool call.
#[derive(Debug, Clone, Copy)]
pub struct ToolContext<'a> {
    pub chat: &'a Chat,
    pub agent: &'a Agent,
}

/// A single callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and parameter schema.
    fn definition(&self) -> ToolDefinition;

    /// Execute with the model-supplied JSON arguments.
    async fn execute(&self, arguments: &str, ctx: &ToolContext<'_>) -> Result<String, ToolError>;

    fn name(&self) -> String {
        self.definition().name
    }
}

/// The tool capability consumed by the orchestrator.
#[async_trait]
pub trait ToolService: Send + Sync {
    /// Definitions of the tools currently enabled.
    async fn enabled_definitions(&self) -> Vec<ToolDefinition>;

    /// Execute a call. `None` means the tool produced no result.
    async fn execute(&self, name: &str, arguments: &str, chat: &Chat, agent: &Agent) -> Option<String>;
}

/// Explicit name → tool map.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// All definitions, ordered by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "echo".into(),
                description: "Echoes back the input".into(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"]
                }),
            }
        }

        async fn execute(&self, arguments: &str, _ctx: &ToolContext<'_>) -> Result<String, ToolError> {
            let args: serde_json::Value =
                serde_json::from_str(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
            Ok(args["text"].as_str().unwrap_or("").to_string())
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.names(), vec!["echo"]);
        assert_eq!(registry.definitions()[0].description, "Echoes back the input");
    }

    #[tokio::test]
    async fn tool_executes_with_context() {
        let chat = Chat::new("c");
        let agent = Agent::new("Iris", "");
        let ctx = ToolContext { chat: &chat, agent: &agent };
        let out = EchoTool.execute(r#"{"text":"hello world"}"#, &ctx).await.unwrap();
        assert_eq!(out, "hello world");

        let err = EchoTool.execute("not json", &ctx).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
