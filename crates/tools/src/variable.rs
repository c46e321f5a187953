//! Variable tool: lets the model read and write agent and chat variables.

use async_trait::async_trait;
use chatforge_core::error::ToolError;
use chatforge_core::tool::{Tool, ToolContext, ToolDefinition};
use chatforge_store::{Variable, VariableScope, VariableStore, VariableValue};
use serde::Deserialize;
use std::fmt::Write as _;

pub struct VariableTool {
    store: VariableStore,
}

impl VariableTool {
    pub fn new(store: VariableStore) -> Self {
        Self { store }
    }
}

#[derive(Debug, Deserialize)]
struct VariableAction {
    action: String,
    #[serde(default)]
    name: Option<String>,
    /// Models sometimes send numbers unquoted.
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default, rename = "type")]
    type_name: Option<String>,
}

impl VariableAction {
    fn name(&self, action: &str) -> Result<&str, ToolError> {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments(format!("variable name is required for '{action}'")))
    }

    fn scope(&self) -> VariableScope {
        self.scope
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    fn raw_value(&self) -> Option<String> {
        match self.value.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Canonical type for the names a model may use.
fn canonical_type(type_name: Option<&str>) -> &'static str {
    match type_name.map(|t| t.to_ascii_lowercase()).as_deref() {
        Some("float" | "double") => "float",
        Some("int" | "integer") => "int",
        _ => "string",
    }
}

fn listing(header: String, variables: &[&Variable]) -> String {
    let mut out = header;
    out.push_str("\n\n");
    for v in variables {
        let _ = writeln!(out, "[{}] {} ({}) = {}", v.scope, v.name, v.value.type_name(), v.value);
    }
    out
}

impl VariableTool {
    async fn get(&self, action: &VariableAction, ctx: &ToolContext<'_>) -> Result<String, ToolError> {
        let name = action.name("get")?;
        let all = self.store.aggregated(&ctx.chat.id.0, &ctx.agent.id).await?;
        let Some(v) = all.get(name) else {
            return Ok(format!("Variable '{name}' not found."));
        };
        Ok(format!(
            "Variable: {}\nScope: {}\nType: {}\nValue: {}\nCreated: {}\nUpdated: {}",
            v.name,
            v.scope,
            v.value.type_name(),
            v.value,
            v.created_at.format("%Y-%m-%d %H:%M:%S"),
            v.updated_at.format("%Y-%m-%d %H:%M:%S"),
        ))
    }

    async fn set(&self, action: &VariableAction, ctx: &ToolContext<'_>) -> Result<String, ToolError> {
        let name = action.name("set")?;
        let raw = action
            .raw_value()
            .ok_or_else(|| ToolError::InvalidArguments("variable value is required for 'set'".into()))?;
        let value = VariableValue::parse(canonical_type(action.type_name.as_deref()), &raw)
            .map_err(ToolError::InvalidArguments)?;
        let scope = action.scope();
        let owner = owner_id(scope, ctx);

        let variable = match self.store.get(scope, owner, name).await? {
            Some(mut existing) => {
                existing.set_value(value);
                existing
            }
            None => Variable::new(name, value),
        };
        let summary = format!(
            "Variable '{name}' set successfully in {scope} scope. Type: {}, Value: {}",
            variable.value.type_name(),
            variable.value
        );
        self.store.set(scope, owner, variable).await?;
        Ok(summary)
    }

    async fn delete(&self, action: &VariableAction, ctx: &ToolContext<'_>) -> Result<String, ToolError> {
        let name = action.name("delete")?;
        let scope = action.scope();
        if self.store.remove(scope, owner_id(scope, ctx), name).await? {
            Ok(format!("Variable '{name}' deleted from {scope} scope."))
        } else {
            Ok(format!("Variable '{name}' not found in {scope} scope."))
        }
    }

    async fn list(&self, action: &VariableAction, ctx: &ToolContext<'_>) -> Result<String, ToolError> {
        let all = self.store.aggregated(&ctx.chat.id.0, &ctx.agent.id).await?;
        let filter = action.scope.as_deref().filter(|s| !s.is_empty()).map(|_| action.scope());
        let selected: Vec<&Variable> = all
            .iter()
            .filter(|v| filter.is_none_or(|scope| v.scope == scope))
            .collect();
        if selected.is_empty() {
            return Ok("No variables found.".into());
        }
        Ok(listing(format!("Found {} variable(s):", selected.len()), &selected))
    }

    async fn search(&self, action: &VariableAction, ctx: &ToolContext<'_>) -> Result<String, ToolError> {
        let pattern = action.name("search")?;
        let needle = pattern.to_lowercase();
        let all = self.store.aggregated(&ctx.chat.id.0, &ctx.agent.id).await?;
        let matched: Vec<&Variable> = all
            .iter()
            .filter(|v| v.name.to_lowercase().contains(&needle))
            .collect();
        if matched.is_empty() {
            return Ok(format!("No variables found matching pattern '{pattern}'."));
        }
        Ok(listing(
            format!("Found {} variable(s) matching '{pattern}':", matched.len()),
            &matched,
        ))
    }
}

fn owner_id<'a>(scope: VariableScope, ctx: &'a ToolContext<'_>) -> &'a str {
    match scope {
        VariableScope::Agent => &ctx.agent.id,
        VariableScope::Chat => &ctx.chat.id.0,
    }
}

#[async_trait]
impl Tool for VariableTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "VariableTool".into(),
            description: "Manage variables in the conversation: get, set, delete, list, or search by name. \
                          Variables are scoped to the agent (shared by all its chats) or to the current chat."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ["get", "set", "delete", "list", "search"],
                        "description": "The action to perform"
                    },
                    "name": {
                        "type": "string",
                        "description": "Variable name; the search pattern for 'search'"
                    },
                    "value": {
                        "type": "string",
                        "description": "Value to store, required for 'set'"
                    },
                    "scope": {
                        "type": "string",
                        "enum": ["agent", "chat"],
                        "description": "Variable scope. Default: chat"
                    },
                    "type": {
                        "type": "string",
                        "enum": ["string", "int", "float"],
                        "description": "Value type for 'set'. Default: string"
                    }
                },
                "required": ["action"]
            }),
        }
    }

    async fn execute(&self, arguments: &str, ctx: &ToolContext<'_>) -> Result<String, ToolError> {
        let action: VariableAction =
            serde_json::from_str(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        match action.action.to_ascii_lowercase().as_str() {
            "get" => self.get(&action, ctx).await,
            "set" => self.set(&action, ctx).await,
            "delete" => self.delete(&action, ctx).await,
            "list" => self.list(&action, ctx).await,
            "search" => self.search(&action, ctx).await,
            other => Err(ToolError::InvalidArguments(format!(
                "unknown action '{other}', expected get, set, delete, list or search"
            ))),
        }
    }
}
