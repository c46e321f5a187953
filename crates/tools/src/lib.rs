//! Tool service and built-in tools for chatforge.
//!
//! Tools are registered explicitly in a [`ToolRegistry`]; the
//! [`RegistryToolService`] exposes only those the user has enabled.
//!
//! - `VariableTool`: get/set/delete/list/search agent and chat variables
//! - `set_chat_name`: rename the current chat

pub mod chat_name;
pub mod service;
pub mod variable;

pub use chat_name::SetChatNameTool;
pub use service::RegistryToolService;
pub use variable::VariableTool;

use chatforge_core::KvStore;
use chatforge_core::tool::ToolRegistry;
use chatforge_store::{ChatStore, VariableStore};
use std::sync::Arc;

/// A registry with every built-in tool, persisting through `kv`.
pub fn default_registry(kv: Arc<dyn KvStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(VariableTool::new(VariableStore::new(kv.clone()))));
    registry.register(Arc::new(SetChatNameTool::new(ChatStore::new(kv))));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatforge_store::InMemoryKvStore;

    #[test]
    fn default_registry_has_builtins() {
        let registry = default_registry(Arc::new(InMemoryKvStore::new()));
        assert_eq!(registry.names(), vec!["VariableTool", "set_chat_name"]);
    }
}
