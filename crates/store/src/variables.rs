//! Typed variables scoped to an agent or a chat.
//!
//! Agent variables live in space `AgentVariables` keyed by agent id, chat
//! variables in `ChatVariables` keyed by chat id. The aggregated view merges
//! both, with a chat variable overriding an agent variable of the same name.

use chatforge_core::error::StoreError;
use chatforge_core::kv::{KvStore, read_json, read_json_strict, write_json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const AGENT_VARIABLES_SPACE: &str = "AgentVariables";
pub const CHAT_VARIABLES_SPACE: &str = "ChatVariables";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableScope {
    Agent,
    #[default]
    Chat,
}

impl fmt::Display for VariableScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableScope::Agent => f.write_str("Agent"),
            VariableScope::Chat => f.write_str("Chat"),
        }
    }
}

impl FromStr for VariableScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "agent" => Ok(VariableScope::Agent),
            "chat" => Ok(VariableScope::Chat),
            other => Err(format!("unknown variable scope: {other}")),
        }
    }
}

/// A variable's typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum VariableValue {
    Float(f32),
    Int(i64),
    String(String),
}

impl VariableValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            VariableValue::Float(_) => "Float",
            VariableValue::Int(_) => "Int",
            VariableValue::String(_) => "String",
        }
    }

    /// Parse `raw` as a value of the named type (`float`, `int` or `string`).
    pub fn parse(type_name: &str, raw: &str) -> Result<Self, String> {
        match type_name.trim().to_ascii_lowercase().as_str() {
            "float" => raw
                .trim()
                .parse()
                .map(VariableValue::Float)
                .map_err(|e| format!("invalid float {raw:?}: {e}")),
            "int" => raw
                .trim()
                .parse()
                .map(VariableValue::Int)
                .map_err(|e| format!("invalid int {raw:?}: {e}")),
            "string" => Ok(VariableValue::String(raw.to_string())),
            other => Err(format!("unknown variable type: {other}")),
        }
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableValue::Float(v) => write!(f, "{v}"),
            VariableValue::Int(v) => write!(f, "{v}"),
            VariableValue::String(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(flatten)]
    pub value: VariableValue,
    #[serde(default)]
    pub scope: VariableScope,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: VariableValue) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            value,
            scope: VariableScope::Chat,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_value(&mut self, value: VariableValue) {
        self.value = value;
        self.updated_at = Utc::now();
    }
}

/// An ordered set of variables with case-insensitive names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableSet {
    #[serde(default)]
    pub variables: Vec<Variable>,
}

impl VariableSet {
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name.eq_ignore_ascii_case(name))
    }

    /// Insert or replace by name, keeping the original position on replace.
    pub fn set(&mut self, variable: Variable) {
        match self
            .variables
            .iter_mut()
            .find(|v| v.name.eq_ignore_ascii_case(&variable.name))
        {
            Some(existing) => *existing = variable,
            None => self.variables.push(variable),
        }
    }

    /// Remove by name. Returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.variables.len();
        self.variables.retain(|v| !v.name.eq_ignore_ascii_case(name));
        self.variables.len() != before
    }

    pub fn names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Variable persistence over a [`KvStore`].
#[derive(Clone)]
pub struct VariableStore {
    kv: Arc<dyn KvStore>,
}

impl VariableStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    fn space(scope: VariableScope) -> &'static str {
        match scope {
            VariableScope::Agent => AGENT_VARIABLES_SPACE,
            VariableScope::Chat => CHAT_VARIABLES_SPACE,
        }
    }

    /// Variables for one owner (agent id or chat id). A miss is an empty set.
    pub async fn load(&self, scope: VariableScope, owner_id: &str) -> Result<VariableSet, StoreError> {
        let set = read_json(self.kv.as_ref(), Self::space(scope), owner_id).await?;
        Ok(Self::scoped(set, scope))
    }

    /// Like [`load`](Self::load), but corrupt data is an error.
    async fn load_for_update(&self, scope: VariableScope, owner_id: &str) -> Result<VariableSet, StoreError> {
        let set = read_json_strict(self.kv.as_ref(), Self::space(scope), owner_id).await?;
        Ok(Self::scoped(set, scope))
    }

    fn scoped(set: Option<VariableSet>, scope: VariableScope) -> VariableSet {
        let mut set = set.unwrap_or_default();
        for v in &mut set.variables {
            v.scope = scope;
        }
        set
    }

    pub async fn save(&self, scope: VariableScope, owner_id: &str, set: &VariableSet) -> Result<(), StoreError> {
        write_json(self.kv.as_ref(), Self::space(scope), owner_id, set).await
    }

    pub async fn set(&self, scope: VariableScope, owner_id: &str, mut variable: Variable) -> Result<(), StoreError> {
        let mut set = self.load_for_update(scope, owner_id).await?;
        variable.scope = scope;
        set.set(variable);
        self.save(scope, owner_id, &set).await
    }

    pub async fn remove(&self, scope: VariableScope, owner_id: &str, name: &str) -> Result<bool, StoreError> {
        let mut set = self.load_for_update(scope, owner_id).await?;
        let removed = set.remove(name);
        if removed {
            self.save(scope, owner_id, &set).await?;
        }
        Ok(removed)
    }

    pub async fn get(&self, scope: VariableScope, owner_id: &str, name: &str) -> Result<Option<Variable>, StoreError> {
        Ok(self.load(scope, owner_id).await?.get(name).cloned())
    }

    /// Agent variables overlaid with chat variables; chat wins on name clashes.
    pub async fn aggregated(&self, chat_id: &str, agent_id: &str) -> Result<VariableSet, StoreError> {
        let mut result = self.load(VariableScope::Agent, agent_id).await?;
        for variable in self.load(VariableScope::Chat, chat_id).await?.variables {
            result.set(variable);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryKvStore;

    fn store() -> VariableStore {
        VariableStore::new(Arc::new(InMemoryKvStore::new()))
    }

    #[test]
    fn set_is_case_insensitive() {
        let mut set = VariableSet::default();
        set.set(Variable::new("Gold", VariableValue::Int(5)));
        set.set(Variable::new("gold", VariableValue::Int(7)));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("GOLD").unwrap().value, VariableValue::Int(7));
        assert!(set.remove("GoLd"));
        assert!(set.is_empty());
    }

    #[test]
    fn parse_typed_values() {
        assert_eq!(VariableValue::parse("int", "42").unwrap(), VariableValue::Int(42));
        assert_eq!(VariableValue::parse("Float", "1.5").unwrap(), VariableValue::Float(1.5));
        assert_eq!(
            VariableValue::parse("string", "hi").unwrap(),
            VariableValue::String("hi".into())
        );
        assert!(VariableValue::parse("int", "x").is_err());
        assert!(VariableValue::parse("bool", "true").is_err());
    }

    #[test]
    fn variable_serializes_type_and_value() {
        let json = serde_json::to_value(Variable::new("hp", VariableValue::Int(10))).unwrap();
        assert_eq!(json["type"], "Int");
        assert_eq!(json["value"], 10);
        assert_eq!(json["name"], "hp");
    }

    #[tokio::test]
    async fn chat_overrides_agent_in_aggregate() {
        let store = store();
        store
            .set(VariableScope::Agent, "a1", Variable::new("mood", VariableValue::String("calm".into())))
            .await
            .unwrap();
        store
            .set(VariableScope::Agent, "a1", Variable::new("level", VariableValue::Int(3)))
            .await
            .unwrap();
        store
            .set(VariableScope::Chat, "c1", Variable::new("Mood", VariableValue::String("angry".into())))
            .await
            .unwrap();

        let merged = store.aggregated("c1", "a1").await.unwrap();
        assert_eq!(merged.len(), 2);
        let mood = merged.get("mood").unwrap();
        assert_eq!(mood.scope, VariableScope::Chat);
        assert_eq!(mood.value.to_string(), "angry");
        assert_eq!(merged.get("level").unwrap().scope, VariableScope::Agent);
    }

    #[tokio::test]
    async fn remove_chat_variable_touches_chat_space_only() {
        let store = store();
        store
            .set(VariableScope::Agent, "same", Variable::new("x", VariableValue::Int(1)))
            .await
            .unwrap();
        store
            .set(VariableScope::Chat, "same", Variable::new("x", VariableValue::Int(2)))
            .await
            .unwrap();

        assert!(store.remove(VariableScope::Chat, "same", "x").await.unwrap());
        assert!(store.get(VariableScope::Chat, "same", "x").await.unwrap().is_none());
        assert!(store.get(VariableScope::Agent, "same", "x").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn missing_owner_is_empty_set() {
        assert!(store().load(VariableScope::Chat, "none").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_over_corrupt_variables_fails() {
        let kv = Arc::new(InMemoryKvStore::new());
        kv.write(CHAT_VARIABLES_SPACE, "c1", "[oops").await.unwrap();
        let store = VariableStore::new(kv.clone());

        assert!(store.load(VariableScope::Chat, "c1").await.unwrap().is_empty());
        let err = store
            .set(VariableScope::Chat, "c1", Variable::new("x", VariableValue::Int(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
        assert_eq!(kv.read(CHAT_VARIABLES_SPACE, "c1").await.unwrap().as_deref(), Some("[oops"));
    }
}
