//! Agent (persona) type.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persona the model speaks as.
///
/// Immutable for the duration of one generation; the assembly builder turns
/// `description` into the leading system entry of the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique agent ID
    pub id: String,

    /// Display name (also substituted for `{{char}}`)
    pub name: String,

    /// Persona description text
    #[serde(default)]
    pub description: String,

    /// Opening line shown when a chat starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greeting: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternative_greetings: Vec<String>,
}

impl Agent {
    /// Create a new agent with a fresh ID.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            greeting: None,
            alternative_greetings: Vec::new(),
        }
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = Some(greeting.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_agent_has_unique_id() {
        let a = Agent::new("Iris", "A helpful botanist.");
        let b = Agent::new("Iris", "A helpful botanist.");
        assert_ne!(a.id, b.id);
        assert!(a.greeting.is_none());
    }

    #[test]
    fn agent_deserializes_with_defaults() {
        let agent: Agent = serde_json::from_str(r#"{"id":"a1","name":"Iris"}"#).unwrap();
        assert_eq!(agent.description, "");
        assert!(agent.alternative_greetings.is_empty());
    }
}
