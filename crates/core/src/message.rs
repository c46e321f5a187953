//! Message and Chat domain types.
//!
//! These are the value objects that flow through the whole system:
//! the session appends to a `Chat`, the assembly builder derives a
//! `PromptBuffer` from it, and the orchestrator feeds model turns back in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a chat (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub String);

impl ChatId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ChatId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message in a conversation.
///
/// Persisted chats store the sender as a label; unknown labels are rejected
/// when the message is deserialized, so every `Message` in memory carries a
/// valid role and dispatch sites never need a fallback arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    /// System instructions (persona, injected context)
    System,
    /// The end user
    User,
    /// The model
    Assistant,
    /// The model's tool-call turn
    ToolCall,
    /// Output of an executed tool
    ToolResult,
}

impl Role {
    /// Canonical persisted label.
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::ToolCall => "tool_call",
            Role::ToolResult => "tool_result",
        }
    }

    /// Whether messages of this role are emitted by the model and may carry
    /// tool calls.
    pub fn is_model_turn(&self) -> bool {
        matches!(self, Role::Assistant | Role::ToolCall)
    }
}

/// A sender label that does not name any [`Role`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown message role: {0:?}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" | "ai" => Ok(Role::Assistant),
            "tool_call" => Ok(Role::ToolCall),
            "tool_result" => Ok(Role::ToolResult),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.label().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A tool call embedded in a model turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRef {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as JSON string
    pub arguments: String,
}

impl ToolCallRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    #[serde(alias = "sender")]
    pub role: Role,

    /// The text content
    #[serde(default)]
    pub content: String,

    /// Tool calls requested by the model (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRef>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_ref_id: Option<String>,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message with the given role and no tool metadata.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            result_ref_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a model turn that requests tool calls.
    pub fn tool_call(content: impl Into<String>, calls: Vec<ToolCallRef>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::new(Role::ToolCall, content)
        }
    }

    /// Create a tool result message answering the call with `ref_id`.
    pub fn tool_result(ref_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            result_ref_id: Some(ref_id.into()),
            ..Self::new(Role::ToolResult, content)
        }
    }

    /// Attach tool calls to this message.
    pub fn with_tool_calls(mut self, calls: Vec<ToolCallRef>) -> Self {
        self.tool_calls = calls;
        self
    }
}

/// A chat is an ordered sequence of messages with shared context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    /// Unique chat ID
    pub id: ChatId,

    /// Display name (user-set or set by a tool)
    #[serde(default)]
    pub name: String,

    /// Ordered messages
    #[serde(default)]
    pub messages: Vec<Message>,

    /// When the last message was added
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    /// Create a new empty chat.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ChatId::new(),
            name: name.into(),
            messages: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Add a message to the chat.
    pub fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_labels_parse_case_insensitively() {
        assert_eq!("User".parse::<Role>().unwrap(), Role::User);
        assert_eq!("AI".parse::<Role>().unwrap(), Role::Assistant);
        assert_eq!("tool_call".parse::<Role>().unwrap(), Role::ToolCall);
        assert_eq!("Tool_Result".parse::<Role>().unwrap(), Role::ToolResult);
        assert!("tool".parse::<Role>().is_err());
    }

    #[test]
    fn unknown_role_rejected_at_deserialization() {
        let json = r#"{"role":"narrator","content":"Once upon a time"}"#;
        let err = serde_json::from_str::<Message>(json).unwrap_err();
        assert!(err.to_string().contains("narrator"));
    }

    #[test]
    fn sender_alias_accepted() {
        let json = r#"{"sender":"ai","content":"hello"}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "hello");
    }

    #[test]
    fn role_serializes_canonical_label() {
        let msg = Message::tool_result("call_1", "42");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""role":"tool_result""#));
        assert!(json.contains(r#""result_ref_id":"call_1""#));
    }

    #[test]
    fn tool_call_message_carries_calls() {
        let msg = Message::tool_call("", vec![ToolCallRef::new("c1", "echo", "{}")]);
        assert!(msg.role.is_model_turn());
        assert_eq!(msg.tool_calls[0].id, "c1");
        assert!(Role::Assistant.is_model_turn());
        assert!(!Role::ToolResult.is_model_turn());
    }

    #[test]
    fn chat_tracks_updates() {
        let mut chat = Chat::new("test");
        let created = chat.updated_at;
        chat.push(Message::user("First message"));
        assert_eq!(chat.messages.len(), 1);
        assert!(chat.updated_at >= created);
    }
}
