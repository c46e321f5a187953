//! The prompt buffer: the in-progress prompt assembled for one generation.

use crate::message::{Message, Role};
use crate::tool::ToolDefinition;
use serde::{Deserialize, Serialize};

/// How tool definitions are presented to the completion backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolPromptStyle {
    /// Definitions are passed through the backend's native tool API.
    #[default]
    Native,
    /// Definitions are rendered as a text listing for backends without
    /// native tool support.
    Listing,
}

/// Tool definitions attached to a buffer, with their formatting strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolPrompt {
    pub definitions: Vec<ToolDefinition>,
    #[serde(default)]
    pub style: ToolPromptStyle,
}

impl ToolPrompt {
    pub fn new(definitions: Vec<ToolDefinition>, style: ToolPromptStyle) -> Self {
        Self { definitions, style }
    }

    /// Render the definitions as prompt text. Empty for [`ToolPromptStyle::Native`].
    pub fn render(&self) -> String {
        match self.style {
            ToolPromptStyle::Native => String::new(),
            ToolPromptStyle::Listing => {
                let mut out = String::from("You can call the following tools:\n");
                for def in &self.definitions {
                    out.push_str(&format!(
                        "- {}: {}\n  parameters: {}\n",
                        def.name, def.description, def.parameters
                    ));
                }
                out
            }
        }
    }
}

/// The mutable prompt assembled before submission to the completion backend.
///
/// Owned by the assembly builder and the modifier pipeline for the lifetime
/// of one build, then handed to the orchestrator by value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptBuffer {
    /// Free-standing system text, used when no system message carries it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_text: Option<String>,

    /// Ordered prompt entries.
    #[serde(default)]
    pub messages: Vec<Message>,

    /// Tools the model may call this round.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_tools: Option<ToolPrompt>,
}

impl PromptBuffer {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            system_text: None,
            messages,
            available_tools: None,
        }
    }

    /// Text that trigger rules are evaluated against: the system text (if
    /// any) followed by every message's content, one per line, in order.
    pub fn context_text(&self) -> String {
        let mut text = String::new();
        if let Some(system) = self.system_text.as_deref().filter(|s| !s.is_empty()) {
            text.push_str(system);
            text.push('\n');
        }
        for message in &self.messages {
            text.push_str(&message.content);
            text.push('\n');
        }
        text
    }

    /// Index of the first system-role message, if any.
    pub fn first_system_index(&self) -> Option<usize> {
        self.messages.iter().position(|m| m.role == Role::System)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
