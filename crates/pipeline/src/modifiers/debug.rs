//! Diagnostic modifiers that log and leave the buffer untouched.

use crate::modifier::{ContextModifier, ModifierInfo};
use crate::ModifierError;
use async_trait::async_trait;
use chatforge_core::{Agent, Chat, PromptBuffer};
use tracing::info;

/// `Print`: log the input with `{time}` and `{total_len}` expanded.
pub struct Print;

fn render_print(input: &str, buffer: &PromptBuffer) -> String {
    let total_len: usize = buffer.messages.iter().map(|m| m.content.chars().count()).sum();
    input
        .replace("{time}", &chrono::Local::now().format("%Y-%m-%d %H:%M").to_string())
        .replace("{total_len}", &total_len.to_string())
}

#[async_trait]
impl ContextModifier for Print {
    fn info(&self) -> ModifierInfo {
        ModifierInfo {
            name: "Print",
            description: "Prints input to the log. Supports {time} and {total_len}.",
        }
    }

    async fn apply(
        &self,
        buffer: &mut PromptBuffer,
        input: &str,
        _chat: &Chat,
        _agent: &Agent,
    ) -> Result<(), ModifierError> {
        info!(target: "chatforge::print", "{}", render_print(input, buffer));
        Ok(())
    }
}

/// `MessagePrint`: log the buffer's messages as JSON.
pub struct MessagePrint;

#[async_trait]
impl ContextModifier for MessagePrint {
    fn info(&self) -> ModifierInfo {
        ModifierInfo {
            name: "MessagePrint",
            description: "Dump messages to the log as JSON. Input true/false to pretty-print. Default: true",
        }
    }

    async fn apply(
        &self,
        buffer: &mut PromptBuffer,
        input: &str,
        _chat: &Chat,
        _agent: &Agent,
    ) -> Result<(), ModifierError> {
        let pretty = input.trim().parse::<bool>().unwrap_or(true);
        let json = if pretty {
            serde_json::to_string_pretty(&buffer.messages)
        } else {
            serde_json::to_string(&buffer.messages)
        }
        .map_err(|e| ModifierError::Other(format!("cannot serialize messages: {e}")))?;
        info!(target: "chatforge::print", messages = buffer.messages.len(), "{json}");
        Ok(())
    }
}
