//! Prompt assembly: chat + agent → prompt buffer → modifier pipeline.
//!
//! 1. Copy the chat's messages (roles are already validated on load)
//! 2. Prepend a system entry carrying the agent's persona
//! 3. Optionally attach tool definitions with a formatting strategy
//! 4. Run the activated modifiers over the buffer
//!
//! The chat itself is never touched; the pipeline works on the copy.

use chatforge_core::{Agent, Chat, Message, PromptBuffer, ToolDefinition, ToolPrompt, ToolPromptStyle};
use chatforge_pipeline::{ContextPipeline, PipelineError};
use tracing::debug;

/// Builds prompt buffers for one backend.
#[derive(Clone)]
pub struct PromptAssembler {
    pipeline: ContextPipeline,
    tool_style: ToolPromptStyle,
}

impl PromptAssembler {
    pub fn new(pipeline: ContextPipeline) -> Self {
        Self {
            pipeline,
            tool_style: ToolPromptStyle::default(),
        }
    }

    /// How attached tool definitions are presented to the backend.
    pub fn with_tool_style(mut self, style: ToolPromptStyle) -> Self {
        self.tool_style = style;
        self
    }

    pub fn pipeline(&self) -> &ContextPipeline {
        &self.pipeline
    }

    /// Steps 1–2: the raw buffer before any modifier runs.
    pub fn raw_buffer(chat: &Chat, agent: &Agent) -> PromptBuffer {
        let mut messages = Vec::with_capacity(chat.messages.len() + 1);
        messages.push(Message::system(agent.description.clone()));
        messages.extend(chat.messages.iter().cloned());
        PromptBuffer::new(messages)
    }

    /// Plain chat prompt.
    pub async fn build(&self, chat: &Chat, agent: &Agent) -> Result<PromptBuffer, PipelineError> {
        self.finish(Self::raw_buffer(chat, agent), chat, agent).await
    }

    /// Prompt with the given tools available to the model.
    pub async fn build_with_tools(
        &self,
        chat: &Chat,
        agent: &Agent,
        tools: Vec<ToolDefinition>,
    ) -> Result<PromptBuffer, PipelineError> {
        let mut buffer = Self::raw_buffer(chat, agent);
        buffer.available_tools = Some(ToolPrompt::new(tools, self.tool_style));
        self.finish(buffer, chat, agent).await
    }

    async fn finish(&self, buffer: PromptBuffer, chat: &Chat, agent: &Agent) -> Result<PromptBuffer, PipelineError> {
        let raw_len = buffer.len();
        let buffer = self.pipeline.apply(buffer, chat, agent).await?;
        debug!(
            chat_id = %chat.id,
            raw_messages = raw_len,
            messages = buffer.len(),
            tools = buffer.available_tools.as_ref().map_or(0, |t| t.definitions.len()),
            "Prompt assembled"
        );
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatforge_core::Role;
    use chatforge_pipeline::ModifierRegistry;
    use chatforge_store::InMemoryKvStore;
    use std::sync::Arc;

    fn assembler() -> PromptAssembler {
        PromptAssembler::new(ContextPipeline::new(
            ModifierRegistry::new(),
            Arc::new(InMemoryKvStore::new()),
        ))
    }

    fn chat() -> Chat {
        let mut chat = Chat::new("c");
        chat.push(Message::user("hello"));
        chat.push(Message::assistant("hi"));
        chat
    }

    #[tokio::test]
    async fn persona_prepended_and_chat_untouched() {
        let chat = chat();
        let agent = Agent::new("Iris", "A botanist.");
        let buffer = assembler().build(&chat, &agent).await.unwrap();

        assert_eq!(buffer.messages.len(), 3);
        assert_eq!(buffer.messages[0].role, Role::System);
        assert_eq!(buffer.messages[0].content, "A botanist.");
        assert_eq!(buffer.messages[1].content, "hello");
        assert!(buffer.available_tools.is_none());
        assert_eq!(chat.messages.len(), 2);
    }

    #[tokio::test]
    async fn tools_attached_with_style() {
        let tools = vec![ToolDefinition {
            name: "echo".into(),
            description: "Echo".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let buffer = assembler()
            .with_tool_style(ToolPromptStyle::Listing)
            .build_with_tools(&chat(), &Agent::new("a", ""), tools)
            .await
            .unwrap();
        let attached = buffer.available_tools.unwrap();
        assert_eq!(attached.style, ToolPromptStyle::Listing);
        assert_eq!(attached.definitions[0].name, "echo");
    }
}
