//! Completion backend trait: the abstraction over text-generation services.
//!
//! A backend knows how to turn a flat prompt or a [`PromptBuffer`] into a
//! model reply, either as a complete response or as a stream of deltas.
//! The network client itself lives in the host application.

use crate::buffer::PromptBuffer;
use crate::error::ProviderError;
use crate::message::ToolCallRef;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Terminal status of one model response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Still generating, or the backend did not say.
    #[default]
    None,
    /// The model finished its turn.
    Stop,
    /// The model wants one or more tools executed.
    ToolCallRequested,
}

/// A complete chat response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub finish_reason: FinishReason,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRef>,
}

impl ChatResponse {
    /// A plain text reply that ends the turn.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            finish_reason: FinishReason::Stop,
            tool_calls: Vec::new(),
        }
    }

    /// A reply requesting the given tool calls.
    pub fn tool_calls(content: impl Into<String>, calls: Vec<ToolCallRef>) -> Self {
        Self {
            content: content.into(),
            finish_reason: FinishReason::ToolCallRequested,
            tool_calls: calls,
        }
    }

    /// Whether the loop should execute tools and run another round.
    pub fn wants_tools(&self) -> bool {
        self.finish_reason == FinishReason::ToolCallRequested && !self.tool_calls.is_empty()
    }
}

/// A partial tool call in a streaming delta.
///
/// Fragments with the same `index` belong to one call: `arguments` are
/// concatenated, `id` and `name` are taken from whichever fragment carries them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallFragment {
    pub index: usize,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// One incremental piece of a streaming chat response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatDelta {
    /// Content appended by this delta
    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallFragment>,

    #[serde(default)]
    pub finish_reason: FinishReason,
}

impl ChatDelta {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// An empty delta that only carries a finish reason.
    pub fn finish(reason: FinishReason) -> Self {
        Self {
            finish_reason: reason,
            ..Default::default()
        }
    }
}

/// Receiving half of a streaming response.
pub type DeltaStream = mpsc::Receiver<Result<ChatDelta, ProviderError>>;

/// Receiving half of a streaming text completion.
pub type TextStream = mpsc::Receiver<Result<String, ProviderError>>;

/// The completion backend trait.
///
/// The orchestrator calls these without knowing which service answers.
/// Streaming methods default to wrapping the buffered call as a single item.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// A human-readable name for this backend.
    fn name(&self) -> &str;

    /// Complete a flat text prompt.
    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Reply to a chat buffer with text only.
    async fn generate_chat_reply(&self, buffer: &PromptBuffer) -> Result<String, ProviderError> {
        Ok(self.generate_chat_ex(buffer).await?.content)
    }

    /// Reply to a chat buffer with content, finish reason and tool calls.
    async fn generate_chat_ex(&self, buffer: &PromptBuffer) -> Result<ChatResponse, ProviderError>;

    /// Stream a flat text completion.
    async fn stream_text(&self, prompt: &str) -> Result<TextStream, ProviderError> {
        let text = self.generate_text(prompt).await?;
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.send(Ok(text)).await;
        Ok(rx)
    }

    /// Stream a chat reply as deltas.
    async fn stream_chat_ex(&self, buffer: &PromptBuffer) -> Result<DeltaStream, ProviderError> {
        let response = self.generate_chat_ex(buffer).await?;
        let (tx, rx) = mpsc::channel(1);
        let _ = tx
            .send(Ok(ChatDelta {
                content: response.content,
                tool_calls: response
                    .tool_calls
                    .into_iter()
                    .enumerate()
                    .map(|(index, call)| ToolCallFragment {
                        index,
                        id: call.id,
                        name: call.name,
                        arguments: call.arguments,
                    })
                    .collect(),
                finish_reason: response.finish_reason,
            }))
            .await;
        Ok(rx)
    }
}
