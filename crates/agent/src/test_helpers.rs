//! Scripted collaborators for orchestrator tests.

use crate::sink::{ChatRecorder, GenerationSink};
use crate::stream::StreamAccumulator;
use async_trait::async_trait;
use chatforge_core::error::ProviderError;
use chatforge_core::provider::{DeltaStream, TextStream};
use chatforge_core::{
    Agent, Chat, ChatDelta, ChatResponse, CompletionBackend, PromptBuffer, ToolCallFragment, ToolCallRef,
    ToolDefinition, ToolService,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A response requesting one tool call.
pub fn tool_round(id: &str, name: &str) -> ChatResponse {
    ChatResponse::tool_calls("", vec![ToolCallRef::new(id, name, "{}")])
}

fn as_delta(response: ChatResponse) -> ChatDelta {
    ChatDelta {
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
    }
}

/// Replays one delta script per chat round, and fixed chunks for text.
#[derive(Default)]
pub struct ScriptedBackend {
    rounds: Mutex<VecDeque<Vec<ChatDelta>>>,
    text_chunks: Vec<String>,
    chat_calls: AtomicUsize,
    buffers: Mutex<Vec<PromptBuffer>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(rounds: Vec<Vec<ChatDelta>>) -> Self {
        Self {
            rounds: Mutex::new(rounds.into()),
            ..Default::default()
        }
    }

    pub fn from_responses(responses: Vec<ChatResponse>) -> Self {
        Self::new(responses.into_iter().map(|r| vec![as_delta(r)]).collect())
    }

    pub fn with_text(mut self, chunks: Vec<&str>) -> Self {
        self.text_chunks = chunks.into_iter().map(String::from).collect();
        self
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn buffers(&self) -> Vec<PromptBuffer> {
        self.buffers.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn next_round(&self, buffer: &PromptBuffer) -> Result<Vec<ChatDelta>, ProviderError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.buffers.lock().unwrap().push(buffer.clone());
        self.rounds
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::NotConfigured("script exhausted".into()))
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.text_chunks.concat())
    }

    async fn generate_chat_ex(&self, buffer: &PromptBuffer) -> Result<ChatResponse, ProviderError> {
        let mut acc = StreamAccumulator::new();
        for delta in self.next_round(buffer)? {
            acc.push(&delta);
        }
        Ok(acc.into_response())
    }

    async fn stream_text(&self, prompt: &str) -> Result<TextStream, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let (tx, rx) = mpsc::channel(self.text_chunks.len() + 1);
        for chunk in &self.text_chunks {
            tx.send(Ok(chunk.clone())).await.unwrap();
        }
        Ok(rx)
    }

    async fn stream_chat_ex(&self, buffer: &PromptBuffer) -> Result<DeltaStream, ProviderError> {
        let deltas = self.next_round(buffer)?;
        let (tx, rx) = mpsc::channel(deltas.len() + 1);
        for delta in deltas {
            tx.send(Ok(delta)).await.unwrap();
        }
        Ok(rx)
    }
}

/// Offers one `echo` tool. `echo` answers with its arguments, `silent`
/// produces no result and anything else is unknown.
#[derive(Default)]
pub struct CountingToolService {
    calls: AtomicUsize,
}

impl CountingToolService {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolService for CountingToolService {
    async fn enabled_definitions(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "echo".into(),
            description: "Echo the arguments".into(),
            parameters: serde_json::json!({"type": "object"}),
        }]
    }

    async fn execute(&self, name: &str, arguments: &str, _chat: &Chat, _agent: &Agent) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match name {
            "echo" => Some(format!("echo:{arguments}")),
            _ => None,
        }
    }
}

/// Records every callback and appends turns like [`ChatRecorder`].
#[derive(Default)]
pub struct RecordingSink {
    pub responses: Vec<ChatResponse>,
    pub snapshots: Vec<ChatResponse>,
    pub announced: Vec<Vec<ToolCallRef>>,
    /// (name, result, call id)
    pub tool_results: Vec<(String, String, String)>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl RecordingSink {
    /// Cancel `token` when the `k`-th snapshot arrives.
    pub fn cancelling_after(k: usize, token: CancellationToken) -> Self {
        Self {
            cancel_after: Some((k, token)),
            ..Default::default()
        }
    }
}

impl GenerationSink for RecordingSink {
    fn on_response(&mut self, chat: &mut Chat, response: &ChatResponse) {
        self.responses.push(response.clone());
        ChatRecorder.on_response(chat, response);
    }

    fn on_snapshot(&mut self, snapshot: &ChatResponse) {
        self.snapshots.push(snapshot.clone());
        if let Some((k, token)) = &self.cancel_after
            && self.snapshots.len() == *k
        {
            token.cancel();
        }
    }

    fn on_tool_calls(&mut self, calls: &[ToolCallRef]) {
        self.announced.push(calls.to_vec());
    }

    fn on_tool_result(&mut self, chat: &mut Chat, name: &str, result: &str, call_id: &str) {
        self.tool_results.push((name.into(), result.into(), call_id.into()));
        ChatRecorder.on_tool_result(chat, name, result, call_id);
    }
}
