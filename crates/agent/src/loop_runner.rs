//! The generation loop: model rounds alternating with tool execution.
//!
//! ```text
//! Idle ─▶ Generating ─▶ Done
//!              ▲    │
//!              │    ▼
//!          ExecutingTools
//! ```
//!
//! In chat mode each round assembles the prompt with the enabled tools,
//! asks the backend for a response, hands it to the sink and, if the model
//! requested tools, runs them one after another before the next round.
//! Text mode renders a flat prompt and completes it exactly once.

use crate::context::{PromptAssembler, render_text_prompt};
use crate::sink::GenerationSink;
use crate::stream::StreamAccumulator;
use chatforge_config::{CompletionConfig, CompletionMode, CompletionSettings, ConfigError, GenerationConfig};
use chatforge_core::error::{ProviderError, StoreError};
use chatforge_core::event::{DomainEvent, EventBus};
use chatforge_core::provider::{DeltaStream, TextStream};
use chatforge_core::{
    Agent, Chat, ChatDelta, ChatResponse, CompletionBackend, FinishReason, KvStore, ToolCallRef, ToolService,
};
use chatforge_pipeline::PipelineError;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("prompt assembly failed: {0}")]
    Assembly(#[from] PipelineError),

    #[error("completion backend failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("{0} is not supported in text completion mode")]
    UnsupportedOperation(&'static str),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// How a generation ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed { rounds: usize },
    /// Stopped by the cancellation token. The last snapshot the sink saw is
    /// the final state.
    Cancelled { rounds: usize },
}

impl GenerationOutcome {
    pub fn rounds(&self) -> usize {
        match self {
            GenerationOutcome::Completed { rounds } | GenerationOutcome::Cancelled { rounds } => *rounds,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GenerationOutcome::Cancelled { .. })
    }
}

/// Where streamed deltas come from. Text streams are wrapped so they look
/// like chat streams, ending with an empty `Stop` delta.
enum DeltaSource {
    Chat(DeltaStream),
    Text { chunks: TextStream, finished: bool },
}

impl DeltaSource {
    async fn next(&mut self) -> Option<Result<ChatDelta, ProviderError>> {
        match self {
            DeltaSource::Chat(stream) => stream.recv().await,
            DeltaSource::Text { chunks, finished } => {
                if *finished {
                    return None;
                }
                match chunks.recv().await {
                    Some(item) => Some(item.map(ChatDelta::content)),
                    None => {
                        *finished = true;
                        Some(Ok(ChatDelta::finish(FinishReason::Stop)))
                    }
                }
            }
        }
    }
}

/// Drives generation for one backend.
///
/// At most one generation per chat may run at a time; callers serialize.
pub struct Orchestrator {
    backend: Arc<dyn CompletionBackend>,
    tools: Arc<dyn ToolService>,
    assembler: PromptAssembler,
    kv: Arc<dyn KvStore>,
    completion: CompletionConfig,
    max_rounds: Option<usize>,
    missing_result_text: String,
    events: Arc<EventBus>,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        tools: Arc<dyn ToolService>,
        assembler: PromptAssembler,
        kv: Arc<dyn KvStore>,
    ) -> Self {
        let generation = GenerationConfig::default();
        Self {
            backend,
            tools,
            assembler,
            kv,
            completion: CompletionConfig::default(),
            max_rounds: generation.max_rounds,
            missing_result_text: generation.missing_result_text,
            events: Arc::new(EventBus::default()),
        }
    }

    /// Fallback completion settings when the store has none.
    pub fn with_completion_config(mut self, completion: CompletionConfig) -> Self {
        self.completion = completion;
        self
    }

    pub fn with_generation_config(mut self, generation: &GenerationConfig) -> Self {
        self.max_rounds = generation.max_rounds;
        self.missing_result_text = generation.missing_result_text.clone();
        self
    }

    /// Stop after this many model rounds even if more tools are requested.
    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = Some(max);
        self
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub async fn settings(&self) -> Result<CompletionSettings, GenerationError> {
        Ok(CompletionSettings::load(self.kv.as_ref(), &self.completion).await?)
    }

    async fn require_chat_mode(&self, operation: &'static str) -> Result<(), GenerationError> {
        match self.settings().await?.mode {
            CompletionMode::Chat => Ok(()),
            CompletionMode::Text => Err(GenerationError::UnsupportedOperation(operation)),
        }
    }

    // ── Entry points ─────────────────────────────────────────────────────

    /// Buffered generation in the configured completion mode.
    pub async fn generate(
        &self,
        chat: &mut Chat,
        agent: &Agent,
        sink: &mut dyn GenerationSink,
    ) -> Result<GenerationOutcome, GenerationError> {
        let settings = self.settings().await?;
        match settings.mode {
            CompletionMode::Chat => self.tool_loop(chat, agent, sink).await,
            CompletionMode::Text => self.text_once(&settings, chat, agent, sink).await,
        }
    }

    /// Streaming generation in the configured completion mode.
    pub async fn generate_stream(
        &self,
        chat: &mut Chat,
        agent: &Agent,
        sink: &mut dyn GenerationSink,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome, GenerationError> {
        let settings = self.settings().await?;
        match settings.mode {
            CompletionMode::Chat => self.tool_loop_stream(chat, agent, sink, cancel).await,
            CompletionMode::Text => self.text_stream(&settings, chat, agent, sink, cancel).await,
        }
    }

    pub async fn run_tool_loop(
        &self,
        chat: &mut Chat,
        agent: &Agent,
        sink: &mut dyn GenerationSink,
    ) -> Result<GenerationOutcome, GenerationError> {
        self.require_chat_mode("run_tool_loop").await?;
        self.tool_loop(chat, agent, sink).await
    }

    pub async fn run_tool_loop_stream(
        &self,
        chat: &mut Chat,
        agent: &Agent,
        sink: &mut dyn GenerationSink,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome, GenerationError> {
        self.require_chat_mode("run_tool_loop_stream").await?;
        self.tool_loop_stream(chat, agent, sink, cancel).await
    }

    /// One chat round with tools offered, without executing any.
    pub async fn complete_once(&self, chat: &Chat, agent: &Agent) -> Result<ChatResponse, GenerationError> {
        self.require_chat_mode("complete_once").await?;
        let buffer = self
            .assembler
            .build_with_tools(chat, agent, self.tools.enabled_definitions().await)
            .await?;
        Ok(self.backend.generate_chat_ex(&buffer).await?)
    }

    // ── Chat mode ────────────────────────────────────────────────────────

    async fn tool_loop(
        &self,
        chat: &mut Chat,
        agent: &Agent,
        sink: &mut dyn GenerationSink,
    ) -> Result<GenerationOutcome, GenerationError> {
        let mut round = 0;
        loop {
            round += 1;
            self.start_round(chat, round);

            let buffer = self
                .assembler
                .build_with_tools(chat, agent, self.tools.enabled_definitions().await)
                .await?;
            let response = self.backend.generate_chat_ex(&buffer).await?;
            self.deliver(chat, round, &response, sink);

            if !self.should_continue(&response, round) {
                break;
            }
            self.execute_tools(&response.tool_calls, chat, agent, sink, None).await;
        }
        Ok(self.finish(chat, round, false))
    }

    async fn tool_loop_stream(
        &self,
        chat: &mut Chat,
        agent: &Agent,
        sink: &mut dyn GenerationSink,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome, GenerationError> {
        let mut round = 0;
        loop {
            if cancel.is_cancelled() {
                return Ok(self.finish(chat, round, true));
            }
            round += 1;
            self.start_round(chat, round);

            let buffer = self
                .assembler
                .build_with_tools(chat, agent, self.tools.enabled_definitions().await)
                .await?;
            let stream = self.backend.stream_chat_ex(&buffer).await?;
            let Some(response) = self.consume(DeltaSource::Chat(stream), sink, cancel).await? else {
                return Ok(self.finish(chat, round, true));
            };
            self.deliver(chat, round, &response, sink);

            if !self.should_continue(&response, round) {
                break;
            }
            if !self.execute_tools(&response.tool_calls, chat, agent, sink, Some(cancel)).await {
                return Ok(self.finish(chat, round, true));
            }
        }
        Ok(self.finish(chat, round, false))
    }

    fn should_continue(&self, response: &ChatResponse, round: usize) -> bool {
        if !response.wants_tools() {
            return false;
        }
        if self.max_rounds.is_some_and(|max| round >= max) {
            warn!(
                round,
                pending_calls = response.tool_calls.len(),
                "Round limit reached, not executing requested tools"
            );
            return false;
        }
        true
    }

    /// Run `calls` in order. Returns `false` if cancelled before finishing.
    async fn execute_tools(
        &self,
        calls: &[ToolCallRef],
        chat: &mut Chat,
        agent: &Agent,
        sink: &mut dyn GenerationSink,
        cancel: Option<&CancellationToken>,
    ) -> bool {
        sink.on_tool_calls(calls);
        for call in calls {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                return false;
            }
            let started = Instant::now();
            let result = self.tools.execute(&call.name, &call.arguments, chat, agent).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            self.events.publish(DomainEvent::ToolExecuted {
                tool_name: call.name.clone(),
                success: result.is_some(),
                duration_ms,
                timestamp: Utc::now(),
            });

            let text = result.unwrap_or_else(|| {
                warn!(tool = %call.name, call_id = %call.id, "Tool returned no result");
                self.missing_result_text.clone()
            });
            sink.on_tool_result(chat, &call.name, &text, &call.id);
        }
        true
    }

    // ── Text mode ────────────────────────────────────────────────────────

    async fn text_prompt(
        &self,
        settings: &CompletionSettings,
        chat: &Chat,
        agent: &Agent,
    ) -> Result<String, GenerationError> {
        let markers = settings.active_markers()?;
        let buffer = self.assembler.build(chat, agent).await?;
        Ok(render_text_prompt(&buffer, &markers))
    }

    async fn text_once(
        &self,
        settings: &CompletionSettings,
        chat: &mut Chat,
        agent: &Agent,
        sink: &mut dyn GenerationSink,
    ) -> Result<GenerationOutcome, GenerationError> {
        self.start_round(chat, 1);
        let prompt = self.text_prompt(settings, chat, agent).await?;
        let reply = self.backend.generate_text(&prompt).await?;
        self.deliver(chat, 1, &ChatResponse::text(reply), sink);
        Ok(self.finish(chat, 1, false))
    }

    async fn text_stream(
        &self,
        settings: &CompletionSettings,
        chat: &mut Chat,
        agent: &Agent,
        sink: &mut dyn GenerationSink,
        cancel: &CancellationToken,
    ) -> Result<GenerationOutcome, GenerationError> {
        if cancel.is_cancelled() {
            return Ok(self.finish(chat, 0, true));
        }
        self.start_round(chat, 1);
        let prompt = self.text_prompt(settings, chat, agent).await?;
        let chunks = self.backend.stream_text(&prompt).await?;
        let source = DeltaSource::Text { chunks, finished: false };
        let Some(response) = self.consume(source, sink, cancel).await? else {
            return Ok(self.finish(chat, 1, true));
        };
        self.deliver(chat, 1, &response, sink);
        Ok(self.finish(chat, 1, false))
    }

    // ── Shared ───────────────────────────────────────────────────────────

    /// Accumulate a stream, forwarding a snapshot after every delta.
    /// `None` means the token was cancelled.
    async fn consume(
        &self,
        mut source: DeltaSource,
        sink: &mut dyn GenerationSink,
        cancel: &CancellationToken,
    ) -> Result<Option<ChatResponse>, GenerationError> {
        let mut acc = StreamAccumulator::new();
        loop {
            if cancel.is_cancelled() {
                debug!(deltas = acc.deltas(), "Stream cancelled");
                return Ok(None);
            }
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(deltas = acc.deltas(), "Stream cancelled while waiting");
                    return Ok(None);
                }
                item = source.next() => item,
            };
            let Some(item) = next else { break };
            acc.push(&item?);
            sink.on_snapshot(&acc.snapshot());
        }
        Ok(Some(acc.into_response()))
    }

    fn start_round(&self, chat: &Chat, round: usize) {
        debug!(chat_id = %chat.id, round, "Generation round");
        self.events.publish(DomainEvent::RoundStarted {
            chat_id: chat.id.to_string(),
            round,
            timestamp: Utc::now(),
        });
    }

    fn deliver(&self, chat: &mut Chat, round: usize, response: &ChatResponse, sink: &mut dyn GenerationSink) {
        sink.on_response(chat, response);
        self.events.publish(DomainEvent::ResponseDelivered {
            chat_id: chat.id.to_string(),
            round,
            content_len: response.content.len(),
            tool_calls: response.tool_calls.len(),
            timestamp: Utc::now(),
        });
    }

    fn finish(&self, chat: &Chat, rounds: usize, cancelled: bool) -> GenerationOutcome {
        info!(chat_id = %chat.id, rounds, cancelled, backend = self.backend.name(), "Generation finished");
        self.events.publish(DomainEvent::GenerationFinished {
            chat_id: chat.id.to_string(),
            rounds,
            cancelled,
            timestamp: Utc::now(),
        });
        if cancelled {
            GenerationOutcome::Cancelled { rounds }
        } else {
            GenerationOutcome::Completed { rounds }
        }
    }
}
