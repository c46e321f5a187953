//! End-to-end tests for chatforge.
//!
//! These wire a file-backed store, the built-in modifier pipeline, the
//! built-in tools and the orchestrator together, with a scripted backend
//! standing in for the model.

use std::sync::Arc;

use chatforge_agent::{ChatRecorder, GenerationOutcome, GenerationSink, Orchestrator, PromptAssembler};
use chatforge_core::error::ProviderError;
use chatforge_core::provider::DeltaStream;
use chatforge_core::{
    Agent, Chat, ChatDelta, ChatResponse, CompletionBackend, KvStore, Message, PromptBuffer, Role,
    ToolCallRef,
};
use chatforge_pipeline::modifiers::{DynPromptLibrary, DynPromptSet, DynPromptTerm, InjectionMode};
use chatforge_pipeline::tokenizer::EstimateLoader;
use chatforge_pipeline::{ContextPipeline, TokenizerCache, builtin_registry};
use chatforge_store::{ChatStore, FileKvStore, VariableScope, VariableStore, VariableValue};
use chatforge_tools::{RegistryToolService, default_registry};
use tokio_util::sync::CancellationToken;

// ── Scripted backend ─────────────────────────────────────────────────────

/// Returns scripted responses in sequence and records every prompt.
struct ScriptedBackend {
    responses: std::sync::Mutex<Vec<ChatResponse>>,
    prompts: std::sync::Mutex<Vec<PromptBuffer>>,
}

impl ScriptedBackend {
    fn new(mut responses: Vec<ChatResponse>) -> Self {
        responses.reverse();
        Self {
            responses: std::sync::Mutex::new(responses),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<PromptBuffer> {
        self.prompts.lock().unwrap().clone()
    }

    fn next(&self, buffer: &PromptBuffer) -> ChatResponse {
        self.prompts.lock().unwrap().push(buffer.clone());
        self.responses
            .lock()
            .unwrap()
            .pop()
            .expect("ScriptedBackend exhausted")
    }
}

#[async_trait::async_trait]
impl CompletionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn generate_text(&self, _prompt: &str) -> Result<String, ProviderError> {
        Ok("text reply".into())
    }

    async fn generate_chat_ex(&self, buffer: &PromptBuffer) -> Result<ChatResponse, ProviderError> {
        Ok(self.next(buffer))
    }

    /// Streams the content word by word, then the tool calls and finish reason.
    async fn stream_chat_ex(&self, buffer: &PromptBuffer) -> Result<DeltaStream, ProviderError> {
        let response = self.next(buffer);
        let (tx, rx) = tokio::sync::mpsc::channel(64);
        for word in response.content.split_inclusive(' ') {
            tx.send(Ok(ChatDelta::content(word))).await.unwrap();
        }
        let mut last = ChatDelta::finish(response.finish_reason);
        last.tool_calls = response
            .tool_calls
            .into_iter()
            .enumerate()
            .map(|(index, c)| chatforge_core::ToolCallFragment {
                index,
                id: c.id,
                name: c.name,
                arguments: c.arguments,
            })
            .collect();
        tx.send(Ok(last)).await.unwrap();
        Ok(rx)
    }
}

// ── Fixture ──────────────────────────────────────────────────────────────

struct World {
    _dir: tempfile::TempDir,
    kv: Arc<dyn KvStore>,
    chats: ChatStore,
    chat: Chat,
    agent: Agent,
}

impl World {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let kv: Arc<dyn KvStore> = Arc::new(FileKvStore::new(dir.path()));
        let chats = ChatStore::new(kv.clone());

        let agent = Agent::new("Ada", "You are {{char}}, a dragon scholar helping {{user}}.");
        let mut chat = Chat::new("untitled");
        for i in 0..6 {
            chat.push(Message::user(format!("old question {i}")));
            chat.push(Message::assistant(format!("old answer {i}")));
        }
        chat.push(Message::user("Tell me about the dragon of the north."));
        chats.save_agent(&agent).await.unwrap();
        chats.save_chat(&chat).await.unwrap();

        Self {
            _dir: dir,
            kv,
            chats,
            chat,
            agent,
        }
    }

    fn pipeline(&self) -> ContextPipeline {
        let tokenizers = Arc::new(TokenizerCache::new(self.kv.clone(), Arc::new(EstimateLoader), None));
        let registry = builtin_registry(self.kv.clone(), tokenizers, "Sam").unwrap();
        ContextPipeline::new(registry, self.kv.clone())
    }

    async fn tools(&self) -> Arc<RegistryToolService> {
        let service = RegistryToolService::new(default_registry(self.kv.clone()), self.kv.clone());
        service.enable("VariableTool").await.unwrap();
        service.enable("set_chat_name").await.unwrap();
        Arc::new(service)
    }

    async fn orchestrator(&self, backend: Arc<ScriptedBackend>) -> Orchestrator {
        Orchestrator::new(
            backend,
            self.tools().await,
            PromptAssembler::new(self.pipeline()),
            self.kv.clone(),
        )
    }
}

fn call(id: &str, name: &str, args: serde_json::Value) -> ToolCallRef {
    ToolCallRef::new(id, name, serde_json::to_string(&args).unwrap())
}

// ── E2E: pipeline + tool loop ────────────────────────────────────────────

#[tokio::test]
async fn e2e_tool_loop_with_full_pipeline() {
    let world = World::new().await;

    let pipeline = world.pipeline();
    pipeline.activate("ST Style Macro", "").await.unwrap();
    pipeline.activate("LatestN", "4").await.unwrap();
    pipeline.activate("DynPrompt", "lore").await.unwrap();
    pipeline.activate("VariableInject", "all").await.unwrap();

    DynPromptLibrary::new(world.kv.clone())
        .upsert(DynPromptSet::new(
            "lore",
            vec![
                DynPromptTerm::new("dragons", "Dragons of the north hoard ice.").with_rule(r#""dragon""#),
                DynPromptTerm::new("taverns", "Taverns serve mead.").with_rule(r#""tavern""#),
                DynPromptTerm::new("reminder", "Stay in character.")
                    .with_mode(InjectionMode::AtDepth)
                    .at_depth(-2),
            ],
        ))
        .await
        .unwrap();

    let backend = Arc::new(ScriptedBackend::new(vec![
        ChatResponse::tool_calls(
            "Let me note that.",
            vec![
                call(
                    "c1",
                    "VariableTool",
                    serde_json::json!({"action": "set", "name": "topic", "value": "dragons", "scope": "chat"}),
                ),
                call("c2", "set_chat_name", serde_json::json!({"name": "Northern dragons"})),
            ],
        ),
        ChatResponse::text("The dragon of the north sleeps under the glacier."),
    ]));
    let orchestrator = world.orchestrator(backend.clone()).await;

    let mut chat = world.chat.clone();
    let outcome = orchestrator
        .generate(&mut chat, &world.agent, &mut ChatRecorder)
        .await
        .unwrap();
    assert_eq!(outcome, GenerationOutcome::Completed { rounds: 2 });

    // First round prompt: persona macros, window, lore, tools offered
    let prompts = backend.prompts();
    let first = &prompts[0];
    assert_eq!(first.messages[0].role, Role::System);
    assert!(first.messages[0].content.starts_with("Dragons of the north hoard ice.\n"));
    assert!(first.messages[0].content.ends_with("You are Ada, a dragon scholar helping Sam."));
    assert!(!first.context_text().contains("Taverns serve mead."));
    assert!(!first.context_text().contains("old question 0"));
    assert_eq!(first.messages[first.messages.len() - 2].content, "Stay in character.");
    let offered: Vec<&str> = first
        .available_tools
        .as_ref()
        .unwrap()
        .definitions
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(offered, vec!["VariableTool", "set_chat_name"]);

    // Second round sees the tool results and the injected variable
    let second = &prompts[1];
    let results: Vec<&Message> = second.messages.iter().filter(|m| m.role == Role::ToolResult).collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].content.contains("Variable 'topic' set successfully"));
    assert_eq!(results[1].content, "Chat name updated to: Northern dragons");
    let vars = &second.messages.last().unwrap().content;
    assert!(vars.contains("[Chat] Variable: topic (string) = dragons"), "{vars}");

    // Side effects persisted through the file store
    let stored = VariableStore::new(world.kv.clone())
        .get(VariableScope::Chat, &chat.id.0, "topic")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.value, VariableValue::String("dragons".into()));
    assert_eq!(world.chats.load_chat(&chat.id.0).await.unwrap().name, "Northern dragons");

    // The chat itself recorded every turn
    let tail: Vec<Role> = chat.messages.iter().rev().take(4).rev().map(|m| m.role).collect();
    assert_eq!(tail, vec![Role::ToolCall, Role::ToolResult, Role::ToolResult, Role::Assistant]);
}

// ── E2E: streaming with cancellation ─────────────────────────────────────

/// Cancels once a snapshot mentions `stop_word`.
struct CancelOnWord {
    token: CancellationToken,
    stop_word: &'static str,
    snapshots: Vec<String>,
    responses: usize,
}

impl GenerationSink for CancelOnWord {
    fn on_response(&mut self, chat: &mut Chat, response: &ChatResponse) {
        self.responses += 1;
        ChatRecorder.on_response(chat, response);
    }

    fn on_snapshot(&mut self, snapshot: &ChatResponse) {
        self.snapshots.push(snapshot.content.clone());
        if snapshot.content.contains(self.stop_word) {
            self.token.cancel();
        }
    }

    fn on_tool_result(&mut self, chat: &mut Chat, _name: &str, result: &str, call_id: &str) {
        chat.push(Message::tool_result(call_id, result));
    }
}

#[tokio::test]
async fn e2e_streaming_cancel_mid_response() {
    let world = World::new().await;
    let backend = Arc::new(ScriptedBackend::new(vec![ChatResponse::text(
        "one two three four five",
    )]));
    let orchestrator = world.orchestrator(backend).await;

    let token = CancellationToken::new();
    let mut sink = CancelOnWord {
        token: token.clone(),
        stop_word: "three",
        snapshots: Vec::new(),
        responses: 0,
    };
    let mut chat = world.chat.clone();
    let before = chat.messages.len();

    let outcome = orchestrator
        .generate_stream(&mut chat, &world.agent, &mut sink, &token)
        .await
        .unwrap();

    assert!(outcome.is_cancelled());
    assert_eq!(sink.snapshots, vec!["one ", "one two ", "one two three "]);
    assert_eq!(sink.responses, 0);
    assert_eq!(chat.messages.len(), before);
}

#[tokio::test]
async fn e2e_streaming_matches_buffered() {
    let world = World::new().await;
    let script = || {
        vec![
            ChatResponse::tool_calls(
                "Checking.",
                vec![call("c1", "VariableTool", serde_json::json!({"action": "list"}))],
            ),
            ChatResponse::text("Nothing is stored yet."),
        ]
    };

    let mut buffered_chat = world.chat.clone();
    world
        .orchestrator(Arc::new(ScriptedBackend::new(script())))
        .await
        .generate(&mut buffered_chat, &world.agent, &mut ChatRecorder)
        .await
        .unwrap();

    let mut streamed_chat = world.chat.clone();
    world
        .orchestrator(Arc::new(ScriptedBackend::new(script())))
        .await
        .generate_stream(&mut streamed_chat, &world.agent, &mut ChatRecorder, &CancellationToken::new())
        .await
        .unwrap();

    let contents = |chat: &Chat| chat.messages.iter().map(|m| (m.role, m.content.clone())).collect::<Vec<_>>();
    assert_eq!(contents(&buffered_chat), contents(&streamed_chat));
    assert_eq!(streamed_chat.messages.last().unwrap().content, "Nothing is stored yet.");
    assert_eq!(
        streamed_chat.messages[streamed_chat.messages.len() - 2].content,
        "No variables found."
    );
}

#[tokio::test]
async fn e2e_modifier_error_aborts_generation() {
    let world = World::new().await;
    world.pipeline().activate("DynPrompt", "missing-set").await.unwrap();
    let backend = Arc::new(ScriptedBackend::new(vec![]));
    let orchestrator = world.orchestrator(backend.clone()).await;

    let err = orchestrator
        .generate(&mut world.chat.clone(), &world.agent, &mut ChatRecorder)
        .await
        .unwrap_err();
    assert!(matches!(err, chatforge_agent::GenerationError::Assembly(_)));
    assert!(backend.prompts().is_empty());
}

#[tokio::test]
async fn e2e_token_limit_keeps_recent_suffix() {
    let world = World::new().await;
    world.pipeline().activate("Token Limit", "30").await.unwrap();
    let backend = Arc::new(ScriptedBackend::new(vec![ChatResponse::text("ok")]));
    world
        .orchestrator(backend.clone())
        .await
        .generate(&mut world.chat.clone(), &world.agent, &mut ChatRecorder)
        .await
        .unwrap();

    let prompt = &backend.prompts()[0];
    assert!(prompt.messages.len() < world.chat.messages.len() + 1);
    assert_eq!(
        prompt.messages.last().unwrap().content,
        "Tell me about the dragon of the north."
    );
}
