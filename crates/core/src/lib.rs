//! # chatforge core
//!
//! Domain types, capability traits, and error definitions for the chatforge
//! prompt pipeline. This crate carries no behavior of its own beyond the
//! value types. It defines the model that every other crate implements
//! against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (completion backend, tool capability,
//! key-value persistence, tokenizer) is a trait here. Implementations live
//! in their respective crates or in the host application. This enables:
//! - Swapping implementations through explicit wiring
//! - Easy testing with scripted stand-ins
//! - Clean dependency graph (all crates depend inward on core)

pub mod agent;
pub mod buffer;
pub mod error;
pub mod event;
pub mod kv;
pub mod message;
pub mod provider;
pub mod tokenizer;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::Agent;
pub use buffer::{PromptBuffer, ToolPrompt, ToolPromptStyle};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use kv::KvStore;
pub use message::{Chat, ChatId, Message, Role, ToolCallRef};
pub use provider::{ChatDelta, ChatResponse, CompletionBackend, FinishReason, ToolCallFragment};
pub use tokenizer::{EstimateTokenizer, Tokenizer};
pub use tool::{Tool, ToolContext, ToolDefinition, ToolRegistry, ToolService};
