//! Persistence backends and records for chatforge.
//!
//! - [`FileKvStore`]: directory-per-space JSON files on disk
//! - [`InMemoryKvStore`]: map-backed, for tests and ephemeral sessions
//! - [`ChatStore`]: chat and agent records
//! - [`VariableStore`]: agent- and chat-scoped typed variables

pub mod chats;
pub mod file_backend;
pub mod in_memory;
pub mod variables;

pub use chats::ChatStore;
pub use file_backend::FileKvStore;
pub use in_memory::InMemoryKvStore;
pub use variables::{Variable, VariableScope, VariableSet, VariableStore, VariableValue};
