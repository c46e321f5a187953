//! Chat and agent records persisted through a [`KvStore`].

use chatforge_core::error::StoreError;
use chatforge_core::kv::{KvStore, read_json, write_json};
use chatforge_core::{Agent, Chat};
use std::sync::Arc;
use tracing::debug;

pub const CHATS_SPACE: &str = "Chats";
pub const AGENTS_SPACE: &str = "Agents";

/// Loads and saves chats and agents as JSON records keyed by id.
#[derive(Clone)]
pub struct ChatStore {
    kv: Arc<dyn KvStore>,
}

impl ChatStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub async fn load_chat(&self, id: &str) -> Result<Chat, StoreError> {
        read_json(self.kv.as_ref(), CHATS_SPACE, id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                space: CHATS_SPACE.into(),
                key: id.into(),
            })
    }

    pub async fn save_chat(&self, chat: &Chat) -> Result<(), StoreError> {
        write_json(self.kv.as_ref(), CHATS_SPACE, &chat.id.0, chat).await?;
        debug!(chat_id = %chat.id, messages = chat.messages.len(), "Chat saved");
        Ok(())
    }

    pub async fn load_agent(&self, id: &str) -> Result<Agent, StoreError> {
        read_json(self.kv.as_ref(), AGENTS_SPACE, id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                space: AGENTS_SPACE.into(),
                key: id.into(),
            })
    }

    pub async fn save_agent(&self, agent: &Agent) -> Result<(), StoreError> {
        write_json(self.kv.as_ref(), AGENTS_SPACE, &agent.id, agent).await
    }

    /// Rename a persisted chat.
    pub async fn rename_chat(&self, id: &str, name: &str) -> Result<Chat, StoreError> {
        let mut chat = self.load_chat(id).await?;
        chat.name = name.to_string();
        self.save_chat(&chat).await?;
        Ok(chat)
    }
}
