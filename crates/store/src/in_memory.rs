//! In-memory key-value store, useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chatforge_core::error::StoreError;
use chatforge_core::kv::{KvStore, check_key};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A key-value store held in a map. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKvStore {
    entries: Arc<RwLock<HashMap<(String, String), String>>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries across all spaces.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn read(&self, space: &str, key: &str) -> Result<Option<String>, StoreError> {
        check_key(space, key)?;
        let entries = self.entries.read().await;
        Ok(entries.get(&(space.to_string(), key.to_string())).cloned())
    }

    async fn write(&self, space: &str, key: &str, value: &str) -> Result<(), StoreError> {
        check_key(space, key)?;
        self.entries
            .write()
            .await
            .insert((space.to_string(), key.to_string()), value.to_string());
        Ok(())
    }
}
