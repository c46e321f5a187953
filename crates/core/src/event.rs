//! Domain events published by the generation orchestrator.
//!
//! Subscribers (loggers, UIs, metrics) react without coupling to the loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A generation round is about to call the backend
    RoundStarted {
        chat_id: String,
        round: usize,
        timestamp: DateTime<Utc>,
    },

    /// A complete model response was delivered to the caller
    ResponseDelivered {
        chat_id: String,
        round: usize,
        content_len: usize,
        tool_calls: usize,
        timestamp: DateTime<Utc>,
    },

    /// A tool call was executed
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The loop reached a terminal state
    GenerationFinished {
        chat_id: String,
        rounds: usize,
        cancelled: bool,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
