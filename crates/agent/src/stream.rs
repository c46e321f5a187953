//! Accumulation of streamed chat deltas into response snapshots.

use chatforge_core::{ChatDelta, ChatResponse, FinishReason, ToolCallFragment, ToolCallRef};
use std::collections::BTreeMap;

/// Running state of one streamed round.
///
/// Content is concatenated, tool-call fragments are merged by index and
/// the last finish reason other than `None` is kept.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    content: String,
    calls: BTreeMap<usize, ToolCallFragment>,
    finish_reason: FinishReason,
    deltas: usize,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, delta: &ChatDelta) {
        self.deltas += 1;
        self.content.push_str(&delta.content);
        for fragment in &delta.tool_calls {
            let call = self.calls.entry(fragment.index).or_insert_with(|| ToolCallFragment {
                index: fragment.index,
                ..Default::default()
            });
            if !fragment.id.is_empty() {
                call.id.clone_from(&fragment.id);
            }
            if !fragment.name.is_empty() {
                call.name.clone_from(&fragment.name);
            }
            call.arguments.push_str(&fragment.arguments);
        }
        if delta.finish_reason != FinishReason::None {
            self.finish_reason = delta.finish_reason;
        }
    }

    /// Number of deltas consumed so far.
    pub fn deltas(&self) -> usize {
        self.deltas
    }

    /// The response as accumulated so far.
    pub fn snapshot(&self) -> ChatResponse {
        ChatResponse {
            content: self.content.clone(),
            finish_reason: self.finish_reason,
            tool_calls: self
                .calls
                .values()
                .map(|c| ToolCallRef::new(c.id.clone(), c.name.clone(), c.arguments.clone()))
                .collect(),
        }
    }

    pub fn into_response(self) -> ChatResponse {
        ChatResponse {
            content: self.content,
            finish_reason: self.finish_reason,
            tool_calls: self
                .calls
                .into_values()
                .map(|c| ToolCallRef::new(c.id, c.name, c.arguments))
                .collect(),
        }
    }
}
