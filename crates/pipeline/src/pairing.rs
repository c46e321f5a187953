//! Tool-call / tool-result pairing cleanup.
//!
//! After messages are removed, a tool result may refer to a call whose
//! model turn is gone. Such orphans are dropped so every remaining result
//! answers a call that is still present.

use chatforge_core::{Message, Role};
use std::collections::HashSet;

/// Drop tool results whose `result_ref_id` matches no remaining tool call.
/// Returns the number of messages removed.
pub fn remove_orphan_tool_results(messages: &mut Vec<Message>) -> usize {
    let call_ids: HashSet<String> = messages
        .iter()
        .filter(|m| m.role.is_model_turn())
        .flat_map(|m| m.tool_calls.iter().map(|c| c.id.clone()))
        .collect();

    let before = messages.len();
    messages.retain(|m| {
        m.role != Role::ToolResult
            || m.result_ref_id
                .as_deref()
                .is_some_and(|id| call_ids.contains(id))
    });
    before - messages.len()
}

/// Whether every tool result answers a present tool call.
pub fn is_well_paired(messages: &[Message]) -> bool {
    let call_ids: HashSet<&str> = messages
        .iter()
        .filter(|m| m.role.is_model_turn())
        .flat_map(|m| m.tool_calls.iter().map(|c| c.id.as_str()))
        .collect();
    messages
        .iter()
        .filter(|m| m.role == Role::ToolResult)
        .all(|m| m.result_ref_id.as_deref().is_some_and(|id| call_ids.contains(id)))
}
