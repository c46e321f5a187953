//! Receivers of generation output.

use chatforge_core::{Chat, ChatResponse, Message, ToolCallRef};

/// Callbacks the orchestrator drives while generating.
///
/// Each callback gets the chat so it can record the turn; the next round
/// is assembled from whatever the sink leaves in it.
pub trait GenerationSink: Send {
    /// A complete response for one round.
    fn on_response(&mut self, chat: &mut Chat, response: &ChatResponse);

    /// The accumulated response after each streamed delta.
    fn on_snapshot(&mut self, _snapshot: &ChatResponse) {}

    /// Tool calls about to be executed.
    fn on_tool_calls(&mut self, _calls: &[ToolCallRef]) {}

    /// Result of one tool call, in call order.
    fn on_tool_result(&mut self, chat: &mut Chat, name: &str, result: &str, call_id: &str);
}

/// Appends model turns and tool results to the chat.
#[derive(Debug, Default)]
pub struct ChatRecorder;

impl GenerationSink for ChatRecorder {
    fn on_response(&mut self, chat: &mut Chat, response: &ChatResponse) {
        if response.wants_tools() {
            chat.push(Message::tool_call(response.content.clone(), response.tool_calls.clone()));
        } else {
            chat.push(Message::assistant(response.content.clone()));
        }
    }

    fn on_tool_result(&mut self, chat: &mut Chat, _name: &str, result: &str, call_id: &str) {
        chat.push(Message::tool_result(call_id, result));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatforge_core::Role;

    #[test]
    fn recorder_appends_turns() {
        let mut chat = Chat::new("c");
        let mut recorder = ChatRecorder;
        recorder.on_response(
            &mut chat,
            &ChatResponse::tool_calls("looking", vec![ToolCallRef::new("c1", "echo", "{}")]),
        );
        recorder.on_tool_result(&mut chat, "echo", "ok", "c1");
        recorder.on_response(&mut chat, &ChatResponse::text("done"));

        let roles: Vec<Role> = chat.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::ToolCall, Role::ToolResult, Role::Assistant]);
        assert_eq!(chat.messages[1].result_ref_id.as_deref(), Some("c1"));
    }
}
