//! `LatestN`: keep only the most recent messages.

use crate::modifier::{ContextModifier, ModifierInfo};
use crate::pairing::remove_orphan_tool_results;
use crate::ModifierError;
use async_trait::async_trait;
use chatforge_core::{Agent, Chat, Message, PromptBuffer, Role};
use tracing::debug;

/// Keep the last `n` messages. Input is `"N"`, or `"!N"` to let a leading
/// system message fall out of the window instead of pinning it.
pub struct LatestN;

/// Parsed `LatestN` input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub n: usize,
    pub keep_leading_system: bool,
}

impl Window {
    pub fn parse(input: &str) -> Result<Self, ModifierError> {
        let trimmed = input.trim();
        let (keep_leading_system, digits) = match trimmed.strip_prefix('!') {
            Some(rest) => (false, rest.trim()),
            None => (true, trimmed),
        };
        let n: i64 = digits
            .parse()
            .map_err(|_| ModifierError::invalid_input(input, "expected a message count like \"20\" or \"!20\""))?;
        if n <= 0 {
            return Err(ModifierError::invalid_input(input, "message count must be > 0"));
        }
        Ok(Self {
            n: usize::try_from(n).unwrap_or(usize::MAX),
            keep_leading_system,
        })
    }

    /// Apply the window to `messages`. Returns `false` when nothing changed.
    pub fn apply(&self, messages: &mut Vec<Message>) -> bool {
        let len = messages.len();
        if self.n >= len {
            return false;
        }
        let pinned = messages
            .first()
            .filter(|m| self.keep_leading_system && m.role == Role::System)
            .cloned();
        let mut kept = messages.split_off(len - self.n);
        if let Some(first) = pinned {
            kept.insert(0, first);
        }
        *messages = kept;
        true
    }
}

#[async_trait]
impl ContextModifier for LatestN {
    fn info(&self) -> ModifierInfo {
        ModifierInfo {
            name: "LatestN",
            description: "Keep the latest N messages. Input N, or !N to drop the leading system message.",
        }
    }

    async fn apply(
        &self,
        buffer: &mut PromptBuffer,
        input: &str,
        _chat: &Chat,
        _agent: &Agent,
    ) -> Result<(), ModifierError> {
        let window = Window::parse(input)?;
        let before = buffer.messages.len();
        if window.apply(&mut buffer.messages) {
            let orphans = remove_orphan_tool_results(&mut buffer.messages);
            debug!(before, after = buffer.messages.len(), orphans, "LatestN applied");
        }
        Ok(())
    }
}
