//! `Token Limit`: trim old messages to fit a token budget.

use crate::modifier::{ContextModifier, ModifierInfo};
use crate::pairing::remove_orphan_tool_results;
use crate::tokenizer::TokenizerCache;
use crate::ModifierError;
use async_trait::async_trait;
use chatforge_core::error::TokenizerError;
use chatforge_core::{Agent, Chat, Message, PromptBuffer, Tokenizer};
use std::sync::Arc;
use tracing::info;

pub struct TokenLimit {
    tokenizers: Arc<TokenizerCache>,
}

impl TokenLimit {
    pub fn new(tokenizers: Arc<TokenizerCache>) -> Self {
        Self { tokenizers }
    }
}

/// Number of leading messages to drop so the remaining suffix fits `budget`.
///
/// Walks from newest to oldest; the first message that pushes the running
/// total over budget, and everything older, is dropped.
pub fn overflow_len(counts: &[usize], budget: usize) -> usize {
    let mut total = 0usize;
    for (i, count) in counts.iter().enumerate().rev() {
        total = total.saturating_add(*count);
        if total > budget {
            return i + 1;
        }
    }
    0
}

fn count_all(tokenizer: &dyn Tokenizer, messages: &[Message]) -> Result<Vec<usize>, TokenizerError> {
    messages.iter().map(|m| tokenizer.count(&m.content)).collect()
}

#[async_trait]
impl ContextModifier for TokenLimit {
    fn info(&self) -> ModifierInfo {
        ModifierInfo {
            name: "Token Limit",
            description: "Input the token budget (integer); older messages are removed when it is exceeded.",
        }
    }

    async fn apply(
        &self,
        buffer: &mut PromptBuffer,
        input: &str,
        _chat: &Chat,
        _agent: &Agent,
    ) -> Result<(), ModifierError> {
        let budget: usize = input
            .trim()
            .parse()
            .map_err(|_| ModifierError::invalid_input(input, "token budget must be a positive integer"))?;
        if budget == 0 {
            return Err(ModifierError::invalid_input(input, "token budget must be > 0"));
        }
        let tokenizer = self.tokenizers.get().await?;

        let counts = count_all(tokenizer.as_ref(), &buffer.messages)?;
        let before: usize = counts.iter().sum();

        let drop = overflow_len(&counts, budget);
        buffer.messages.drain(..drop);
        remove_orphan_tool_results(&mut buffer.messages);

        let after: usize = count_all(tokenizer.as_ref(), &buffer.messages)?.iter().sum();
        info!(budget, before, after, dropped = drop, "Token limit applied");
        Ok(())
    }
}
