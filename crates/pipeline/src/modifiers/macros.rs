//! `ST Style Macro`: `{{user}}` / `{{char}}` substitution.

use crate::modifier::{ContextModifier, ModifierInfo};
use crate::ModifierError;
use async_trait::async_trait;
use chatforge_core::{Agent, Chat, KvStore, PromptBuffer};
use std::sync::Arc;

pub const USER_SPACE: &str = "User";
pub const USERNAME_KEY: &str = "username";

pub struct StStyleMacro {
    kv: Arc<dyn KvStore>,
    default_username: String,
}

impl StStyleMacro {
    pub fn new(kv: Arc<dyn KvStore>, default_username: impl Into<String>) -> Self {
        Self {
            kv,
            default_username: default_username.into(),
        }
    }
}

fn expand(text: &str, user: &str, char_name: &str) -> String {
    text.replace("{{user}}", user).replace("{{char}}", char_name)
}

#[async_trait]
impl ContextModifier for StStyleMacro {
    fn info(&self) -> ModifierInfo {
        ModifierInfo {
            name: "ST Style Macro",
            description: "Adds support for SillyTavern style macros ({{user}}, {{char}}) in prompts.",
        }
    }

    async fn apply(
        &self,
        buffer: &mut PromptBuffer,
        _input: &str,
        _chat: &Chat,
        agent: &Agent,
    ) -> Result<(), ModifierError> {
        let username = self
            .kv
            .read(USER_SPACE, USERNAME_KEY)
            .await?
            .unwrap_or_else(|| self.default_username.clone());

        for message in &mut buffer.messages {
            message.content = expand(&message.content, &username, &agent.name);
        }
        if let Some(system) = buffer.system_text.as_mut() {
            *system = expand(system, &username, &agent.name);
        }
        Ok(())
    }
}
