//! `set_chat_name`: lets the model title the current chat.

use async_trait::async_trait;
use chatforge_core::error::{StoreError, ToolError};
use chatforge_core::tool::{Tool, ToolContext, ToolDefinition};
use chatforge_store::ChatStore;
use serde::Deserialize;

pub struct SetChatNameTool {
    chats: ChatStore,
}

impl SetChatNameTool {
    pub fn new(chats: ChatStore) -> Self {
        Self { chats }
    }
}

#[derive(Deserialize)]
struct Args {
    name: String,
}

#[async_trait]
impl Tool for SetChatNameTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "set_chat_name".into(),
            description: "Set the name of the current chat. Call when the topic changes or on the user's first \
                          message; do not call it frequently."
                .into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "New name for the current chat" }
                },
                "required": ["name"]
            }),
        }
    }

    async fn execute(&self, arguments: &str, ctx: &ToolContext<'_>) -> Result<String, ToolError> {
        let args: Args =
            serde_json::from_str(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        let name = args.name.trim();
        if name.is_empty() {
            return Err(ToolError::InvalidArguments("name must not be empty".into()));
        }

        match self.chats.rename_chat(&ctx.chat.id.0, name).await {
            Ok(_) => {}
            // Not persisted yet: save the in-flight chat under its new name
            Err(StoreError::NotFound { .. }) => {
                let mut chat = ctx.chat.clone();
                chat.name = name.to_string();
                self.chats.save_chat(&chat).await?;
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(chat_id = %ctx.chat.id, name, "Chat renamed");
        Ok(format!("Chat name updated to: {name}"))
    }
}
