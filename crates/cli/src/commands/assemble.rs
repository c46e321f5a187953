//! `chatforge assemble`: preview the prompt for a stored chat.

use super::Workspace;
use chatforge_agent::{PromptAssembler, render_text_prompt};
use chatforge_config::{CompletionMode, CompletionSettings};
use chatforge_core::ToolService;
use chatforge_store::ChatStore;

/// The prompt as it would be sent: JSON in chat mode, the flat templated
/// text in text mode.
pub async fn render(
    ws: &Workspace,
    chat_id: &str,
    agent_id: &str,
    with_tools: bool,
) -> Result<String, Box<dyn std::error::Error>> {
    let store = ChatStore::new(ws.kv.clone());
    let chat = store.load_chat(chat_id).await?;
    let agent = store.load_agent(agent_id).await?;

    let assembler = PromptAssembler::new(ws.pipeline()?);
    let settings = CompletionSettings::load(ws.kv.as_ref(), &ws.config.completion).await?;

    match settings.mode {
        CompletionMode::Text => {
            if with_tools {
                tracing::warn!("Tools are not offered in text completion mode");
            }
            let buffer = assembler.build(&chat, &agent).await?;
            Ok(render_text_prompt(&buffer, &settings.active_markers()?))
        }
        CompletionMode::Chat => {
            let buffer = if with_tools {
                let tools = ws.tools().enabled_definitions().await;
                assembler.build_with_tools(&chat, &agent, tools).await?
            } else {
                assembler.build(&chat, &agent).await?
            };
            Ok(serde_json::to_string_pretty(&buffer)?)
        }
    }
}

pub async fn run(
    ws: &Workspace,
    chat_id: &str,
    agent_id: &str,
    with_tools: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render(ws, chat_id, agent_id, with_tools).await?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::in_memory_workspace;
    use chatforge_core::{Agent, Chat, Message};

    async fn seed(ws: &Workspace) -> (String, String) {
        let store = ChatStore::new(ws.kv.clone());
        let agent = Agent::new("Ada", "You are {{char}}, talking to {{user}}.");
        let mut chat = Chat::new("first");
        for i in 0..5 {
            chat.push(Message::user(format!("question {i}")));
            chat.push(Message::assistant(format!("answer {i}")));
        }
        store.save_agent(&agent).await.unwrap();
        store.save_chat(&chat).await.unwrap();
        (chat.id.to_string(), agent.id.clone())
    }

    #[tokio::test]
    async fn chat_mode_applies_pipeline() {
        let ws = in_memory_workspace();
        let (chat_id, agent_id) = seed(&ws).await;
        let pipeline = ws.pipeline().unwrap();
        pipeline.activate("ST Style Macro", "").await.unwrap();
        pipeline.activate("LatestN", "3").await.unwrap();

        let json = render(&ws, &chat_id, &agent_id, true).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let messages = value["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["content"], "You are Ada, talking to User.");
        assert!(value["available_tools"]["definitions"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn text_mode_renders_template() {
        let ws = in_memory_workspace();
        let (chat_id, agent_id) = seed(&ws).await;
        CompletionSettings::save_mode(ws.kv.as_ref(), CompletionMode::Text)
            .await
            .unwrap();

        let prompt = render(&ws, &chat_id, &agent_id, false).await.unwrap();
        assert!(prompt.contains("<|im_start|>user\nquestion 4<|im_end|>\n"));
        assert!(prompt.ends_with("<|im_start|>assistant\n"));
    }

    #[tokio::test]
    async fn missing_chat_is_an_error() {
        let ws = in_memory_workspace();
        assert!(render(&ws, "nope", "nope", false).await.is_err());
    }
}
