//! Flat prompt rendering for text-completion backends.

use chatforge_config::{MarkerPair, TemplateMarkers};
use chatforge_core::{PromptBuffer, Role};

fn markers_for(role: Role, markers: &TemplateMarkers) -> &MarkerPair {
    match role {
        Role::System | Role::ToolResult => &markers.system,
        Role::User => &markers.user,
        Role::Assistant | Role::ToolCall => &markers.assistant,
    }
}

/// Render `buffer` as one string: the system text, then every message
/// wrapped in its role's markers, then the assistant prefix to cue the reply.
pub fn render_text_prompt(buffer: &PromptBuffer, markers: &TemplateMarkers) -> String {
    let mut prompt = String::new();
    if let Some(system) = buffer.system_text.as_deref().filter(|s| !s.is_empty()) {
        prompt.push_str(&markers.system.wrap(system));
    }
    for message in &buffer.messages {
        prompt.push_str(&markers_for(message.role, markers).wrap(&message.content));
    }
    prompt.push_str(&markers.assistant.prefix);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatforge_config::TextTemplate;
    use chatforge_core::Message;

    #[test]
    fn renders_chatml_like_template() {
        let markers = TextTemplate::new("t", "<s><|></s>", "<u><|></u>", "<a><|></a>")
            .markers()
            .unwrap();
        let mut buffer = PromptBuffer::new(vec![
            Message::system("persona"),
            Message::user("hi"),
            Message::assistant("hello"),
            Message::user("bye"),
        ]);
        buffer.system_text = Some("lore".into());

        assert_eq!(
            render_text_prompt(&buffer, &markers),
            "<s>lore</s><s>persona</s><u>hi</u><a>hello</a><u>bye</u><a>"
        );
    }

    #[test]
    fn empty_buffer_is_just_the_cue() {
        let markers = TextTemplate::new("t", "<|>", "<|>", "### Response:\n<|>\n").markers().unwrap();
        assert_eq!(render_text_prompt(&PromptBuffer::default(), &markers), "### Response:\n");
    }
}
