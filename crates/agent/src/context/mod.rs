//! Prompt construction: the chat-mode buffer and the text-mode flat prompt.

pub mod assembler;
pub mod text_prompt;

pub use assembler::PromptAssembler;
pub use text_prompt::render_text_prompt;
