//! Generation for a chat: prompt assembly and the tool loop.
//!
//! Each round goes through the same steps:
//!
//! 1. **Assemble** the prompt buffer from the agent persona and chat history
//! 2. **Run** the activated context modifiers over it
//! 3. **Complete** it with the configured backend, buffered or streamed
//! 4. **If tools were requested**: execute them in order, record the
//!    results and start the next round
//! 5. **Otherwise**: hand the reply to the sink and stop
//!
//! Text completion mode skips tools and renders the buffer into a single
//! templated prompt instead.

pub mod context;
pub mod loop_runner;
pub mod sink;
pub mod stream;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{PromptAssembler, render_text_prompt};
pub use loop_runner::{GenerationError, GenerationOutcome, Orchestrator};
pub use sink::{ChatRecorder, GenerationSink};
pub use stream::StreamAccumulator;
