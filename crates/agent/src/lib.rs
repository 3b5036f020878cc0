//! The flightdeck agent loop.
//!
//! Each question runs through a **Call → Dispatch → Narrate** cycle:
//!
//! 1. Seed a conversation with the system instructions and the question
//! 2. Send it to the model together with the tool catalog
//! 3. **If tool calls**: dispatch them in order, narrating each as an event,
//!    append their results and loop back to step 2
//! 4. **If text only**: emit the answer and finish
//!
//! The loop stops at the first text-only reply, at the iteration ceiling, or
//! when the model call itself fails. Calls to the `annotate` reflex tool
//! never leave the loop.

pub mod annotate;
pub mod instructions;
pub mod loop_runner;
pub mod sink;

#[cfg(test)]
mod test_helpers;

pub use annotate::{ANNOTATE_TOOL, Annotation, annotate_spec, parse_annotation};
pub use instructions::DEFAULT_INSTRUCTIONS;
pub use loop_runner::{
    AgentLoop, AgentRun, DEFAULT_MAX_ITERATIONS, RunOutcome, RunPhase, RunSummary,
};
pub use sink::EventSink;
