//! # flightdeck core
//!
//! Domain types, traits, and error definitions for the flightdeck agent.
//! This crate has no framework dependencies; every other crate depends
//! inward on it.
//!
//! The seams are traits: [`ChatModel`] for the language model and
//! [`ToolProvider`] for the tool catalog. Implementations live in their own
//! crates, which keeps the orchestration loop testable with scripted stubs.

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, RunError, ToolError};
pub use event::{AgentEvent, EventKind, EventPayload};
pub use message::{Conversation, ConversationId, Message, MessageToolCall, Role};
pub use provider::{ChatModel, ChatRequest, ChatResponse, Usage};
pub use tool::{Tool, ToolArgs, ToolProvider, ToolRegistry, ToolSpec};
