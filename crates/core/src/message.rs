//! Conversation turns.
//!
//! A run's transcript is created from the fixed instructions and the user's
//! question, then only ever appended to: assistant turns (optionally carrying
//! tool-call requests) and the tool turns answering them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation (one per run).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a turn in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Fixed instructions
    System,
    /// The end user
    User,
    /// The model
    Assistant,
    /// Tool execution result
    Tool,
}

/// A single turn in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who produced this turn
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content.into())
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content.into())
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content.into())
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::with_role(Role::Tool, content.into());
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }
}

/// A tool-call request embedded in an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Correlation id, echoed back by the matching tool turn
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments exactly as the model produced them (a JSON string, unparsed)
    pub arguments: String,
}

/// An append-only, ordered transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: ConversationId,

    /// Ordered turns
    pub messages: Vec<Message>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        Self {
            id: ConversationId::new(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Seed a conversation with the fixed instructions and the user's question.
    pub fn start(instructions: impl Into<String>, question: impl Into<String>) -> Self {
        let mut conv = Self::new();
        conv.push(Message::system(instructions));
        conv.push(Message::user(question));
        conv
    }

    /// Append a turn.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Index of the latest assistant turn.
    fn last_assistant_index(&self) -> Option<usize> {
        self.messages.iter().rposition(|m| m.role == Role::Assistant)
    }

    /// Append the result for a tool call.
    ///
    /// If the latest assistant turn repeated a call id, the result recorded
    /// last for that id replaces the earlier one, so each id keeps exactly
    /// one tool turn.
    pub fn record_tool_result(&mut self, call_id: &str, content: impl Into<String>) {
        let content = content.into();
        let start = self.last_assistant_index().map_or(0, |i| i + 1);
        let existing = self.messages[start..]
            .iter_mut()
            .find(|m| m.role == Role::Tool && m.tool_call_id.as_deref() == Some(call_id));

        match existing {
            Some(turn) => {
                turn.content = content;
                turn.timestamp = Utc::now();
            }
            None => self.push(Message::tool_result(call_id, content)),
        }
    }

    /// Call ids requested by the latest assistant turn that have no tool turn yet.
    pub fn pending_tool_calls(&self) -> Vec<&str> {
        let Some(idx) = self.last_assistant_index() else {
            return Vec::new();
        };
        let answered: Vec<&str> = self.messages[idx + 1..]
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();

        let mut pending: Vec<&str> = Vec::new();
        for tc in &self.messages[idx].tool_calls {
            let id = tc.id.as_str();
            if !answered.contains(&id) && !pending.contains(&id) {
                pending.push(id);
            }
        }
        pending
    }

    /// Rough token estimate (4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.messages.iter().map(|m| m.content.len() / 4).sum()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assistant_with_calls(ids: &[&str]) -> Message {
        let mut msg = Message::assistant("");
        msg.tool_calls = ids
            .iter()
            .map(|id| MessageToolCall {
                id: (*id).into(),
                name: "get_flights".into(),
                arguments: "{}".into(),
            })
            .collect();
        msg
    }

    #[test]
    fn start_seeds_system_and_user() {
        let conv = Conversation::start("Be helpful", "Which flight is busiest?");
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.messages[0].role, Role::System);
        assert_eq!(conv.messages[1].role, Role::User);
        assert_eq!(conv.messages[1].content, "Which flight is busiest?");
    }

    #[test]
    fn pending_calls_clear_as_results_arrive() {
        let mut conv = Conversation::start("sys", "q");
        conv.push(assistant_with_calls(&["call_1", "call_2"]));
        assert_eq!(conv.pending_tool_calls(), vec!["call_1", "call_2"]);

        conv.record_tool_result("call_1", "{}");
        assert_eq!(conv.pending_tool_calls(), vec!["call_2"]);

        conv.record_tool_result("call_2", "{}");
        assert!(conv.pending_tool_calls().is_empty());
    }

    #[test]
    fn duplicate_call_id_last_write_wins() {
        let mut conv = Conversation::start("sys", "q");
        conv.push(assistant_with_calls(&["dup", "dup"]));

        conv.record_tool_result("dup", "first");
        conv.record_tool_result("dup", "second");

        let tool_turns: Vec<_> = conv
            .messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .collect();
        assert_eq!(tool_turns.len(), 1);
        assert_eq!(tool_turns[0].content, "second");
        assert!(conv.pending_tool_calls().is_empty());
    }

    #[test]
    fn same_id_in_later_batch_gets_its_own_turn() {
        let mut conv = Conversation::start("sys", "q");
        conv.push(assistant_with_calls(&["call_1"]));
        conv.record_tool_result("call_1", "a");
        conv.push(assistant_with_calls(&["call_1"]));
        conv.record_tool_result("call_1", "b");

        let contents: Vec<_> = conv
            .messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["a", "b"]);
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = Message::tool_result("call_9", r#"{"ok":true}"#);
        let json = serde_json::to_string(&msg).unwrap();
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.role, Role::Tool);
        assert_eq!(deserialized.tool_call_id.as_deref(), Some("call_9"));
    }

    #[test]
    fn conversation_token_estimate() {
        let mut conv = Conversation::new();
        conv.push(Message::user("12345678901234567890"));
        assert_eq!(conv.estimated_tokens(), 5);
    }
}
