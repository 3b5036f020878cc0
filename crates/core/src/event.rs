//! `AgentEvent`: one narrated unit of progress in a run.
//!
//! Events are what the caller sees: annotations the model writes about its
//! own reasoning, tool calls and their results, the final answer, and the
//! terminal marker. The wire shape (`type`, `title`, `description`,
//! `timestamp`, `data`) is what the web client parses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The closed set of event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Annotation,
    ToolCall,
    ToolResult,
    Message,
    Error,
    Done,
}

impl EventKind {
    /// Wire / SSE event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Annotation => "annotation",
            Self::ToolCall => "tool_call",
            Self::ToolResult => "tool_result",
            Self::Message => "message",
            Self::Error => "error",
            Self::Done => "done",
        }
    }

    fn default_title(&self) -> &'static str {
        match self {
            Self::Annotation => "Step",
            Self::ToolCall => "Tool call",
            Self::ToolResult => "Tool result",
            Self::Message => "Response",
            Self::Error => "Error",
            Self::Done => "Complete",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured data attached to an event, one shape per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    ToolCall {
        tool: String,
        args: serde_json::Value,
    },
    ToolResult {
        tool: String,
        result: serde_json::Value,
    },
    Error {
        error: String,
        /// Set only on the error that ends the run.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        fatal: bool,
    },
    Message {
        content: String,
    },
    Done {
        #[serde(rename = "finalAnswer")]
        final_answer: String,
    },
}

/// One emitted unit of progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Short label, never empty
    pub title: String,

    /// Free-text detail, may be empty
    #[serde(default)]
    pub description: String,

    pub timestamp: DateTime<Utc>,

    #[serde(rename = "data", default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<EventPayload>,
}

impl AgentEvent {
    /// Build an event. An empty title is replaced by the kind's default label.
    pub fn new(
        kind: EventKind,
        title: impl Into<String>,
        description: impl Into<String>,
        payload: Option<EventPayload>,
    ) -> Self {
        let title = title.into();
        let title = if title.trim().is_empty() {
            kind.default_title().to_string()
        } else {
            title
        };
        Self {
            kind,
            title,
            description: description.into(),
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn annotation(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(EventKind::Annotation, title, description, None)
    }

    pub fn tool_call(tool: &str, args: serde_json::Value) -> Self {
        Self::new(
            EventKind::ToolCall,
            format!("Calling {tool}"),
            "Executing tool with args",
            Some(EventPayload::ToolCall {
                tool: tool.to_string(),
                args,
            }),
        )
    }

    pub fn tool_result(tool: &str, result: serde_json::Value) -> Self {
        Self::new(
            EventKind::ToolResult,
            format!("{tool} completed"),
            "Tool execution successful",
            Some(EventPayload::ToolResult {
                tool: tool.to_string(),
                result,
            }),
        )
    }

    /// A recoverable tool failure; the run continues.
    pub fn tool_error(tool: &str, error: impl Into<String>) -> Self {
        let error = error.into();
        Self::new(
            EventKind::Error,
            format!("{tool} failed"),
            error.clone(),
            Some(EventPayload::Error {
                error,
                fatal: false,
            }),
        )
    }

    /// The error that ends the run.
    pub fn fatal_error(
        title: impl Into<String>,
        description: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self::new(
            EventKind::Error,
            title,
            description,
            Some(EventPayload::Error {
                error: error.into(),
                fatal: true,
            }),
        )
    }

    pub fn message(content: impl Into<String>) -> Self {
        let content = content.into();
        Self::new(
            EventKind::Message,
            "Response",
            content.clone(),
            Some(EventPayload::Message { content }),
        )
    }

    pub fn done(final_answer: impl Into<String>) -> Self {
        Self::new(
            EventKind::Done,
            "Complete",
            "Agent finished processing",
            Some(EventPayload::Done {
                final_answer: final_answer.into(),
            }),
        )
    }

    /// `Done`, or an `Error` marked fatal.
    pub fn is_terminal(&self) -> bool {
        match self.kind {
            EventKind::Done => true,
            EventKind::Error => matches!(self.payload, Some(EventPayload::Error { fatal: true, .. })),
            _ => false,
        }
    }

    /// The tool name carried by `ToolCall` / `ToolResult` payloads.
    pub fn tool(&self) -> Option<&str> {
        match &self.payload {
            Some(EventPayload::ToolCall { tool, .. } | EventPayload::ToolResult { tool, .. }) => {
                Some(tool.as_str())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_matches_client() {
        let event = AgentEvent::tool_call("get_flights", serde_json::json!({"dest_code": "TOK"}));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tool_call");
        assert_eq!(json["title"], "Calling get_flights");
        assert_eq!(json["data"]["tool"], "get_flights");
        assert_eq!(json["data"]["args"]["dest_code"], "TOK");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn annotation_has_no_data() {
        let json = serde_json::to_value(AgentEvent::annotation("Planning", "")).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["description"], "");
    }

    #[test]
    fn empty_title_falls_back() {
        let event = AgentEvent::annotation("  ", "details");
        assert_eq!(event.title, "Step");
    }

    #[test]
    fn done_uses_camel_case_final_answer() {
        let json = serde_json::to_value(AgentEvent::done("42 flights")).unwrap();
        assert_eq!(json["data"]["finalAnswer"], "42 flights");
    }

    #[test]
    fn fatal_flag_only_serialized_when_set() {
        let recoverable = serde_json::to_value(AgentEvent::tool_error("foo", "boom")).unwrap();
        assert!(recoverable["data"].get("fatal").is_none());

        let fatal = serde_json::to_value(AgentEvent::fatal_error("Agent Error", "x", "x")).unwrap();
        assert_eq!(fatal["data"]["fatal"], true);
    }

    #[test]
    fn terminal_classification() {
        assert!(AgentEvent::done("a").is_terminal());
        assert!(AgentEvent::fatal_error("t", "d", "e").is_terminal());
        assert!(!AgentEvent::tool_error("foo", "boom").is_terminal());
        assert!(!AgentEvent::message("a").is_terminal());
    }

    #[test]
    fn tool_result_deserializes_into_matching_payload() {
        let json = r#"{"type":"tool_result","title":"get_flights completed","description":"",
            "timestamp":"2025-02-26T08:00:00Z","data":{"tool":"get_flights","result":{"total_count":2}}}"#;
        let event: AgentEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind, EventKind::ToolResult);
        match event.payload {
            Some(EventPayload::ToolResult { tool, result }) => {
                assert_eq!(tool, "get_flights");
                assert_eq!(result["total_count"], 2);
            }
            other => panic!("Expected ToolResult payload, got {other:?}"),
        }
    }
}
