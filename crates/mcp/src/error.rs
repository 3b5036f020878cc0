use flightdeck_core::error::ToolError;
use thiserror::Error;

/// Failures talking to an MCP server.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Failed to spawn '{command}': {reason}")]
    Spawn { command: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("'{method}' timed out after {timeout_secs}s")]
    Timeout { method: String, timeout_secs: u64 },

    #[error("Server returned error {code}: {message}")]
    Rpc { code: i64, message: String },
}

impl McpError {
    /// Map into the tool taxonomy the agent loop understands.
    pub fn into_tool_error(self, tool_name: &str) -> ToolError {
        match self {
            Self::Timeout { timeout_secs, .. } => ToolError::Timeout {
                tool_name: tool_name.to_string(),
                timeout_secs,
            },
            Self::Rpc { message, .. } => ToolError::ExecutionFailed {
                tool_name: tool_name.to_string(),
                reason: message,
            },
            other => ToolError::Transport(other.to_string()),
        }
    }
}
