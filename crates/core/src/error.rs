//! Error types for the flightdeck domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; `RunError` is the
//! taxonomy the orchestration loop works with.

use thiserror::Error;

/// The top-level error type for all flightdeck operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Run errors ---
    #[error("Run error: {0}")]
    Run(#[from] RunError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// A failure of the chat-completions call itself.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

/// A failure to invoke a tool through a tool provider.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool provider unreachable: {0}")]
    Transport(String),

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

/// Errors surfaced while a single question is being processed.
///
/// `ArgumentParse` and `ToolInvocation` are absorbed into the conversation;
/// the remaining variants end the run.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    #[error("Malformed arguments for '{tool}': {reason}")]
    ArgumentParse { tool: String, reason: String },

    #[error(transparent)]
    ToolInvocation(#[from] ToolError),

    #[error("Iteration budget of {max_iterations} exhausted without a final answer")]
    IterationBudgetExceeded { max_iterations: u32 },

    #[error(transparent)]
    UpstreamModel(#[from] ProviderError),

    #[error("Run exceeded its {timeout_ms}ms time limit")]
    TimedOut { timeout_ms: u64 },

    #[error("Event consumer detached")]
    Detached,
}

impl RunError {
    /// Whether this error terminates the run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::IterationBudgetExceeded { .. }
                | Self::UpstreamModel(_)
                | Self::TimedOut { .. }
                | Self::Detached
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::ExecutionFailed {
            tool_name: "get_flights".into(),
            reason: "server crashed".into(),
        });
        assert!(err.to_string().contains("get_flights"));
        assert!(err.to_string().contains("server crashed"));
    }

    #[test]
    fn run_error_fatality() {
        assert!(!RunError::ArgumentParse {
            tool: "get_flights".into(),
            reason: "expected object".into(),
        }
        .is_fatal());
        assert!(!RunError::ToolInvocation(ToolError::NotFound("foo".into())).is_fatal());
        assert!(RunError::IterationBudgetExceeded { max_iterations: 20 }.is_fatal());
        assert!(RunError::UpstreamModel(ProviderError::Network("reset".into())).is_fatal());
        assert!(RunError::TimedOut { timeout_ms: 60_000 }.is_fatal());
    }

    #[test]
    fn sub_second_timeout_keeps_its_duration() {
        let err = RunError::TimedOut { timeout_ms: 250 };
        assert_eq!(err.to_string(), "Run exceeded its 250ms time limit");
    }

    #[test]
    fn tool_invocation_error_is_transparent() {
        let err = RunError::from(ToolError::NotFound("foo".into()));
        assert_eq!(err.to_string(), "Tool not found: foo");
    }
}
