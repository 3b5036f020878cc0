//! Tool catalog contract.
//!
//! The orchestration loop only depends on [`ToolProvider`]: a stable catalog
//! plus `call(name, args)`. Two implementations exist in the workspace: the
//! in-process [`ToolRegistry`] below and the subprocess-backed MCP client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ToolError;

/// JSON object passed as tool arguments.
pub type ToolArgs = serde_json::Map<String, serde_json::Value>;

/// A catalog entry: what the model is told about a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    #[serde(default)]
    pub description: String,

    /// JSON Schema describing the tool's input, passed through verbatim
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// Anything that can list and invoke tools.
///
/// The catalog must stay stable for the duration of a run. `call` returns
/// `Ok(Value::Null)` for tools that produce nothing; that is a success.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// A name for diagnostics (e.g., "flight-server").
    fn name(&self) -> &str;

    /// The tools this provider exposes.
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError>;

    /// Invoke a tool by name.
    async fn call(&self, name: &str, args: ToolArgs) -> Result<serde_json::Value, ToolError>;
}

/// An in-process tool.
///
/// Argument validation against the schema is the tool's job, not the loop's.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "get_flights").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: ToolArgs) -> Result<serde_json::Value, ToolError>;

    /// Convert this tool into a catalog entry.
    fn to_spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// A registry of in-process tools.
pub struct ToolRegistry {
    name: String,
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// All catalog entries, sorted by name.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self.tools.values().map(|t| t.to_spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolProvider for ToolRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError> {
        Ok(self.specs())
    }

    async fn call(&self, name: &str, args: ToolArgs) -> Result<serde_json::Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.execute(args).await
    }
}
