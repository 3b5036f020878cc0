//! MCP server: exposes any [`ToolProvider`] over newline-delimited stdio.

use std::sync::Arc;

use flightdeck_core::error::ToolError;
use flightdeck_core::tool::ToolProvider;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::error::McpError;
use crate::protocol::{
    CallToolParams, CallToolResult, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    JSONRPC_VERSION, JsonRpcRequest, JsonRpcResponse, ListToolsResult, METHOD_NOT_FOUND,
    PARSE_ERROR, PROTOCOL_VERSION,
};

pub struct McpServer {
    name: String,
    version: String,
    tools: Arc<dyn ToolProvider>,
}

impl McpServer {
    pub fn new(name: impl Into<String>, version: impl Into<String>, tools: Arc<dyn ToolProvider>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            tools,
        }
    }

    /// Serve until the reader reaches EOF.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<(), McpError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(server = %self.name, "MCP server listening on stdio");
        let mut lines = BufReader::new(reader).lines();

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?
        {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(response) = self.handle_line(trimmed).await {
                let mut out = serde_json::to_string(&response)
                    .map_err(|e| McpError::Protocol(e.to_string()))?;
                out.push('\n');
                writer
                    .write_all(out.as_bytes())
                    .await
                    .map_err(|e| McpError::Transport(e.to_string()))?;
                writer
                    .flush()
                    .await
                    .map_err(|e| McpError::Transport(e.to_string()))?;
            }
        }

        info!(server = %self.name, "Client disconnected");
        Ok(())
    }

    /// Handle one inbound line. Notifications get no response.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Unparseable request");
                return Some(JsonRpcResponse::failure(Value::Null, PARSE_ERROR, e.to_string()));
            }
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::failure(
                request.id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                "jsonrpc must be \"2.0\"",
            ));
        }

        let Some(id) = request.id.clone() else {
            debug!(method = %request.method, "Notification received");
            return None;
        };

        let response = match self.dispatch(&request.method, request.params).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err((code, message)) => JsonRpcResponse::failure(id, code, message),
        };
        Some(response)
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, (i64, String)> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": { "name": self.name, "version": self.version }
            })),
            "ping" => Ok(json!({})),
            "tools/list" => {
                let tools = self
                    .tools
                    .list_tools()
                    .await
                    .map_err(|e| (INTERNAL_ERROR, e.to_string()))?;
                serde_json::to_value(ListToolsResult { tools })
                    .map_err(|e| (INTERNAL_ERROR, e.to_string()))
            }
            "tools/call" => {
                let params: CallToolParams = params
                    .ok_or_else(|| "missing params".to_string())
                    .and_then(|p| serde_json::from_value(p).map_err(|e| e.to_string()))
                    .map_err(|e| (INVALID_PARAMS, e))?;
                let result = self.call_tool(params).await?;
                serde_json::to_value(result).map_err(|e| (INTERNAL_ERROR, e.to_string()))
            }
            other => Err((METHOD_NOT_FOUND, format!("Method not found: {other}"))),
        }
    }

    /// Tool failures are reported in-band with `isError`; an unknown tool
    /// is a protocol error.
    async fn call_tool(&self, params: CallToolParams) -> Result<CallToolResult, (i64, String)> {
        let args = params.arguments.unwrap_or_default();
        debug!(tool = %params.name, "tools/call");

        match self.tools.call(&params.name, args).await {
            Ok(value) => Ok(CallToolResult::text(&value)),
            Err(ToolError::NotFound(name)) => {
                Err((METHOD_NOT_FOUND, format!("Unknown tool: {name}")))
            }
            Err(e) => {
                warn!(tool = %params.name, error = %e, "Tool failed");
                Ok(CallToolResult::error(e.to_string()))
            }
        }
    }
}
