//! MCP client over newline-delimited stdio.
//!
//! [`McpClient::spawn`] launches a server subprocess; [`McpClient::connect`]
//! speaks to any reader/writer pair. Requests are serialized through a
//! mutex, so a single connection never has two calls in flight. The tool
//! list is fetched once per connection.

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use flightdeck_config::McpServerConfig;
use flightdeck_core::error::ToolError;
use flightdeck_core::tool::{ToolArgs, ToolProvider, ToolSpec};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::error::McpError;
use crate::protocol::{
    CallToolParams, CallToolResult, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    METHOD_NOT_FOUND, PROTOCOL_VERSION,
};

type BoxReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

struct Connection {
    lines: Lines<BufReader<BoxReader>>,
    writer: BoxWriter,
    /// Held so the subprocess dies with the client.
    _child: Option<Child>,
    /// Set while a frame is being written. Stays set if the write was
    /// abandoned halfway, since the pipe then holds a partial line.
    poisoned: bool,
}

impl Connection {
    async fn send(&mut self, message: &JsonRpcRequest) -> Result<(), McpError> {
        if self.poisoned {
            return Err(McpError::Transport(
                "Connection unusable after an interrupted write".into(),
            ));
        }
        self.poisoned = true;
        write_line(&mut self.writer, message).await?;
        self.poisoned = false;
        Ok(())
    }
}

/// A connected MCP server.
pub struct McpClient {
    name: String,
    timeout: Duration,
    next_id: AtomicU64,
    conn: Mutex<Connection>,
    catalog: OnceCell<Vec<ToolSpec>>,
}

impl McpClient {
    /// Spawn the configured server and complete the handshake.
    pub async fn spawn(config: &McpServerConfig) -> Result<Self, McpError> {
        info!(server = %config.name, command = %config.command, "Spawning MCP server");

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| McpError::Spawn {
            command: config.command.clone(),
            reason: e.to_string(),
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Transport("Failed to capture server stdout".into()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Transport("Failed to capture server stdin".into()))?;

        let timeout = Duration::from_secs(config.request_timeout_secs);
        Self::handshake(
            config.name.clone(),
            Box::new(stdout),
            Box::new(stdin),
            Some(child),
            timeout,
        )
        .await
    }

    /// Complete the handshake over an existing transport.
    pub async fn connect<R, W>(
        name: impl Into<String>,
        reader: R,
        writer: W,
        timeout: Duration,
    ) -> Result<Self, McpError>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::handshake(name.into(), Box::new(reader), Box::new(writer), None, timeout).await
    }

    async fn handshake(
        name: String,
        reader: BoxReader,
        writer: BoxWriter,
        child: Option<Child>,
        timeout: Duration,
    ) -> Result<Self, McpError> {
        let client = Self {
            name,
            timeout,
            next_id: AtomicU64::new(1),
            conn: Mutex::new(Connection {
                lines: BufReader::new(reader).lines(),
                writer,
                _child: child,
                poisoned: false,
            }),
            catalog: OnceCell::new(),
        };

        let init = client
            .request(
                "initialize",
                Some(json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                })),
            )
            .await?;

        client
            .notify(JsonRpcRequest::notification("notifications/initialized"))
            .await?;

        let server_info = init.get("serverInfo").cloned().unwrap_or_default();
        debug!(server = %client.name, %server_info, "MCP handshake complete");
        Ok(client)
    }

    async fn notify(&self, notification: JsonRpcRequest) -> Result<(), McpError> {
        self.conn.lock().await.send(&notification).await
    }

    /// Send a request and wait for the response with the same id.
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);

        let mut conn = self.conn.lock().await;
        let exchange = async {
            conn.send(&request).await?;
            read_response(&mut conn.lines, id).await
        };

        let response = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| McpError::Timeout {
                method: method.to_string(),
                timeout_secs: self.timeout.as_secs(),
            })??;

        match (response.result, response.error) {
            (_, Some(error)) => Err(McpError::Rpc {
                code: error.code,
                message: error.message,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}

async fn write_line(writer: &mut BoxWriter, message: &JsonRpcRequest) -> Result<(), McpError> {
    let mut line = serde_json::to_string(message).map_err(|e| McpError::Protocol(e.to_string()))?;
    line.push('\n');
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| McpError::Transport(e.to_string()))?;
    writer
        .flush()
        .await
        .map_err(|e| McpError::Transport(e.to_string()))
}

/// Read lines until the response for `id` arrives. Server-initiated
/// notifications, stale responses and non-JSON noise are skipped.
async fn read_response(
    lines: &mut Lines<BufReader<BoxReader>>,
    id: u64,
) -> Result<JsonRpcResponse, McpError> {
    loop {
        let line = lines
            .next_line()
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?
            .ok_or_else(|| McpError::Transport("Server closed the connection".into()))?;

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<JsonRpcResponse>(trimmed) {
            Ok(response) if response.id == Value::from(id) => return Ok(response),
            Ok(response) => debug!(id = %response.id, expected = id, "Skipping unrelated response"),
            Err(_) => debug!(line = %trimmed, "Skipping non-response line"),
        }
    }
}

#[async_trait]
impl ToolProvider for McpClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError> {
        let tools = self
            .catalog
            .get_or_try_init(|| async {
                let result = self
                    .request("tools/list", None)
                    .await
                    .map_err(|e| e.into_tool_error("tools/list"))?;
                let listed: ListToolsResult = serde_json::from_value(result).map_err(|e| {
                    ToolError::Transport(format!("Malformed tools/list result: {e}"))
                })?;
                debug!(server = %self.name, count = listed.tools.len(), "Tool list cached");
                Ok::<_, ToolError>(listed.tools)
            })
            .await?;
        Ok(tools.clone())
    }

    async fn call(&self, name: &str, args: ToolArgs) -> Result<Value, ToolError> {
        let params = CallToolParams {
            name: name.to_string(),
            arguments: Some(args),
        };
        let params = serde_json::to_value(params)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let result = match self.request("tools/call", Some(params)).await {
            Ok(result) => result,
            Err(McpError::Rpc { code, .. }) if code == METHOD_NOT_FOUND => {
                return Err(ToolError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into_tool_error(name)),
        };

        let result: CallToolResult = serde_json::from_value(result)
            .map_err(|e| ToolError::Transport(format!("Malformed tools/call result: {e}")))?;

        if result.is_error {
            let reason = result.first_text().unwrap_or("tool reported an error").to_string();
            warn!(server = %self.name, tool = name, %reason, "Tool returned isError");
            return Err(ToolError::ExecutionFailed {
                tool_name: name.to_string(),
                reason,
            });
        }

        Ok(result.decode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn spawn_missing_binary_fails() {
        let config = McpServerConfig {
            name: "ghost".into(),
            description: String::new(),
            command: "/nonexistent/flightdeck-mcp-server".into(),
            args: vec![],
            env: HashMap::new(),
            enabled: true,
            request_timeout_secs: 1,
        };
        let err = McpClient::spawn(&config).await.err().unwrap();
        assert!(matches!(err, McpError::Spawn { .. }));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        // The server side is held open but never answers.
        let (client_io, _server_io) = tokio::io::duplex(1024);
        let (reader, writer) = tokio::io::split(client_io);
        let err = McpClient::connect("silent", reader, writer, Duration::from_millis(50))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, McpError::Timeout { .. }));
    }

    /// Answers the handshake, then stops reading while keeping the pipe open.
    async fn stalled_after_handshake(server_io: tokio::io::DuplexStream) {
        let (reader, mut writer) = tokio::io::split(server_io);
        let mut lines = BufReader::new(reader).lines();
        lines.next_line().await.unwrap();
        writer
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n")
            .await
            .unwrap();
        lines.next_line().await.unwrap();
        std::future::pending::<()>().await;
    }

    #[tokio::test]
    async fn interrupted_write_poisons_connection() {
        let (client_io, server_io) = tokio::io::duplex(64);
        tokio::spawn(stalled_after_handshake(server_io));
        let (reader, writer) = tokio::io::split(client_io);
        let client = McpClient::connect("stalled", reader, writer, Duration::from_millis(200))
            .await
            .unwrap();

        // Far larger than the pipe buffer, so the write cannot finish.
        let mut args = ToolArgs::new();
        args.insert("payload".into(), Value::String("x".repeat(4096)));
        let err = client.call("echo", args).await.unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. } | ToolError::Transport(_)));

        // The next call fails fast instead of appending to a partial line.
        let second = tokio::time::timeout(Duration::from_millis(100), client.call("echo", ToolArgs::new()))
            .await
            .expect("second call should not wait");
        match second {
            Err(ToolError::Transport(reason)) => assert!(reason.contains("interrupted write")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn closed_server_is_transport_error() {
        let (client_io, server_io) = tokio::io::duplex(1024);
        drop(server_io);
        let (reader, writer) = tokio::io::split(client_io);
        let err = McpClient::connect("closed", reader, writer, Duration::from_secs(1))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, McpError::Transport(_)));
    }
}
