//! `flightdeck flight-server`: the flight tools as an MCP stdio server.
//!
//! Point an `[[mcp_servers]]` entry at this command to run the tools out of
//! process.

use std::sync::Arc;

use flightdeck_mcp::McpServer;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let server = McpServer::new(
        "flight-data-server",
        env!("CARGO_PKG_VERSION"),
        Arc::new(flightdeck_tools::default_registry()),
    );

    server.serve(tokio::io::stdin(), tokio::io::stdout()).await?;
    Ok(())
}
