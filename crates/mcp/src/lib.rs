//! MCP (Model Context Protocol) plumbing for flightdeck.
//!
//! - [`McpClient`] connects to a tool server subprocess over stdio.
//! - [`McpServer`] exposes a local tool catalog over stdio.
//! - [`MultiProvider`] merges several catalogs into one.

pub mod client;
pub mod error;
pub mod multi;
pub mod protocol;
pub mod server;

use std::sync::Arc;

use flightdeck_config::McpServerConfig;
use flightdeck_core::tool::ToolProvider;
use tracing::{info, warn};

pub use client::McpClient;
pub use error::McpError;
pub use multi::MultiProvider;
pub use server::McpServer;

/// Connect to every given server and merge their catalogs.
///
/// Servers that fail to start are logged and skipped, so the result may be
/// empty.
pub async fn connect_servers<'a>(
    servers: impl IntoIterator<Item = &'a McpServerConfig>,
) -> MultiProvider {
    let mut providers: Vec<Arc<dyn ToolProvider>> = Vec::new();

    for config in servers {
        match McpClient::spawn(config).await {
            Ok(client) => {
                info!(server = %config.name, "MCP server connected");
                providers.push(Arc::new(client));
            }
            Err(e) => warn!(server = %config.name, error = %e, "MCP server unavailable"),
        }
    }

    MultiProvider::build(providers).await
}
