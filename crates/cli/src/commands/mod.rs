//! Subcommand implementations and the wiring they share.

pub mod ask;
pub mod flight_server;
pub mod init;
pub mod serve;
pub mod tools;

use std::sync::Arc;
use std::time::Duration;

use flightdeck_agent::AgentLoop;
use flightdeck_config::AppConfig;
use flightdeck_core::tool::ToolProvider;
use tracing::{info, warn};

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// The tool provider for a run: configured MCP servers, or the in-process
/// flight registry when none is enabled or none could be reached.
pub async fn build_tools(config: &AppConfig) -> Arc<dyn ToolProvider> {
    let enabled = config.enabled_mcp_servers().count();
    if enabled > 0 {
        let multi = flightdeck_mcp::connect_servers(config.enabled_mcp_servers()).await;
        if multi.provider_count() > 0 {
            info!(servers = multi.provider_count(), "Using MCP tool servers");
            return Arc::new(multi);
        }
        warn!(configured = enabled, "No MCP server reachable, using built-in flight tools");
    }
    Arc::new(flightdeck_tools::default_registry())
}

/// Build the agent loop from config: model, tools and loop limits.
pub async fn build_agent(config: &AppConfig) -> Result<AgentLoop, Box<dyn std::error::Error>> {
    let model = flightdeck_providers::build_from_config(config)?;
    let tools = build_tools(config).await;

    let mut agent = AgentLoop::new(model, tools, config.provider.model.clone())
        .with_max_iterations(config.agent.max_iterations);

    if let Some(instructions) = &config.agent.instructions_override {
        agent = agent.with_instructions(instructions.clone());
    }
    if let Some(temperature) = config.provider.temperature {
        agent = agent.with_temperature(temperature);
    }
    if let Some(max_tokens) = config.provider.max_tokens {
        agent = agent.with_max_tokens(max_tokens);
    }
    if let Some(secs) = config.agent.run_timeout_secs {
        agent = agent.with_run_timeout(Duration::from_secs(secs));
    }

    Ok(agent)
}
