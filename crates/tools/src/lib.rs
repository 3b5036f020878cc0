//! Flight and passenger query tools for flightdeck.
//!
//! The tools read a fixed in-memory dataset (see [`data`]) and are served
//! either in-process or over MCP stdio by `flightdeck flight-server`.

pub mod data;
pub mod flights;

use flightdeck_core::tool::ToolRegistry;

pub use flights::{
    CountPassengersByFlightTool, GetDestinationInfoTool, GetFlightsTool,
    GetPassengersByFlightTool, GetTopFlightsWithDestinationsTool,
};

/// Registry name reported by the flight tools.
pub const REGISTRY_NAME: &str = "flight-data";

/// Create a registry with all five flight-data tools.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new(REGISTRY_NAME);
    registry.register(Box::new(GetFlightsTool));
    registry.register(Box::new(GetPassengersByFlightTool));
    registry.register(Box::new(CountPassengersByFlightTool));
    registry.register(Box::new(GetTopFlightsWithDestinationsTool));
    registry.register(Box::new(GetDestinationInfoTool));

    tracing::debug!(tools = registry.len(), "Flight tool registry initialized");
    registry
}
