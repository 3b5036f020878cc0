//! The five flight-data query tools.

use async_trait::async_trait;
use flightdeck_core::error::ToolError;
use flightdeck_core::tool::{Tool, ToolArgs};
use serde::Serialize;
use serde_json::{Value, json};

use crate::data::{self, Flight, Passenger};

/// Passengers listed per flight before the manifest is truncated.
const PASSENGER_PAGE: usize = 20;
const DEFAULT_TOP_N: usize = 10;

fn to_value<T: Serialize>(tool: &str, value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::ExecutionFailed {
        tool_name: tool.to_string(),
        reason: e.to_string(),
    })
}

/// An optional string argument. Absent or null yields `None`.
fn optional_str<'a>(args: &'a ToolArgs, key: &str) -> Result<Option<&'a str>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "'{key}' must be a string, got {other}"
        ))),
    }
}

fn required_str<'a>(args: &'a ToolArgs, key: &str) -> Result<&'a str, ToolError> {
    optional_str(args, key)?
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

/// An optional non-negative count. Fractional values are truncated.
fn optional_count(args: &ToolArgs, key: &str) -> Result<Option<usize>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(u) = n.as_u64() {
                return Ok(Some(u as usize));
            }
            match n.as_f64() {
                Some(f) if f >= 0.0 => Ok(Some(f as usize)),
                _ => Err(ToolError::InvalidArguments(format!(
                    "'{key}' must be a non-negative number"
                ))),
            }
        }
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "'{key}' must be a number, got {other}"
        ))),
    }
}

// --- get_flights ---

#[derive(Serialize)]
struct FlightsResponse {
    total_count: usize,
    flights: Vec<&'static Flight>,
}

pub struct GetFlightsTool;

#[async_trait]
impl Tool for GetFlightsTool {
    fn name(&self) -> &str {
        "get_flights"
    }

    fn description(&self) -> &str {
        "Get list of all flights with their details including flight ID, destination code, departure time, and airline."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "dest_code": {
                    "type": "string",
                    "description": "Filter by destination code (e.g., 'TOK', 'LAX', 'JFK')"
                },
                "airline": {
                    "type": "string",
                    "description": "Filter by airline name"
                }
            }
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let dest_code = optional_str(&args, "dest_code")?.filter(|s| !s.is_empty());
        let airline = optional_str(&args, "airline")?
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let flights: Vec<&'static Flight> = data::flights()
            .filter(|f| dest_code.is_none_or(|d| f.dest_code.eq_ignore_ascii_case(d)))
            .filter(|f| {
                airline
                    .as_deref()
                    .is_none_or(|a| f.airline.to_lowercase().contains(a))
            })
            .collect();

        to_value(
            self.name(),
            &FlightsResponse {
                total_count: flights.len(),
                flights,
            },
        )
    }
}

// --- get_passengers_by_flight ---

#[derive(Serialize)]
struct PassengersResponse<'a> {
    flight_number: &'a str,
    passenger_count: usize,
    passengers: Vec<&'static Passenger>,
    note: Option<String>,
}

pub struct GetPassengersByFlightTool;

#[async_trait]
impl Tool for GetPassengersByFlightTool {
    fn name(&self) -> &str {
        "get_passengers_by_flight"
    }

    fn description(&self) -> &str {
        "Get all passengers for a specific flight number."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "flight_number": {
                    "type": "string",
                    "description": "The flight number/ID to get passengers for (e.g., 'DL4733')"
                }
            },
            "required": ["flight_number"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let flight_number = required_str(&args, "flight_number")?;
        let wanted = flight_number.to_uppercase();

        let all: Vec<&'static Passenger> = data::passengers()
            .iter()
            .filter(|p| p.flight_number == wanted)
            .collect();
        let total = all.len();

        let note = (total > PASSENGER_PAGE)
            .then(|| format!("Showing first {PASSENGER_PAGE} of {total} passengers"));

        to_value(
            self.name(),
            &PassengersResponse {
                flight_number,
                passenger_count: total,
                passengers: all.into_iter().take(PASSENGER_PAGE).collect(),
                note,
            },
        )
    }
}

// --- count_passengers_by_flight ---

#[derive(Serialize)]
struct FlightCount {
    flight_number: &'static str,
    passenger_count: usize,
}

#[derive(Serialize)]
struct CountResponse {
    total_flights: usize,
    flights: Vec<FlightCount>,
}

pub struct CountPassengersByFlightTool;

#[async_trait]
impl Tool for CountPassengersByFlightTool {
    fn name(&self) -> &str {
        "count_passengers_by_flight"
    }

    fn description(&self) -> &str {
        "Count the number of passengers for each flight. Returns flight numbers sorted by passenger count."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "top_n": {
                    "type": "number",
                    "description": "Return only top N flights by passenger count. Default is all."
                }
            }
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value, ToolError> {
        // Zero means "no limit", same as omitting it.
        let top_n = optional_count(&args, "top_n")?.filter(|n| *n > 0);

        let flights: Vec<FlightCount> = data::passenger_counts()
            .into_iter()
            .take(top_n.unwrap_or(usize::MAX))
            .map(|(flight_number, passenger_count)| FlightCount {
                flight_number,
                passenger_count,
            })
            .collect();

        to_value(
            self.name(),
            &CountResponse {
                total_flights: flights.len(),
                flights,
            },
        )
    }
}

// --- get_top_flights_with_destinations ---

#[derive(Serialize)]
struct TopFlight {
    flight_number: &'static str,
    passenger_count: usize,
    destination: &'static str,
    destination_code: &'static str,
    airline: &'static str,
    departure_time: &'static str,
}

#[derive(Serialize)]
struct TopFlightsResponse {
    query: String,
    total_results: usize,
    results: Vec<TopFlight>,
}

pub struct GetTopFlightsWithDestinationsTool;

#[async_trait]
impl Tool for GetTopFlightsWithDestinationsTool {
    fn name(&self) -> &str {
        "get_top_flights_with_destinations"
    }

    fn description(&self) -> &str {
        "Get the top flights by passenger count along with their destination information. This is useful for queries like 'show me top 10 flights with most passengers and their destinations'."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "top_n": {
                    "type": "number",
                    "description": "Number of top flights to return. Default is 10.",
                    "default": DEFAULT_TOP_N
                }
            }
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let top_n = optional_count(&args, "top_n")?.unwrap_or(DEFAULT_TOP_N);

        let results: Vec<TopFlight> = data::passenger_counts()
            .into_iter()
            .take(top_n)
            .filter_map(|(flight_number, passenger_count)| {
                let flight = data::find_flight(flight_number)?;
                Some(TopFlight {
                    flight_number,
                    passenger_count,
                    destination: data::city_name(flight.dest_code).unwrap_or(flight.dest_code),
                    destination_code: flight.dest_code,
                    airline: flight.airline,
                    departure_time: flight.departure_time,
                })
            })
            .collect();

        to_value(
            self.name(),
            &TopFlightsResponse {
                query: format!("Top {top_n} flights by passenger volume"),
                total_results: results.len(),
                results,
            },
        )
    }
}

// --- get_destination_info ---

#[derive(Serialize)]
struct DestinationResponse {
    destination_code: String,
    city_name: &'static str,
    total_flights: usize,
    total_passengers: usize,
    flights: Vec<&'static Flight>,
}

pub struct GetDestinationInfoTool;

#[async_trait]
impl Tool for GetDestinationInfoTool {
    fn name(&self) -> &str {
        "get_destination_info"
    }

    fn description(&self) -> &str {
        "Get information about a destination by its code."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "dest_code": {
                    "type": "string",
                    "description": "The destination code (e.g., 'TOK', 'LAX', 'JFK')"
                }
            },
            "required": ["dest_code"]
        })
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let dest_code = required_str(&args, "dest_code")?.to_uppercase();

        // An unknown code is an answer, not a failure: the model reads it.
        let Some(city_name) = data::city_name(&dest_code) else {
            return Ok(json!({ "error": format!("Unknown destination code: {dest_code}") }));
        };

        let flights: Vec<&'static Flight> = data::flights()
            .filter(|f| f.dest_code == dest_code)
            .collect();
        let total_passengers = data::passengers()
            .iter()
            .filter(|p| flights.iter().any(|f| f.flight_id == p.flight_number))
            .count();

        to_value(
            self.name(),
            &DestinationResponse {
                destination_code: dest_code,
                city_name,
                total_flights: flights.len(),
                total_passengers,
                flights,
            },
        )
    }
}
