//! In-memory flight and passenger dataset.
//!
//! Thirteen departures on 2025-02-26 with a fixed passenger count each.
//! Passenger seats come from a seeded RNG so every process sees the same
//! manifest.

use std::sync::LazyLock;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Destination code to city name.
pub const DESTINATIONS: &[(&str, &str)] = &[
    ("TOK", "Tokyo"),
    ("PAR", "Paris"),
    ("SFO", "San Francisco"),
    ("LAX", "Los Angeles"),
    ("JFK", "New York (JFK)"),
    ("LHR", "London"),
    ("CDG", "Paris (CDG)"),
];

const SEAT_LETTERS: [char; 6] = ['A', 'B', 'C', 'D', 'E', 'F'];
const SEAT_SEED: u64 = 0x2025_0226;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flight {
    #[serde(rename = "flight_ID")]
    pub flight_id: &'static str,
    pub dest_code: &'static str,
    pub departure_time: &'static str,
    pub airline: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Passenger {
    #[serde(rename = "passenger_ID")]
    pub passenger_id: String,
    pub flight_number: &'static str,
    pub name: String,
    pub seat: String,
}

const fn flight(
    flight_id: &'static str,
    dest_code: &'static str,
    departure_time: &'static str,
    airline: &'static str,
) -> Flight {
    Flight {
        flight_id,
        dest_code,
        departure_time,
        airline,
    }
}

/// Every flight in departure order, with its booked passenger count.
const SCHEDULE: &[(Flight, usize)] = &[
    (flight("DL4733", "TOK", "2025-02-26T08:00:00Z", "Delta"), 337),
    (flight("UA5554", "PAR", "2025-02-26T09:30:00Z", "United"), 329),
    (flight("AL7912", "SFO", "2025-02-26T10:00:00Z", "Alaska"), 166),
    (flight("LH5562", "LAX", "2025-02-26T11:00:00Z", "Lufthansa"), 158),
    (flight("AL2567", "JFK", "2025-02-26T12:30:00Z", "Alaska"), 148),
    (flight("DL4678", "JFK", "2025-02-26T13:00:00Z", "Delta"), 148),
    (flight("DL6788", "SFO", "2025-02-26T14:00:00Z", "Delta"), 143),
    (flight("LH1278", "LAX", "2025-02-26T15:00:00Z", "Lufthansa"), 139),
    (flight("UA5790", "LAX", "2025-02-26T16:00:00Z", "United"), 138),
    (flight("ABC324", "LAX", "2025-02-26T17:00:00Z", "ABC Air"), 135),
    (flight("YIX124", "JFK", "2025-02-26T18:00:00Z", "YIX Airways"), 130),
    (flight("BA1234", "LHR", "2025-02-26T19:00:00Z", "British Airways"), 120),
    (flight("AF5678", "CDG", "2025-02-26T20:00:00Z", "Air France"), 115),
];

static PASSENGERS: LazyLock<Vec<Passenger>> = LazyLock::new(generate_passengers);

fn generate_passengers() -> Vec<Passenger> {
    let mut rng = StdRng::seed_from_u64(SEAT_SEED);
    let mut passengers = Vec::with_capacity(SCHEDULE.iter().map(|(_, n)| n).sum());
    let mut next_id = 1usize;

    for (flight, count) in SCHEDULE {
        for _ in 0..*count {
            let row: u32 = rng.random_range(1..=40);
            let letter = SEAT_LETTERS[rng.random_range(0..SEAT_LETTERS.len())];
            passengers.push(Passenger {
                passenger_id: format!("PAX{next_id:06}"),
                flight_number: flight.flight_id,
                name: format!("Passenger {next_id}"),
                seat: format!("{row}{letter}"),
            });
            next_id += 1;
        }
    }

    passengers
}

/// All flights in departure order.
pub fn flights() -> impl Iterator<Item = &'static Flight> {
    SCHEDULE.iter().map(|(f, _)| f)
}

/// The full passenger manifest, grouped by flight in departure order.
pub fn passengers() -> &'static [Passenger] {
    &PASSENGERS
}

pub fn find_flight(flight_id: &str) -> Option<&'static Flight> {
    flights().find(|f| f.flight_id == flight_id)
}

/// City name for a destination code. Exact match; callers normalize case.
pub fn city_name(dest_code: &str) -> Option<&'static str> {
    DESTINATIONS
        .iter()
        .find(|(code, _)| *code == dest_code)
        .map(|(_, city)| *city)
}

/// Passenger counts per flight, highest first. Ties keep departure order.
pub fn passenger_counts() -> Vec<(&'static str, usize)> {
    let mut counts: Vec<(&'static str, usize)> = flights()
        .map(|f| {
            let n = passengers()
                .iter()
                .filter(|p| p.flight_number == f.flight_id)
                .count();
            (f.flight_id, n)
        })
        .filter(|(_, n)| *n > 0)
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
