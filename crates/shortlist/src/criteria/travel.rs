use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Driving time between two addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelTime {
    pub seconds: i64,
    /// Human readable duration shown as the criterion comment.
    pub text: String,
}

impl TravelTime {
    pub fn from_seconds(seconds: i64) -> Self {
        Self {
            seconds,
            text: describe_duration(seconds),
        }
    }
}

/// External travel-time collaborator. Implementations must not block on
/// network I/O; resolve the durations ahead of time and serve them from memory.
pub trait TravelTimeLookup: Send + Sync {
    fn travel_time(&self, origin: &str, destination: &str) -> Option<TravelTime>;
}

/// Lookup that knows no routes; every travel criterion scores as unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTravelTimes;

impl TravelTimeLookup for NoTravelTimes {
    fn travel_time(&self, _origin: &str, _destination: &str) -> Option<TravelTime> {
        None
    }
}

/// Precomputed route table keyed by normalized origin and destination.
#[derive(Debug, Clone, Default)]
pub struct TravelTimeTable {
    routes: HashMap<(String, String), TravelTime>,
}

impl TravelTimeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, origin: &str, destination: &str, seconds: i64) -> Self {
        self.insert(origin, destination, TravelTime::from_seconds(seconds));
        self
    }

    pub fn insert(&mut self, origin: &str, destination: &str, travel_time: TravelTime) {
        self.routes
            .insert((route_key(origin), route_key(destination)), travel_time);
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TravelTableError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Reads `origin,destination,seconds[,text]` rows.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TravelTableError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let mut table = Self::new();

        for row in csv_reader.deserialize::<RouteRow>() {
            let row = row?;
            let travel_time = match row.text.filter(|text| !text.is_empty()) {
                Some(text) => TravelTime {
                    seconds: row.seconds,
                    text,
                },
                None => TravelTime::from_seconds(row.seconds),
            };
            table.insert(&row.origin, &row.destination, travel_time);
        }

        Ok(table)
    }
}

impl TravelTimeLookup for TravelTimeTable {
    fn travel_time(&self, origin: &str, destination: &str) -> Option<TravelTime> {
        self.routes
            .get(&(route_key(origin), route_key(destination)))
            .cloned()
    }
}

#[derive(Debug, Deserialize)]
struct RouteRow {
    origin: String,
    destination: String,
    seconds: i64,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TravelTableError {
    #[error("failed to read travel-time table: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid travel-time row: {0}")]
    Csv(#[from] csv::Error),
}

fn route_key(address: &str) -> String {
    address
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Formats a duration the way route planners print it ("1 hour 5 mins").
pub fn describe_duration(seconds: i64) -> String {
    let minutes = seconds.max(0).saturating_add(30) / 60;
    let (hours, minutes) = (minutes / 60, minutes % 60);
    let plural = |count: i64, unit: &str| {
        if count == 1 {
            format!("{count} {unit}")
        } else {
            format!("{count} {unit}s")
        }
    };

    match (hours, minutes) {
        (0, minutes) => plural(minutes, "min"),
        (hours, 0) => plural(hours, "hour"),
        (hours, minutes) => format!("{} {}", plural(hours, "hour"), plural(minutes, "min")),
    }
}
