//! Core data types and enums for routes.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::identifiers::ProviderIdentifier;

// ============================================================================
// Values
// ============================================================================

/// WGS-84 position in decimal degrees
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl From<Coordinate> for geo::Point {
    fn from(c: Coordinate) -> Self {
        geo::Point::new(c.lng, c.lat)
    }
}

impl From<geo::Point> for Coordinate {
    fn from(p: geo::Point) -> Self {
        Self::new(p.y(), p.x())
    }
}

impl From<geo::Coord> for Coordinate {
    fn from(c: geo::Coord) -> Self {
        Self::new(c.y, c.x)
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Belgian moped classes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum VehicleClass {
    /// Speed-limited to 25 km/h
    A,
    /// Speed-limited to 45 km/h
    B,
}

impl VehicleClass {
    pub fn speed_cap_kph(&self) -> u32 {
        match self {
            Self::A => 25,
            Self::B => 45,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Maneuver {
    TurnLeft,
    TurnRight,
    GoStraight,
    Roundabout,
    UTurn,
    Arrive,
    Depart,
    Unknown,
}

impl Maneuver {
    /// Map a provider's maneuver token onto the closed maneuver set.
    ///
    /// Keyword checks run in order, so "ROUNDABOUT_LEFT" is a left turn.
    pub fn from_token(token: &str) -> Self {
        let token = token.trim().to_ascii_lowercase();

        if token.contains("left") {
            Self::TurnLeft
        } else if token.contains("right") {
            Self::TurnRight
        } else if token.contains("straight") {
            Self::GoStraight
        } else if token.contains("roundabout") {
            Self::Roundabout
        } else if token.contains("uturn") {
            Self::UTurn
        } else if token == "depart" {
            Self::Depart
        } else if token == "arrive" {
            Self::Arrive
        } else {
            Self::Unknown
        }
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A single turn-by-turn instruction bound to a route coordinate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub route_index: usize,
    pub distance_from_start_m: f64,
    pub text: String,
    pub maneuver: Maneuver,
    pub location: Coordinate,
}

impl Instruction {
    pub const ARRIVED_TEXT: &'static str = "Bestemming bereikt";

    /// Terminal instruction used once every provider instruction has been passed
    pub fn arrival(route: &Route) -> Self {
        Self {
            route_index: route.coordinates.len() - 1,
            distance_from_start_m: route.total_distance_m,
            text: Self::ARRIVED_TEXT.to_string(),
            maneuver: Maneuver::Arrive,
            location: route.last_coordinate(),
        }
    }
}

/// A normalized route. Only constructible through [`Route::new`], which
/// checks the geometry and instruction invariants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RouteParts")]
pub struct Route {
    coordinates: Vec<Coordinate>,
    instructions: Vec<Instruction>,
    total_distance_m: f64,
    total_duration_s: f64,
    provider: ProviderIdentifier,
}

#[derive(Deserialize)]
struct RouteParts {
    coordinates: Vec<Coordinate>,
    instructions: Vec<Instruction>,
    total_distance_m: f64,
    total_duration_s: f64,
    provider: ProviderIdentifier,
}

impl TryFrom<RouteParts> for Route {
    type Error = RoutingError;

    fn try_from(parts: RouteParts) -> Result<Self> {
        Route::new(
            parts.coordinates,
            parts.instructions,
            parts.total_distance_m,
            parts.total_duration_s,
            parts.provider,
        )
    }
}

impl Route {
    pub fn new(
        coordinates: Vec<Coordinate>,
        instructions: Vec<Instruction>,
        total_distance_m: f64,
        total_duration_s: f64,
        provider: ProviderIdentifier,
    ) -> Result<Self> {
        if coordinates.is_empty() {
            return Err(RoutingError::InvalidData("route has no coordinates".into()));
        }

        let mut previous: Option<usize> = None;
        for instruction in &instructions {
            if instruction.route_index >= coordinates.len() {
                return Err(RoutingError::InvalidData(format!(
                    "instruction index {} outside geometry of {} points",
                    instruction.route_index,
                    coordinates.len()
                )));
            }
            if let Some(previous) = previous.filter(|&p| instruction.route_index <= p) {
                return Err(RoutingError::InvalidData(format!(
                    "instruction index {} does not advance past {}",
                    instruction.route_index, previous
                )));
            }
            previous = Some(instruction.route_index);
        }

        if !total_distance_m.is_finite() || !total_duration_s.is_finite() {
            return Err(RoutingError::InvalidData("route totals are not finite".into()));
        }

        Ok(Self {
            coordinates,
            instructions,
            total_distance_m,
            total_duration_s,
            provider,
        })
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn total_distance_m(&self) -> f64 {
        self.total_distance_m
    }

    pub fn total_duration_s(&self) -> f64 {
        self.total_duration_s
    }

    pub fn provider(&self) -> &ProviderIdentifier {
        &self.provider
    }

    pub fn last_coordinate(&self) -> Coordinate {
        // non-empty by construction
        self.coordinates[self.coordinates.len() - 1]
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    /// Transport or parse failure; recovered by falling back to the next backend
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("No route found")]
    RouteNotFound,

    #[error("No result for address: {0}")]
    GeocodeNotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, RoutingError>;
