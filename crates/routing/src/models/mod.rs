//! Routing data models, types, and traits.

pub mod road;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use road::{RoadSegment, RoadType, SignFlags, Surface};
pub use traits::{Geocoder, IncidentSource, RoutingProvider};
pub use types::{Coordinate, Instruction, Maneuver, Result, Route, RoutingError, VehicleClass};
