//! # moped-nav-routing
//!
//! Legality-aware route planning for Belgian mopeds (class A and class B).
//!
//! ## Features
//!
//! - **Legality engine**: per-segment access rules for both moped classes
//! - **Geodesy**: haversine distances and compass bearings on WGS-84 points
//! - **Provider fallback**: ordered routing backends with one normalized schema
//! - **Traffic**: incident lookups around a planned route (traffic-aware backends)
//! - **Pluggable networking**: bring your own [`DataFetcher`](network::DataFetcher)
//!
//! ## Example
//!
//! ```
//! use moped_nav_routing::prelude::*;
//!
//! let ring_road = RoadSegment {
//!     road_type: RoadType::Secondary,
//!     max_speed_kph: 70,
//!     signs: SignFlags::from_bools(false, false, false, true, false, false, false),
//!     ..RoadSegment::default()
//! };
//!
//! // C6 sign without a usable cycle path: closed to class B mopeds
//! assert!(!is_accessible(&ring_road, VehicleClass::B));
//! assert_eq!(preferred_profile(VehicleClass::B), ProfileTag::Bicycle);
//! ```

pub mod config;
pub mod geocode;
pub mod identifiers;
pub mod incidents;
pub mod legality;
pub mod models;
pub mod network;
pub mod provider;
pub mod spatial;

pub use geo;

// Re-exports for convenience
pub mod prelude {
    pub use crate::config::ProviderConfig;
    pub use crate::geocode::{GeocoderChain, NominatimGeocoder, TomTomGeocoder};
    pub use crate::identifiers::*;
    pub use crate::incidents::{Incident, IncidentKind};
    pub use crate::legality::{
        is_accessible, permitted_direction, preferred_profile, surface_penalty, ProfileTag,
        TravelDirection,
    };
    pub use crate::models::{road::*, traits::*, types::*};
    pub use crate::network::traits::*;
    pub use crate::provider::{
        chain::ProviderChain, osrm::OsrmProvider, tomtom::TomTomProvider, RouteRequest,
    };
    pub use crate::spatial::{bearing_degrees, distance_meters};
}

pub use prelude::*;
