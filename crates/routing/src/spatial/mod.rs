//! Geodesy and bounding-box utilities.

pub mod queries;

pub use queries::{bearing_degrees, bounding_box, distance_meters, padded, EARTH_RADIUS_M};
