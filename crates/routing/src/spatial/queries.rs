//! Spatial query utilities for distance and bearing calculations.
//!
//! Uses the Haversine formula on a spherical Earth.

use geo::{coord, BoundingRect, LineString, Rect};

use crate::models::types::Coordinate;

/// Sphere radius used for every distance in this crate
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    if a == b {
        return 0.0;
    }

    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial compass bearing from `from` toward `to`, in `[0, 360)`.
///
/// The result is meaningless when both points coincide; callers must check
/// for that before relying on it.
pub fn bearing_degrees(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let y = d_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lng.cos();

    let bearing = y.atan2(x).to_degrees().rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// Bounding box of a sequence of coordinates (x = lng, y = lat)
pub fn bounding_box(coordinates: &[Coordinate]) -> Option<Rect> {
    coordinates
        .iter()
        .map(|c| coord! { x: c.lng, y: c.lat })
        .collect::<LineString>()
        .bounding_rect()
}

/// Grow a box by `degrees` on every side
pub fn padded(rect: Rect, degrees: f64) -> Rect {
    Rect::new(
        coord! { x: rect.min().x - degrees, y: rect.min().y - degrees },
        coord! { x: rect.max().x + degrees, y: rect.max().y + degrees },
    )
}
