//! Belgian moped access rules.
//!
//! A segment is judged on its road type, speed limit and posted signs:
//!
//! 1. Motorways and trunk roads are closed to both classes, whatever the signs say.
//! 2. Class A may always use cycle infrastructure. On a carriageway it is only
//!    turned away by a C6 sign when there is no cycle path to fall back on.
//! 3. Class B may only use a cycleway carrying the M sign. On a carriageway a C6
//!    sign closes the road unless a cycle path admitting class B runs alongside.
//!
//! The same rules drive the coarse profile requested from providers that do not
//! accept per-segment constraints.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::road::{RoadSegment, RoadType, Surface};
use crate::models::types::VehicleClass;

/// Speed limit above which a carriageway counts as a fast road for class B
pub const FAST_ROAD_KPH: u32 = 50;

/// Routing preference requested from a backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ProfileTag {
    /// Cycle-infrastructure biased; never routes over motorway-grade roads
    Bicycle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TravelDirection {
    Forward,
    Both,
}

/// Whether `class` may legally ride on `segment`
pub fn is_accessible(segment: &RoadSegment, class: VehicleClass) -> bool {
    if segment.road_type.is_motorway_grade() {
        return false;
    }

    match class {
        VehicleClass::A => {
            if segment.road_type.is_cycle_infrastructure() {
                return true;
            }
            // a C6 sign still leaves class A the cycle path
            !(segment.mopeds_prohibited_on_road() && !segment.has_cycle_path())
        }
        VehicleClass::B => {
            if segment.road_type == RoadType::Cycleway {
                return segment.mopeds_allowed_on_cycle_path();
            }

            let usable_cycle_path =
                segment.has_cycle_path() && segment.mopeds_allowed_on_cycle_path();

            if segment.max_speed_kph > FAST_ROAD_KPH {
                // fast roads: take the cycle path when it admits class B
                return usable_cycle_path || !segment.mopeds_prohibited_on_road();
            }

            !segment.mopeds_prohibited_on_road() || usable_cycle_path
        }
    }
}

/// Coarse profile to request when a backend only exposes a profile selector.
///
/// Both classes get the bicycle profile: motor-vehicle profiles happily use
/// motorways and trunk roads.
pub fn preferred_profile(_class: VehicleClass) -> ProfileTag {
    ProfileTag::Bicycle
}

/// Directions in which `class` may traverse the segment, or `None` if it may
/// not use it at all. M2/M3 signs open one-way streets to mopeds in both
/// directions.
pub fn permitted_direction(segment: &RoadSegment, class: VehicleClass) -> Option<TravelDirection> {
    if !is_accessible(segment, class) {
        return None;
    }

    if segment.one_way_car() && !segment.one_way_moped_exempt() {
        Some(TravelDirection::Forward)
    } else {
        Some(TravelDirection::Both)
    }
}

/// Cost multiplier for uncomfortable surfaces
pub fn surface_penalty(segment: &RoadSegment) -> f64 {
    match segment.surface {
        Surface::Cobblestone => 3.0,
        Surface::Asphalt | Surface::Gravel => 1.0,
    }
}
