//! Routing backends and the fallback chain in front of them.

pub mod chain;
pub mod osrm;
pub mod tomtom;

pub use chain::ProviderChain;
pub use osrm::OsrmProvider;
pub use tomtom::TomTomProvider;

use tracing::debug;

use crate::legality::{preferred_profile, ProfileTag};
use crate::models::types::{Coordinate, Instruction, VehicleClass};

/// Backend-neutral route request
#[derive(Clone, Debug, PartialEq)]
pub struct RouteRequest {
    pub start: Coordinate,
    pub end: Coordinate,
    pub profile: ProfileTag,
    /// Speed cap hint for backends that route motorized two-wheelers
    pub max_speed_kph: Option<u32>,
    pub avoid_motorways: bool,
}

impl RouteRequest {
    pub fn for_class(start: Coordinate, end: Coordinate, class: VehicleClass) -> Self {
        let profile = preferred_profile(class);

        match class {
            VehicleClass::A => Self {
                start,
                end,
                profile,
                max_speed_kph: None,
                avoid_motorways: false,
            },
            VehicleClass::B => Self {
                start,
                end,
                profile,
                max_speed_kph: Some(class.speed_cap_kph()),
                avoid_motorways: true,
            },
        }
    }
}

/// Drop instructions that fall outside the geometry or do not advance along it
pub(crate) fn retain_advancing(
    instructions: Vec<Instruction>,
    point_count: usize,
) -> Vec<Instruction> {
    let mut last: Option<usize> = None;

    instructions
        .into_iter()
        .filter(|instruction| {
            let index = instruction.route_index;
            let keep = index < point_count && last.is_none_or(|l| index > l);
            if keep {
                last = Some(index);
            } else {
                debug!(index, point_count, "dropping instruction off the route geometry");
            }
            keep
        })
        .collect()
}
