use moped_nav_routing::{Instruction, Maneuver};
use serde::Serialize;
use strum::Display;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TrackerPhase {
    /// No route, or a route that has not been started
    #[default]
    Idle,
    Tracking,
}

/// Guidance derived from one position fix. Recomputed from scratch on every
/// fix; only the heading fallback looks at the previous state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NavigationState {
    pub closest_route_index: usize,
    /// Fraction of route points passed, in `[0, 1)`
    pub progress: f64,
    pub distance_to_next_m: f64,
    /// Linear share of the route's total duration
    pub remaining_duration_s: f64,
    pub next_instruction: Instruction,
    pub heading_deg: f64,
    pub speed_kph: Option<u32>,
}

impl NavigationState {
    pub fn has_arrived(&self) -> bool {
        self.next_instruction.maneuver == Maneuver::Arrive
            && self.distance_to_next_m == 0.0
    }
}
