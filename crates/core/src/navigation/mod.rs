pub mod state;
pub mod tracker;

pub use state::{NavigationState, TrackerPhase};
pub use tracker::{closest_index, compute_state, Tracker, HEADING_LOOKAHEAD, SCAN_STRIDE};
