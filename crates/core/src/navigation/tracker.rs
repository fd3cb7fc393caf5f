//! Turns position fixes into guidance along a loaded route.

use std::sync::Arc;

use moped_nav_routing::{bearing_degrees, distance_meters, Coordinate, Instruction, Route};
use tracing::{debug, info};

use crate::error::{NavigationError, Result};
use crate::navigation::state::{NavigationState, TrackerPhase};
use crate::sensor::PositionFix;

/// Only every n-th route point is compared against the fix
pub const SCAN_STRIDE: usize = 2;
/// Points ahead of the closest one used for the heading
pub const HEADING_LOOKAHEAD: usize = 3;

#[derive(Debug, Default)]
pub struct Tracker {
    route: Option<Arc<Route>>,
    phase: TrackerPhase,
    last_fix: Option<PositionFix>,
    state: Option<NavigationState>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> TrackerPhase {
        self.phase
    }

    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    pub fn state(&self) -> Option<&NavigationState> {
        self.state.as_ref()
    }

    pub fn last_fix(&self) -> Option<PositionFix> {
        self.last_fix
    }

    /// Replace the route wholesale. Derived state from the old route is
    /// dropped; while tracking, guidance restarts on the new route right away.
    pub fn load_route(&mut self, route: Arc<Route>) -> Option<NavigationState> {
        info!(
            provider = %route.provider(),
            points = route.coordinates().len(),
            "route loaded"
        );

        self.route = Some(route);
        self.state = None;

        match self.phase {
            TrackerPhase::Tracking => self.recompute(),
            TrackerPhase::Idle => None,
        }
    }

    /// Idle -> Tracking. Emits a first state when a fix is already known.
    pub fn start(&mut self) -> Result<Option<NavigationState>> {
        if self.route.is_none() {
            return Err(NavigationError::NoRoute);
        }

        self.phase = TrackerPhase::Tracking;
        Ok(self.recompute())
    }

    /// Tracking -> Idle. The route stays loaded.
    pub fn cancel(&mut self) {
        if self.phase == TrackerPhase::Tracking {
            debug!("navigation stopped");
        }
        self.phase = TrackerPhase::Idle;
        self.state = None;
    }

    /// Drop the route and stop tracking
    pub fn reset(&mut self) {
        self.cancel();
        self.route = None;
    }

    pub fn on_fix(&mut self, fix: PositionFix) -> Option<NavigationState> {
        self.last_fix = Some(fix);

        match self.phase {
            TrackerPhase::Tracking => self.recompute(),
            TrackerPhase::Idle => None,
        }
    }

    fn recompute(&mut self) -> Option<NavigationState> {
        let route = self.route.as_ref()?;
        let fix = self.last_fix?;

        let state = compute_state(route, fix, self.state.as_ref());
        self.state = Some(state.clone());
        Some(state)
    }
}

/// Index of the sampled route point nearest to `position`. Ties keep the
/// earlier index.
pub fn closest_index(route: &Route, position: Coordinate) -> usize {
    let mut best = (0, f64::INFINITY);

    for (index, point) in route.coordinates().iter().enumerate().step_by(SCAN_STRIDE) {
        let distance = distance_meters(position, *point);
        if distance < best.1 {
            best = (index, distance);
        }
    }

    best.0
}

/// Guidance for `fix` on `route`. `previous` is only consulted for the
/// heading when no bearing can be derived from the geometry.
pub fn compute_state(
    route: &Route,
    fix: PositionFix,
    previous: Option<&NavigationState>,
) -> NavigationState {
    let coordinates = route.coordinates();
    let closest = closest_index(route, fix.coordinate);

    let progress = closest as f64 / coordinates.len() as f64;
    let remaining_duration_s = (route.total_duration_s() * (1.0 - progress)).round();

    let (next_instruction, distance_to_next_m) = match route
        .instructions()
        .iter()
        .find(|i| i.route_index > closest)
    {
        Some(next) => (
            next.clone(),
            distance_meters(fix.coordinate, next.location).round(),
        ),
        None => (Instruction::arrival(route), 0.0),
    };

    let lookahead = coordinates[(closest + HEADING_LOOKAHEAD).min(coordinates.len() - 1)];
    let heading_deg = if fix.coordinate != lookahead {
        bearing_degrees(fix.coordinate, lookahead)
    } else if coordinates[closest] != lookahead {
        bearing_degrees(coordinates[closest], lookahead)
    } else {
        previous.map_or(0.0, |p| p.heading_deg)
    };

    NavigationState {
        closest_route_index: closest,
        progress,
        distance_to_next_m,
        remaining_duration_s,
        next_instruction,
        heading_deg,
        speed_kph: fix.speed_kph(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use moped_nav_routing::{Maneuver, ProviderIdentifier};

    /// Straight line north from Ghent's Korenmarkt, roughly 111 m between points
    fn northbound(points: usize) -> Vec<Coordinate> {
        (0..points)
            .map(|i| Coordinate::new(51.05 + i as f64 * 0.001, 3.72))
            .collect()
    }

    fn instruction(
        route_index: usize,
        coordinates: &[Coordinate],
        maneuver: Maneuver,
    ) -> Instruction {
        Instruction {
            route_index,
            distance_from_start_m: route_index as f64 * 111.0,
            text: format!("{maneuver} at {route_index}"),
            maneuver,
            location: coordinates[route_index],
        }
    }

    fn route(points: usize, turns: &[usize]) -> Arc<Route> {
        let coordinates = northbound(points);
        let instructions = turns
            .iter()
            .map(|&i| instruction(i, &coordinates, Maneuver::TurnRight))
            .collect();

        Arc::new(
            Route::new(
                coordinates,
                instructions,
                points as f64 * 111.0,
                1000.0,
                ProviderIdentifier::osrm(),
            )
            .unwrap(),
        )
    }

    fn tracking(route: Arc<Route>) -> Tracker {
        let mut tracker = Tracker::new();
        tracker.load_route(route);
        assert_eq!(tracker.start().unwrap(), None);
        tracker
    }

    #[test]
    fn test_fix_on_sampled_point_is_closest() {
        let route = route(11, &[]);

        for k in (0..11).step_by(SCAN_STRIDE) {
            let fix = PositionFix::at(route.coordinates()[k]);
            assert_eq!(closest_index(&route, fix.coordinate), k);
        }
    }

    #[test]
    fn test_next_instruction_and_distance() {
        let route = route(10, &[4, 8]);
        let fix = PositionFix::at(route.coordinates()[2]);

        let state = compute_state(&route, fix, None);
        assert_eq!(state.closest_route_index, 2);
        assert_eq!(state.next_instruction.route_index, 4);
        // two points of 0.001 degrees latitude
        assert_relative_eq!(state.distance_to_next_m, 222.0, epsilon = 1.0);
        assert_eq!(state.distance_to_next_m.fract(), 0.0);
    }

    #[test]
    fn test_remaining_duration_is_linear() {
        let route = route(10, &[]);
        let fix = PositionFix::at(route.coordinates()[4]);

        let state = compute_state(&route, fix, None);
        assert_relative_eq!(state.progress, 0.4);
        assert_relative_eq!(state.remaining_duration_s, 600.0);
    }

    #[test]
    fn test_past_last_instruction_synthesizes_arrival() {
        let route = route(10, &[4]);
        let fix = PositionFix::at(route.coordinates()[8]);

        let state = compute_state(&route, fix, None);
        assert_eq!(state.next_instruction.maneuver, Maneuver::Arrive);
        assert_eq!(state.next_instruction.text, Instruction::ARRIVED_TEXT);
        assert_eq!(state.next_instruction.location, route.last_coordinate());
        assert_eq!(state.distance_to_next_m, 0.0);
        assert!(state.has_arrived());
    }

    #[test]
    fn test_route_without_instructions_arrives() {
        let route = route(4, &[]);
        let state = compute_state(&route, PositionFix::at(route.coordinates()[0]), None);
        assert_eq!(state.next_instruction.maneuver, Maneuver::Arrive);
    }

    #[test]
    fn test_progress_never_decreases_moving_forward() {
        let route = route(30, &[5, 12, 20, 27]);
        let mut tracker = tracking(Arc::clone(&route));

        let mut last_progress = 0.0;
        // ride along the line in small steps, between route points too
        for step in 0..=58 {
            let position = Coordinate::new(51.05 + step as f64 * 0.0005, 3.72001);
            let state = tracker.on_fix(PositionFix::at(position)).unwrap();
            assert!(state.progress >= last_progress);
            last_progress = state.progress;
        }
    }

    #[test]
    fn test_heading_points_ahead() {
        let route = route(10, &[]);
        let fix = PositionFix::at(Coordinate::new(51.0505, 3.7195));

        let state = compute_state(&route, fix, None);
        assert!(state.heading_deg < 10.0 || state.heading_deg > 350.0);
    }

    #[test]
    fn test_heading_fallback_when_fix_hits_lookahead_point() {
        let route = route(3, &[]);
        // closest sampled index 2 is the last point, so lookahead coincides
        let fix = PositionFix::at(route.last_coordinate());

        let previous = NavigationState {
            heading_deg: 42.0,
            ..compute_state(&route, PositionFix::at(route.coordinates()[0]), None)
        };
        assert_eq!(compute_state(&route, fix, Some(&previous)).heading_deg, 42.0);
        assert_eq!(compute_state(&route, fix, None).heading_deg, 0.0);
    }

    #[test]
    fn test_idle_tracker_ignores_fixes() {
        let mut tracker = Tracker::new();
        tracker.load_route(route(5, &[]));

        assert_eq!(tracker.on_fix(PositionFix::at(Coordinate::new(51.05, 3.72))), None);
        assert_eq!(tracker.phase(), TrackerPhase::Idle);

        // the fix is remembered and used as soon as tracking starts
        let first = tracker.start().unwrap().unwrap();
        assert_eq!(first.closest_route_index, 0);
        assert_eq!(tracker.phase(), TrackerPhase::Tracking);
    }

    #[test]
    fn test_start_without_route() {
        let mut tracker = Tracker::new();
        assert!(matches!(tracker.start(), Err(NavigationError::NoRoute)));
    }

    #[test]
    fn test_new_route_resets_state() {
        let mut tracker = tracking(route(20, &[15]));
        let far = PositionFix::at(Coordinate::new(51.068, 3.72));
        assert_eq!(tracker.on_fix(far).unwrap().closest_route_index, 18);

        // shorter replacement: the old index would be out of range
        let state = tracker.load_route(route(4, &[2])).unwrap();
        assert_eq!(state.closest_route_index, 2);
        assert_eq!(state.next_instruction.maneuver, Maneuver::Arrive);
        assert_eq!(tracker.route().unwrap().coordinates().len(), 4);
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let mut tracker = tracking(route(5, &[]));
        tracker.on_fix(PositionFix::new(Coordinate::new(51.05, 3.72), Some(10.0)));
        assert_eq!(tracker.state().unwrap().speed_kph, Some(36));

        tracker.cancel();
        assert_eq!(tracker.phase(), TrackerPhase::Idle);
        assert!(tracker.state().is_none());
        assert!(tracker.route().is_some());

        tracker.reset();
        assert!(tracker.route().is_none());
    }
}
