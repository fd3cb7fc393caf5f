use moped_nav_core::prelude::*;
use moped_nav_routing::{Incident, Route};
use tracing::{info, warn};

/// Logs route and traffic updates; prints guidance as JSON lines when asked
pub struct ConsolePresenter {
    print_guidance: bool,
}

impl ConsolePresenter {
    pub fn new(print_guidance: bool) -> Self {
        Self { print_guidance }
    }
}

impl Presenter for ConsolePresenter {
    fn render_route(&self, route: &Route) {
        info!(
            "Route with {} points from {}",
            route.coordinates().len(),
            route.provider()
        );
    }

    fn render_incidents(&self, incidents: &[Incident]) {
        for incident in incidents {
            warn!(
                "{} at {:.5},{:.5}: {} (+{} s)",
                incident.kind,
                incident.location.lat,
                incident.location.lng,
                incident.description.as_deref().unwrap_or("-"),
                incident.delay_s
            );
        }
    }

    fn render_navigation(&self, state: &NavigationState) {
        if !self.print_guidance {
            return;
        }
        match serde_json::to_string(state) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("Failed to encode guidance: {e}"),
        }
    }

    fn clear(&self) {
        info!("Cleared");
    }
}
