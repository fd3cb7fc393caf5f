//! Boundary towards whatever draws the map and the guidance panel.

use moped_nav_routing::{Incident, Route};

use crate::navigation::NavigationState;

/// Read-only consumer of session output. Calls arrive from the session's
/// tasks, so implementations should hand work off to their own UI thread.
pub trait Presenter: Send + Sync {
    fn render_route(&self, route: &Route);
    fn render_incidents(&self, incidents: &[Incident]);
    fn render_navigation(&self, state: &NavigationState);
    /// Remove route, incidents and guidance
    fn clear(&self);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPresenter;

impl Presenter for NoopPresenter {
    fn render_route(&self, _route: &Route) {}
    fn render_incidents(&self, _incidents: &[Incident]) {}
    fn render_navigation(&self, _state: &NavigationState) {}
    fn clear(&self) {}
}
