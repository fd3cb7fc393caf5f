//! Live navigation on top of `moped-nav-routing`: position feed, tracker
//! and the session tying planning and tracking together.

pub mod error;
pub mod navigation;
pub mod presentation;
pub mod sensor;
pub mod session;

pub use moped_nav_routing as routing;

pub mod prelude {
    pub use crate::error::{NavigationError, Result};
    pub use crate::navigation::{NavigationState, Tracker, TrackerPhase};
    pub use crate::presentation::{NoopPresenter, Presenter};
    pub use crate::sensor::{PositionFix, SensorFeed, Subscription, DEFAULT_POSITION};
    pub use crate::session::NavigationSession;
}
