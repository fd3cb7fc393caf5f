use moped_nav_routing::RoutingError;

#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("Position sensor unavailable")]
    SensorUnavailable,

    /// A newer request or a cancellation superseded this one
    #[error("Result of generation {issued} discarded, session is at {current}")]
    StaleGeneration { issued: u64, current: u64 },

    #[error("No route loaded")]
    NoRoute,
}

pub type Result<T> = std::result::Result<T, NavigationError>;
