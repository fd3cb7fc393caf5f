//! Capabilities implemented by concrete backends.
//!
//! These traits are the seams between the normalized routing model and the
//! commercial or open services behind it. Implementations can be remote,
//! canned (tests) or on-device.

use std::future::Future;
use std::pin::Pin;

use crate::geocode::Suggestion;
use crate::identifiers::ProviderIdentifier;
use crate::incidents::Incident;
use crate::models::types::*;
use crate::provider::RouteRequest;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ============================================================================
// Routing
// ============================================================================

/// A routing backend producing normalized routes
pub trait RoutingProvider: Send + Sync {
    fn id(&self) -> &ProviderIdentifier;

    /// Whether durations include live traffic and incidents can be queried
    fn supports_traffic(&self) -> bool {
        false
    }

    /// Plan one route. `RouteNotFound` means the backend answered without a path;
    /// anything else is treated as the backend being unavailable.
    fn plan<'a>(&'a self, request: &'a RouteRequest) -> BoxFuture<'a, Result<Route>>;

    /// Live incident feed backing this provider, if any
    fn incidents(&self) -> Option<&dyn IncidentSource> {
        None
    }
}

/// Live traffic incidents inside a bounding box
pub trait IncidentSource: Send + Sync {
    fn fetch_incidents<'a>(&'a self, bounds: geo::Rect) -> BoxFuture<'a, Result<Vec<Incident>>>;
}

// ============================================================================
// Geocoding
// ============================================================================

/// Free-text address lookup restricted to one country
pub trait Geocoder: Send + Sync {
    fn id(&self) -> &ProviderIdentifier;

    /// Best match for the query
    fn geocode<'a>(&'a self, query: &'a str, country: &'a str) -> BoxFuture<'a, Result<Coordinate>>;

    /// Autocomplete candidates, best first
    fn suggest<'a>(
        &'a self,
        query: &'a str,
        country: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<Suggestion>>>;
}
