//! Ordered fallback across routing backends.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ProviderConfig;
use crate::incidents::Incident;
use crate::models::traits::RoutingProvider;
use crate::models::types::*;
use crate::network::traits::DataFetcher;
use crate::provider::{OsrmProvider, RouteRequest, TomTomProvider};
use crate::spatial::{bounding_box, padded};

/// Padding around the route when querying incidents, in degrees
pub const INCIDENT_BBOX_PADDING_DEG: f64 = 0.01;

/// Routing backends tried in order until one produces a route.
///
/// This type is cheap to clone since all backends are stored in `Arc`s.
#[derive(Clone)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn RoutingProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn RoutingProvider>>) -> Self {
        Self { providers }
    }

    /// TomTom first when a key is configured, OSRM as the fallback
    pub fn from_config(config: &ProviderConfig, fetcher: Arc<dyn DataFetcher>) -> Self {
        let mut providers: Vec<Arc<dyn RoutingProvider>> = Vec::new();

        if let Some(key) = config.tomtom_api_key.as_deref().filter(|_| config.tomtom_enabled()) {
            providers.push(Arc::new(TomTomProvider::new(config, key, Arc::clone(&fetcher))));
        }
        providers.push(Arc::new(OsrmProvider::new(config, fetcher)));

        Self::new(providers)
    }

    pub fn providers(&self) -> &[Arc<dyn RoutingProvider>] {
        &self.providers
    }

    /// Plan a route for `class`, falling back through the chain.
    ///
    /// Each backend is called at most once. Fails with `RouteNotFound` when at
    /// least one backend answered without a path, `ProviderUnavailable` when
    /// none could be reached.
    pub async fn plan_route(
        &self,
        start: Coordinate,
        end: Coordinate,
        class: VehicleClass,
    ) -> Result<Route> {
        let request = RouteRequest::for_class(start, end, class);
        let mut answered_without_route = false;
        let mut last_failure = None;

        for provider in &self.providers {
            match provider.plan(&request).await {
                Ok(route) => {
                    info!(
                        provider = %provider.id(),
                        points = route.coordinates().len(),
                        instructions = route.instructions().len(),
                        "route planned"
                    );
                    return Ok(route);
                }
                Err(RoutingError::RouteNotFound) => {
                    warn!(provider = %provider.id(), "no route, trying next provider");
                    answered_without_route = true;
                }
                Err(e) => {
                    warn!(
                        provider = %provider.id(),
                        error = %e,
                        "routing failed, trying next provider"
                    );
                    last_failure = Some(e.to_string());
                }
            }
        }

        if answered_without_route {
            Err(RoutingError::RouteNotFound)
        } else {
            Err(RoutingError::ProviderUnavailable(
                last_failure.unwrap_or_else(|| "no routing providers configured".into()),
            ))
        }
    }

    /// Whether the backend that produced `route` reports live traffic
    pub fn supports_traffic(&self, route: &Route) -> bool {
        self.provider_for(route)
            .is_some_and(|p| p.supports_traffic() && p.incidents().is_some())
    }

    /// Incidents around `route`, queried from the backend that planned it.
    /// Routes from traffic-blind backends have none.
    pub async fn fetch_incidents(&self, route: &Route) -> Result<Vec<Incident>> {
        let Some(source) = self
            .provider_for(route)
            .filter(|p| p.supports_traffic())
            .and_then(|p| p.incidents())
        else {
            debug!(provider = %route.provider(), "provider has no traffic feed");
            return Ok(Vec::new());
        };

        let Some(bounds) = bounding_box(route.coordinates()) else {
            return Ok(Vec::new());
        };

        source
            .fetch_incidents(padded(bounds, INCIDENT_BBOX_PADDING_DEG))
            .await
    }

    fn provider_for(&self, route: &Route) -> Option<&Arc<dyn RoutingProvider>> {
        self.providers.iter().find(|p| p.id() == route.provider())
    }
}
