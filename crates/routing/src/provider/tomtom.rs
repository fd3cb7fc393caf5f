//! TomTom Routing API backend.
//!
//! Traffic-aware: reported traffic delay is added to the base travel time,
//! and the same key unlocks the incident feed.

use std::sync::Arc;

use serde::Deserialize;

use crate::config::ProviderConfig;
use crate::identifiers::ProviderIdentifier;
use crate::incidents::TomTomTraffic;
use crate::legality::ProfileTag;
use crate::models::traits::{BoxFuture, IncidentSource, RoutingProvider};
use crate::models::types::*;
use crate::network::traits::{fetch_json, url_with_params, DataFetcher};
use crate::provider::{retain_advancing, RouteRequest};

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct CalculateRouteResponse {
    #[serde(default)]
    routes: Vec<TomTomRoute>,
}

#[derive(Debug, Deserialize)]
struct TomTomRoute {
    summary: Summary,
    legs: Vec<Leg>,
    #[serde(default)]
    guidance: Option<Guidance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    length_in_meters: f64,
    travel_time_in_seconds: f64,
    #[serde(default)]
    traffic_delay_in_seconds: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    points: Vec<LatLon>,
}

#[derive(Debug, Deserialize)]
struct LatLon {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct Guidance {
    #[serde(default)]
    instructions: Vec<GuidanceInstruction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GuidanceInstruction {
    point_index: usize,
    #[serde(default)]
    route_offset_in_meters: f64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    maneuver: String,
}

// ============================================================================
// Provider
// ============================================================================

pub struct TomTomProvider {
    id: ProviderIdentifier,
    fetcher: Arc<dyn DataFetcher>,
    base_url: String,
    api_key: String,
    language: String,
    traffic: TomTomTraffic,
}

impl TomTomProvider {
    pub fn new(
        config: &ProviderConfig,
        api_key: impl Into<String>,
        fetcher: Arc<dyn DataFetcher>,
    ) -> Self {
        let api_key = api_key.into();

        Self {
            id: ProviderIdentifier::tomtom(),
            traffic: TomTomTraffic::new(config, api_key.clone(), Arc::clone(&fetcher)),
            fetcher,
            base_url: config.tomtom_routing_url.clone(),
            api_key,
            language: config.language.clone(),
        }
    }

    fn request_url(&self, request: &RouteRequest) -> Result<String> {
        let base = format!(
            "{}/{},{}:{},{}/json",
            self.base_url.trim_end_matches('/'),
            request.start.lat,
            request.start.lng,
            request.end.lat,
            request.end.lng,
        );

        // a speed cap means a motorized two-wheeler; otherwise follow the profile
        let travel_mode = match (request.max_speed_kph, request.profile) {
            (Some(_), _) => "motorcycle",
            (None, ProfileTag::Bicycle) => "bicycle",
        };

        let mut params = vec![
            ("key", self.api_key.clone()),
            ("traffic", "true".to_string()),
            ("departAt", "now".to_string()),
            ("travelMode", travel_mode.to_string()),
            ("language", self.language.clone()),
            ("instructionsType", "text".to_string()),
        ];
        if let Some(max_speed) = request.max_speed_kph {
            params.push(("vehicleMaxSpeed", max_speed.to_string()));
        }
        if request.avoid_motorways {
            params.push(("avoid", "motorways".to_string()));
        }

        url_with_params(&base, params)
    }
}

impl RoutingProvider for TomTomProvider {
    fn id(&self) -> &ProviderIdentifier {
        &self.id
    }

    fn supports_traffic(&self) -> bool {
        true
    }

    fn plan<'a>(&'a self, request: &'a RouteRequest) -> BoxFuture<'a, Result<Route>> {
        Box::pin(async move {
            let url = self.request_url(request)?;
            let response: CalculateRouteResponse = fetch_json(self.fetcher.as_ref(), &url).await?;
            normalize(response, self.id.clone())
        })
    }

    fn incidents(&self) -> Option<&dyn IncidentSource> {
        Some(&self.traffic)
    }
}

fn normalize(response: CalculateRouteResponse, provider: ProviderIdentifier) -> Result<Route> {
    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or(RoutingError::RouteNotFound)?;

    let coordinates: Vec<Coordinate> = route
        .legs
        .iter()
        .flat_map(|leg| leg.points.iter())
        .map(|p| Coordinate::new(p.latitude, p.longitude))
        .collect();

    let instructions = route
        .guidance
        .map(|g| g.instructions)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|instr| {
            // instructions pointing past the geometry are dropped, not defaulted
            let location = *coordinates.get(instr.point_index)?;
            Some(Instruction {
                route_index: instr.point_index,
                distance_from_start_m: instr.route_offset_in_meters,
                text: instr.message,
                maneuver: Maneuver::from_token(&instr.maneuver),
                location,
            })
        })
        .collect();
    let instructions = retain_advancing(instructions, coordinates.len());

    let duration = route.summary.travel_time_in_seconds
        + route.summary.traffic_delay_in_seconds.unwrap_or(0.0);

    Route::new(
        coordinates,
        instructions,
        route.summary.length_in_meters,
        duration,
        provider,
    )
    .map_err(|e| RoutingError::ProviderUnavailable(e.to_string()))
}
