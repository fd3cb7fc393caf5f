//! OSRM backend.
//!
//! Traffic-blind and without per-step geometry offsets: every instruction's
//! route index is its position in the step list, so callers get a coarser
//! instruction-to-geometry alignment than from TomTom.

use std::sync::Arc;

use serde::Deserialize;

use crate::config::ProviderConfig;
use crate::identifiers::ProviderIdentifier;
use crate::legality::ProfileTag;
use crate::models::traits::{BoxFuture, RoutingProvider};
use crate::models::types::*;
use crate::network::traits::{fetch_json, url_with_params, DataFetcher};
use crate::provider::{retain_advancing, RouteRequest};

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: LineGeometry,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct LineGeometry {
    /// `[lng, lat]` pairs
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
struct Step {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    name: String,
    maneuver: StepManeuver,
}

#[derive(Debug, Deserialize)]
struct StepManeuver {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    modifier: Option<String>,
    location: [f64; 2],
}

impl StepManeuver {
    /// Token fed to [`Maneuver::from_token`]
    fn token(&self) -> &str {
        match self.kind.as_str() {
            "depart" | "arrive" | "roundabout" => self.kind.as_str(),
            "rotary" | "roundabout turn" | "exit roundabout" | "exit rotary" => "roundabout",
            _ => self.modifier.as_deref().unwrap_or(&self.kind),
        }
    }

    fn text(&self, road_name: &str) -> String {
        [self.kind.as_str(), self.modifier.as_deref().unwrap_or(""), road_name]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ============================================================================
// Provider
// ============================================================================

pub struct OsrmProvider {
    id: ProviderIdentifier,
    fetcher: Arc<dyn DataFetcher>,
    base_url: String,
}

impl OsrmProvider {
    pub fn new(config: &ProviderConfig, fetcher: Arc<dyn DataFetcher>) -> Self {
        Self {
            id: ProviderIdentifier::osrm(),
            fetcher,
            base_url: config.osrm_url.clone(),
        }
    }

    /// OSRM has no speed-cap or avoid parameters on the bike profile; the
    /// profile itself keeps the route off motorways.
    fn request_url(&self, request: &RouteRequest) -> Result<String> {
        let profile = match request.profile {
            ProfileTag::Bicycle => "bike",
        };
        let base = format!(
            "{}/{}/{},{};{},{}",
            self.base_url.trim_end_matches('/'),
            profile,
            request.start.lng,
            request.start.lat,
            request.end.lng,
            request.end.lat,
        );

        url_with_params(
            &base,
            [
                ("overview", "full".to_string()),
                ("geometries", "geojson".to_string()),
                ("steps", "true".to_string()),
            ],
        )
    }
}

impl RoutingProvider for OsrmProvider {
    fn id(&self) -> &ProviderIdentifier {
        &self.id
    }

    fn plan<'a>(&'a self, request: &'a RouteRequest) -> BoxFuture<'a, Result<Route>> {
        Box::pin(async move {
            let url = self.request_url(request)?;
            let response: OsrmResponse = fetch_json(self.fetcher.as_ref(), &url).await?;
            normalize(response, self.id.clone())
        })
    }
}

fn normalize(response: OsrmResponse, provider: ProviderIdentifier) -> Result<Route> {
    match response.code.as_str() {
        "Ok" => {}
        "NoRoute" | "NoSegment" => return Err(RoutingError::RouteNotFound),
        other => {
            return Err(RoutingError::ProviderUnavailable(format!("OSRM answered {other}")));
        }
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or(RoutingError::RouteNotFound)?;

    let coordinates: Vec<Coordinate> = route
        .geometry
        .coordinates
        .iter()
        .map(|[lng, lat]| Coordinate::new(*lat, *lng))
        .collect();

    let mut distance_from_start = 0.0;
    let instructions = route
        .legs
        .iter()
        .flat_map(|leg| leg.steps.iter())
        .enumerate()
        .map(|(index, step)| {
            let [lng, lat] = step.maneuver.location;
            let instruction = Instruction {
                route_index: index,
                distance_from_start_m: distance_from_start,
                text: step.maneuver.text(&step.name),
                maneuver: Maneuver::from_token(step.maneuver.token()),
                location: Coordinate::new(lat, lng),
            };
            distance_from_start += step.distance;
            instruction
        })
        .collect();
    let instructions = retain_advancing(instructions, coordinates.len());

    Route::new(coordinates, instructions, route.distance, route.duration, provider)
        .map_err(|e| RoutingError::ProviderUnavailable(e.to_string()))
}
