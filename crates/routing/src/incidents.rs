//! Live traffic incidents around a planned route.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, FromRepr};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::identifiers::IncidentIdentifier;
use crate::models::traits::{BoxFuture, IncidentSource};
use crate::models::types::{Coordinate, Result};
use crate::network::traits::{fetch_json, url_with_params, DataFetcher};

/// Incident categories, indexed by the provider's icon category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, FromRepr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum IncidentKind {
    Unknown = 0,
    Accident = 1,
    Fog = 2,
    DangerousConditions = 3,
    Rain = 4,
    Ice = 5,
    Jam = 6,
    LaneClosed = 7,
    RoadClosed = 8,
}

impl IncidentKind {
    pub fn from_icon_category(icon: i64) -> Self {
        u8::try_from(icon)
            .ok()
            .and_then(Self::from_repr)
            .unwrap_or(Self::Unknown)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentIdentifier,
    pub location: Coordinate,
    pub kind: IncidentKind,
    pub description: Option<String>,
    /// 0 (unknown) to 4 (very serious)
    pub magnitude: u8,
    pub delay_s: u32,
}

// ============================================================================
// TomTom traffic feed
// ============================================================================

const INCIDENT_FIELDS: &str = concat!(
    "{incidents{type,geometry{type,coordinates},",
    "properties{iconCategory,magnitudeOfDelay,delay,events{description,code,iconCategory}}}}",
);

#[derive(Debug, Deserialize)]
struct IncidentResponse {
    #[serde(default)]
    incidents: Vec<RawIncident>,
}

#[derive(Debug, Deserialize)]
struct RawIncident {
    /// Kept raw so one odd geometry only drops its own incident
    #[serde(default)]
    geometry: serde_json::Value,
    #[serde(default)]
    properties: RawProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawProperties {
    icon_category: i64,
    magnitude_of_delay: i64,
    delay: Option<i64>,
    events: Vec<RawEvent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEvent {
    description: Option<String>,
}

pub struct TomTomTraffic {
    fetcher: Arc<dyn DataFetcher>,
    base_url: String,
    api_key: String,
    language: String,
}

impl TomTomTraffic {
    pub fn new(
        config: &ProviderConfig,
        api_key: impl Into<String>,
        fetcher: Arc<dyn DataFetcher>,
    ) -> Self {
        Self {
            fetcher,
            base_url: config.tomtom_traffic_url.clone(),
            api_key: api_key.into(),
            language: config.language.clone(),
        }
    }

    fn request_url(&self, bounds: geo::Rect) -> Result<String> {
        let bbox = format!(
            "{:.6},{:.6},{:.6},{:.6}",
            bounds.min().x,
            bounds.min().y,
            bounds.max().x,
            bounds.max().y
        );

        url_with_params(
            &self.base_url,
            [
                ("key", self.api_key.clone()),
                ("bbox", bbox),
                ("fields", INCIDENT_FIELDS.to_string()),
                ("language", self.language.clone()),
            ],
        )
    }
}

impl IncidentSource for TomTomTraffic {
    fn fetch_incidents<'a>(&'a self, bounds: geo::Rect) -> BoxFuture<'a, Result<Vec<Incident>>> {
        Box::pin(async move {
            let url = self.request_url(bounds)?;
            let response: IncidentResponse = fetch_json(self.fetcher.as_ref(), &url).await?;
            Ok(normalize(response))
        })
    }
}

/// Point geometries give their point, line strings their first vertex
fn incident_location(geometry: serde_json::Value) -> Option<Coordinate> {
    let geometry: geojson::Geometry = serde_json::from_value(geometry).ok()?;

    let position = match geometry.value {
        geojson::Value::Point(position) => position,
        geojson::Value::LineString(line) => line.into_iter().next()?,
        _ => return None,
    };

    match position.as_slice() {
        [lng, lat, ..] => Some(Coordinate::new(*lat, *lng)).filter(Coordinate::is_valid),
        _ => None,
    }
}

fn normalize(response: IncidentResponse) -> Vec<Incident> {
    response
        .incidents
        .into_iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            let Some(location) = incident_location(raw.geometry) else {
                debug!(index, "dropping incident with unparseable geometry");
                return None;
            };
            let properties = raw.properties;

            Some(Incident {
                id: IncidentIdentifier::new(format!("inc-{index}")),
                location,
                kind: IncidentKind::from_icon_category(properties.icon_category),
                description: properties
                    .events
                    .into_iter()
                    .find_map(|event| event.description),
                magnitude: properties.magnitude_of_delay.clamp(0, 4) as u8,
                delay_s: properties.delay.unwrap_or(0).max(0) as u32,
            })
        })
        .collect()
}
