//! Address lookup and autocomplete with fallback between geocoders.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ProviderConfig;
use crate::identifiers::{ProviderIdentifier, SuggestionIdentifier};
use crate::models::traits::{BoxFuture, Geocoder};
use crate::models::types::{Coordinate, Result, RoutingError};
use crate::network::traits::{fetch_json, url_with_params, DataFetcher};

/// Autocomplete needs at least this many characters
pub const MIN_SUGGESTION_QUERY_CHARS: usize = 3;
pub const MAX_SUGGESTIONS: usize = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: SuggestionIdentifier,
    pub label: String,
    pub location: Coordinate,
}

// ============================================================================
// TomTom Search
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    id: String,
    position: SearchPosition,
    #[serde(default)]
    address: SearchAddress,
}

#[derive(Debug, Deserialize)]
struct SearchPosition {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SearchAddress {
    freeform_address: String,
}

pub struct TomTomGeocoder {
    id: ProviderIdentifier,
    fetcher: Arc<dyn DataFetcher>,
    base_url: String,
    api_key: String,
}

impl TomTomGeocoder {
    pub fn new(
        config: &ProviderConfig,
        api_key: impl Into<String>,
        fetcher: Arc<dyn DataFetcher>,
    ) -> Self {
        Self {
            id: ProviderIdentifier::tomtom(),
            fetcher,
            base_url: config.tomtom_search_url.clone(),
            api_key: api_key.into(),
        }
    }

    fn search_url(
        &self,
        query: &str,
        country: &str,
        limit: usize,
        typeahead: bool,
    ) -> Result<String> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| RoutingError::ProviderUnavailable(format!("bad endpoint: {e}")))?;

        url.path_segments_mut()
            .map_err(|_| {
                RoutingError::ProviderUnavailable("search endpoint cannot take a path".into())
            })?
            .pop_if_empty()
            .push(&format!("{query}.json"));

        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair("countrySet", country)
            .append_pair("limit", &limit.to_string());
        if typeahead {
            url.query_pairs_mut().append_pair("typeahead", "true");
        }

        Ok(url.into())
    }

    async fn search(
        &self,
        query: &str,
        country: &str,
        limit: usize,
        typeahead: bool,
    ) -> Result<Vec<SearchResult>> {
        let url = self.search_url(query, country, limit, typeahead)?;
        let response: SearchResponse = fetch_json(self.fetcher.as_ref(), &url).await?;
        Ok(response.results)
    }
}

impl Geocoder for TomTomGeocoder {
    fn id(&self) -> &ProviderIdentifier {
        &self.id
    }

    fn geocode<'a>(
        &'a self,
        query: &'a str,
        country: &'a str,
    ) -> BoxFuture<'a, Result<Coordinate>> {
        Box::pin(async move {
            self.search(query, country, 1, false)
                .await?
                .into_iter()
                .next()
                .map(|r| Coordinate::new(r.position.lat, r.position.lon))
                .ok_or_else(|| RoutingError::GeocodeNotFound(query.to_string()))
        })
    }

    fn suggest<'a>(
        &'a self,
        query: &'a str,
        country: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<Suggestion>>> {
        Box::pin(async move {
            Ok(self
                .search(query, country, limit, true)
                .await?
                .into_iter()
                .map(|r| Suggestion {
                    id: SuggestionIdentifier::new(r.id),
                    label: r.address.freeform_address,
                    location: Coordinate::new(r.position.lat, r.position.lon),
                })
                .collect())
        })
    }
}

// ============================================================================
// Nominatim
// ============================================================================

#[derive(Debug, Deserialize)]
struct Place {
    #[serde(default)]
    place_id: u64,
    /// Nominatim sends coordinates as strings
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

impl Place {
    fn coordinate(&self) -> Option<Coordinate> {
        let lat = self.lat.parse().ok()?;
        let lng = self.lon.parse().ok()?;
        Some(Coordinate::new(lat, lng)).filter(Coordinate::is_valid)
    }
}

pub struct NominatimGeocoder {
    id: ProviderIdentifier,
    fetcher: Arc<dyn DataFetcher>,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(config: &ProviderConfig, fetcher: Arc<dyn DataFetcher>) -> Self {
        Self {
            id: ProviderIdentifier::nominatim(),
            fetcher,
            base_url: config.nominatim_url.clone(),
        }
    }

    async fn search(
        &self,
        query: &str,
        country: &str,
        limit: usize,
        details: bool,
    ) -> Result<Vec<Place>> {
        let mut params = vec![
            ("format", "json".to_string()),
            ("q", query.to_string()),
            ("countrycodes", country.to_ascii_lowercase()),
            ("limit", limit.to_string()),
        ];
        if details {
            params.push(("addressdetails", "1".to_string()));
        }

        let url = url_with_params(&self.base_url, params)?;
        fetch_json(self.fetcher.as_ref(), &url).await
    }
}

impl Geocoder for NominatimGeocoder {
    fn id(&self) -> &ProviderIdentifier {
        &self.id
    }

    fn geocode<'a>(
        &'a self,
        query: &'a str,
        country: &'a str,
    ) -> BoxFuture<'a, Result<Coordinate>> {
        Box::pin(async move {
            self.search(query, country, 1, false)
                .await?
                .first()
                .and_then(Place::coordinate)
                .ok_or_else(|| RoutingError::GeocodeNotFound(query.to_string()))
        })
    }

    fn suggest<'a>(
        &'a self,
        query: &'a str,
        country: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<Suggestion>>> {
        Box::pin(async move {
            Ok(self
                .search(query, country, limit, true)
                .await?
                .into_iter()
                .filter_map(|place| {
                    Some(Suggestion {
                        id: SuggestionIdentifier::new(place.place_id.to_string()),
                        location: place.coordinate()?,
                        label: place.display_name,
                    })
                })
                .collect())
        })
    }
}

// ============================================================================
// Chain
// ============================================================================

/// Geocoders tried in order; the first answer wins
#[derive(Clone)]
pub struct GeocoderChain {
    geocoders: Vec<Arc<dyn Geocoder>>,
    country: String,
}

impl GeocoderChain {
    pub fn new(geocoders: Vec<Arc<dyn Geocoder>>, country: impl Into<String>) -> Self {
        Self {
            geocoders,
            country: country.into(),
        }
    }

    /// TomTom Search first when a key is configured, Nominatim as the fallback
    pub fn from_config(config: &ProviderConfig, fetcher: Arc<dyn DataFetcher>) -> Self {
        let mut geocoders: Vec<Arc<dyn Geocoder>> = Vec::new();

        if let Some(key) = config.tomtom_api_key.as_deref().filter(|_| config.tomtom_enabled()) {
            geocoders.push(Arc::new(TomTomGeocoder::new(config, key, Arc::clone(&fetcher))));
        }
        geocoders.push(Arc::new(NominatimGeocoder::new(config, fetcher)));

        Self::new(geocoders, config.country.clone())
    }

    pub async fn geocode(&self, query: &str) -> Result<Coordinate> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RoutingError::GeocodeNotFound(String::new()));
        }

        for geocoder in &self.geocoders {
            match geocoder.geocode(query, &self.country).await {
                Ok(coordinate) => return Ok(coordinate),
                Err(e) => {
                    warn!(geocoder = %geocoder.id(), error = %e, "geocoding failed, trying next")
                }
            }
        }

        Err(RoutingError::GeocodeNotFound(query.to_string()))
    }

    /// Autocomplete candidates. Short queries and total failure both yield
    /// an empty list.
    pub async fn suggest(&self, query: &str) -> Vec<Suggestion> {
        let query = query.trim();
        if query.chars().count() < MIN_SUGGESTION_QUERY_CHARS {
            return Vec::new();
        }

        for geocoder in &self.geocoders {
            match geocoder.suggest(query, &self.country, MAX_SUGGESTIONS).await {
                Ok(suggestions) if !suggestions.is_empty() => {
                    return suggestions.into_iter().take(MAX_SUGGESTIONS).collect();
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(geocoder = %geocoder.id(), error = %e, "autocomplete failed, trying next")
                }
            }
        }

        Vec::new()
    }
}
