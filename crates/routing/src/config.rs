//! Backend endpoints and request settings.

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// TomTom is only used when a key is present
    pub tomtom_api_key: Option<String>,
    pub tomtom_routing_url: String,
    pub tomtom_search_url: String,
    pub tomtom_traffic_url: String,
    pub osrm_url: String,
    pub nominatim_url: String,
    /// Language of instruction and incident texts
    pub language: String,
    /// ISO 3166-1 alpha-2 country geocoding is restricted to
    pub country: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl ProviderConfig {
    pub fn tomtom_enabled(&self) -> bool {
        self.tomtom_api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            tomtom_api_key: None,
            tomtom_routing_url: "https://api.tomtom.com/routing/1/calculateRoute".into(),
            tomtom_search_url: "https://api.tomtom.com/search/2/search".into(),
            tomtom_traffic_url: "https://api.tomtom.com/traffic/services/5/incidentDetails".into(),
            osrm_url: "https://router.project-osrm.org/route/v1".into(),
            nominatim_url: "https://nominatim.openstreetmap.org/search".into(),
            language: "nl-NL".into(),
            country: "BE".into(),
            request_timeout_secs: 20,
            user_agent: concat!("moped-nav/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: ProviderConfig =
            serde_json::from_str(r#"{ "tomtom_api_key": "abc", "country": "NL" }"#).unwrap();

        assert!(config.tomtom_enabled());
        assert_eq!(config.country, "NL");
        assert_eq!(config.language, "nl-NL");
        assert_eq!(config.request_timeout_secs, 20);
    }

    #[test]
    fn test_blank_key_disables_tomtom() {
        let config = ProviderConfig {
            tomtom_api_key: Some("  ".into()),
            ..ProviderConfig::default()
        };
        assert!(!config.tomtom_enabled());
        assert!(!ProviderConfig::default().tomtom_enabled());
    }
}
