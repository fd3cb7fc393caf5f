//! Pluggable networking traits.
//!
//! Backends never talk to a client directly; they go through a
//! [`DataFetcher`] so tests and embedders can supply their own transport.

use serde::de::DeserializeOwned;

use crate::models::traits::BoxFuture;
use crate::models::types::{Result, RoutingError};

/// Fetch raw bytes from a URL
pub trait DataFetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// Fetch and decode a JSON document. Decoding failures count as the
/// backend being unavailable, same as transport failures.
pub async fn fetch_json<T: DeserializeOwned>(fetcher: &dyn DataFetcher, url: &str) -> Result<T> {
    let body = fetcher.fetch(url).await?;

    serde_json::from_slice(&body)
        .map_err(|e| RoutingError::ProviderUnavailable(format!("malformed response: {e}")))
}

/// Build `base?k=v&...` with every value percent-encoded
pub fn url_with_params<'a>(
    base: &str,
    params: impl IntoIterator<Item = (&'a str, String)>,
) -> Result<String> {
    reqwest::Url::parse_with_params(base, params)
        .map(String::from)
        .map_err(|e| RoutingError::ProviderUnavailable(format!("bad endpoint {base}: {e}")))
}
