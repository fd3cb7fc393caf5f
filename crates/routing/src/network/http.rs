//! reqwest-backed [`DataFetcher`].

use std::time::Duration;

use crate::config::ProviderConfig;
use crate::models::traits::BoxFuture;
use crate::models::types::{Result, RoutingError};
use crate::network::traits::DataFetcher;

/// HTTP transport with a bounded request time
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| RoutingError::ProviderUnavailable(e.to_string()))?;

        Ok(Self { client })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        Self::new(
            Duration::from_secs(config.request_timeout_secs),
            &config.user_agent,
        )
    }
}

impl DataFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| RoutingError::ProviderUnavailable(e.without_url().to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(RoutingError::ProviderUnavailable(format!("status {status}")));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| RoutingError::ProviderUnavailable(e.without_url().to_string()))?;

            Ok(bytes.to_vec())
        })
    }
}
