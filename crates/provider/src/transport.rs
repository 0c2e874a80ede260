//! Rate-limited HTTP transport for the quote provider.

use async_trait::async_trait;
use governor::{clock::DefaultClock, state::InMemoryState, Quota, RateLimiter};
use reqwest::Client;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

use wheel_scan_core::config::ProviderConfig;
use wheel_scan_core::{MarketPhase, ScanError};

/// Abstraction over the provider connection so pipelines can run against an
/// in-memory transport in tests.
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    /// Fetches a JSON payload from `endpoint` with the given query params.
    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<serde_json::Value, ScanError>;
}

type DirectLimiter = RateLimiter<governor::state::direct::NotKeyed, InMemoryState, DefaultClock>;

/// reqwest-backed transport with a provider-wide rate limiter.
///
/// The base URL is fixed at construction: live during the open session,
/// delayed otherwise.
pub struct HttpTransport {
    http_client: Client,
    base_url: String,
    api_token: String,
    rate_limiter: Arc<DirectLimiter>,
}

impl HttpTransport {
    #[must_use]
    pub fn new(config: &ProviderConfig, phase: MarketPhase) -> Self {
        let base_url = if phase.is_live() {
            config.live_base_url.clone()
        } else {
            config.delayed_base_url.clone()
        };

        let rps = NonZeroU32::new(config.requests_per_second.max(1)).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(rps)));

        Self {
            http_client: Client::new(),
            base_url,
            api_token: config.api_token.clone(),
            rate_limiter,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ProviderTransport for HttpTransport {
    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<serde_json::Value, ScanError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(endpoint, "provider fetch");

        let response = self
            .http_client
            .get(&url)
            .query(params)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| ScanError::ProviderUnavailable(format!("{endpoint}: {e}")))?;

        if !response.status().is_success() {
            return Err(ScanError::ProviderUnavailable(format!(
                "{endpoint}: HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ScanError::ProviderUnavailable(format!("{endpoint}: bad body: {e}")))
    }
}

/// Cache-through fetch used by every provider client: fresh cache entry
/// wins, otherwise fetch and store. Failed fetches are never cached.
pub async fn fetch_cached(
    transport: &dyn ProviderTransport,
    cache: &crate::cache::CacheStore,
    endpoint: &str,
    symbol: &str,
    params: &[(String, String)],
) -> Result<serde_json::Value, ScanError> {
    let key = crate::cache::CacheKey::new(endpoint, symbol, params);
    if let Some(value) = cache.get(&key).await {
        return Ok(value);
    }
    let value = transport.get_json(endpoint, params).await?;
    cache.put(key, value.clone()).await;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_phase_routes_to_live_base() {
        let config = ProviderConfig::default();
        let transport = HttpTransport::new(&config, MarketPhase::Open);
        assert_eq!(transport.base_url(), config.live_base_url);
    }

    #[test]
    fn every_other_phase_routes_to_delayed_base() {
        let config = ProviderConfig::default();
        for phase in [MarketPhase::Pre, MarketPhase::Post, MarketPhase::Closed] {
            let transport = HttpTransport::new(&config, phase);
            assert_eq!(transport.base_url(), config.delayed_base_url);
        }
    }
}
