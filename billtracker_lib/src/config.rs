//! Environment-driven configuration for the upstream client.

use std::time::Duration;

use crate::cache::CacheTtls;
use crate::error::BillTrackerError;
use crate::rate_limiter::DEFAULT_MIN_INTERVAL;

/// Free-tier LegiScan monthly query allowance.
pub const DEFAULT_MONTHLY_LIMIT: u64 = 30_000;

/// Settings for building a [`crate::CachedClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub min_interval: Duration,
    pub ttls: CacheTtls,
    pub monthly_limit: u64,
}

impl ClientConfig {
    /// Defaults against the production endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: legiscan_api::DEFAULT_BASE_URL.to_string(),
            timeout: legiscan_api::DEFAULT_TIMEOUT,
            min_interval: DEFAULT_MIN_INTERVAL,
            ttls: CacheTtls::default(),
            monthly_limit: DEFAULT_MONTHLY_LIMIT,
        }
    }

    /// Reads `LEGISCAN_*` variables. Only the API key is required.
    pub fn from_env() -> Result<Self, BillTrackerError> {
        let api_key = std::env::var("LEGISCAN_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                BillTrackerError::Config(
                    "LEGISCAN_API_KEY environment variable not set".to_string(),
                )
            })?;

        let mut config = Self::new(api_key);
        if let Ok(url) = std::env::var("LEGISCAN_BASE_URL") {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }
        config.timeout = Duration::from_secs(env_u64(
            "LEGISCAN_TIMEOUT_SECS",
            config.timeout.as_secs(),
        ));
        config.min_interval = Duration::from_millis(env_u64(
            "LEGISCAN_MIN_INTERVAL_MS",
            config.min_interval.as_millis() as u64,
        ));
        config.monthly_limit = monthly_limit_from_env();
        Ok(config)
    }
}

/// Monthly query allowance from `LEGISCAN_MONTHLY_LIMIT`, without requiring an API key.
pub fn monthly_limit_from_env() -> u64 {
    env_u64("LEGISCAN_MONTHLY_LIMIT", DEFAULT_MONTHLY_LIMIT)
}

pub(crate) fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|val| val.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ClientConfig::new("k");
        assert_eq!(config.base_url, "https://api.legiscan.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.min_interval, Duration::from_millis(100));
        assert_eq!(config.monthly_limit, 30_000);
        assert_eq!(config.ttls.master_list, Duration::from_secs(3600));
    }

    #[test]
    fn env_u64_falls_back_on_garbage() {
        std::env::set_var("BILLTRACKER_TEST_ENV_U64", "not-a-number");
        assert_eq!(env_u64("BILLTRACKER_TEST_ENV_U64", 7), 7);
        std::env::set_var("BILLTRACKER_TEST_ENV_U64", "42");
        assert_eq!(env_u64("BILLTRACKER_TEST_ENV_U64", 7), 42);
        std::env::remove_var("BILLTRACKER_TEST_ENV_U64");
    }
}
