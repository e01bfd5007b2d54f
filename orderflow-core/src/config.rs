//! Environment-driven configuration, matching the donor stack's habit of a
//! small typed config struct with `Default` plus an explicit env loader
//! rather than a config file format.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Default decimal precision used for market-order quote/base
    /// conversions when a market does not specify its own.
    pub default_market_amount_decimals: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_market_amount_decimals: 8,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = env::var("ORDERFLOW_MARKET_AMOUNT_DECIMALS") {
            if let Ok(parsed) = raw.parse() {
                config.default_market_amount_decimals = parsed;
            }
        }
        config
    }
}

#[derive(Debug, Clone)]
pub struct ChannelHubConfig {
    /// Base URL the hub fetches `SnapshotV2` from when a market channel is
    /// first created.
    pub snapshot_base_url: String,
    pub snapshot_fetch_timeout: Duration,
}

impl Default for ChannelHubConfig {
    fn default() -> Self {
        Self {
            snapshot_base_url: "http://localhost:8080".to_string(),
            snapshot_fetch_timeout: Duration::from_secs(5),
        }
    }
}

impl ChannelHubConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("ORDERFLOW_SNAPSHOT_BASE_URL") {
            config.snapshot_base_url = url;
        }
        if let Ok(raw) = env::var("ORDERFLOW_SNAPSHOT_FETCH_TIMEOUT_MS") {
            if let Ok(ms) = raw.parse() {
                config.snapshot_fetch_timeout = Duration::from_millis(ms);
            }
        }
        config
    }
}
