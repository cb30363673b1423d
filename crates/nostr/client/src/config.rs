//! Pool configuration.
//!
//! Loaded from a TOML file; every field has a default so an empty file (or no
//! file) is a valid configuration.
//!
//! ```toml
//! relays = ["wss://relay.damus.io", "wss://nos.lol"]
//! query_timeout_secs = 5
//! min_write_confirmations = 2
//! ```

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Environment variable overriding the relay list (comma-separated URLs).
pub const RELAYS_ENV: &str = "NOSTR_RELAYS";

/// Relay pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Relays to add to the pool at startup.
    #[serde(default = "default_relays")]
    pub relays: Vec<String>,
    /// Budget for `connect_all`, in seconds (default: 10).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Per-relay budget for a query, in seconds (default: 5).
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
    /// Per-relay budget for a publish acknowledgement, in seconds (default: 10).
    #[serde(default = "default_publish_timeout_secs")]
    pub publish_timeout_secs: u64,
    /// Relays that must accept a publish for it to succeed (default: 1).
    #[serde(default = "default_min_write_confirmations")]
    pub min_write_confirmations: usize,
    /// Profiles kept in the profile cache (default: 1000).
    #[serde(default = "default_profile_cache_size")]
    pub profile_cache_size: usize,
}

// Default value functions
fn default_relays() -> Vec<String> {
    crate::DEFAULT_RELAYS.iter().map(|s| s.to_string()).collect()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_query_timeout_secs() -> u64 {
    5
}

fn default_publish_timeout_secs() -> u64 {
    10
}

fn default_min_write_confirmations() -> usize {
    1
}

fn default_profile_cache_size() -> usize {
    1000
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            relays: default_relays(),
            connect_timeout_secs: default_connect_timeout_secs(),
            query_timeout_secs: default_query_timeout_secs(),
            publish_timeout_secs: default_publish_timeout_secs(),
            min_write_confirmations: default_min_write_confirmations(),
            profile_cache_size: default_profile_cache_size(),
        }
    }
}

impl PoolConfig {
    /// Default configuration with a custom relay list.
    pub fn with_relays(relays: Vec<String>) -> Self {
        Self {
            relays,
            ..Self::default()
        }
    }

    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse and validate TOML configuration text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the relay list with `NOSTR_RELAYS` when it is set and non-empty.
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var(RELAYS_ENV) {
            self.apply_relay_list(&value);
        }
    }

    fn apply_relay_list(&mut self, value: &str) {
        let relays: Vec<String> = value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if !relays.is_empty() {
            self.relays = relays;
        }
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.relays.is_empty() {
            return Err(ClientError::Config("at least one relay is required".to_string()));
        }
        for relay in &self.relays {
            validate_relay_url(relay)?;
        }
        if self.min_write_confirmations == 0 {
            return Err(ClientError::Config(
                "min_write_confirmations must be at least 1".to_string(),
            ));
        }
        if self.profile_cache_size == 0 {
            return Err(ClientError::Config(
                "profile_cache_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs)
    }
}

/// Parse a relay URL, requiring the `ws` or `wss` scheme.
pub fn validate_relay_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url)?;
    if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
        return Err(ClientError::InvalidUrl(format!(
            "URL must use ws:// or wss:// scheme, got: {}",
            url
        )));
    }
    if parsed.host_str().is_none() {
        return Err(ClientError::InvalidUrl(format!("URL has no host: {}", url)));
    }
    Ok(parsed)
}
