//! Environment-driven engine configuration.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `CARBONWISE_LOCATION` | `de` |
//! | `CARBONWISE_API_KEY` | unset (fallback provider disabled) |
//! | `CARBONWISE_REFRESH_INTERVAL_MINUTES` | `60` |
//! | `CARBONWISE_FETCH_TIMEOUT_SECS` | `60` |
//! | `CARBONWISE_PRIMARY_URL` | Energy-Charts `co2eq` endpoint |
//! | `CARBONWISE_FORECAST_URL` | carbon-aware-computing forecast endpoint |
//! | `CARBONWISE_INTENSITY_URL` | carbon-aware-computing intensity endpoint |

use std::env;
use std::time::Duration;

use tracing::warn;

use crate::adapters::{CARBON_AWARE_FORECAST_URL, CARBON_AWARE_INTENSITY_URL, ENERGY_CHARTS_CO2EQ_URL};
use crate::cache::DEFAULT_TTL;
use crate::retry::RetryConfig;
use crate::ValidationError;

pub const DEFAULT_LOCATION: &str = "de";
pub const DEFAULT_REFRESH_INTERVAL_MINUTES: u64 = 60;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

/// Settings shared by the router, the cache and the refresh task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Lowercase country or zone code, e.g. `de`.
    pub location: String,
    /// Enables the fallback and intensity providers when set.
    pub api_key: Option<String>,
    pub refresh_interval: Duration,
    pub fetch_timeout: Duration,
    pub cache_ttl: Duration,
    pub retry: RetryConfig,
    pub primary_url: String,
    pub forecast_url: String,
    pub intensity_url: String,
    /// Problems found while loading that fell back to defaults.
    pub warnings: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            location: String::from(DEFAULT_LOCATION),
            api_key: None,
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_MINUTES * 60),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            cache_ttl: DEFAULT_TTL,
            retry: RetryConfig::default(),
            primary_url: String::from(ENERGY_CHARTS_CO2EQ_URL),
            forecast_url: String::from(CARBON_AWARE_FORECAST_URL),
            intensity_url: String::from(CARBON_AWARE_INTENSITY_URL),
            warnings: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Reads the `CARBONWISE_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        if let Some(location) = get("CARBONWISE_LOCATION") {
            config.location = validate_location(&location)?;
        }
        config.api_key = get("CARBONWISE_API_KEY");

        if let Some(raw) = get("CARBONWISE_REFRESH_INTERVAL_MINUTES") {
            match positive_u64(&raw) {
                Some(minutes) => config.refresh_interval = Duration::from_secs(minutes * 60),
                None => config.push_warning(format!(
                    "invalid refresh interval '{raw}', using default of {DEFAULT_REFRESH_INTERVAL_MINUTES} minutes"
                )),
            }
        }
        if let Some(raw) = get("CARBONWISE_FETCH_TIMEOUT_SECS") {
            match positive_u64(&raw) {
                Some(secs) => config.fetch_timeout = Duration::from_secs(secs),
                None => config.push_warning(format!(
                    "invalid fetch timeout '{raw}', using default of {DEFAULT_FETCH_TIMEOUT_SECS}s"
                )),
            }
        }

        if let Some(url) = get("CARBONWISE_PRIMARY_URL") {
            config.primary_url = url;
        }
        if let Some(url) = get("CARBONWISE_FORECAST_URL") {
            config.forecast_url = url;
        }
        if let Some(url) = get("CARBONWISE_INTENSITY_URL") {
            config.intensity_url = url;
        }

        Ok(config)
    }

    /// Overrides the location, e.g. from a command-line flag.
    pub fn with_location(mut self, location: &str) -> Result<Self, ValidationError> {
        self.location = validate_location(location)?;
        Ok(self)
    }

    fn push_warning(&mut self, warning: String) {
        warn!("{warning}");
        self.warnings.push(warning);
    }
}

fn validate_location(raw: &str) -> Result<String, ValidationError> {
    let location = raw.trim().to_ascii_lowercase();
    let valid = !location.is_empty()
        && location
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if valid {
        Ok(location)
    } else {
        Err(ValidationError::InvalidLocation {
            value: raw.to_owned(),
        })
    }
}

fn positive_u64(raw: &str) -> Option<u64> {
    raw.parse::<u64>().ok().filter(|value| *value > 0)
}
