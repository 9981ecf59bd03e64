use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Default remote endpoint for latest, historical and currency-list requests.
pub const DEFAULT_API_BASE_URL: &str = "https://api.exchangerate-api.com/v4";

/// Assumed capacity of the backing key-value storage (5 MiB).
pub const DEFAULT_STORAGE_CAPACITY_BYTES: u64 = 5 * 1024 * 1024;

/// Engine tunables. These are not user preferences (see `UserSettings`)
/// and are never persisted; callers build them once at startup.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use currency_sync_core::config::EngineConfig;
///
/// let config = EngineConfig::from_json_str(r#"{ "rate_cache_ttl_minutes": 5 }"#).unwrap();
/// assert_eq!(config.rate_cache_ttl_minutes, 5);
/// assert_eq!(config.history_limit, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the rate API, without a trailing slash.
    pub api_base_url: String,

    /// Per-request timeout for the reqwest client.
    pub request_timeout_secs: u64,

    /// How long a fetched rate snapshot stays fresh in the rate cache.
    pub rate_cache_ttl_minutes: u64,

    /// How long a fetched historical series stays fresh in the series cache.
    pub series_cache_ttl_minutes: u64,

    /// Maximum number of conversion records kept.
    pub history_limit: usize,

    /// Seed for the generator behind synthetic series data.
    pub rng_seed: u64,

    /// Capacity used as the denominator of the storage usage report.
    pub storage_capacity_bytes: u64,

    /// Upper bound on the span of a single historical series request.
    pub series_max_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 10,
            rate_cache_ttl_minutes: 30,
            series_cache_ttl_minutes: 60,
            history_limit: 100,
            rng_seed: 42,
            storage_capacity_bytes: DEFAULT_STORAGE_CAPACITY_BYTES,
            series_max_days: 365,
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| CoreError::Config(format!("Failed to parse engine config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.api_base_url.trim().is_empty() {
            return Err(CoreError::Config("api_base_url must not be empty".into()));
        }
        if self.rate_cache_ttl_minutes == 0 || self.series_cache_ttl_minutes == 0 {
            return Err(CoreError::Config("cache TTLs must be at least one minute".into()));
        }
        if self.history_limit == 0 {
            return Err(CoreError::Config("history_limit must be positive".into()));
        }
        if self.storage_capacity_bytes == 0 {
            return Err(CoreError::Config("storage_capacity_bytes must be positive".into()));
        }
        if self.series_max_days <= 0 {
            return Err(CoreError::Config("series_max_days must be positive".into()));
        }
        Ok(())
    }

    pub fn rate_cache_ttl_millis(&self) -> i64 {
        minutes_to_millis(self.rate_cache_ttl_minutes)
    }

    pub fn series_cache_ttl_millis(&self) -> i64 {
        minutes_to_millis(self.series_cache_ttl_minutes)
    }

    /// The base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}

fn minutes_to_millis(minutes: u64) -> i64 {
    i64::try_from(minutes)
        .unwrap_or(i64::MAX / 60_000)
        .saturating_mul(60_000)
}
