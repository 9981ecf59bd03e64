use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::CoreError;
use super::kv::KeyValueStorage;

// ── Persisted keys ──────────────────────────────────────────────────

pub const SETTINGS_KEY: &str = "settings";
pub const HISTORY_KEY: &str = "conversion_history";
/// Next history id, kept apart from the records so clearing them does not
/// rewind the sequence.
pub const HISTORY_SEQ_KEY: &str = "conversion_history_next_id";
pub const CURRENCIES_KEY: &str = "currencies";
pub const RATE_CACHE_KEY: &str = "exchange_rates_cache";
pub const SERIES_CACHE_KEY: &str = "historical_rates_cache";

pub const ALL_KEYS: &[&str] = &[
    SETTINGS_KEY,
    HISTORY_KEY,
    HISTORY_SEQ_KEY,
    CURRENCIES_KEY,
    RATE_CACHE_KEY,
    SERIES_CACHE_KEY,
];

/// Read and decode `key`. Missing keys are `Ok(None)`.
pub fn try_load<T: DeserializeOwned>(
    storage: &dyn KeyValueStorage,
    key: &str,
) -> Result<Option<T>, CoreError> {
    match storage.get(key)? {
        Some(blob) => serde_json::from_str(&blob)
            .map(Some)
            .map_err(|e| CoreError::Deserialization(format!("Corrupt blob under '{key}': {e}"))),
        None => Ok(None),
    }
}

/// Read `key`, logging and returning `None` on a storage or decode failure.
pub fn load<T: DeserializeOwned>(storage: &dyn KeyValueStorage, key: &str) -> Option<T> {
    match try_load(storage, key) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Failed to load persisted value, using default");
            None
        }
    }
}

/// Encode and write `value` under `key`.
pub fn try_save<T: Serialize + ?Sized>(
    storage: &mut dyn KeyValueStorage,
    key: &str,
    value: &T,
) -> Result<(), CoreError> {
    let blob = serde_json::to_string(value)
        .map_err(|e| CoreError::Serialization(format!("Failed to serialize '{key}': {e}")))?;
    storage.set(key, &blob)
}

/// Write `value` under `key`; a failure is logged and the in-memory state
/// stays authoritative. Returns whether the write happened.
pub fn save<T: Serialize + ?Sized>(storage: &mut dyn KeyValueStorage, key: &str, value: &T) -> bool {
    match try_save(storage, key, value) {
        Ok(()) => true,
        Err(e) => {
            warn!(key, error = %e, "Failed to persist value, continuing in memory");
            false
        }
    }
}

/// Remove `key`, logging a failure.
pub fn remove(storage: &mut dyn KeyValueStorage, key: &str) -> bool {
    match storage.remove(key) {
        Ok(()) => true,
        Err(e) => {
            warn!(key, error = %e, "Failed to remove persisted value");
            false
        }
    }
}

/// How much of the assumed storage capacity is in use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageUsage {
    pub used_bytes: u64,
    pub capacity_bytes: u64,
    /// 0–100, may exceed 100 if the capacity assumption is wrong
    pub percent: f64,
}

/// Sum of key + value byte lengths across every stored key.
pub fn usage(storage: &dyn KeyValueStorage, capacity_bytes: u64) -> Result<StorageUsage, CoreError> {
    let mut used: u64 = 0;
    for key in storage.keys()? {
        let value_len = storage.get(&key)?.map(|v| v.len()).unwrap_or(0);
        used += (key.len() + value_len) as u64;
    }
    let percent = if capacity_bytes == 0 {
        0.0
    } else {
        used as f64 / capacity_bytes as f64 * 100.0
    };
    Ok(StorageUsage {
        used_bytes: used,
        capacity_bytes,
        percent,
    })
}
