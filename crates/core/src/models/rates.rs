use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Source label for snapshots fetched from the live endpoint.
pub const LIVE_SOURCE: &str = "ExchangeRate-API";

/// Source label for snapshots built from the embedded fallback table.
/// Callers compare against this to detect degraded mode.
pub const FALLBACK_SOURCE: &str = "Fallback Data";

/// A complete set of exchange rates relative to one base currency.
///
/// Snapshots are replaced wholesale on refresh and never mutated in part.
/// `rates` may or may not contain the base itself; [`RateSnapshot::rate`]
/// always reports `1.0` for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    /// Base currency code (uppercased)
    pub base: String,

    /// currency code → units of that currency per one unit of `base`
    pub rates: HashMap<String, f64>,

    /// Capture time, epoch milliseconds
    pub timestamp: i64,

    /// Where the rates came from (see [`LIVE_SOURCE`], [`FALLBACK_SOURCE`])
    pub source: String,
}

impl RateSnapshot {
    /// Build a snapshot, dropping any non-finite or non-positive rate so the
    /// "all rates > 0" invariant holds for every snapshot in the system.
    pub fn new(
        base: impl Into<String>,
        rates: HashMap<String, f64>,
        timestamp: i64,
        source: impl Into<String>,
    ) -> Self {
        let rates = rates
            .into_iter()
            .filter(|(_, r)| r.is_finite() && *r > 0.0)
            .map(|(code, r)| (code.to_uppercase(), r))
            .collect();
        Self {
            base: base.into().to_uppercase(),
            rates,
            timestamp,
            source: source.into(),
        }
    }

    /// Rate of `code` relative to the base; the base itself is always 1.
    pub fn rate(&self, code: &str) -> Option<f64> {
        if code.eq_ignore_ascii_case(&self.base) {
            return Some(1.0);
        }
        self.rates
            .get(&code.to_uppercase())
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
    }

    pub fn is_fallback(&self) -> bool {
        self.source == FALLBACK_SOURCE
    }
}

/// One day of a historical series for a currency pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub rate: f64,
    /// Midnight UTC of `date`, epoch milliseconds
    pub timestamp: i64,
    /// True when the point was synthesized instead of fetched.
    #[serde(default)]
    pub synthetic: bool,
}

/// Cache key for a currency pair, e.g. `"USD-CNY"`.
pub fn pair_key(base: &str, target: &str) -> String {
    format!("{}-{}", base.to_uppercase(), target.to_uppercase())
}
