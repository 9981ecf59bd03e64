use std::collections::HashMap;

use crate::services::conversion_service::AmountSet;
use super::currency::TrackedCurrencies;
use super::history::HistoryLog;
use super::rates::{RateSnapshot, SeriesPoint};
use super::settings::UserSettings;

/// The most recent user edit, replayed whenever the rate snapshot changes.
#[derive(Debug, Clone, PartialEq)]
pub struct LastEdit {
    pub currency: String,
    pub amount: f64,
}

/// Everything the presentation layer reads, owned by the store.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub currencies: TrackedCurrencies,
    pub amounts: AmountSet,
    /// Active snapshot; `None` until the first refresh or cache hit
    pub rates: Option<RateSnapshot>,
    /// When `rates` was fetched or cached, epoch milliseconds. The
    /// snapshot's own timestamp is the provider's publication time.
    pub rates_fetched_at: Option<i64>,
    pub history: HistoryLog,
    pub settings: UserSettings,
    /// Pair key (`"USD-CNY"`) → last fetched series
    pub series: HashMap<String, Vec<SeriesPoint>>,
    /// True while a refresh or series fetch is in flight
    pub loading: bool,
    /// Human-readable description of the last degraded refresh
    pub error: Option<String>,
    pub last_edit: Option<LastEdit>,
}

impl StoreState {
    /// Whether the active snapshot came from the embedded fallback table.
    pub fn is_degraded(&self) -> bool {
        self.rates.as_ref().is_some_and(|r| r.is_fallback())
    }

    pub fn amount(&self, code: &str) -> Option<f64> {
        self.amounts.get(&code.to_uppercase()).copied()
    }
}
