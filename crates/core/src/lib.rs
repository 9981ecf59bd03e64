pub mod cache;
pub mod clock;
pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use cache::{CacheEntry, TtlCache};
use clock::{Clock, SystemClock};
use config::EngineConfig;
use errors::CoreError;
use models::{
    currency::{normalize_code, Currency, TrackedCurrencies},
    history::{ConversionRecord, HistoryLog},
    rates::{pair_key, RateSnapshot, SeriesPoint},
    settings::{SettingsPatch, UserSettings},
    state::{LastEdit, StoreState},
};
use providers::{
    currency_list::CurrencyListSource,
    http::{ReqwestHttpClient, SharedHttpClient},
    rate_source::RateSource,
    series_source::HistoricalSeriesSource,
};
use services::conversion_service::{AmountSet, ConversionEngine};
use storage::{
    backup::{self, Backup},
    kv::KeyValueStorage,
    persistence::{
        self, StorageUsage, CURRENCIES_KEY, HISTORY_KEY, HISTORY_SEQ_KEY, RATE_CACHE_KEY,
        SERIES_CACHE_KEY, SETTINGS_KEY,
    },
};

/// Identity of one rate refresh. Only the most recently issued ticket may
/// apply its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTicket {
    pub generation: u64,
    pub base: String,
}

/// Entry counts of the two TTL caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub rate_entries: usize,
    pub series_entries: usize,
}

/// Main entry point for the currency-sync core library.
///
/// Owns the converter state and every collaborator needed to mutate it:
/// rate and series sources, the two TTL caches, the conversion engine and
/// the persistence backend. Construct one per session and hand it to
/// consumers; there is no global instance.
#[must_use]
pub struct ConverterStore {
    state: StoreState,
    engine: ConversionEngine,
    rate_source: RateSource,
    series_source: HistoricalSeriesSource,
    currency_list: CurrencyListSource,
    rate_cache: TtlCache<RateSnapshot>,
    series_cache: TtlCache<Vec<SeriesPoint>>,
    storage: Box<dyn KeyValueStorage>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    /// Latest issued refresh generation.
    refresh_generation: u64,
}

impl std::fmt::Debug for ConverterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterStore")
            .field("currencies", &self.state.currencies.codes())
            .field("base", &self.state.settings.base_currency)
            .field("rates_source", &self.state.rates.as_ref().map(|r| r.source.as_str()))
            .field("history", &self.state.history.len())
            .field("cached_rates", &self.rate_cache.len())
            .field("cached_series", &self.series_cache.len())
            .field("refresh_generation", &self.refresh_generation)
            .finish()
    }
}

impl ConverterStore {
    /// Build a store over `storage`, restoring any persisted state.
    pub fn new(
        storage: Box<dyn KeyValueStorage>,
        http: SharedHttpClient,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let base_url = config.base_url().to_string();

        let mut store = Self {
            state: StoreState {
                history: HistoryLog::new(config.history_limit),
                ..StoreState::default()
            },
            engine: ConversionEngine::new(),
            rate_source: RateSource::new(http.clone(), base_url.clone()),
            series_source: HistoricalSeriesSource::new(http.clone(), base_url.clone(), config.rng_seed),
            currency_list: CurrencyListSource::new(http, base_url),
            rate_cache: TtlCache::new("rates", config.rate_cache_ttl_millis()),
            series_cache: TtlCache::new("series", config.series_cache_ttl_millis()),
            storage,
            clock,
            config,
            refresh_generation: 0,
        };
        store.hydrate();
        Ok(store)
    }

    /// Store with the reqwest client, the system clock and default config.
    pub fn with_defaults(storage: Box<dyn KeyValueStorage>) -> Result<Self, CoreError> {
        let config = EngineConfig::default();
        let http: SharedHttpClient = Arc::new(ReqwestHttpClient::new(config.request_timeout_secs));
        Self::new(storage, http, Arc::new(SystemClock), config)
    }

    // ── State ───────────────────────────────────────────────────────

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> &StoreState {
        &self.state
    }

    #[must_use]
    pub fn settings(&self) -> &UserSettings {
        &self.state.settings
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The persistence backend, for inspection.
    #[must_use]
    pub fn storage(&self) -> &dyn KeyValueStorage {
        self.storage.as_ref()
    }

    #[must_use]
    pub fn rate_source(&self) -> &RateSource {
        &self.rate_source
    }

    // ── Currencies ──────────────────────────────────────────────────

    /// Track a currency by code. Name and symbol default from the built-in
    /// catalogue.
    pub fn add_currency(
        &mut self,
        code: &str,
        name: Option<String>,
        symbol: Option<String>,
    ) -> Result<&Currency, CoreError> {
        let code = normalize_code(code)?;
        let mut currency = Currency::from_code(&code);
        if let Some(name) = name {
            currency.name = name;
        }
        if let Some(symbol) = symbol {
            currency.symbol = symbol;
        }
        self.state.currencies.add(currency)?;
        self.persist_currencies();
        self.state
            .currencies
            .get(&code)
            .ok_or(CoreError::CurrencyNotFound(code))
    }

    /// Stop tracking a currency. Rejected if fewer than two would remain.
    pub fn remove_currency(&mut self, code: &str) -> Result<Currency, CoreError> {
        let removed = self.state.currencies.remove(code)?;
        self.persist_currencies();
        Ok(removed)
    }

    /// Move a currency to `new_index` (clamped to the end of the list).
    pub fn move_currency(&mut self, code: &str, new_index: usize) -> Result<(), CoreError> {
        self.state.currencies.move_to(code, new_index)?;
        self.persist_currencies();
        Ok(())
    }

    pub fn set_favorite(&mut self, code: &str, favorite: bool) -> Result<(), CoreError> {
        self.state.currencies.update(code, |c| c.favorite = favorite)?;
        self.persist_currencies();
        Ok(())
    }

    /// Flip the favorite flag in place and return the new value.
    pub fn toggle_favorite(&mut self, code: &str) -> Result<bool, CoreError> {
        let favorite = self
            .state
            .currencies
            .update(code, |c| c.favorite = !c.favorite)?
            .favorite;
        self.persist_currencies();
        Ok(favorite)
    }

    pub fn set_active(&mut self, code: &str, active: bool) -> Result<(), CoreError> {
        self.state.currencies.update(code, |c| c.active = active)?;
        self.persist_currencies();
        Ok(())
    }

    /// Change display name and/or symbol without moving the currency.
    pub fn rename_currency(
        &mut self,
        code: &str,
        name: Option<String>,
        symbol: Option<String>,
    ) -> Result<(), CoreError> {
        self.state.currencies.update(code, |c| {
            if let Some(name) = name {
                c.name = name;
            }
            if let Some(symbol) = symbol {
                c.symbol = symbol;
            }
        })?;
        self.persist_currencies();
        Ok(())
    }

    /// Currencies the user can add: the remote list, or the built-in
    /// catalogue when it cannot be fetched.
    pub async fn available_currencies(&self) -> BTreeMap<String, String> {
        self.currency_list.fetch().await
    }

    // ── Amounts & Conversions ───────────────────────────────────────

    /// Set `code` to `amount` and derive every other amount from it.
    ///
    /// When `log` is set and the edit propagated through a snapshot, an
    /// ALL-currencies record is appended to the history.
    pub fn edit_amount(&mut self, code: &str, amount: f64, log: bool) -> Result<&AmountSet, CoreError> {
        if !amount.is_finite() {
            return Err(CoreError::ValidationError(format!("Amount must be a finite number, got {amount}")));
        }
        let code = normalize_code(code)?;
        let dp = self.state.settings.decimal_places;
        self.state.amounts = self.engine.apply_edit(
            &self.state.amounts,
            &code,
            amount,
            self.state.rates.as_ref(),
            dp,
        );
        self.state.last_edit = Some(LastEdit {
            currency: code.clone(),
            amount,
        });

        let propagated = amount > 0.0
            && self.state.rates.as_ref().is_some_and(|r| r.rate(&code).is_some());
        if log && propagated {
            let source = self
                .state
                .rates
                .as_ref()
                .map(|r| r.source.clone())
                .unwrap_or_default();
            let draft = self.engine.all_currencies_draft(&code, amount, &source);
            let now = self.clock.now_millis();
            self.state.history.append(draft, now);
            self.persist_history();
        }
        Ok(&self.state.amounts)
    }

    /// Convert `amount` from one currency to another with the active
    /// snapshot and log it. Returns `None` (nothing logged) when no snapshot
    /// is active or either rate is unknown.
    pub fn convert_pair(&mut self, from: &str, to: &str, amount: f64) -> Option<ConversionRecord> {
        let draft = self.engine.convert_pair(
            from,
            to,
            amount,
            self.state.rates.as_ref(),
            self.state.settings.decimal_places,
        )?;
        let now = self.clock.now_millis();
        let record = self.state.history.append(draft, now).clone();
        self.persist_history();
        Some(record)
    }

    // ── History ─────────────────────────────────────────────────────

    /// Newest-first records involving `code`; ALL-currencies records
    /// involve every currency.
    #[must_use]
    pub fn history_for_currency(&self, code: &str) -> Vec<&ConversionRecord> {
        self.state.history.iter().filter(|r| r.involves(code)).collect()
    }

    pub fn clear_history(&mut self) {
        self.state.history.clear();
        self.persist_history();
    }

    // ── Settings ────────────────────────────────────────────────────

    /// Merge a partial settings update.
    ///
    /// The patch is validated as a whole; an invalid patch changes nothing.
    /// A new base currency triggers a rate refresh, a new decimal-places
    /// value re-rounds the current amounts.
    pub async fn update_settings(&mut self, patch: SettingsPatch) -> Result<(), CoreError> {
        let next = self.state.settings.merged(&patch)?;
        let base_changed = next.base_currency != self.state.settings.base_currency;
        let dp_changed = next.decimal_places != self.state.settings.decimal_places;
        self.state.settings = next;
        self.persist_settings();

        if dp_changed {
            self.replay_last_edit();
        }
        if base_changed {
            info!(base = %self.state.settings.base_currency, "Base currency changed, refreshing rates");
            self.refresh_rates().await;
        }
        Ok(())
    }

    // ── Rates ───────────────────────────────────────────────────────

    /// Refresh the active snapshot for the configured base, serving from the
    /// rate cache while it is fresh.
    pub async fn refresh_rates(&mut self) -> Option<&RateSnapshot> {
        self.refresh(false).await;
        self.state.rates.as_ref()
    }

    /// Refresh from the network, bypassing the rate cache.
    pub async fn force_refresh_rates(&mut self) -> Option<&RateSnapshot> {
        self.refresh(true).await;
        self.state.rates.as_ref()
    }

    /// Start a refresh: issue a new generation and set the loading flag.
    /// Any ticket issued earlier becomes stale.
    pub fn begin_rate_refresh(&mut self) -> RefreshTicket {
        self.refresh_generation += 1;
        self.state.loading = true;
        RefreshTicket {
            generation: self.refresh_generation,
            base: self.state.settings.base_currency.clone(),
        }
    }

    /// Finish a refresh started by [`ConverterStore::begin_rate_refresh`].
    ///
    /// A stale ticket's result is discarded and `false` returned. Otherwise
    /// the snapshot is replaced wholesale (with the fallback table on
    /// error, recording the error message), the loading flag cleared, and
    /// the last edit replayed against the new rates.
    pub fn complete_rate_refresh(
        &mut self,
        ticket: &RefreshTicket,
        result: Result<RateSnapshot, CoreError>,
    ) -> bool {
        if ticket.generation != self.refresh_generation {
            debug!(
                generation = ticket.generation,
                latest = self.refresh_generation,
                "Discarding stale rate refresh"
            );
            return false;
        }

        let now = self.clock.now_millis();
        let snapshot = match result {
            Ok(snapshot) => {
                self.state.error = None;
                snapshot
            }
            Err(e) => {
                warn!(base = %ticket.base, error = %e, "Rate refresh failed, using fallback rates");
                self.state.error = Some(format!("Failed to fetch exchange rates: {e}"));
                self.rate_source.fallback(&ticket.base, now)
            }
        };

        self.state.rates = Some(snapshot);
        self.state.rates_fetched_at = Some(now);
        self.state.loading = false;
        self.replay_last_edit();
        true
    }

    /// Whether auto-refresh is enabled and the active snapshot was fetched
    /// longer ago than the configured interval (or there is none).
    #[must_use]
    pub fn refresh_due(&self, now: i64) -> bool {
        if !self.state.settings.auto_refresh {
            return false;
        }
        match (&self.state.rates, self.state.rates_fetched_at) {
            (Some(_), Some(fetched_at)) => {
                now.saturating_sub(fetched_at) >= self.state.settings.refresh_interval_millis()
            }
            _ => true,
        }
    }

    /// Refresh if [`ConverterStore::refresh_due`]; returns whether it did.
    pub async fn refresh_if_due(&mut self) -> bool {
        if !self.refresh_due(self.clock.now_millis()) {
            return false;
        }
        self.refresh(true).await;
        true
    }

    // ── Historical series ───────────────────────────────────────────

    /// Day series for `base → target` over the last `days` days, through the
    /// series cache. Updates the per-pair series map.
    pub async fn fetch_series(
        &mut self,
        base: &str,
        target: &str,
        days: i64,
    ) -> Result<Vec<SeriesPoint>, CoreError> {
        let base = normalize_code(base)?;
        let target = normalize_code(target)?;
        if days > self.config.series_max_days {
            return Err(CoreError::ValidationError(format!(
                "Series span of {days} days exceeds maximum of {} days",
                self.config.series_max_days
            )));
        }
        let key = pair_key(&base, &target);
        if days <= 0 {
            self.state.series.insert(key, Vec::new());
            return Ok(Vec::new());
        }

        let now = self.clock.now_millis();
        let wanted = days as usize;
        if let Some(cached) = self.series_cache.get(&key, now) {
            if cached.len() >= wanted {
                let points = cached[cached.len() - wanted..].to_vec();
                self.state.series.insert(key, points.clone());
                return Ok(points);
            }
        }

        self.state.loading = true;
        let points = self
            .series_source
            .fetch_series(&base, &target, days, date_of(now))
            .await;
        self.state.loading = false;

        if points.iter().any(|p| !p.synthetic) {
            self.series_cache.put(key.clone(), points.clone(), now);
        }
        self.persist_series_cache();
        self.state.series.insert(key, points.clone());
        Ok(points)
    }

    // ── Cache Management ────────────────────────────────────────────

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            rate_entries: self.rate_cache.len(),
            series_entries: self.series_cache.len(),
        }
    }

    /// Drop both caches and their persisted blobs.
    pub fn clear_cache(&mut self) {
        self.rate_cache.clear();
        self.series_cache.clear();
        persistence::remove(self.storage.as_mut(), RATE_CACHE_KEY);
        persistence::remove(self.storage.as_mut(), SERIES_CACHE_KEY);
    }

    // ── Export / Import ─────────────────────────────────────────────

    #[must_use]
    pub fn export_backup(&self) -> Backup {
        Backup {
            settings: Some(self.state.settings.clone()),
            history: Some(self.state.history.to_vec()),
            currencies: Some(self.state.currencies.as_slice().to_vec()),
            exported_at: Some(self.clock.now_millis()),
        }
    }

    pub fn export_json(&self) -> Result<String, CoreError> {
        self.export_backup().to_json()
    }

    /// Restore from a JSON backup. Only sections present in the backup are
    /// overwritten; a malformed backup is rejected before anything changes.
    ///
    /// A new base currency swaps in a fresh cached snapshot for it if there
    /// is one, otherwise drops the active snapshot so the next refresh is
    /// due. A new decimal-places value re-rounds the current amounts.
    pub fn import_json(&mut self, json: &str) -> Result<(), CoreError> {
        let backup = Backup::parse(json)?;
        if let Some(settings) = backup.settings {
            let base_changed = settings.base_currency != self.state.settings.base_currency;
            let dp_changed = settings.decimal_places != self.state.settings.decimal_places;
            self.state.settings = settings;
            self.persist_settings();

            if base_changed {
                self.install_cached_rates();
            }
            if base_changed || dp_changed {
                self.replay_last_edit();
            }
        }
        if let Some(history) = backup.history {
            let next_id = self.state.history.next_id();
            self.state.history = HistoryLog::from_records(history, self.config.history_limit);
            self.state.history.resume_from(next_id);
            self.persist_history();
        }
        if let Some(currencies) = backup.currencies {
            self.state.currencies = currencies;
            self.persist_currencies();
        }
        Ok(())
    }

    /// History as CSV, newest first.
    pub fn export_history_csv(&self) -> Result<String, CoreError> {
        backup::history_to_csv(self.state.history.iter())
    }

    pub fn storage_usage(&self) -> Result<StorageUsage, CoreError> {
        persistence::usage(self.storage.as_ref(), self.config.storage_capacity_bytes)
    }

    // ── Internal ────────────────────────────────────────────────────

    async fn refresh(&mut self, force: bool) {
        let ticket = self.begin_rate_refresh();
        let now = self.clock.now_millis();

        if !force {
            if let Some(cached) = self.rate_cache.get(&ticket.base, now) {
                if self.complete_rate_refresh(&ticket, Ok(cached)) {
                    self.state.rates_fetched_at = self.rate_cache.captured_at(&ticket.base);
                }
                return;
            }
        }

        let result = self.rate_source.try_fetch_latest(&ticket.base, now).await;
        if let Ok(snapshot) = &result {
            self.rate_cache.put(ticket.base.clone(), snapshot.clone(), now);
            self.persist_rate_cache();
        }
        self.complete_rate_refresh(&ticket, result);
    }

    /// Re-derive amounts from the last edit against the current snapshot.
    fn replay_last_edit(&mut self) {
        if let Some(edit) = &self.state.last_edit {
            self.state.amounts = self.engine.apply_edit(
                &self.state.amounts,
                &edit.currency,
                edit.amount,
                self.state.rates.as_ref(),
                self.state.settings.decimal_places,
            );
        }
    }

    fn hydrate(&mut self) {
        let storage = self.storage.as_ref();

        if let Some(settings) = persistence::load::<UserSettings>(storage, SETTINGS_KEY) {
            match settings.validate() {
                Ok(()) => self.state.settings = settings,
                Err(e) => warn!(error = %e, "Ignoring invalid persisted settings"),
            }
        }

        if let Some(records) = persistence::load::<Vec<ConversionRecord>>(storage, HISTORY_KEY) {
            self.state.history = HistoryLog::from_records(records, self.config.history_limit);
        }
        if let Some(next_id) = persistence::load::<u64>(storage, HISTORY_SEQ_KEY) {
            self.state.history.resume_from(next_id);
        }

        if let Some(list) = persistence::load::<Vec<Currency>>(storage, CURRENCIES_KEY) {
            match TrackedCurrencies::from_vec(list) {
                Ok(currencies) => self.state.currencies = currencies,
                Err(e) => warn!(error = %e, "Ignoring invalid persisted currency list"),
            }
        }

        if let Some(entries) =
            persistence::load::<HashMap<String, CacheEntry<RateSnapshot>>>(storage, RATE_CACHE_KEY)
        {
            self.rate_cache = TtlCache::from_entries("rates", self.config.rate_cache_ttl_millis(), entries);
        }

        if let Some(entries) =
            persistence::load::<HashMap<String, CacheEntry<Vec<SeriesPoint>>>>(storage, SERIES_CACHE_KEY)
        {
            self.series_cache =
                TtlCache::from_entries("series", self.config.series_cache_ttl_millis(), entries);
        }

        self.install_cached_rates();
    }

    /// Make the fresh cached snapshot for the current base the active one,
    /// or clear the active snapshot when the cache has none.
    fn install_cached_rates(&mut self) {
        let now = self.clock.now_millis();
        let base = self.state.settings.base_currency.clone();
        match self.rate_cache.get(&base, now) {
            Some(snapshot) => {
                debug!(%base, "Installed cached rate snapshot");
                self.state.rates = Some(snapshot);
                self.state.rates_fetched_at = self.rate_cache.captured_at(&base);
            }
            None => {
                self.state.rates = None;
                self.state.rates_fetched_at = None;
            }
        }
    }

    fn persist_settings(&mut self) {
        persistence::save(self.storage.as_mut(), SETTINGS_KEY, &self.state.settings);
    }

    fn persist_history(&mut self) {
        persistence::save(self.storage.as_mut(), HISTORY_KEY, &self.state.history.to_vec());
        persistence::save(self.storage.as_mut(), HISTORY_SEQ_KEY, &self.state.history.next_id());
    }

    fn persist_currencies(&mut self) {
        persistence::save(self.storage.as_mut(), CURRENCIES_KEY, self.state.currencies.as_slice());
    }

    fn persist_rate_cache(&mut self) {
        persistence::save(self.storage.as_mut(), RATE_CACHE_KEY, self.rate_cache.entries());
    }

    fn persist_series_cache(&mut self) {
        persistence::save(self.storage.as_mut(), SERIES_CACHE_KEY, self.series_cache.entries());
    }
}

/// Calendar date (UTC) of an epoch-millisecond instant.
fn date_of(millis: i64) -> NaiveDate {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.date_naive())
        .unwrap_or_else(|| Utc::now().date_naive())
}
