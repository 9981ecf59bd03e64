// Shared test doubles: a scripted HTTP client and store builders.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use currency_sync_core::clock::ManualClock;
use currency_sync_core::config::EngineConfig;
use currency_sync_core::errors::CoreError;
use currency_sync_core::logging::LoggingConfig;
use currency_sync_core::providers::http::HttpClient;
use currency_sync_core::storage::kv::{KeyValueStorage, MemoryStorage};
use currency_sync_core::ConverterStore;

pub const BASE_URL: &str = "http://rates.test";

/// 2025-01-15T12:00:00Z
pub const NOW: i64 = 1_736_942_400_000;

pub const USD_LATEST: &str = r#"{
    "base": "USD",
    "rates": { "USD": 1.0, "CNY": 7.0, "EUR": 0.5, "GBP": 0.25, "JPY": 150.0 },
    "timestamp": 1736940000
}"#;

pub const EUR_LATEST: &str = r#"{
    "base": "EUR",
    "rates": { "EUR": 1.0, "USD": 2.0, "CNY": 14.0, "GBP": 0.5, "JPY": 300.0 },
    "timestamp": 1736940000
}"#;

pub fn latest_url(base: &str) -> String {
    format!("{BASE_URL}/latest/{base}")
}

pub fn historical_url(date: &str, base: &str) -> String {
    format!("{BASE_URL}/{date}/{base}")
}

/// HTTP client answering from a table of url → body. Unknown URLs fail
/// like a refused connection.
#[derive(Default)]
pub struct MockHttp {
    responses: Mutex<HashMap<String, String>>,
    requests: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.set(url, body);
        self
    }

    pub fn set(&self, url: impl Into<String>, body: impl Into<String>) {
        self.responses.lock().unwrap().insert(url.into(), body.into());
    }

    pub fn remove(&self, url: &str) {
        self.responses.lock().unwrap().remove(url);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for MockHttp {
    async fn get_text(&self, url: &str) -> Result<String, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(url.to_string());
        self.responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| CoreError::Network(format!("connection refused: {url}")))
    }
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        api_base_url: BASE_URL.into(),
        ..Default::default()
    }
}

pub fn build_store(
    storage: Box<dyn KeyValueStorage>,
    http: Arc<MockHttp>,
    clock: Arc<ManualClock>,
) -> ConverterStore {
    // First caller wins; RUST_LOG=debug shows cache and fallback events.
    LoggingConfig::default().try_init();
    ConverterStore::new(storage, http, clock, test_config()).unwrap()
}

/// Store over empty memory storage, a USD/EUR-capable API and a clock at [`NOW`].
pub fn online_store() -> (ConverterStore, Arc<MockHttp>, Arc<ManualClock>) {
    let http = Arc::new(
        MockHttp::new()
            .with(latest_url("USD"), USD_LATEST)
            .with(latest_url("EUR"), EUR_LATEST),
    );
    let clock = Arc::new(ManualClock::new(NOW));
    let store = build_store(Box::new(MemoryStorage::new()), http.clone(), clock.clone());
    (store, http, clock)
}

/// Store whose every network call fails.
pub fn offline_store() -> (ConverterStore, Arc<MockHttp>, Arc<ManualClock>) {
    let http = Arc::new(MockHttp::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let store = build_store(Box::new(MemoryStorage::new()), http.clone(), clock.clone());
    (store, http, clock)
}

/// Storage whose every operation fails, for degraded-persistence paths.
pub struct BrokenStorage;

impl KeyValueStorage for BrokenStorage {
    fn get(&self, _key: &str) -> Result<Option<String>, CoreError> {
        Err(CoreError::Storage("disk unavailable".into()))
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), CoreError> {
        Err(CoreError::Storage("quota exceeded".into()))
    }

    fn remove(&mut self, _key: &str) -> Result<(), CoreError> {
        Err(CoreError::Storage("disk unavailable".into()))
    }

    fn keys(&self) -> Result<Vec<String>, CoreError> {
        Err(CoreError::Storage("disk unavailable".into()))
    }
}
