use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::rates::{RateSnapshot, LIVE_SOURCE};
use super::fallback;
use super::http::{get_json, SharedHttpClient};

// ── Rate API response types ─────────────────────────────────────────

#[derive(Deserialize)]
struct LatestResponse {
    base: Option<String>,
    rates: HashMap<String, f64>,
    /// Epoch seconds
    #[serde(alias = "time_last_updated")]
    timestamp: Option<i64>,
}

/// Fetches the latest rate snapshot for a base currency.
///
/// - **Endpoint**: `GET {base_url}/latest/{BASE}`
/// - **Degraded mode**: any transport error, non-success status or
///   malformed body yields the embedded fallback table, labelled
///   [`crate::models::rates::FALLBACK_SOURCE`].
pub struct RateSource {
    http: SharedHttpClient,
    base_url: String,
}

impl RateSource {
    pub fn new(http: SharedHttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Latest snapshot for `base`, falling back to the embedded table on any
    /// failure. `now` stamps the fallback snapshot and any response that
    /// carries no timestamp of its own.
    pub async fn fetch_latest(&self, base: &str, now: i64) -> RateSnapshot {
        match self.try_fetch_latest(base, now).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(base, error = %e, "Rate fetch failed, using fallback rates");
                self.fallback(base, now)
            }
        }
    }

    /// Network-only variant that reports the failure instead of degrading.
    pub async fn try_fetch_latest(&self, base: &str, now: i64) -> Result<RateSnapshot, CoreError> {
        let base = base.trim().to_uppercase();
        let url = format!("{}/latest/{base}", self.base_url);

        let resp: LatestResponse = get_json(self.http.as_ref(), LIVE_SOURCE, &url).await?;

        if resp.rates.is_empty() {
            return Err(CoreError::Api {
                provider: LIVE_SOURCE.into(),
                message: format!("Empty rate table for {base}"),
            });
        }
        if let Some(reported) = &resp.base {
            if !reported.eq_ignore_ascii_case(&base) {
                return Err(CoreError::Api {
                    provider: LIVE_SOURCE.into(),
                    message: format!("Requested base {base} but response is based on {reported}"),
                });
            }
        }

        let timestamp = resp
            .timestamp
            .map(|secs| secs.saturating_mul(1000))
            .unwrap_or(now);

        let snapshot = RateSnapshot::new(base, resp.rates, timestamp, LIVE_SOURCE);
        if snapshot.rates.is_empty() {
            return Err(CoreError::Api {
                provider: LIVE_SOURCE.into(),
                message: format!("No positive rates for {}", snapshot.base),
            });
        }

        debug!(base = %snapshot.base, count = snapshot.rates.len(), "Fetched latest rates");
        Ok(snapshot)
    }

    /// The degraded-mode snapshot for `base`. Cannot fail.
    pub fn fallback(&self, base: &str, now: i64) -> RateSnapshot {
        fallback::fallback_snapshot(base, now)
    }
}
