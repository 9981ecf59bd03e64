use chrono::{Duration, NaiveDate, NaiveTime};
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::rates::{SeriesPoint, LIVE_SOURCE};
use super::fallback::mock_rate;
use super::http::{get_json, SharedHttpClient};

#[derive(Deserialize)]
struct HistoricalResponse {
    rates: HashMap<String, f64>,
}

/// Day-indexed rate series for a currency pair.
///
/// - **Endpoint**: `GET {base_url}/{yyyy-mm-dd}/{BASE}`, one request per day,
///   all issued concurrently.
/// - **Point failure**: the point is resynthesized around the mock rate with
///   a 0.5–1 % perturbation, never dropped.
/// - **Total failure**: the whole series is synthesized as a random walk with
///   at most ±1 % movement per day.
///
/// Noise comes from a seeded generator so output is reproducible for a given
/// seed and call sequence.
pub struct HistoricalSeriesSource {
    http: SharedHttpClient,
    base_url: String,
    rng: StdRng,
}

impl HistoricalSeriesSource {
    pub fn new(http: SharedHttpClient, base_url: impl Into<String>, seed: u64) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Restart the noise generator from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Series for `base → target` covering the `days` days ending on `today`,
    /// ascending by timestamp. Always exactly `days` points; empty when
    /// `days <= 0`.
    pub async fn fetch_series(
        &mut self,
        base: &str,
        target: &str,
        days: i64,
        today: NaiveDate,
    ) -> Vec<SeriesPoint> {
        if days <= 0 {
            return Vec::new();
        }
        let base = base.trim().to_uppercase();
        let target = target.trim().to_uppercase();
        let dates = span_ending(today, days);

        if base == target {
            return dates.into_iter().map(|d| point(d, 1.0, false)).collect();
        }

        let results = {
            let this = &*self;
            join_all(dates.iter().map(|d| this.try_fetch_point(&base, &target, *d))).await
        };

        let failures = results.iter().filter(|r| r.is_err()).count();
        let mut points = if failures == results.len() {
            warn!(%base, %target, days, "Historical endpoint unreachable, synthesizing series");
            self.synthesize_series(&base, &target, &dates)
        } else {
            dates
                .iter()
                .zip(results)
                .map(|(date, result)| match result {
                    Ok(rate) => point(*date, rate, false),
                    Err(e) => {
                        debug!(%base, %target, %date, error = %e, "Resynthesizing failed point");
                        let rate = self.synthesize_point(&base, &target);
                        point(*date, rate, true)
                    }
                })
                .collect()
        };

        // Completion order of the point fetches is not the date order.
        points.sort_by_key(|p| p.timestamp);
        points
    }

    /// Fetch one day's rate from the network.
    pub async fn try_fetch_point(
        &self,
        base: &str,
        target: &str,
        date: NaiveDate,
    ) -> Result<f64, CoreError> {
        let url = format!("{}/{}/{base}", self.base_url, date.format("%Y-%m-%d"));
        let resp: HistoricalResponse = get_json(self.http.as_ref(), LIVE_SOURCE, &url).await?;
        resp.rates
            .get(target)
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or_else(|| CoreError::Api {
                provider: LIVE_SOURCE.into(),
                message: format!("No rate for {base} → {target} on {date}"),
            })
    }

    fn synthesize_point(&mut self, base: &str, target: &str) -> f64 {
        let center = mock_rate(base, target);
        let magnitude = self.rng.gen_range(0.005..=0.01);
        let sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        center * (1.0 + sign * magnitude)
    }

    fn synthesize_series(&mut self, base: &str, target: &str, dates: &[NaiveDate]) -> Vec<SeriesPoint> {
        let mut rate = mock_rate(base, target);
        dates
            .iter()
            .map(|date| {
                rate *= 1.0 + self.rng.gen_range(-0.01..=0.01);
                point(*date, rate, true)
            })
            .collect()
    }
}

/// The `days` consecutive dates ending on `today`, oldest first.
fn span_ending(today: NaiveDate, days: i64) -> Vec<NaiveDate> {
    (0..days)
        .rev()
        .filter_map(|back| today.checked_sub_signed(Duration::days(back)))
        .collect()
}

fn point(date: NaiveDate, rate: f64, synthetic: bool) -> SeriesPoint {
    SeriesPoint {
        date,
        rate,
        timestamp: date.and_time(NaiveTime::MIN).and_utc().timestamp_millis(),
        synthetic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_is_oldest_first_and_ends_today() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let span = span_ending(today, 3);
        assert_eq!(
            span,
            vec![
                NaiveDate::from_ymd_opt(2025, 2, 27).unwrap(),
                NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
                today,
            ]
        );
    }

    #[test]
    fn point_timestamp_is_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(1970, 1, 2).unwrap();
        assert_eq!(point(date, 1.0, false).timestamp, 86_400_000);
    }
}
