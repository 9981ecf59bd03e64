// ═══════════════════════════════════════════════════════════════════
// Provider Tests — RateSource, HistoricalSeriesSource, CurrencyListSource
// ═══════════════════════════════════════════════════════════════════

mod common;

use chrono::NaiveDate;
use std::sync::Arc;

use common::{historical_url, latest_url, MockHttp, BASE_URL, NOW, USD_LATEST};
use currency_sync_core::errors::CoreError;
use currency_sync_core::models::rates::{FALLBACK_SOURCE, LIVE_SOURCE};
use currency_sync_core::providers::currency_list::CurrencyListSource;
use currency_sync_core::providers::fallback::mock_rate;
use currency_sync_core::providers::rate_source::RateSource;
use currency_sync_core::providers::series_source::HistoricalSeriesSource;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
}

// ── RateSource ──────────────────────────────────────────────────────

mod rate_source {
    use super::*;

    #[tokio::test]
    async fn live_snapshot_converts_seconds_to_millis() {
        let http = Arc::new(MockHttp::new().with(latest_url("USD"), USD_LATEST));
        let source = RateSource::new(http.clone(), BASE_URL);

        let snap = source.fetch_latest("usd", NOW).await;

        assert_eq!(snap.source, LIVE_SOURCE);
        assert_eq!(snap.base, "USD");
        assert_eq!(snap.timestamp, 1_736_940_000_000);
        assert_eq!(snap.rate("CNY"), Some(7.0));
        assert_eq!(http.requests(), vec![latest_url("USD")]);
    }

    #[tokio::test]
    async fn network_failure_falls_back() {
        let source = RateSource::new(Arc::new(MockHttp::new()), BASE_URL);

        let snap = source.fetch_latest("USD", NOW).await;

        assert_eq!(snap.source, FALLBACK_SOURCE);
        assert!(snap.is_fallback());
        assert!((snap.rate("CNY").unwrap() - 7.2456).abs() < 1e-9);
        assert_eq!(snap.timestamp, NOW);
    }

    #[tokio::test]
    async fn try_fetch_reports_network_error() {
        let source = RateSource::new(Arc::new(MockHttp::new()), BASE_URL);
        let err = source.try_fetch_latest("USD", NOW).await.unwrap_err();
        assert!(matches!(err, CoreError::Network(_)));
    }

    #[tokio::test]
    async fn malformed_body_falls_back() {
        let http = Arc::new(MockHttp::new().with(latest_url("USD"), "<html>502 Bad Gateway</html>"));
        let source = RateSource::new(http, BASE_URL);

        let err = source.try_fetch_latest("USD", NOW).await.unwrap_err();
        assert!(matches!(err, CoreError::Api { .. }));
        assert_eq!(source.fetch_latest("USD", NOW).await.source, FALLBACK_SOURCE);
    }

    #[tokio::test]
    async fn empty_rate_table_falls_back() {
        let http = Arc::new(MockHttp::new().with(latest_url("USD"), r#"{"base":"USD","rates":{}}"#));
        let source = RateSource::new(http, BASE_URL);
        assert_eq!(source.fetch_latest("USD", NOW).await.source, FALLBACK_SOURCE);
    }

    #[tokio::test]
    async fn mismatched_base_falls_back() {
        let http = Arc::new(MockHttp::new().with(latest_url("EUR"), USD_LATEST));
        let source = RateSource::new(http, BASE_URL);
        let snap = source.fetch_latest("EUR", NOW).await;
        assert_eq!(snap.source, FALLBACK_SOURCE);
        assert_eq!(snap.base, "EUR");
    }

    #[tokio::test]
    async fn missing_timestamp_uses_now() {
        let body = r#"{"base":"USD","rates":{"EUR":0.9}}"#;
        let http = Arc::new(MockHttp::new().with(latest_url("USD"), body));
        let source = RateSource::new(http, BASE_URL);
        assert_eq!(source.fetch_latest("USD", NOW).await.timestamp, NOW);
    }

    #[tokio::test]
    async fn legacy_timestamp_field_is_accepted() {
        let body = r#"{"base":"USD","rates":{"EUR":0.9},"time_last_updated":1700000000}"#;
        let http = Arc::new(MockHttp::new().with(latest_url("USD"), body));
        let source = RateSource::new(http, BASE_URL);
        assert_eq!(source.fetch_latest("USD", NOW).await.timestamp, 1_700_000_000_000);
    }

    #[tokio::test]
    async fn base_without_fallback_table_uses_usd_table() {
        let source = RateSource::new(Arc::new(MockHttp::new()), BASE_URL);
        let snap = source.fetch_latest("SEK", NOW).await;
        assert_eq!(snap.base, "USD");
        assert_eq!(snap.source, FALLBACK_SOURCE);
    }

    #[tokio::test]
    async fn trailing_slash_in_base_url_is_ignored() {
        let http = Arc::new(MockHttp::new().with(latest_url("USD"), USD_LATEST));
        let source = RateSource::new(http.clone(), format!("{BASE_URL}/"));
        assert_eq!(source.fetch_latest("USD", NOW).await.source, LIVE_SOURCE);
    }

    #[test]
    fn fallback_rates_are_positive() {
        let source = RateSource::new(Arc::new(MockHttp::new()), BASE_URL);
        for base in ["USD", "EUR", "CNY", "GBP", "JPY", "XYZ"] {
            let snap = source.fallback(base, 0);
            assert!(!snap.rates.is_empty());
            assert!(snap.rates.values().all(|r| *r > 0.0));
        }
    }
}

// ── HistoricalSeriesSource ──────────────────────────────────────────

mod series_source {
    use super::*;

    fn day_body(rate: f64) -> String {
        format!(r#"{{"base":"USD","rates":{{"CNY":{rate},"EUR":0.9}}}}"#)
    }

    #[tokio::test]
    async fn seven_points_strictly_increasing_despite_failures() {
        // Only three of the seven days answer.
        let http = Arc::new(
            MockHttp::new()
                .with(historical_url("2025-01-09", "USD"), day_body(7.1))
                .with(historical_url("2025-01-12", "USD"), day_body(7.2))
                .with(historical_url("2025-01-15", "USD"), day_body(7.3)),
        );
        let mut source = HistoricalSeriesSource::new(http.clone(), BASE_URL, 7);

        let points = source.fetch_series("USD", "CNY", 7, today()).await;

        assert_eq!(points.len(), 7);
        assert!(points.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2025, 1, 9).unwrap());
        assert_eq!(points[6].date, today());
        assert_eq!(http.calls(), 7);

        assert_eq!(points[0].rate, 7.1);
        assert!(!points[0].synthetic);
        assert_eq!(points[3].rate, 7.2);
        assert_eq!(points[6].rate, 7.3);

        let center = mock_rate("USD", "CNY");
        for p in points.iter().filter(|p| p.synthetic) {
            let deviation = (p.rate / center - 1.0).abs();
            assert!(deviation >= 0.005 - 1e-12 && deviation <= 0.01 + 1e-12, "deviation {deviation}");
        }
        assert_eq!(points.iter().filter(|p| p.synthetic).count(), 4);
    }

    #[tokio::test]
    async fn day_missing_target_is_resynthesized() {
        let http = Arc::new(
            MockHttp::new()
                .with(historical_url("2025-01-14", "USD"), r#"{"base":"USD","rates":{"EUR":0.9}}"#)
                .with(historical_url("2025-01-15", "USD"), day_body(7.3)),
        );
        let mut source = HistoricalSeriesSource::new(http, BASE_URL, 1);
        let points = source.fetch_series("USD", "CNY", 2, today()).await;

        assert_eq!(points.len(), 2);
        assert!(points[0].synthetic);
        assert!(!points[1].synthetic);
    }

    #[tokio::test]
    async fn unreachable_endpoint_synthesizes_whole_series() {
        let mut source = HistoricalSeriesSource::new(Arc::new(MockHttp::new()), BASE_URL, 99);
        let points = source.fetch_series("USD", "CNY", 30, today()).await;

        assert_eq!(points.len(), 30);
        assert!(points.iter().all(|p| p.synthetic && p.rate > 0.0));
        assert!(points.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        for w in points.windows(2) {
            let step = w[1].rate / w[0].rate - 1.0;
            assert!(step.abs() <= 0.01 + 1e-12, "daily step {step}");
        }
    }

    #[tokio::test]
    async fn same_seed_same_series() {
        let mut a = HistoricalSeriesSource::new(Arc::new(MockHttp::new()), BASE_URL, 1234);
        let mut b = HistoricalSeriesSource::new(Arc::new(MockHttp::new()), BASE_URL, 1234);

        let first = a.fetch_series("EUR", "USD", 10, today()).await;
        let second = b.fetch_series("EUR", "USD", 10, today()).await;
        assert_eq!(first, second);

        a.reseed(1234);
        assert_eq!(a.fetch_series("EUR", "USD", 10, today()).await, first);
    }

    #[tokio::test]
    async fn non_positive_days_is_empty_without_requests() {
        let http = Arc::new(MockHttp::new());
        let mut source = HistoricalSeriesSource::new(http.clone(), BASE_URL, 1);

        assert!(source.fetch_series("USD", "CNY", 0, today()).await.is_empty());
        assert!(source.fetch_series("USD", "CNY", -3, today()).await.is_empty());
        assert_eq!(http.calls(), 0);
    }

    #[tokio::test]
    async fn same_currency_is_flat_one() {
        let http = Arc::new(MockHttp::new());
        let mut source = HistoricalSeriesSource::new(http.clone(), BASE_URL, 1);
        let points = source.fetch_series("usd", "USD", 5, today()).await;

        assert_eq!(points.len(), 5);
        assert!(points.iter().all(|p| p.rate == 1.0 && !p.synthetic));
        assert_eq!(http.calls(), 0);
    }
}

// ── CurrencyListSource ──────────────────────────────────────────────

mod currency_list {
    use super::*;

    #[tokio::test]
    async fn remote_list_is_uppercased_and_sorted() {
        let http = Arc::new(
            MockHttp::new().with(format!("{BASE_URL}/currencies"), r#"{"usd":"US Dollar","AUD":"Australian Dollar"}"#),
        );
        let source = CurrencyListSource::new(http, BASE_URL);
        let list = source.fetch().await;

        let codes: Vec<&String> = list.keys().collect();
        assert_eq!(codes, vec!["AUD", "USD"]);
    }

    #[tokio::test]
    async fn failure_uses_builtin_catalogue() {
        let source = CurrencyListSource::new(Arc::new(MockHttp::new()), BASE_URL);
        let list = source.fetch().await;
        assert_eq!(list.len(), 19);
        assert_eq!(list["CNY"], "Chinese Yuan");
    }

    #[tokio::test]
    async fn empty_remote_list_uses_builtin_catalogue() {
        let http = Arc::new(MockHttp::new().with(format!("{BASE_URL}/currencies"), "{}"));
        let source = CurrencyListSource::new(http, BASE_URL);
        assert!(source.try_fetch().await.is_err());
        assert_eq!(source.fetch().await.len(), 19);
    }
}
