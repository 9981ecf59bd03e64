//! Embedded rate tables used when the network is unavailable.
//!
//! These numbers only keep the converter usable offline. They are not
//! current market rates.

use std::collections::HashMap;

use crate::models::rates::{RateSnapshot, FALLBACK_SOURCE};

/// Base currency of the table used when a base has no table of its own.
pub const DEFAULT_FALLBACK_BASE: &str = "USD";

type RateTable = &'static [(&'static str, f64)];

/// base → (code → rate)
const FALLBACK_RATES: &[(&str, RateTable)] = &[
    (
        "USD",
        &[
            ("CNY", 7.2456),
            ("EUR", 0.9234),
            ("GBP", 0.7891),
            ("JPY", 149.85),
            ("KRW", 1325.50),
            ("HKD", 7.8234),
            ("AUD", 1.5234),
            ("CAD", 1.3567),
            ("CHF", 0.8756),
            ("SGD", 1.3456),
            ("INR", 83.12),
        ],
    ),
    (
        "CNY",
        &[
            ("USD", 0.1380),
            ("EUR", 0.1274),
            ("GBP", 0.1089),
            ("JPY", 20.68),
            ("KRW", 182.94),
            ("HKD", 1.0797),
        ],
    ),
    (
        "EUR",
        &[
            ("USD", 1.0830),
            ("CNY", 7.8468),
            ("GBP", 0.8546),
            ("JPY", 162.28),
            ("CHF", 0.9482),
        ],
    ),
    (
        "GBP",
        &[
            ("USD", 1.2673),
            ("CNY", 9.1823),
            ("EUR", 1.1702),
            ("JPY", 189.90),
        ],
    ),
    (
        "JPY",
        &[
            ("USD", 0.006673),
            ("CNY", 0.04835),
            ("EUR", 0.006162),
            ("GBP", 0.005266),
        ],
    ),
];

/// Direct pair rates used as the centre of synthesized series data.
const MOCK_PAIR_RATES: &[(&str, f64)] = &[
    ("USD-CNY", 7.2456),
    ("USD-EUR", 0.9234),
    ("USD-GBP", 0.7891),
    ("USD-JPY", 149.85),
    ("EUR-USD", 1.0830),
    ("EUR-CNY", 7.8468),
    ("GBP-USD", 1.2673),
    ("CNY-USD", 0.1380),
    ("JPY-USD", 0.006673),
];

fn table_for(base: &str) -> Option<RateTable> {
    FALLBACK_RATES
        .iter()
        .find(|(b, _)| b.eq_ignore_ascii_case(base))
        .map(|(_, table)| *table)
}

/// Build the degraded-mode snapshot for `base`.
///
/// Bases without a table get the USD table, so the snapshot's `base` is
/// `USD` in that case. This cannot fail.
pub fn fallback_snapshot(base: &str, now: i64) -> RateSnapshot {
    let (base, table) = match table_for(base) {
        Some(table) => (base.to_uppercase(), table),
        None => (
            DEFAULT_FALLBACK_BASE.to_string(),
            table_for(DEFAULT_FALLBACK_BASE).unwrap_or(&[]),
        ),
    };
    let rates: HashMap<String, f64> = table.iter().map(|(c, r)| (c.to_string(), *r)).collect();
    RateSnapshot::new(base, rates, now, FALLBACK_SOURCE)
}

/// Central rate for synthesized `base → target` data: a direct pair entry,
/// else a cross rate through the USD table, else 1.
pub fn mock_rate(base: &str, target: &str) -> f64 {
    if base.eq_ignore_ascii_case(target) {
        return 1.0;
    }
    let key = format!("{}-{}", base.to_uppercase(), target.to_uppercase());
    if let Some((_, rate)) = MOCK_PAIR_RATES.iter().find(|(k, _)| *k == key) {
        return *rate;
    }
    let usd = fallback_snapshot(DEFAULT_FALLBACK_BASE, 0);
    match (usd.rate(base), usd.rate(target)) {
        (Some(b), Some(t)) => t / b,
        _ => 1.0,
    }
}
