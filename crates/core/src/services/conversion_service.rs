use std::collections::HashMap;

use crate::models::history::{ConversionDraft, ALL_CURRENCIES};
use crate::models::rates::RateSnapshot;

/// currency code → displayed amount
pub type AmountSet = HashMap<String, f64>;

/// Round half away from zero to `decimal_places`.
///
/// `f64::round` already rounds halves away from zero; the value is scaled
/// first. Non-finite results of the scaling are returned unchanged.
pub fn round_to(value: f64, decimal_places: u32) -> f64 {
    let factor = 10f64.powi(decimal_places as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

/// Derives every currency's amount from a single edited amount.
///
/// Pure arithmetic over a rate snapshot: no I/O, no state.
pub struct ConversionEngine;

impl ConversionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Propagate an edit of `edited` to `new_amount` across the snapshot.
    ///
    /// 1. Without a usable snapshot (absent, or no rate for `edited`), or
    ///    when `new_amount <= 0`, only `edited` changes.
    /// 2. Otherwise the anchor is `new_amount / rate(edited)` in the base
    ///    currency, and every code in `snapshot.rates` becomes
    ///    `round(anchor × rate(code))`; the base becomes `round(anchor)`.
    /// 3. Codes in `prior` but not in the snapshot keep their amounts.
    pub fn apply_edit(
        &self,
        prior: &AmountSet,
        edited: &str,
        new_amount: f64,
        snapshot: Option<&RateSnapshot>,
        decimal_places: u32,
    ) -> AmountSet {
        let edited = edited.to_uppercase();
        let mut amounts = prior.clone();

        let snapshot = match snapshot {
            Some(s) if new_amount > 0.0 => s,
            _ => {
                amounts.insert(edited, new_amount);
                return amounts;
            }
        };

        let anchor = match self.anchor_amount(&edited, new_amount, snapshot) {
            Some(anchor) => anchor,
            None => {
                amounts.insert(edited, new_amount);
                return amounts;
            }
        };

        for (code, rate) in &snapshot.rates {
            amounts.insert(code.clone(), round_to(anchor * rate, decimal_places));
        }
        if edited != snapshot.base {
            amounts.insert(snapshot.base.clone(), round_to(anchor, decimal_places));
        } else {
            amounts.insert(edited, round_to(new_amount, decimal_places));
        }
        amounts
    }

    /// Convert `amount` of `from` into `to` through the snapshot base.
    ///
    /// Returns `None` (and nothing should be logged) when the snapshot is
    /// absent, either rate is missing, or the amount or result is not a
    /// finite number.
    pub fn convert_pair(
        &self,
        from: &str,
        to: &str,
        amount: f64,
        snapshot: Option<&RateSnapshot>,
        decimal_places: u32,
    ) -> Option<ConversionDraft> {
        if !amount.is_finite() {
            return None;
        }
        let snapshot = snapshot?;
        let from = from.to_uppercase();
        let to = to.to_uppercase();
        let from_rate = snapshot.rate(&from)?;
        let to_rate = snapshot.rate(&to)?;

        let to_amount = round_to(amount / from_rate * to_rate, decimal_places);
        let exchange_rate = to_rate / from_rate;
        if !to_amount.is_finite() || !exchange_rate.is_finite() {
            return None;
        }
        Some(ConversionDraft {
            from_currency: from,
            to_currency: to,
            from_amount: amount,
            to_amount,
            exchange_rate,
            source: snapshot.source.clone(),
        })
    }

    /// The draft logged for a simultaneous conversion into every tracked
    /// currency. No single pair rate applies, so the rate is recorded as 1.
    pub fn all_currencies_draft(&self, from: &str, amount: f64, source: &str) -> ConversionDraft {
        ConversionDraft {
            from_currency: from.to_uppercase(),
            to_currency: ALL_CURRENCIES.to_string(),
            from_amount: amount,
            to_amount: 0.0,
            exchange_rate: 1.0,
            source: source.to_string(),
        }
    }

    fn anchor_amount(&self, edited: &str, amount: f64, snapshot: &RateSnapshot) -> Option<f64> {
        if edited == snapshot.base {
            return Some(amount);
        }
        snapshot.rate(edited).map(|rate| amount / rate)
    }
}

impl Default for ConversionEngine {
    fn default() -> Self {
        Self::new()
    }
}
