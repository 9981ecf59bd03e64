use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Minimum number of currencies that must stay tracked at all times.
pub const MIN_TRACKED_CURRENCIES: usize = 2;

/// Built-in catalogue: (code, display name, symbol).
/// Used when the currency-list endpoint is unreachable and to fill in
/// names/symbols for currencies added by code only.
pub const CURRENCY_CATALOGUE: &[(&str, &str, &str)] = &[
    ("USD", "US Dollar", "$"),
    ("EUR", "Euro", "€"),
    ("GBP", "British Pound", "£"),
    ("JPY", "Japanese Yen", "¥"),
    ("CNY", "Chinese Yuan", "¥"),
    ("KRW", "South Korean Won", "₩"),
    ("HKD", "Hong Kong Dollar", "HK$"),
    ("AUD", "Australian Dollar", "A$"),
    ("CAD", "Canadian Dollar", "C$"),
    ("CHF", "Swiss Franc", "CHF"),
    ("SGD", "Singapore Dollar", "S$"),
    ("INR", "Indian Rupee", "₹"),
    ("RUB", "Russian Ruble", "₽"),
    ("BRL", "Brazilian Real", "R$"),
    ("MXN", "Mexican Peso", "MX$"),
    ("NZD", "New Zealand Dollar", "NZ$"),
    ("SEK", "Swedish Krona", "kr"),
    ("NOK", "Norwegian Krone", "kr"),
    ("THB", "Thai Baht", "฿"),
];

/// Currencies tracked on first run, in display order.
pub const DEFAULT_TRACKED: &[&str] = &["USD", "CNY", "EUR", "GBP", "JPY"];

/// Normalize and validate a currency code: trimmed, uppercased, exactly
/// three ASCII letters.
pub fn normalize_code(code: &str) -> Result<String, CoreError> {
    let trimmed = code.trim().to_uppercase();
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CoreError::ValidationError(format!(
            "Invalid currency code '{code}': must be exactly 3 ASCII letters (e.g., USD, EUR, CNY)"
        )));
    }
    Ok(trimmed)
}

/// Look up a code in the built-in catalogue.
pub fn catalogue_entry(code: &str) -> Option<(&'static str, &'static str)> {
    CURRENCY_CATALOGUE
        .iter()
        .find(|(c, _, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name, symbol)| (*name, *symbol))
}

/// A currency shown in the converter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    /// ISO-like code, uppercased (e.g., "USD")
    pub code: String,

    /// Human-readable name (e.g., "US Dollar")
    pub name: String,

    /// Display symbol (e.g., "$")
    pub symbol: String,

    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(default)]
    pub favorite: bool,
}

fn default_true() -> bool {
    true
}

impl Currency {
    pub fn new(code: impl Into<String>, name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            code: code.into().to_uppercase(),
            name: name.into(),
            symbol: symbol.into(),
            active: true,
            favorite: false,
        }
    }

    /// Build a currency from the catalogue, falling back to the code itself
    /// for name and symbol when it is not listed.
    pub fn from_code(code: &str) -> Self {
        let upper = code.to_uppercase();
        match catalogue_entry(&upper) {
            Some((name, symbol)) => Self::new(upper, name, symbol),
            None => Self::new(upper.clone(), upper.clone(), upper),
        }
    }
}

/// Ordered list of tracked currencies.
///
/// Invariants: codes are unique, and the list never shrinks below
/// [`MIN_TRACKED_CURRENCIES`] through `remove`. Field updates happen in
/// place so a currency keeps its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackedCurrencies {
    items: Vec<Currency>,
}

impl Default for TrackedCurrencies {
    fn default() -> Self {
        Self {
            items: DEFAULT_TRACKED.iter().map(|c| Currency::from_code(c)).collect(),
        }
    }
}

impl TrackedCurrencies {
    /// Build from an arbitrary list, dropping duplicate codes (first wins).
    /// Rejects lists that would leave fewer than the minimum tracked.
    pub fn from_vec(items: Vec<Currency>) -> Result<Self, CoreError> {
        let mut unique: Vec<Currency> = Vec::with_capacity(items.len());
        for mut item in items {
            item.code = normalize_code(&item.code)?;
            if !unique.iter().any(|c| c.code == item.code) {
                unique.push(item);
            }
        }
        if unique.len() < MIN_TRACKED_CURRENCIES {
            return Err(CoreError::MinimumCurrencies {
                minimum: MIN_TRACKED_CURRENCIES,
            });
        }
        Ok(Self { items: unique })
    }

    pub fn as_slice(&self) -> &[Currency] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn codes(&self) -> Vec<String> {
        self.items.iter().map(|c| c.code.clone()).collect()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.position(code).is_some()
    }

    pub fn get(&self, code: &str) -> Option<&Currency> {
        self.position(code).map(|idx| &self.items[idx])
    }

    pub fn position(&self, code: &str) -> Option<usize> {
        self.items.iter().position(|c| c.code.eq_ignore_ascii_case(code))
    }

    /// Append a currency at the end of the list.
    pub fn add(&mut self, mut currency: Currency) -> Result<(), CoreError> {
        currency.code = normalize_code(&currency.code)?;
        if self.contains(&currency.code) {
            return Err(CoreError::DuplicateCurrency(currency.code));
        }
        self.items.push(currency);
        Ok(())
    }

    /// Remove a currency. Fails without touching the list if that would
    /// leave fewer than [`MIN_TRACKED_CURRENCIES`].
    pub fn remove(&mut self, code: &str) -> Result<Currency, CoreError> {
        let idx = self
            .position(code)
            .ok_or_else(|| CoreError::CurrencyNotFound(code.to_uppercase()))?;
        if self.items.len() <= MIN_TRACKED_CURRENCIES {
            return Err(CoreError::MinimumCurrencies {
                minimum: MIN_TRACKED_CURRENCIES,
            });
        }
        Ok(self.items.remove(idx))
    }

    /// Move a currency to `new_index`, clamped to the end of the list.
    pub fn move_to(&mut self, code: &str, new_index: usize) -> Result<(), CoreError> {
        let idx = self
            .position(code)
            .ok_or_else(|| CoreError::CurrencyNotFound(code.to_uppercase()))?;
        let item = self.items.remove(idx);
        let target = new_index.min(self.items.len());
        self.items.insert(target, item);
        Ok(())
    }

    /// Apply an in-place update to one currency.
    pub fn update<F>(&mut self, code: &str, f: F) -> Result<&Currency, CoreError>
    where
        F: FnOnce(&mut Currency),
    {
        let idx = self
            .position(code)
            .ok_or_else(|| CoreError::CurrencyNotFound(code.to_uppercase()))?;
        let item = &mut self.items[idx];
        f(item);
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_has_nineteen_unique_entries() {
        let mut codes: Vec<&str> = CURRENCY_CATALOGUE.iter().map(|(c, _, _)| *c).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 19);
    }

    #[test]
    fn from_code_unknown_uses_code_as_name() {
        let c = Currency::from_code("xyz");
        assert_eq!(c.code, "XYZ");
        assert_eq!(c.name, "XYZ");
    }

    #[test]
    fn from_vec_drops_duplicates() {
        let list = TrackedCurrencies::from_vec(vec![
            Currency::from_code("USD"),
            Currency::from_code("usd"),
            Currency::from_code("EUR"),
        ])
        .unwrap();
        assert_eq!(list.codes(), vec!["USD", "EUR"]);
    }
}
