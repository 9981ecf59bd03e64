use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::models::currency::{Currency, TrackedCurrencies};
use crate::models::history::ConversionRecord;
use crate::models::settings::UserSettings;

/// Column order of the history CSV export.
pub const CSV_HEADER: [&str; 6] = [
    "timestamp",
    "fromCurrency",
    "toCurrency",
    "fromAmount",
    "toAmount",
    "exchangeRate",
];

/// Portable backup of the user-owned state.
///
/// Every section is optional on import: only present sections overwrite
/// the store, and unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<UserSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<ConversionRecord>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currencies: Option<Vec<Currency>>,

    /// Epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<i64>,
}

/// A backup that passed validation and can be applied without failing.
#[derive(Debug, Clone)]
pub struct ValidatedBackup {
    pub settings: Option<UserSettings>,
    pub history: Option<Vec<ConversionRecord>>,
    pub currencies: Option<TrackedCurrencies>,
}

impl Backup {
    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize backup: {e}")))
    }

    /// Parse and validate a backup. Nothing is applied here, so a rejected
    /// backup leaves the store untouched.
    pub fn parse(json: &str) -> Result<ValidatedBackup, CoreError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| CoreError::InvalidBackup(format!("not valid JSON: {e}")))?;
        if !value.is_object() {
            return Err(CoreError::InvalidBackup("top level must be an object".into()));
        }
        let backup: Backup = serde_json::from_value(value)
            .map_err(|e| CoreError::InvalidBackup(e.to_string()))?;
        backup.validate()
    }

    fn validate(self) -> Result<ValidatedBackup, CoreError> {
        if let Some(settings) = &self.settings {
            settings
                .validate()
                .map_err(|e| CoreError::InvalidBackup(format!("settings: {e}")))?;
        }
        let currencies = self
            .currencies
            .map(TrackedCurrencies::from_vec)
            .transpose()
            .map_err(|e| CoreError::InvalidBackup(format!("currencies: {e}")))?;
        let history = self.history.map(validate_history).transpose()?;
        Ok(ValidatedBackup {
            settings: self.settings,
            history,
            currencies,
        })
    }
}

/// Reject duplicate ids and put records newest-first (descending id).
fn validate_history(mut records: Vec<ConversionRecord>) -> Result<Vec<ConversionRecord>, CoreError> {
    records.sort_by(|a, b| b.id.cmp(&a.id));
    if let Some(pair) = records.windows(2).find(|w| w[0].id == w[1].id) {
        return Err(CoreError::InvalidBackup(format!(
            "history: duplicate record id {}",
            pair[0].id
        )));
    }
    Ok(records)
}

/// Render history records (newest first) as CSV. Timestamps are formatted
/// as `yyyy-MM-dd HH:mm:ss` in UTC.
pub fn history_to_csv<'a, I>(records: I) -> Result<String, CoreError>
where
    I: IntoIterator<Item = &'a ConversionRecord>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.write_record([
            format_timestamp(record.timestamp),
            record.from_currency.clone(),
            record.to_currency.clone(),
            record.from_amount.to_string(),
            record.to_amount.to_string(),
            record.exchange_rate.to_string(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| CoreError::Serialization(format!("Failed to flush CSV: {e}")))?;
    String::from_utf8(bytes).map_err(|e| CoreError::Serialization(e.to_string()))
}

fn format_timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}
