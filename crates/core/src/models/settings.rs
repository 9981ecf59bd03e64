use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::models::currency::{normalize_code, DEFAULT_TRACKED};

/// Allowed auto-refresh interval, in minutes.
pub const REFRESH_INTERVAL_RANGE: std::ops::RangeInclusive<u32> = 1..=60;

/// Largest supported number of displayed decimal places.
pub const MAX_DECIMAL_PLACES: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    Auto,
}

/// User preferences, persisted under the settings key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    /// Currencies offered first in pickers.
    pub preferred_currencies: Vec<String>,

    /// Base currency rate snapshots are requested for.
    pub base_currency: String,

    /// Currency pre-selected for display.
    pub display_currency: String,

    /// Decimal places every derived amount is rounded to.
    pub decimal_places: u32,

    pub theme: Theme,

    pub auto_refresh: bool,

    /// Minutes between automatic refreshes, within [`REFRESH_INTERVAL_RANGE`].
    pub refresh_interval_minutes: u32,

    pub notifications: bool,

    pub language: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            preferred_currencies: DEFAULT_TRACKED.iter().map(|c| c.to_string()).collect(),
            base_currency: "USD".to_string(),
            display_currency: "CNY".to_string(),
            decimal_places: 2,
            theme: Theme::Auto,
            auto_refresh: true,
            refresh_interval_minutes: 5,
            notifications: true,
            language: "en".to_string(),
        }
    }
}

/// Partial settings update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub preferred_currencies: Option<Vec<String>>,
    pub base_currency: Option<String>,
    pub display_currency: Option<String>,
    pub decimal_places: Option<u32>,
    pub theme: Option<Theme>,
    pub auto_refresh: Option<bool>,
    pub refresh_interval_minutes: Option<u32>,
    pub notifications: Option<bool>,
    pub language: Option<String>,
}

impl UserSettings {
    pub fn validate(&self) -> Result<(), CoreError> {
        normalize_code(&self.base_currency)?;
        normalize_code(&self.display_currency)?;
        for code in &self.preferred_currencies {
            normalize_code(code)?;
        }
        if self.decimal_places > MAX_DECIMAL_PLACES {
            return Err(CoreError::ValidationError(format!(
                "decimal places must be between 0 and {MAX_DECIMAL_PLACES}, got {}",
                self.decimal_places
            )));
        }
        if !REFRESH_INTERVAL_RANGE.contains(&self.refresh_interval_minutes) {
            return Err(CoreError::ValidationError(format!(
                "refresh interval must be between {} and {} minutes, got {}",
                REFRESH_INTERVAL_RANGE.start(),
                REFRESH_INTERVAL_RANGE.end(),
                self.refresh_interval_minutes
            )));
        }
        Ok(())
    }

    /// Return a copy with `patch` applied and codes normalized. The result
    /// is validated as a whole, so an invalid patch changes nothing.
    pub fn merged(&self, patch: &SettingsPatch) -> Result<UserSettings, CoreError> {
        let mut next = self.clone();
        if let Some(list) = &patch.preferred_currencies {
            next.preferred_currencies = list
                .iter()
                .map(|c| normalize_code(c))
                .collect::<Result<_, _>>()?;
        }
        if let Some(base) = &patch.base_currency {
            next.base_currency = normalize_code(base)?;
        }
        if let Some(display) = &patch.display_currency {
            next.display_currency = normalize_code(display)?;
        }
        if let Some(dp) = patch.decimal_places {
            next.decimal_places = dp;
        }
        if let Some(theme) = patch.theme {
            next.theme = theme;
        }
        if let Some(auto) = patch.auto_refresh {
            next.auto_refresh = auto;
        }
        if let Some(interval) = patch.refresh_interval_minutes {
            next.refresh_interval_minutes = interval;
        }
        if let Some(notifications) = patch.notifications {
            next.notifications = notifications;
        }
        if let Some(language) = &patch.language {
            next.language = language.clone();
        }
        next.validate()?;
        Ok(next)
    }

    pub fn refresh_interval_millis(&self) -> i64 {
        i64::from(self.refresh_interval_minutes) * 60_000
    }
}
