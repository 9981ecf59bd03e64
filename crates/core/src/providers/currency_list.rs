use std::collections::BTreeMap;
use tracing::warn;

use crate::errors::CoreError;
use crate::models::currency::CURRENCY_CATALOGUE;
use crate::models::rates::LIVE_SOURCE;
use super::http::{get_json, SharedHttpClient};

/// Catalogue of currencies the user can choose from.
///
/// `GET {base_url}/currencies` → `{ "USD": "US Dollar", ... }`; on any
/// failure the built-in 19-entry catalogue is returned instead.
pub struct CurrencyListSource {
    http: SharedHttpClient,
    base_url: String,
}

impl CurrencyListSource {
    pub fn new(http: SharedHttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// code → display name, sorted by code.
    pub async fn fetch(&self) -> BTreeMap<String, String> {
        match self.try_fetch().await {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "Currency list fetch failed, using built-in catalogue");
                builtin_catalogue()
            }
        }
    }

    pub async fn try_fetch(&self) -> Result<BTreeMap<String, String>, CoreError> {
        let url = format!("{}/currencies", self.base_url);
        let list: BTreeMap<String, String> = get_json(self.http.as_ref(), LIVE_SOURCE, &url).await?;
        if list.is_empty() {
            return Err(CoreError::Api {
                provider: LIVE_SOURCE.into(),
                message: "Empty currency list".into(),
            });
        }
        Ok(list
            .into_iter()
            .map(|(code, name)| (code.to_uppercase(), name))
            .collect())
    }
}

pub fn builtin_catalogue() -> BTreeMap<String, String> {
    CURRENCY_CATALOGUE
        .iter()
        .map(|(code, name, _)| (code.to_string(), name.to_string()))
        .collect()
}
