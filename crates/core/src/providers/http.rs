use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use crate::errors::CoreError;

/// The "HTTP GET" capability every data source is built on.
///
/// Sources only ever issue GETs and read the body, so this is the single
/// seam tests replace to simulate outages and malformed payloads.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait HttpClient: Send + Sync {
    /// GET `url` and return the response body.
    /// Non-success statuses are errors.
    async fn get_text(&self, url: &str) -> Result<String, CoreError>;
}

pub type SharedHttpClient = Arc<dyn HttpClient>;

/// GET `url` and decode the body as JSON. Decoding failures are reported
/// as [`CoreError::Api`] tagged with `provider`.
pub async fn get_json<T: DeserializeOwned>(
    http: &dyn HttpClient,
    provider: &str,
    url: &str,
) -> Result<T, CoreError> {
    let body = http.get_text(url).await?;
    serde_json::from_str(&body).map_err(|e| CoreError::Api {
        provider: provider.to_string(),
        message: format!("Failed to parse response from {url}: {e}"),
    })
}

/// reqwest-backed client used outside tests.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new(timeout_secs: u64) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(timeout_secs));
        #[cfg(target_arch = "wasm32")]
        let _ = timeout_secs;
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl HttpClient for ReqwestHttpClient {
    async fn get_text(&self, url: &str) -> Result<String, CoreError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(resp.text().await?)
    }
}
