//! HTTP client for the Dune Analytics API.
//!
//! The client does a single GET per call: no retries and no pagination.
//! Everything above it talks to the [`AnalyticsApi`] trait so tests can
//! substitute a scripted source.

use crate::config::DuneConfig;
use crate::error::{ConfigError, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Query parameters for one request, in the order they are sent.
pub type Params = Vec<(String, String)>;

const API_KEY_HEADER: &str = "X-Dune-API-Key";

/// A remote analytics source reachable by path and query parameters.
#[async_trait]
pub trait AnalyticsApi: Send + Sync {
    /// GET `path` with `params` and decode the JSON body.
    async fn get(&self, path: &str, params: &[(String, String)]) -> Result<Value, TransportError>;
}

/// Dune API client. The key is read once at construction.
#[derive(Debug, Clone)]
pub struct DuneClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl DuneClient {
    /// Build a client from configuration, failing if the API key is absent.
    pub fn new(config: &DuneConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingCredential {
                name: "DUNE_API_KEY",
            })?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl AnalyticsApi for DuneClient {
    async fn get(&self, path: &str, params: &[(String, String)]) -> Result<Value, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, params);

        let response = self
            .http_client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// Rows of a `{result: {rows: [...]}}` body. A missing array is a decode error.
pub fn result_rows(body: Value) -> Result<Vec<Value>, TransportError> {
    match take_rows(body) {
        Some(rows) => Ok(rows),
        None => Err(TransportError::Decode(
            "response has no result.rows array".to_string(),
        )),
    }
}

/// Rows of a `{result: {rows: [...]}}` body, or nothing if the body has none.
pub fn result_rows_or_empty(body: Value) -> Vec<Value> {
    take_rows(body).unwrap_or_default()
}

fn take_rows(mut body: Value) -> Option<Vec<Value>> {
    match body.get_mut("result")?.get_mut("rows")?.take() {
        Value::Array(rows) => Some(rows),
        _ => None,
    }
}

/// Build a parameter list from string pairs.
pub fn params<I, K, V>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
