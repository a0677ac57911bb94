//! Minimal Solana JSON-RPC client.
//!
//! Only the two calls the Solana agent needs: `getSlot` and `getBalance`.

use crate::config::SolanaConfig;
use crate::error::{ConfigError, TransportError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Solana RPC client bound to one endpoint.
#[derive(Debug, Clone)]
pub struct SolanaClient {
    http_client: reqwest::Client,
    rpc_url: String,
}

impl SolanaClient {
    /// Build a client from configuration, failing if no endpoint is set.
    pub fn new(config: &SolanaConfig) -> Result<Self, ConfigError> {
        let rpc_url = config
            .rpc_url
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingCredential {
                name: "SOLANA_RPC_URL",
            })?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            rpc_url,
        })
    }

    /// Current slot at the node's default commitment.
    pub async fn get_slot(&self) -> Result<u64, TransportError> {
        let result = self.call("getSlot", json!([])).await?;
        result
            .as_u64()
            .ok_or_else(|| TransportError::Decode(format!("slot is not an integer: {}", result)))
    }

    /// Balance of `public_key` in lamports.
    pub async fn get_balance(&self, public_key: &str) -> Result<u64, TransportError> {
        let result = self.call("getBalance", json!([public_key])).await?;
        result
            .get("value")
            .and_then(Value::as_u64)
            .ok_or_else(|| TransportError::Decode(format!("balance has no value: {}", result)))
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        debug!("RPC {} {}", method, params);

        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status { status, body });
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        if let Some(err) = body.error {
            return Err(TransportError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        body.result
            .ok_or_else(|| TransportError::Decode("response has no result".to_string()))
    }
}

/// Lamports to SOL.
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL
}

/// Whether `key` looks like a base58-encoded 32-byte public key.
pub fn is_valid_public_key(key: &str) -> bool {
    (32..=44).contains(&key.len()) && key.chars().all(|c| BASE58_ALPHABET.contains(c))
}
