//! Blocking JSON-RPC 2.0 over HTTP, shared by the wallet proxy, bundler and
//! paymaster adapters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Bytes, B256, U256};
use serde_json::Value;

use gasless_core::PortError;

/// EIP-1193 "user rejected request".
const USER_REJECTED: i64 = 4001;

pub fn build_http_client(timeout_ms: u64) -> Result<reqwest::blocking::Client, PortError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(|e| PortError::Transport(format!("failed to build http client: {e}")))
}

#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    label: &'static str,
    endpoint: String,
    client: reqwest::blocking::Client,
    next_id: Arc<AtomicU64>,
}

impl JsonRpcClient {
    pub fn new(
        label: &'static str,
        endpoint: impl Into<String>,
        client: reqwest::blocking::Client,
    ) -> Self {
        Self {
            label,
            endpoint: endpoint.into(),
            client,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn call(&self, method: &str, params: Value) -> Result<Value, PortError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        rpc_call(&self.client, self.label, &self.endpoint, id, method, params)
    }
}

pub fn rpc_call(
    client: &reqwest::blocking::Client,
    label: &str,
    endpoint: &str,
    id: u64,
    method: &str,
    params: Value,
) -> Result<Value, PortError> {
    let payload = serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    });
    tracing::debug!(label, method, "json-rpc request");
    let response = client
        .post(endpoint)
        .json(&payload)
        .send()
        .map_err(|e| PortError::Transport(format!("{label} request failed: {e}")))?;
    let status = response.status();
    let body: Value = response
        .json()
        .map_err(|e| PortError::Transport(format!("{label} json decode failed: {e}")))?;
    if !status.is_success() {
        return Err(PortError::Transport(format!(
            "{label} status {status}: {body}"
        )));
    }
    if let Some(err) = body.get("error") {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_owned();
        if err.get("code").and_then(Value::as_i64) == Some(USER_REJECTED) {
            return Err(PortError::Rejected(message));
        }
        return Err(PortError::Transport(format!(
            "{label} {method} returned error: {err}"
        )));
    }
    body.get("result")
        .cloned()
        .ok_or_else(|| PortError::Transport(format!("{label} {method} missing result")))
}

pub fn parse_b256(value: &Value, what: &str) -> Result<B256, PortError> {
    value
        .as_str()
        .ok_or_else(|| PortError::Transport(format!("{what}: hex string expected")))?
        .parse()
        .map_err(|e| PortError::Validation(format!("invalid {what}: {e}")))
}

pub fn parse_bytes(value: &Value, what: &str) -> Result<Bytes, PortError> {
    value
        .as_str()
        .ok_or_else(|| PortError::Transport(format!("{what}: hex string expected")))?
        .parse()
        .map_err(|e| PortError::Validation(format!("invalid {what}: {e}")))
}

pub fn parse_quantity(value: &Value, what: &str) -> Result<U256, PortError> {
    if let Some(n) = value.as_u64() {
        return Ok(U256::from(n));
    }
    let raw = value
        .as_str()
        .ok_or_else(|| PortError::Transport(format!("{what}: quantity expected")))?;
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(raw, 10),
    }
    .map_err(|e| PortError::Validation(format!("invalid {what}: {e}")))
}

pub fn parse_u64(value: &Value, what: &str) -> Result<u64, PortError> {
    let quantity = parse_quantity(value, what)?;
    u64::try_from(quantity).map_err(|_| PortError::Validation(format!("{what} overflows u64")))
}
