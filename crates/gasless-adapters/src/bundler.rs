use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{keccak256, Address, B256};
use serde::Deserialize;
use serde_json::json;

use gasless_core::domain::UserOperationReceipt;
use gasless_core::{BundlerPort, PortError, UserOperation};

use crate::rpc::{build_http_client, parse_b256, rpc_call};
use crate::AdapterConfig;

#[derive(Debug, Clone)]
pub struct BundlerAdapter {
    mode: BundlerMode,
    next_id: Arc<AtomicU64>,
    state: Arc<Mutex<Vec<UserOperation>>>,
}

#[derive(Debug, Clone)]
enum BundlerMode {
    Http(reqwest::blocking::Client),
    InMemory,
    Disabled(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptWire {
    user_op_hash: B256,
    success: bool,
    receipt: InnerReceiptWire,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InnerReceiptWire {
    transaction_hash: B256,
}

impl Default for BundlerAdapter {
    fn default() -> Self {
        Self::with_config(&AdapterConfig::default())
    }
}

impl BundlerAdapter {
    pub fn with_config(config: &AdapterConfig) -> Self {
        if config.offline {
            return Self::in_memory();
        }
        match build_http_client(config.http_timeout_ms) {
            Ok(client) => Self::from_mode(BundlerMode::Http(client)),
            Err(e) => Self::from_mode(BundlerMode::Disabled(e.to_string())),
        }
    }

    pub fn in_memory() -> Self {
        Self::from_mode(BundlerMode::InMemory)
    }

    fn from_mode(mode: BundlerMode) -> Self {
        Self {
            mode,
            next_id: Arc::new(AtomicU64::new(1)),
            state: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn submitted(&self) -> Result<Vec<UserOperation>, PortError> {
        self.state
            .lock()
            .map(|ops| ops.clone())
            .map_err(|e| PortError::Transport(format!("bundler lock poisoned: {e}")))
    }

    fn call(
        &self,
        endpoint: &str,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, PortError> {
        match &self.mode {
            BundlerMode::Http(client) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                rpc_call(client, "bundler", endpoint, id, method, params)
            }
            BundlerMode::Disabled(reason) => Err(PortError::Policy(reason.clone())),
            BundlerMode::InMemory => Err(PortError::NotImplemented("in-memory bundler rpc")),
        }
    }
}

impl BundlerPort for BundlerAdapter {
    fn send_user_operation(
        &self,
        endpoint: &str,
        op: &UserOperation,
        entry_point: Address,
    ) -> Result<B256, PortError> {
        let hash = if matches!(self.mode, BundlerMode::InMemory) {
            keccak256(op.pack())
        } else {
            let result = self.call(
                endpoint,
                "eth_sendUserOperation",
                json!([op, entry_point.to_string()]),
            )?;
            parse_b256(&result, "userOpHash")?
        };
        self.state
            .lock()
            .map_err(|e| PortError::Transport(format!("bundler lock poisoned: {e}")))?
            .push(op.clone());
        tracing::info!(sender = %op.sender, user_op_hash = %hash, "user operation submitted");
        Ok(hash)
    }

    fn user_operation_receipt(
        &self,
        endpoint: &str,
        user_op_hash: B256,
    ) -> Result<Option<UserOperationReceipt>, PortError> {
        if matches!(self.mode, BundlerMode::InMemory) {
            return Ok(Some(UserOperationReceipt {
                user_op_hash,
                success: true,
                transaction_hash: keccak256(user_op_hash),
            }));
        }
        let result = self.call(
            endpoint,
            "eth_getUserOperationReceipt",
            json!([user_op_hash.to_string()]),
        )?;
        if result.is_null() {
            return Ok(None);
        }
        let wire: ReceiptWire = serde_json::from_value(result)
            .map_err(|e| PortError::Transport(format!("bundler receipt decode failed: {e}")))?;
        Ok(Some(UserOperationReceipt {
            user_op_hash: wire.user_op_hash,
            success: wire.success,
            transaction_hash: wire.receipt.transaction_hash,
        }))
    }
}
