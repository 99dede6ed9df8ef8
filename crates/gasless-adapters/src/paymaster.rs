use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy::primitives::{Address, Bytes};
use serde_json::json;

use gasless_core::domain::{PaymasterMode, SponsorshipData};
use gasless_core::{PaymasterPort, PortError, UserOperation};

use crate::rpc::{build_http_client, rpc_call};
use crate::AdapterConfig;

/// Paymaster address used by the in-memory adapter's `paymasterAndData`.
const IN_MEMORY_PAYMASTER: Address = Address::repeat_byte(0x99);

#[derive(Debug, Clone)]
pub struct PaymasterAdapter {
    mode: PaymasterRuntime,
    next_id: Arc<AtomicU64>,
}

#[derive(Debug, Clone)]
enum PaymasterRuntime {
    Http(reqwest::blocking::Client),
    InMemory,
    Disabled(String),
}

impl Default for PaymasterAdapter {
    fn default() -> Self {
        Self::with_config(&AdapterConfig::default())
    }
}

impl PaymasterAdapter {
    pub fn with_config(config: &AdapterConfig) -> Self {
        if config.offline {
            return Self::in_memory();
        }
        let mode = match build_http_client(config.http_timeout_ms) {
            Ok(client) => PaymasterRuntime::Http(client),
            Err(e) => PaymasterRuntime::Disabled(e.to_string()),
        };
        Self {
            mode,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            mode: PaymasterRuntime::InMemory,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl PaymasterPort for PaymasterAdapter {
    fn sponsor_user_operation(
        &self,
        endpoint: &str,
        op: &UserOperation,
        mode: PaymasterMode,
    ) -> Result<SponsorshipData, PortError> {
        let client = match &self.mode {
            PaymasterRuntime::Http(client) => client,
            PaymasterRuntime::Disabled(reason) => return Err(PortError::Policy(reason.clone())),
            PaymasterRuntime::InMemory => {
                return Ok(SponsorshipData {
                    paymaster_and_data: Bytes::from(IN_MEMORY_PAYMASTER.to_vec()),
                    ..Default::default()
                })
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let result = rpc_call(
            client,
            "paymaster",
            endpoint,
            id,
            "pm_sponsorUserOperation",
            json!([op, {"mode": mode.as_str(), "calculateGasLimits": true}]),
        )?;
        let sponsorship: SponsorshipData = serde_json::from_value(result).map_err(|e| {
            PortError::Transport(format!("paymaster sponsorship decode failed: {e}"))
        })?;
        if sponsorship.paymaster_and_data.is_empty() {
            return Err(PortError::Rejected(
                "paymaster returned empty paymasterAndData".to_owned(),
            ));
        }
        tracing::info!(sender = %op.sender, mode = mode.as_str(), "user operation sponsored");
        Ok(sponsorship)
    }
}
