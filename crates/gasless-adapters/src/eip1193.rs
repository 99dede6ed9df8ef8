use std::sync::{Arc, Mutex, MutexGuard};

use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy::dyn_abi::TypedData;
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{address, keccak256, Address, Bytes, TxKind, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use serde_json::{json, Value};

use gasless_core::domain::{
    FeeEstimate, ProviderEvent, ProviderEventKind, SignMethod, TxReceipt, TxRequest,
    WalletSession,
};
use gasless_core::{PortError, ProviderPort};

use crate::rpc::{build_http_client, parse_b256, parse_bytes, parse_quantity, parse_u64};
use crate::{AdapterConfig, JsonRpcClient};

const DETERMINISTIC_ACCOUNT: Address = address!("1000000000000000000000000000000000000001");
const DETERMINISTIC_CHAIN_ID: u64 = 5;
const DETERMINISTIC_FEE_WEI: u64 = 1_500_000_000;

/// Wallet adapter. Talks to an EIP-1193 JSON-RPC proxy, signs with a local
/// development key, or answers deterministically for offline runs.
#[derive(Debug, Clone)]
pub struct Eip1193Adapter {
    mode: ProviderMode,
    state: Arc<Mutex<ProviderState>>,
}

#[derive(Debug, Clone)]
enum ProviderMode {
    Disabled(String),
    Deterministic,
    Proxy(JsonRpcClient),
    LocalKey(LocalKeyRuntime),
}

#[derive(Debug, Clone)]
struct LocalKeyRuntime {
    signer: PrivateKeySigner,
    rpc: JsonRpcClient,
}

#[derive(Debug, Clone)]
struct ProviderState {
    connected: bool,
    accounts: Vec<Address>,
    chain_id: u64,
    event_seq: u64,
    events: Vec<ProviderEvent>,
}

impl Default for ProviderState {
    fn default() -> Self {
        Self {
            connected: false,
            accounts: vec![DETERMINISTIC_ACCOUNT],
            chain_id: DETERMINISTIC_CHAIN_ID,
            event_seq: 0,
            events: Vec::new(),
        }
    }
}

impl ProviderState {
    fn push_event(&mut self, kind: ProviderEventKind, value: String) {
        self.event_seq = self.event_seq.saturating_add(1);
        self.events.push(ProviderEvent {
            sequence: self.event_seq,
            kind,
            value,
        });
    }

    fn set_accounts(&mut self, accounts: Vec<Address>) {
        if self.accounts != accounts {
            let value = accounts_json(&accounts);
            self.accounts = accounts;
            self.push_event(ProviderEventKind::AccountsChanged, value);
        }
    }

    fn set_chain_id(&mut self, chain_id: u64) {
        if self.chain_id != chain_id {
            self.chain_id = chain_id;
            self.push_event(ProviderEventKind::ChainChanged, chain_id.to_string());
        }
    }
}

impl Default for Eip1193Adapter {
    fn default() -> Self {
        Self::deterministic()
    }
}

impl Eip1193Adapter {
    pub fn deterministic() -> Self {
        Self::from_mode(ProviderMode::Deterministic)
    }

    pub fn disabled(reason: impl Into<String>) -> Self {
        Self::from_mode(ProviderMode::Disabled(reason.into()))
    }

    /// Proxy URL wins over a local key; neither configured falls back to the
    /// deterministic wallet.
    pub fn with_config(config: &AdapterConfig) -> Self {
        let client = match build_http_client(config.http_timeout_ms) {
            Ok(client) => client,
            Err(e) => return Self::disabled(e.to_string()),
        };

        if let Some(url) = &config.wallet_proxy_url {
            tracing::info!(url = %url, "wallet: eip1193 proxy");
            return Self::from_mode(ProviderMode::Proxy(JsonRpcClient::new(
                "eip1193 proxy",
                url.clone(),
                client,
            )));
        }

        if let Some(raw_key) = &config.dev_private_key {
            let Some(rpc_url) = &config.rpc_url else {
                return Self::disabled("GASLESS_DEV_PRIVATE_KEY requires GASLESS_RPC_URL");
            };
            return match raw_key.parse::<PrivateKeySigner>() {
                Ok(signer) => {
                    tracing::info!(address = %signer.address(), "wallet: local development key");
                    Self::from_mode(ProviderMode::LocalKey(LocalKeyRuntime {
                        signer,
                        rpc: JsonRpcClient::new("rpc", rpc_url.clone(), client),
                    }))
                }
                Err(e) => Self::disabled(format!("invalid development key: {e}")),
            };
        }

        tracing::info!("wallet: deterministic offline provider");
        Self::deterministic()
    }

    fn from_mode(mode: ProviderMode) -> Self {
        let mut state = ProviderState::default();
        if let ProviderMode::LocalKey(runtime) = &mode {
            state.accounts = vec![runtime.signer.address()];
        }
        Self {
            mode,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match self.mode {
            ProviderMode::Disabled(_) => "disabled",
            ProviderMode::Deterministic => "deterministic",
            ProviderMode::Proxy(_) => "proxy",
            ProviderMode::LocalKey(_) => "local-key",
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ProviderState>, PortError> {
        self.state
            .lock()
            .map_err(|e| PortError::Transport(format!("provider lock poisoned: {e}")))
    }

    fn check_mode(&self) -> Result<(), PortError> {
        if let ProviderMode::Disabled(reason) = &self.mode {
            return Err(PortError::Policy(reason.clone()));
        }
        Ok(())
    }

    fn rpc(&self) -> Result<&JsonRpcClient, PortError> {
        match &self.mode {
            ProviderMode::Proxy(rpc) => Ok(rpc),
            ProviderMode::LocalKey(runtime) => Ok(&runtime.rpc),
            ProviderMode::Disabled(reason) => Err(PortError::Policy(reason.clone())),
            ProviderMode::Deterministic => {
                Err(PortError::NotImplemented("deterministic provider has no rpc"))
            }
        }
    }

    fn deterministic_signature(
        &self,
        method: SignMethod,
        payload: &[u8],
        expected_signer: Address,
    ) -> Bytes {
        let mut seed = Vec::new();
        seed.extend_from_slice(method.rpc_name().as_bytes());
        seed.extend_from_slice(expected_signer.as_slice());
        seed.extend_from_slice(payload);
        let hash = keccak256(seed);
        let mut sig = Vec::with_capacity(65);
        sig.extend_from_slice(hash.as_slice());
        sig.extend_from_slice(keccak256(hash).as_slice());
        sig.push(27);
        Bytes::from(sig)
    }

    pub fn debug_inject_accounts_changed(&self, accounts: Vec<Address>) -> Result<(), PortError> {
        let mut g = self.lock()?;
        let value = accounts_json(&accounts);
        g.accounts = accounts;
        g.push_event(ProviderEventKind::AccountsChanged, value);
        Ok(())
    }

    pub fn debug_inject_chain_changed(&self, chain_id: u64) -> Result<(), PortError> {
        let mut g = self.lock()?;
        g.chain_id = chain_id;
        g.push_event(ProviderEventKind::ChainChanged, chain_id.to_string());
        Ok(())
    }

    fn parse_accounts(result: &Value, method: &str) -> Result<Vec<Address>, PortError> {
        let arr = result
            .as_array()
            .ok_or_else(|| PortError::Transport(format!("{method}: array expected")))?;
        arr.iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| PortError::Transport(format!("{method}: string expected")))?
                    .parse()
                    .map_err(|e| PortError::Validation(format!("invalid account address: {e}")))
            })
            .collect()
    }

    fn remote_chain_id(&self) -> Result<u64, PortError> {
        let result = self.rpc()?.call("eth_chainId", json!([]))?;
        parse_u64(&result, "eth_chainId")
    }

    fn sign_locally(
        signer: &PrivateKeySigner,
        method: SignMethod,
        payload: &[u8],
        expected_signer: Address,
    ) -> Result<Bytes, PortError> {
        if signer.address() != expected_signer {
            return Err(PortError::Policy(format!(
                "signer {} does not match requested account {expected_signer}",
                signer.address()
            )));
        }
        let signature = match method {
            SignMethod::Eip712 => {
                let typed: TypedData = serde_json::from_slice(payload)
                    .map_err(|e| PortError::Validation(format!("invalid typed data: {e}")))?;
                let digest = typed
                    .eip712_signing_hash()
                    .map_err(|e| PortError::Validation(format!("typed data hash failed: {e}")))?;
                signer.sign_hash_sync(&digest)
            }
            SignMethod::PersonalSign => signer.sign_message_sync(payload),
        }
        .map_err(|e| PortError::Transport(format!("local signing failed: {e}")))?;
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }

    fn send_raw_locally(&self, runtime: &LocalKeyRuntime, tx: &TxRequest) -> Result<B256, PortError> {
        let rpc = &runtime.rpc;
        let call = tx_object(tx);
        let nonce = parse_u64(
            &rpc.call("eth_getTransactionCount", json!([tx.from.to_string(), "pending"]))?,
            "eth_getTransactionCount",
        )?;
        let gas_limit = parse_u64(&rpc.call("eth_estimateGas", json!([call]))?, "eth_estimateGas")?;
        let fees = self.fee_estimate()?;
        let unsigned = TxEip1559 {
            chain_id: self.remote_chain_id()?,
            nonce,
            gas_limit: gas_limit.saturating_mul(6) / 5,
            max_fee_per_gas: to_u128(fees.max_fee_per_gas, "maxFeePerGas")?,
            max_priority_fee_per_gas: to_u128(fees.max_priority_fee_per_gas, "maxPriorityFeePerGas")?,
            to: TxKind::Call(tx.to),
            value: tx.value,
            input: tx.data.clone(),
            ..Default::default()
        };
        let signature = runtime
            .signer
            .sign_hash_sync(&unsigned.signature_hash())
            .map_err(|e| PortError::Transport(format!("local signing failed: {e}")))?;
        let envelope = TxEnvelope::Eip1559(unsigned.into_signed(signature));
        let raw = Bytes::from(envelope.encoded_2718());
        let result = rpc.call("eth_sendRawTransaction", json!([raw.to_string()]))?;
        parse_b256(&result, "eth_sendRawTransaction")
    }
}

impl ProviderPort for Eip1193Adapter {
    fn request_accounts(&self) -> Result<Vec<Address>, PortError> {
        self.check_mode()?;
        let accounts = match &self.mode {
            ProviderMode::Proxy(rpc) => {
                let result = rpc.call("eth_requestAccounts", json!([]))?;
                Self::parse_accounts(&result, "eth_requestAccounts")?
            }
            ProviderMode::LocalKey(runtime) => vec![runtime.signer.address()],
            _ => self.lock()?.accounts.clone(),
        };
        if accounts.is_empty() {
            return Err(PortError::Policy(
                "no wallet accounts available; unlock/connect wallet".to_owned(),
            ));
        }
        let mut g = self.lock()?;
        g.set_accounts(accounts.clone());
        g.connected = true;
        Ok(accounts)
    }

    fn chain_id(&self) -> Result<u64, PortError> {
        self.check_mode()?;
        if matches!(self.mode, ProviderMode::Deterministic) {
            return Ok(self.lock()?.chain_id);
        }
        let chain_id = self.remote_chain_id()?;
        self.lock()?.set_chain_id(chain_id);
        Ok(chain_id)
    }

    fn session(&self) -> Result<Option<WalletSession>, PortError> {
        let g = self.lock()?;
        if !g.connected {
            return Ok(None);
        }
        Ok(g.accounts.first().map(|account| WalletSession {
            account: *account,
            accounts: g.accounts.clone(),
            chain_id: g.chain_id,
        }))
    }

    fn refresh(&self) -> Result<(), PortError> {
        self.check_mode()?;
        match &self.mode {
            ProviderMode::Proxy(rpc) => {
                let accounts =
                    Self::parse_accounts(&rpc.call("eth_accounts", json!([]))?, "eth_accounts")?;
                let chain_id = self.remote_chain_id()?;
                let mut g = self.lock()?;
                g.set_accounts(accounts);
                g.set_chain_id(chain_id);
            }
            ProviderMode::LocalKey(_) => {
                let chain_id = self.remote_chain_id()?;
                self.lock()?.set_chain_id(chain_id);
            }
            _ => {}
        }
        Ok(())
    }

    fn sign_payload(
        &self,
        method: SignMethod,
        payload: &[u8],
        expected_signer: Address,
    ) -> Result<Bytes, PortError> {
        self.check_mode()?;
        match &self.mode {
            ProviderMode::Proxy(rpc) => {
                let params = match method {
                    SignMethod::PersonalSign => json!([
                        format!("0x{}", alloy::hex::encode(payload)),
                        expected_signer.to_string()
                    ]),
                    SignMethod::Eip712 => json!([
                        expected_signer.to_string(),
                        String::from_utf8_lossy(payload).to_string()
                    ]),
                };
                let result = rpc.call(method.rpc_name(), params)?;
                parse_bytes(&result, "signature")
            }
            ProviderMode::LocalKey(runtime) => {
                Self::sign_locally(&runtime.signer, method, payload, expected_signer)
            }
            _ => Ok(self.deterministic_signature(method, payload, expected_signer)),
        }
    }

    fn call(&self, to: Address, data: &Bytes) -> Result<Bytes, PortError> {
        self.check_mode()?;
        let result = self.rpc()?.call(
            "eth_call",
            json!([{"to": to.to_string(), "data": data.to_string()}, "latest"]),
        )?;
        parse_bytes(&result, "eth_call result")
    }

    fn get_code(&self, address: Address) -> Result<Bytes, PortError> {
        self.check_mode()?;
        if matches!(self.mode, ProviderMode::Deterministic) {
            return Ok(Bytes::new());
        }
        let result = self
            .rpc()?
            .call("eth_getCode", json!([address.to_string(), "latest"]))?;
        parse_bytes(&result, "eth_getCode result")
    }

    fn fee_estimate(&self) -> Result<FeeEstimate, PortError> {
        self.check_mode()?;
        if matches!(self.mode, ProviderMode::Deterministic) {
            let fee = U256::from(DETERMINISTIC_FEE_WEI);
            return Ok(FeeEstimate {
                max_fee_per_gas: fee,
                max_priority_fee_per_gas: fee,
            });
        }
        let rpc = self.rpc()?;
        let gas_price = parse_quantity(&rpc.call("eth_gasPrice", json!([]))?, "eth_gasPrice")?;
        let priority = match rpc.call("eth_maxPriorityFeePerGas", json!([])) {
            Ok(v) => parse_quantity(&v, "eth_maxPriorityFeePerGas")?,
            Err(e) => {
                tracing::debug!(error = %e, "eth_maxPriorityFeePerGas unavailable, using gas price");
                gas_price
            }
        };
        Ok(FeeEstimate {
            max_fee_per_gas: gas_price.saturating_add(priority),
            max_priority_fee_per_gas: priority,
        })
    }

    fn send_transaction(&self, tx: &TxRequest) -> Result<B256, PortError> {
        self.check_mode()?;
        match &self.mode {
            ProviderMode::Proxy(rpc) => {
                let result = rpc.call("eth_sendTransaction", json!([tx_object(tx)]))?;
                parse_b256(&result, "eth_sendTransaction")
            }
            ProviderMode::LocalKey(runtime) => self.send_raw_locally(runtime, tx),
            _ => Err(PortError::NotImplemented(
                "deterministic provider cannot send transactions",
            )),
        }
    }

    fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, PortError> {
        self.check_mode()?;
        let result = self
            .rpc()?
            .call("eth_getTransactionReceipt", json!([tx_hash.to_string()]))?;
        if result.is_null() {
            return Ok(None);
        }
        let block_number = match result.get("blockNumber") {
            Some(v) if !v.is_null() => Some(parse_u64(v, "blockNumber")?),
            _ => None,
        };
        let success = match result.get("status") {
            Some(v) if !v.is_null() => parse_u64(v, "status")? == 1,
            _ => true,
        };
        let transaction_hash = match result.get("transactionHash") {
            Some(v) => parse_b256(v, "transactionHash")?,
            None => tx_hash,
        };
        Ok(Some(TxReceipt {
            transaction_hash,
            block_number,
            success,
        }))
    }

    fn drain_events(&self) -> Result<Vec<ProviderEvent>, PortError> {
        let mut g = self.lock()?;
        Ok(std::mem::take(&mut g.events))
    }
}

fn tx_object(tx: &TxRequest) -> Value {
    json!({
        "from": tx.from.to_string(),
        "to": tx.to.to_string(),
        "value": tx.value,
        "data": tx.data.to_string(),
    })
}

fn accounts_json(accounts: &[Address]) -> String {
    Value::from(
        accounts
            .iter()
            .map(|a| Value::String(a.to_string()))
            .collect::<Vec<_>>(),
    )
    .to_string()
}

fn to_u128(value: U256, what: &str) -> Result<u128, PortError> {
    u128::try_from(value).map_err(|_| PortError::Validation(format!("{what} overflows u128")))
}
