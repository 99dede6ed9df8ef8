use alloy::primitives::{Address, Bytes, B256};
use thiserror::Error;

use crate::domain::{
    FeeEstimate, FlowEvent, MetaTxRequest, PaymasterMode, ProviderEvent, SignMethod,
    SponsorshipData, TxReceipt, TxRequest, UserOperationReceipt, WalletSession,
};
use crate::user_op::UserOperation;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("policy error: {0}")]
    Policy(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Connected wallet plus the RPC it fronts.
pub trait ProviderPort {
    /// Prompts the wallet for accounts (`eth_requestAccounts`).
    fn request_accounts(&self) -> Result<Vec<Address>, PortError>;
    fn chain_id(&self) -> Result<u64, PortError>;
    /// Last known connection; never touches the network.
    fn session(&self) -> Result<Option<WalletSession>, PortError>;
    /// Re-reads accounts and chain without prompting, recording change events.
    fn refresh(&self) -> Result<(), PortError>;
    fn sign_payload(
        &self,
        method: SignMethod,
        payload: &[u8],
        expected_signer: Address,
    ) -> Result<Bytes, PortError>;
    fn call(&self, to: Address, data: &Bytes) -> Result<Bytes, PortError>;
    fn get_code(&self, address: Address) -> Result<Bytes, PortError>;
    fn fee_estimate(&self) -> Result<FeeEstimate, PortError>;
    fn send_transaction(&self, tx: &TxRequest) -> Result<B256, PortError>;
    fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, PortError>;
    fn drain_events(&self) -> Result<Vec<ProviderEvent>, PortError>;
}

pub trait RelayerPort {
    /// Returns the relayed transaction hash (`txHashGenerated`).
    fn send_meta_transaction(&self, request: &MetaTxRequest) -> Result<B256, PortError>;
}

pub trait BundlerPort {
    fn send_user_operation(
        &self,
        endpoint: &str,
        op: &UserOperation,
        entry_point: Address,
    ) -> Result<B256, PortError>;
    fn user_operation_receipt(
        &self,
        endpoint: &str,
        user_op_hash: B256,
    ) -> Result<Option<UserOperationReceipt>, PortError>;
}

pub trait PaymasterPort {
    fn sponsor_user_operation(
        &self,
        endpoint: &str,
        op: &UserOperation,
        mode: PaymasterMode,
    ) -> Result<SponsorshipData, PortError>;
}

pub trait AbiPort {
    fn encode_calldata(
        &self,
        abi_json: &str,
        method_signature: &str,
        args: &[String],
    ) -> Result<(Bytes, [u8; 4]), PortError>;
    fn selector_from_method_signature(&self, method_signature: &str) -> Result<[u8; 4], PortError>;
}

pub trait ClockPort {
    fn now_ms(&self) -> Result<u64, PortError>;
    fn sleep_ms(&self, ms: u64);
}

pub trait FlowObserver {
    fn on_event(&self, event: FlowEvent);
}
