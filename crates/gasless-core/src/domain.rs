use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::state_machine::SubmissionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampMs(pub u64);

/// Encoding style used for calls against the deposit contract.
///
/// `Ethers` goes through the compile-time `sol!` bindings, `Web3` through the
/// JSON ABI carried by the chain configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientLibrary {
    Web3,
    Ethers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignMethod {
    Eip712,
    PersonalSign,
}

impl SignMethod {
    pub fn rpc_name(self) -> &'static str {
        match self {
            SignMethod::Eip712 => "eth_signTypedData_v4",
            SignMethod::PersonalSign => "personal_sign",
        }
    }

    /// Value of the relayer's `signatureType` field.
    pub fn relayer_signature_type(self) -> &'static str {
        match self {
            SignMethod::Eip712 => "EIP712_SIGN",
            SignMethod::PersonalSign => "PERSONAL_SIGN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelayTransport {
    /// `executeMetaTransaction` on the target contract, posted to the relayer API.
    Custom,
    /// Trusted forwarder call wrapped in a sponsored ERC-4337 user operation.
    Eip2771,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PanelKind {
    Web3CustomEip712,
    Web3CustomPersonal,
    Web3Eip2771Eip712,
    Web3Eip2771Personal,
    EthersCustomEip712,
    EthersCustomPersonal,
    EthersEip2771Eip712,
    EthersEip2771Personal,
}

impl PanelKind {
    /// Tab order.
    pub const ALL: [PanelKind; 8] = [
        PanelKind::Web3CustomEip712,
        PanelKind::Web3CustomPersonal,
        PanelKind::Web3Eip2771Eip712,
        PanelKind::Web3Eip2771Personal,
        PanelKind::EthersCustomEip712,
        PanelKind::EthersCustomPersonal,
        PanelKind::EthersEip2771Eip712,
        PanelKind::EthersEip2771Personal,
    ];

    pub fn index(self) -> usize {
        match self {
            PanelKind::Web3CustomEip712 => 0,
            PanelKind::Web3CustomPersonal => 1,
            PanelKind::Web3Eip2771Eip712 => 2,
            PanelKind::Web3Eip2771Personal => 3,
            PanelKind::EthersCustomEip712 => 4,
            PanelKind::EthersCustomPersonal => 5,
            PanelKind::EthersEip2771Eip712 => 6,
            PanelKind::EthersEip2771Personal => 7,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            PanelKind::Web3CustomEip712 => "Web3 + Custom + EIP712 Sign",
            PanelKind::Web3CustomPersonal => "Web3 + Custom + Personal Sign",
            PanelKind::Web3Eip2771Eip712 => "Web3 + EIP2771 + EIP712 Sign",
            PanelKind::Web3Eip2771Personal => "Web3 + EIP2771 + Personal Sign",
            PanelKind::EthersCustomEip712 => "Ethers + Custom + EIP712 Sign",
            PanelKind::EthersCustomPersonal => "Ethers + Custom + Personal Sign",
            PanelKind::EthersEip2771Eip712 => "Ethers + EIP2771 + EIP712 Sign",
            PanelKind::EthersEip2771Personal => "Ethers + EIP2771 + Personal Sign",
        }
    }

    pub fn client(self) -> ClientLibrary {
        match self {
            PanelKind::Web3CustomEip712
            | PanelKind::Web3CustomPersonal
            | PanelKind::Web3Eip2771Eip712
            | PanelKind::Web3Eip2771Personal => ClientLibrary::Web3,
            _ => ClientLibrary::Ethers,
        }
    }

    pub fn transport(self) -> RelayTransport {
        match self {
            PanelKind::Web3CustomEip712
            | PanelKind::Web3CustomPersonal
            | PanelKind::EthersCustomEip712
            | PanelKind::EthersCustomPersonal => RelayTransport::Custom,
            _ => RelayTransport::Eip2771,
        }
    }

    pub fn sign_method(self) -> SignMethod {
        match self {
            PanelKind::Web3CustomEip712
            | PanelKind::Web3Eip2771Eip712
            | PanelKind::EthersCustomEip712
            | PanelKind::EthersEip2771Eip712 => SignMethod::Eip712,
            _ => SignMethod::PersonalSign,
        }
    }
}

/// Cached wallet connection, readable without touching the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    pub account: Address,
    pub accounts: Vec<Address>,
    pub chain_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderEventKind {
    AccountsChanged,
    ChainChanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEvent {
    pub sequence: u64,
    pub kind: ProviderEventKind,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRequest {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    pub success: bool,
}

/// An ERC-2612 permit signed by the token owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitSignature {
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
    pub nonce: U256,
    pub deadline: U256,
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSignature {
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

/// Payload handed to the meta-transaction relayer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaTxRequest {
    pub base_url: String,
    pub api_key: String,
    pub api_id: String,
    pub from: Address,
    pub to: Address,
    pub params: Vec<serde_json::Value>,
    pub signature_type: SignMethod,
    /// Full `executeMetaTransaction` calldata, kept for logging and local relayers.
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymasterMode {
    Sponsored,
}

impl PaymasterMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymasterMode::Sponsored => "SPONSORED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipData {
    pub paymaster_and_data: Bytes,
    #[serde(default)]
    pub call_gas_limit: Option<U256>,
    #[serde(default)]
    pub verification_gas_limit: Option<U256>,
    #[serde(default)]
    pub pre_verification_gas: Option<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    pub user_op_hash: B256,
    pub success: bool,
    pub transaction_hash: B256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub panel: PanelKind,
    pub amount: String,
    pub meta_tx_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionPath {
    Direct,
    Relayer,
    Bundler,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub panel: PanelKind,
    pub path: SubmissionPath,
    pub tx_hash: B256,
    pub user_op_hash: Option<B256>,
    pub smart_account: Option<Address>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Progress reported while a submission runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    Notice(Notice),
    Status(SubmissionStatus),
    SmartAccount(Address),
    UserOpSubmitted(B256),
    TxHashGenerated(B256),
    TxMined(B256),
}
