//! Per-chain configuration records and the registry that selects them.

use std::collections::BTreeMap;

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::ports::PortError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub explorer_url: String,
    pub contract: ContractConfig,
    pub token: TokenConfig,
    pub forwarder: ForwarderConfig,
    pub relayer: RelayerConfig,
    pub account_abstraction: AccountAbstractionConfig,
}

impl ChainConfig {
    pub fn tx_url(&self, tx_hash: B256) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_url.trim_end_matches('/'))
    }

    pub fn address_url(&self, address: Address) -> String {
        format!("{}/address/{address}", self.explorer_url.trim_end_matches('/'))
    }
}

/// The deposit contract. `domain_*` feed the EIP-712 domain used by the
/// contract's own `executeMetaTransaction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractConfig {
    pub address: Address,
    pub abi: serde_json::Value,
    pub domain_name: String,
    pub domain_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenConfig {
    pub address: Address,
    pub decimals: u8,
    #[serde(default = "default_permit_version")]
    pub permit_version: String,
}

fn default_permit_version() -> String {
    "1".to_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwarderConfig {
    pub address: Address,
    pub domain_name: String,
    pub domain_version: String,
    pub gas: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayerConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub api_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountAbstractionConfig {
    pub bundler_url: String,
    pub paymaster_url: String,
    pub entry_point: Address,
    pub factory: Address,
    #[serde(default)]
    pub account_index: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryFile {
    default_chain_id: u64,
    chains: Vec<ChainConfig>,
}

/// Chain ID → configuration, with a default record for unknown chains.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainRegistry {
    default: ChainConfig,
    chains: BTreeMap<u64, ChainConfig>,
}

impl ChainRegistry {
    pub fn new(default_chain_id: u64, chains: Vec<ChainConfig>) -> Result<Self, PortError> {
        let mut map = BTreeMap::new();
        for chain in chains {
            let chain_id = chain.chain_id;
            if map.insert(chain_id, chain).is_some() {
                return Err(PortError::Validation(format!(
                    "duplicate chain config: {chain_id}"
                )));
            }
        }
        let default = map.get(&default_chain_id).cloned().ok_or_else(|| {
            PortError::Validation(format!(
                "default chain {default_chain_id} missing from registry"
            ))
        })?;
        Ok(Self {
            default,
            chains: map,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, PortError> {
        let file: RegistryFile = serde_json::from_str(raw)
            .map_err(|e| PortError::Validation(format!("invalid chain registry json: {e}")))?;
        Self::new(file.default_chain_id, file.chains)
    }

    pub fn default_config(&self) -> &ChainConfig {
        &self.default
    }

    pub fn get(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.get(&chain_id)
    }

    pub fn contains(&self, chain_id: u64) -> bool {
        self.chains.contains_key(&chain_id)
    }

    /// Configuration for the connected chain, falling back to the default.
    pub fn select(&self, chain_id: Option<u64>) -> &ChainConfig {
        chain_id
            .and_then(|id| self.chains.get(&id))
            .unwrap_or(&self.default)
    }

    /// String-keyed lookup; empty or unparsable keys select the default.
    pub fn select_str(&self, raw: &str) -> &ChainConfig {
        self.select(parse_chain_id(raw).ok())
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Overwrites every relayer API key that is still empty.
    pub fn fill_relayer_api_key(&mut self, api_key: &str) {
        for chain in self.chains.values_mut() {
            if chain.relayer.api_key.is_empty() {
                chain.relayer.api_key = api_key.to_owned();
            }
        }
        if self.default.relayer.api_key.is_empty() {
            self.default.relayer.api_key = api_key.to_owned();
        }
    }

    /// Expands `{chainId}` and `{apiKey}` in bundler/paymaster URLs.
    pub fn expand_endpoint_templates(&mut self, bundler_key: &str, paymaster_key: &str) {
        for chain in self
            .chains
            .values_mut()
            .chain(std::iter::once(&mut self.default))
        {
            let id = chain.chain_id.to_string();
            let aa = &mut chain.account_abstraction;
            aa.bundler_url = aa
                .bundler_url
                .replace("{chainId}", &id)
                .replace("{apiKey}", bundler_key);
            aa.paymaster_url = aa
                .paymaster_url
                .replace("{chainId}", &id)
                .replace("{apiKey}", paymaster_key);
        }
    }
}

/// Parses decimal or `0x` hex chain ids.
pub fn parse_chain_id(raw: &str) -> Result<u64, PortError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PortError::Validation("empty chain id".to_owned()));
    }
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
            .map_err(|e| PortError::Validation(format!("invalid hex chain id: {e}")))
    } else {
        raw.parse()
            .map_err(|e| PortError::Validation(format!("invalid chain id: {e}")))
    }
}
