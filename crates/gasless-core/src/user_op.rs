//! ERC-4337 user operations (EntryPoint v0.6 layout).

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::sol_types::{SolCall, SolValue};
use serde::{Deserialize, Serialize};

use crate::contracts::{ISmartAccount, ISmartAccountFactory};
use crate::domain::SponsorshipData;

pub const DEFAULT_CALL_GAS_LIMIT: u64 = 500_000;
pub const DEFAULT_VERIFICATION_GAS_LIMIT: u64 = 1_000_000;
pub const DEFAULT_PRE_VERIFICATION_GAS: u64 = 100_000;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: Bytes,
    pub call_data: Bytes,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub paymaster_and_data: Bytes,
    pub signature: Bytes,
}

impl UserOperation {
    /// `abi.encode` of every field with dynamic fields replaced by their hash.
    pub fn pack(&self) -> Vec<u8> {
        (
            self.sender,
            self.nonce,
            keccak256(&self.init_code),
            keccak256(&self.call_data),
            self.call_gas_limit,
            self.verification_gas_limit,
            self.pre_verification_gas,
            self.max_fee_per_gas,
            self.max_priority_fee_per_gas,
            keccak256(&self.paymaster_and_data),
        )
            .abi_encode()
    }

    pub fn hash(&self, entry_point: Address, chain_id: u64) -> B256 {
        let inner = keccak256(self.pack());
        keccak256((inner, entry_point, U256::from(chain_id)).abi_encode())
    }

    /// Copies sponsorship fields in; gas limits the paymaster omits are kept.
    pub fn apply_sponsorship(&mut self, sponsorship: &SponsorshipData) {
        self.paymaster_and_data = sponsorship.paymaster_and_data.clone();
        if let Some(gas) = sponsorship.call_gas_limit {
            self.call_gas_limit = gas;
        }
        if let Some(gas) = sponsorship.verification_gas_limit {
            self.verification_gas_limit = gas;
        }
        if let Some(gas) = sponsorship.pre_verification_gas {
            self.pre_verification_gas = gas;
        }
    }
}

/// Placeholder ECDSA signature used while the paymaster simulates the operation.
pub fn dummy_signature() -> Bytes {
    let mut sig = vec![0xff; 64];
    sig.push(0x1c);
    Bytes::from(sig)
}

pub fn smart_account_call(dest: Address, value: U256, func: Bytes) -> Bytes {
    Bytes::from(ISmartAccount::executeCallCall { dest, value, func }.abi_encode())
}

/// Factory address followed by the deployment calldata.
pub fn init_code(factory: Address, owner: Address, index: u64) -> Bytes {
    let call = ISmartAccountFactory::deployCounterFactualAccountCall {
        owner,
        index: U256::from(index),
    };
    let mut code = factory.to_vec();
    code.extend_from_slice(&call.abi_encode());
    Bytes::from(code)
}
