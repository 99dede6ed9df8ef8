//! Payloads handed to the wallet for signing.
//!
//! Typed data is produced twice: as the `eth_signTypedData_v4` JSON document
//! the wallet displays, and as the EIP-712 digest computed from the `sol!`
//! struct. Both must agree; local signers hash the JSON, tests compare them.

use std::borrow::Cow;

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::sol_types::{Eip712Domain, SolStruct, SolValue};
use serde_json::{json, Value};

use crate::chain::{ContractConfig, ForwarderConfig};
use crate::contracts::{ForwardRequest, MetaTransaction, Permit};
use crate::domain::SplitSignature;
use crate::ports::PortError;

#[derive(Debug, Clone, PartialEq)]
pub struct TypedPayload {
    pub json: Value,
    pub digest: B256,
}

impl TypedPayload {
    /// Bytes sent as the typed-data parameter of `eth_signTypedData_v4`.
    pub fn to_payload_bytes(&self) -> Vec<u8> {
        self.json.to_string().into_bytes()
    }
}

fn owned(s: &str) -> Option<Cow<'static, str>> {
    Some(Cow::Owned(s.to_owned()))
}

pub fn permit_domain(
    token_name: &str,
    version: &str,
    chain_id: u64,
    token: Address,
) -> Eip712Domain {
    Eip712Domain::new(
        owned(token_name),
        owned(version),
        Some(U256::from(chain_id)),
        Some(token),
        None,
    )
}

pub fn permit_typed_data(
    token_name: &str,
    version: &str,
    chain_id: u64,
    token: Address,
    permit: &Permit,
) -> TypedPayload {
    let domain = permit_domain(token_name, version, chain_id, token);
    let json = json!({
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "version", "type": "string"},
                {"name": "chainId", "type": "uint256"},
                {"name": "verifyingContract", "type": "address"}
            ],
            "Permit": [
                {"name": "owner", "type": "address"},
                {"name": "spender", "type": "address"},
                {"name": "value", "type": "uint256"},
                {"name": "nonce", "type": "uint256"},
                {"name": "deadline", "type": "uint256"}
            ]
        },
        "primaryType": "Permit",
        "domain": {
            "name": token_name,
            "version": version,
            "chainId": chain_id,
            "verifyingContract": token.to_string(),
        },
        "message": {
            "owner": permit.owner.to_string(),
            "spender": permit.spender.to_string(),
            "value": permit.value.to_string(),
            "nonce": permit.nonce.to_string(),
            "deadline": permit.deadline.to_string(),
        }
    });
    TypedPayload {
        json,
        digest: permit.eip712_signing_hash(&domain),
    }
}

/// Domain of contracts implementing `executeMetaTransaction`: the chain id is
/// carried as the salt instead of `chainId`.
pub fn meta_transaction_domain(contract: &ContractConfig, chain_id: u64) -> Eip712Domain {
    Eip712Domain::new(
        owned(&contract.domain_name),
        owned(&contract.domain_version),
        None,
        Some(contract.address),
        Some(chain_salt(chain_id)),
    )
}

pub fn meta_transaction_typed_data(
    contract: &ContractConfig,
    chain_id: u64,
    message: &MetaTransaction,
) -> TypedPayload {
    let domain = meta_transaction_domain(contract, chain_id);
    let json = json!({
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "version", "type": "string"},
                {"name": "verifyingContract", "type": "address"},
                {"name": "salt", "type": "bytes32"}
            ],
            "MetaTransaction": [
                {"name": "nonce", "type": "uint256"},
                {"name": "from", "type": "address"},
                {"name": "functionSignature", "type": "bytes"}
            ]
        },
        "primaryType": "MetaTransaction",
        "domain": {
            "name": contract.domain_name,
            "version": contract.domain_version,
            "verifyingContract": contract.address.to_string(),
            "salt": chain_salt(chain_id).to_string(),
        },
        "message": {
            "nonce": message.nonce.to_string(),
            "from": message.from.to_string(),
            "functionSignature": message.functionSignature.to_string(),
        }
    });
    TypedPayload {
        json,
        digest: message.eip712_signing_hash(&domain),
    }
}

pub fn forwarder_domain(forwarder: &ForwarderConfig, chain_id: u64) -> Eip712Domain {
    Eip712Domain::new(
        owned(&forwarder.domain_name),
        owned(&forwarder.domain_version),
        Some(U256::from(chain_id)),
        Some(forwarder.address),
        None,
    )
}

pub fn forward_request_typed_data(
    forwarder: &ForwarderConfig,
    chain_id: u64,
    request: &ForwardRequest,
) -> TypedPayload {
    let domain = forwarder_domain(forwarder, chain_id);
    let json = json!({
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "version", "type": "string"},
                {"name": "chainId", "type": "uint256"},
                {"name": "verifyingContract", "type": "address"}
            ],
            "ForwardRequest": [
                {"name": "from", "type": "address"},
                {"name": "to", "type": "address"},
                {"name": "value", "type": "uint256"},
                {"name": "gas", "type": "uint256"},
                {"name": "nonce", "type": "uint256"},
                {"name": "data", "type": "bytes"}
            ]
        },
        "primaryType": "ForwardRequest",
        "domain": {
            "name": forwarder.domain_name,
            "version": forwarder.domain_version,
            "chainId": chain_id,
            "verifyingContract": forwarder.address.to_string(),
        },
        "message": {
            "from": request.from.to_string(),
            "to": request.to.to_string(),
            "value": request.value.to_string(),
            "gas": request.gas.to_string(),
            "nonce": request.nonce.to_string(),
            "data": request.data.to_string(),
        }
    });
    TypedPayload {
        json,
        digest: request.eip712_signing_hash(&domain),
    }
}

pub fn chain_salt(chain_id: u64) -> B256 {
    B256::from(U256::from(chain_id))
}

/// `keccak256(abi.encodePacked(nonce, contract, chainId, functionSignature))`,
/// signed with `personal_sign` by contracts that accept personal signatures.
pub fn custom_personal_message(
    nonce: U256,
    contract: Address,
    chain_id: u64,
    function_signature: &[u8],
) -> B256 {
    let mut packed = (nonce, contract, U256::from(chain_id)).abi_encode_packed();
    packed.extend_from_slice(function_signature);
    keccak256(packed)
}

/// Packed digest of a forward request, signed with `personal_sign` for
/// `executePersonalSign`.
pub fn forward_request_personal_message(request: &ForwardRequest) -> B256 {
    let packed = (
        request.from,
        request.to,
        request.value,
        request.gas,
        request.nonce,
        keccak256(&request.data),
    )
        .abi_encode_packed();
    keccak256(packed)
}

/// Splits a 65-byte `r || s || v` signature; `v` of 0/1 is lifted to 27/28.
pub fn split_signature(signature: &[u8]) -> Result<SplitSignature, PortError> {
    if signature.len() != 65 {
        return Err(PortError::Validation(format!(
            "signature must be 65 bytes, got {}",
            signature.len()
        )));
    }
    let r = B256::from_slice(&signature[0..32]);
    let s = B256::from_slice(&signature[32..64]);
    let v = match signature[64] {
        v @ (0 | 1) => v + 27,
        v @ (27 | 28) => v,
        other => {
            return Err(PortError::Validation(format!(
                "invalid signature recovery id: {other}"
            )))
        }
    };
    Ok(SplitSignature { v, r, s })
}
