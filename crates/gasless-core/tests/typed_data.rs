use alloy::dyn_abi::TypedData;
use alloy::primitives::{address, keccak256, Address, Bytes, U256};
use alloy::sol_types::SolValue;
use gasless_core::chain::{ContractConfig, ForwarderConfig};
use gasless_core::contracts::{ForwardRequest, MetaTransaction, Permit};
use gasless_core::typed_data::{
    chain_salt, custom_personal_message, forward_request_personal_message,
    forward_request_typed_data, meta_transaction_typed_data, permit_typed_data, split_signature,
    TypedPayload,
};
use gasless_core::user_op::{dummy_signature, init_code, UserOperation};

const OWNER: Address = address!("1000000000000000000000000000000000000001");
const CONTRACT: Address = address!("2000000000000000000000000000000000000002");
const TOKEN: Address = address!("3000000000000000000000000000000000000003");
const FORWARDER: Address = address!("4000000000000000000000000000000000000004");

fn json_digest(payload: &TypedPayload) -> alloy::primitives::B256 {
    let typed: TypedData =
        serde_json::from_slice(&payload.to_payload_bytes()).expect("typed data json");
    typed.eip712_signing_hash().expect("json digest")
}

#[test]
fn permit_json_hashes_like_sol_struct() {
    let permit = Permit {
        owner: OWNER,
        spender: CONTRACT,
        value: U256::from(10).pow(U256::from(18)),
        nonce: U256::from(3),
        deadline: U256::MAX,
    };
    let payload = permit_typed_data("Test USD", "1", 5, TOKEN, &permit);
    assert_eq!(json_digest(&payload), payload.digest);
    assert_eq!(payload.json["primaryType"], "Permit");
}

#[test]
fn meta_transaction_json_hashes_like_sol_struct() {
    let contract = ContractConfig {
        address: CONTRACT,
        abi: serde_json::json!([]),
        domain_name: "DepositVault".to_owned(),
        domain_version: "1".to_owned(),
    };
    let message = MetaTransaction {
        nonce: U256::from(7),
        from: OWNER,
        functionSignature: Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef, 0x01]),
    };
    let payload = meta_transaction_typed_data(&contract, 80001, &message);
    assert_eq!(json_digest(&payload), payload.digest);
    assert_eq!(
        payload.json["domain"]["salt"],
        chain_salt(80001).to_string()
    );
    assert!(payload.json["domain"].get("chainId").is_none());
}

#[test]
fn forward_request_json_hashes_like_sol_struct() {
    let forwarder = ForwarderConfig {
        address: FORWARDER,
        domain_name: "Biconomy Forwarder".to_owned(),
        domain_version: "1".to_owned(),
        gas: 300_000,
    };
    let request = ForwardRequest {
        from: OWNER,
        to: CONTRACT,
        value: U256::ZERO,
        gas: U256::from(300_000),
        nonce: U256::from(11),
        data: Bytes::from_static(&[0x12, 0x34]),
    };
    let payload = forward_request_typed_data(&forwarder, 5, &request);
    assert_eq!(json_digest(&payload), payload.digest);
}

#[test]
fn chain_salt_is_left_padded_chain_id() {
    let salt = chain_salt(5);
    assert_eq!(salt[31], 5);
    assert!(salt[..31].iter().all(|b| *b == 0));
}

#[test]
fn personal_messages_hash_packed_fields() {
    let fn_sig = [0xaa, 0xbb];
    let mut packed = Vec::new();
    packed.extend_from_slice(&U256::from(7).to_be_bytes::<32>());
    packed.extend_from_slice(CONTRACT.as_slice());
    packed.extend_from_slice(&U256::from(5).to_be_bytes::<32>());
    packed.extend_from_slice(&fn_sig);
    assert_eq!(
        custom_personal_message(U256::from(7), CONTRACT, 5, &fn_sig),
        keccak256(packed)
    );

    let request = ForwardRequest {
        from: OWNER,
        to: CONTRACT,
        value: U256::ZERO,
        gas: U256::from(1),
        nonce: U256::from(2),
        data: Bytes::from_static(&[0x01]),
    };
    let a = forward_request_personal_message(&request);
    let mut changed = request.clone();
    changed.nonce = U256::from(3);
    assert_ne!(a, forward_request_personal_message(&changed));
}

#[test]
fn split_signature_normalises_recovery_id() {
    let mut raw = vec![0x11; 32];
    raw.extend(vec![0x22; 32]);
    raw.push(1);
    let sig = split_signature(&raw).expect("split");
    assert_eq!(sig.v, 28);
    assert_eq!(sig.r.0, [0x11; 32]);
    assert_eq!(sig.s.0, [0x22; 32]);

    raw[64] = 27;
    assert_eq!(split_signature(&raw).expect("split").v, 27);

    raw[64] = 5;
    assert!(split_signature(&raw).is_err());
    assert!(split_signature(&raw[..64]).is_err());
}

#[test]
fn user_operation_hash_binds_entry_point_and_chain() {
    let entry_point = address!("5FF137D4b0FDCD49DcA30c7CF57E578a026d2789");
    let op = UserOperation {
        sender: OWNER,
        nonce: U256::from(1),
        call_data: Bytes::from_static(&[0x01, 0x02]),
        signature: dummy_signature(),
        ..Default::default()
    };

    let expected = keccak256((keccak256(op.pack()), entry_point, U256::from(5)).abi_encode());
    assert_eq!(op.hash(entry_point, 5), expected);
    assert_ne!(op.hash(entry_point, 5), op.hash(entry_point, 80001));

    let mut signed = op.clone();
    signed.signature = Bytes::from(vec![0x01; 65]);
    assert_eq!(op.hash(entry_point, 5), signed.hash(entry_point, 5));

    assert_eq!(op.pack().len(), 10 * 32);
    assert_eq!(dummy_signature().len(), 65);
}

#[test]
fn init_code_prefixes_factory_address() {
    let factory = address!("6000000000000000000000000000000000000006");
    let code = init_code(factory, OWNER, 0);
    assert_eq!(&code[..20], factory.as_slice());
    assert_eq!(code.len(), 20 + 4 + 64);
}
