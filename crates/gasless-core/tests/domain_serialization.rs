use alloy::primitives::{Address, Bytes, U256};
use gasless_core::domain::{SponsorshipData, TxReceipt};
use gasless_core::{PanelKind, RelayTransport, SignMethod, UserOperation};

#[test]
fn user_operation_serializes_with_camel_case_hex_fields() {
    let op = UserOperation {
        sender: Address::ZERO,
        nonce: U256::from(16),
        call_gas_limit: U256::from(500_000),
        ..Default::default()
    };
    let value = serde_json::to_value(&op).expect("serialize user op");
    assert_eq!(value["nonce"], "0x10");
    assert_eq!(value["callGasLimit"], "0x7a120");
    assert_eq!(value["initCode"], "0x");
    assert!(value.get("paymasterAndData").is_some());
    assert!(value.get("maxPriorityFeePerGas").is_some());
}

#[test]
fn sponsorship_accepts_missing_gas_fields() {
    let data: SponsorshipData =
        serde_json::from_str(r#"{"paymasterAndData":"0xdeadbeef","callGasLimit":"0x10"}"#)
            .expect("parse sponsorship");
    assert_eq!(data.paymaster_and_data, Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]));
    assert_eq!(data.call_gas_limit, Some(U256::from(16)));
    assert_eq!(data.verification_gas_limit, None);
}

#[test]
fn tx_receipt_roundtrip_serialization() {
    let receipt = TxReceipt {
        transaction_hash: Default::default(),
        block_number: Some(12),
        success: true,
    };
    let json = serde_json::to_string(&receipt).expect("serialize");
    assert!(json.contains("transactionHash"));
    let back: TxReceipt = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, receipt);
}

#[test]
fn panels_cover_every_combination_once() {
    assert_eq!(PanelKind::ALL.len(), 8);
    for (i, panel) in PanelKind::ALL.iter().enumerate() {
        assert_eq!(panel.index(), i);
        assert_eq!(PanelKind::from_index(i), Some(*panel));
    }
    assert_eq!(PanelKind::from_index(8), None);

    let mut combos: Vec<_> = PanelKind::ALL
        .iter()
        .map(|p| (p.client(), p.transport(), p.sign_method()))
        .collect();
    combos.sort_by_key(|c| format!("{c:?}"));
    combos.dedup();
    assert_eq!(combos.len(), 8);
}

#[test]
fn panel_labels_follow_tab_order() {
    assert_eq!(PanelKind::Web3CustomEip712.label(), "Web3 + Custom + EIP712 Sign");
    assert_eq!(
        PanelKind::EthersEip2771Personal.label(),
        "Ethers + EIP2771 + Personal Sign"
    );
    assert_eq!(
        PanelKind::Web3Eip2771Personal.transport(),
        RelayTransport::Eip2771
    );
    assert_eq!(PanelKind::EthersCustomPersonal.sign_method(), SignMethod::PersonalSign);
}

#[test]
fn sign_methods_map_to_rpc_and_relayer_names() {
    assert_eq!(SignMethod::Eip712.rpc_name(), "eth_signTypedData_v4");
    assert_eq!(SignMethod::PersonalSign.rpc_name(), "personal_sign");
    assert_eq!(SignMethod::Eip712.relayer_signature_type(), "EIP712_SIGN");
    assert_eq!(SignMethod::PersonalSign.relayer_signature_type(), "PERSONAL_SIGN");
}
