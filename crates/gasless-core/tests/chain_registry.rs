mod common;

use common::sample_chain;
use gasless_core::chain::parse_chain_id;
use gasless_core::ChainRegistry;

fn registry() -> ChainRegistry {
    ChainRegistry::new(5, vec![sample_chain(5), sample_chain(80001)]).expect("registry")
}

#[test]
fn select_matches_connected_chain() {
    let registry = registry();
    assert_eq!(registry.select(Some(80001)).chain_id, 80001);
    assert_eq!(registry.select(Some(5)).chain_id, 5);
}

#[test]
fn switching_chain_reselects_configuration() {
    let registry = registry();
    let before = registry.select(Some(5));
    let after = registry.select(Some(80001));
    assert_ne!(before.chain_id, after.chain_id);
    assert_eq!(after.name, "test-80001");
}

#[test]
fn unknown_or_empty_chain_falls_back_to_default() {
    let registry = registry();
    assert_eq!(registry.select(None).chain_id, 5);
    assert_eq!(registry.select(Some(1)).chain_id, 5);
    assert_eq!(registry.select_str("").chain_id, 5);
    assert_eq!(registry.select_str("0x13881").chain_id, 80001);
    assert_eq!(registry.select_str("not-a-chain").chain_id, 5);
}

#[test]
fn duplicate_or_missing_default_is_rejected() {
    let err = ChainRegistry::new(5, vec![sample_chain(5), sample_chain(5)]).expect_err("duplicate");
    assert!(err.to_string().contains("duplicate chain config"));
    let err = ChainRegistry::new(1, vec![sample_chain(5)]).expect_err("missing default");
    assert!(err.to_string().contains("default chain 1"));
}

#[test]
fn registry_loads_from_json() {
    let raw = serde_json::json!({
        "defaultChainId": 5,
        "chains": [sample_chain(5)],
    })
    .to_string();
    let registry = ChainRegistry::from_json(&raw).expect("parse registry");
    assert_eq!(registry.len(), 1);
    assert!(registry.contains(5));
    assert_eq!(registry.default_config(), &sample_chain(5));
}

#[test]
fn endpoint_templates_and_api_key_are_filled() {
    let mut chain = sample_chain(5);
    chain.relayer.api_key.clear();
    chain.account_abstraction.bundler_url = "https://bundler.test/{chainId}/{apiKey}".to_owned();
    chain.account_abstraction.paymaster_url = "https://pm.test/{chainId}/{apiKey}".to_owned();
    let mut registry = ChainRegistry::new(5, vec![chain]).expect("registry");

    registry.fill_relayer_api_key("relayer-key");
    registry.expand_endpoint_templates("bundler-key", "pm-key");

    let cfg = registry.select(Some(5));
    assert_eq!(cfg.relayer.api_key, "relayer-key");
    assert_eq!(cfg.account_abstraction.bundler_url, "https://bundler.test/5/bundler-key");
    assert_eq!(cfg.account_abstraction.paymaster_url, "https://pm.test/5/pm-key");
}

#[test]
fn chain_ids_parse_in_decimal_and_hex() {
    assert_eq!(parse_chain_id("137").expect("decimal"), 137);
    assert_eq!(parse_chain_id("0x89").expect("hex"), 137);
    assert!(parse_chain_id("").is_err());
}

#[test]
fn explorer_links_are_built_from_base_url() {
    let chain = sample_chain(5);
    let url = chain.tx_url(common::RELAYED_TX);
    assert!(url.starts_with("https://explorer.test/tx/0x"));
    assert!(chain.address_url(common::owner_address()).contains("/address/0x"));
}
