#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use alloy::primitives::{address, b256, Address, Bytes, B256, U256};
use alloy::sol_types::{SolCall, SolValue};
use serde_json::json;

use gasless_core::chain::{
    AccountAbstractionConfig, ChainConfig, ContractConfig, ForwarderConfig, RelayerConfig,
    TokenConfig,
};
use gasless_core::contracts::{
    IDepositVault, IERC20Permit, IEntryPoint, IForwarder, ISmartAccountFactory,
};
use gasless_core::domain::{
    FeeEstimate, MetaTxRequest, PaymasterMode, ProviderEvent, SignMethod, SponsorshipData,
    TxReceipt, TxRequest, UserOperationReceipt, WalletSession,
};
use gasless_core::{
    AbiPort, BundlerPort, ClockPort, FlowSettings, Orchestrator, PaymasterPort, PortError,
    ProviderPort, RelayerPort, UserOperation,
};

pub const CHAIN_ID: u64 = 5;
pub const RELAYED_TX: B256 =
    b256!("00000000000000000000000000000000000000000000000000000000000000aa");
pub const MINED_TX: B256 =
    b256!("00000000000000000000000000000000000000000000000000000000000000bb");
pub const DIRECT_TX: B256 =
    b256!("00000000000000000000000000000000000000000000000000000000000000cc");

pub fn owner_address() -> Address {
    address!("1000000000000000000000000000000000000001")
}

pub fn smart_account() -> Address {
    address!("5000000000000000000000000000000000000005")
}

pub fn sample_chain(chain_id: u64) -> ChainConfig {
    ChainConfig {
        chain_id,
        name: format!("test-{chain_id}"),
        explorer_url: "https://explorer.test".to_owned(),
        contract: ContractConfig {
            address: address!("2000000000000000000000000000000000000002"),
            abi: json!([]),
            domain_name: "DepositVault".to_owned(),
            domain_version: "1".to_owned(),
        },
        token: TokenConfig {
            address: address!("3000000000000000000000000000000000000003"),
            decimals: 18,
            permit_version: "1".to_owned(),
        },
        forwarder: ForwarderConfig {
            address: address!("4000000000000000000000000000000000000004"),
            domain_name: "Biconomy Forwarder".to_owned(),
            domain_version: "1".to_owned(),
            gas: 300_000,
        },
        relayer: RelayerConfig {
            base_url: "http://relayer.test".to_owned(),
            api_key: "test-key".to_owned(),
            api_id: "api-id".to_owned(),
        },
        account_abstraction: AccountAbstractionConfig {
            bundler_url: "http://bundler.test".to_owned(),
            paymaster_url: "http://paymaster.test".to_owned(),
            entry_point: address!("5FF137D4b0FDCD49DcA30c7CF57E578a026d2789"),
            factory: address!("6000000000000000000000000000000000000006"),
            account_index: 0,
        },
    }
}

pub fn signature_bytes(seed: u8) -> Bytes {
    let mut v = vec![seed; 65];
    v[64] = 28;
    Bytes::from(v)
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub session: Option<WalletSession>,
    pub network_calls: u64,
    pub signed: Vec<(SignMethod, Vec<u8>)>,
    pub eth_calls: Vec<(Address, Bytes)>,
    pub sent: Vec<TxRequest>,
    pub deployed: bool,
    pub receipt_after: u64,
    pub receipt_polls: u64,
    pub reverted: bool,
}

/// Wallet double answering `eth_call` by selector.
#[derive(Debug)]
pub struct FakeProvider {
    pub state: Mutex<FakeState>,
    answers: HashMap<[u8; 4], Bytes>,
}

impl FakeProvider {
    pub fn connected(chain_id: u64) -> Self {
        let provider = Self::disconnected();
        {
            let mut state = provider.state.lock().expect("state");
            state.session = Some(WalletSession {
                account: owner_address(),
                accounts: vec![owner_address()],
                chain_id,
            });
        }
        provider
    }

    pub fn disconnected() -> Self {
        let mut answers = HashMap::new();
        answers.insert(
            IERC20Permit::nameCall::SELECTOR,
            Bytes::from(("Test USD".to_owned(),).abi_encode_params()),
        );
        answers.insert(
            IERC20Permit::noncesCall::SELECTOR,
            Bytes::from(U256::from(3).abi_encode()),
        );
        answers.insert(
            IDepositVault::getNonceCall::SELECTOR,
            Bytes::from(U256::from(7).abi_encode()),
        );
        answers.insert(
            IForwarder::getNonceCall::SELECTOR,
            Bytes::from(U256::from(11).abi_encode()),
        );
        answers.insert(
            IEntryPoint::getNonceCall::SELECTOR,
            Bytes::from(U256::from(0).abi_encode()),
        );
        answers.insert(
            ISmartAccountFactory::getAddressForCounterFactualAccountCall::SELECTOR,
            Bytes::from(smart_account().abi_encode()),
        );
        Self {
            state: Mutex::new(FakeState::default()),
            answers,
        }
    }

    pub fn network_calls(&self) -> u64 {
        self.state.lock().expect("state").network_calls
    }

    fn touch(&self) {
        self.state.lock().expect("state").network_calls += 1;
    }
}

impl ProviderPort for FakeProvider {
    fn request_accounts(&self) -> Result<Vec<Address>, PortError> {
        self.touch();
        let mut state = self.state.lock().expect("state");
        let session = state.session.get_or_insert_with(|| WalletSession {
            account: owner_address(),
            accounts: vec![owner_address()],
            chain_id: CHAIN_ID,
        });
        Ok(session.accounts.clone())
    }

    fn chain_id(&self) -> Result<u64, PortError> {
        self.touch();
        let state = self.state.lock().expect("state");
        Ok(state.session.as_ref().map(|s| s.chain_id).unwrap_or(CHAIN_ID))
    }

    fn session(&self) -> Result<Option<WalletSession>, PortError> {
        Ok(self.state.lock().expect("state").session.clone())
    }

    fn refresh(&self) -> Result<(), PortError> {
        self.touch();
        Ok(())
    }

    fn sign_payload(
        &self,
        method: SignMethod,
        payload: &[u8],
        _expected_signer: Address,
    ) -> Result<Bytes, PortError> {
        self.touch();
        let mut state = self.state.lock().expect("state");
        state.signed.push((method, payload.to_vec()));
        Ok(signature_bytes(state.signed.len() as u8))
    }

    fn call(&self, to: Address, data: &Bytes) -> Result<Bytes, PortError> {
        self.touch();
        self.state
            .lock()
            .expect("state")
            .eth_calls
            .push((to, data.clone()));
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| PortError::Validation("short calldata".to_owned()))?;
        self.answers
            .get(&selector)
            .cloned()
            .ok_or(PortError::NotImplemented("eth_call"))
    }

    fn get_code(&self, _address: Address) -> Result<Bytes, PortError> {
        self.touch();
        let deployed = self.state.lock().expect("state").deployed;
        Ok(if deployed {
            Bytes::from_static(&[0x60, 0x80])
        } else {
            Bytes::new()
        })
    }

    fn fee_estimate(&self) -> Result<FeeEstimate, PortError> {
        self.touch();
        Ok(FeeEstimate {
            max_fee_per_gas: U256::from(2_000_000_000u64),
            max_priority_fee_per_gas: U256::from(1_000_000_000u64),
        })
    }

    fn send_transaction(&self, tx: &TxRequest) -> Result<B256, PortError> {
        self.touch();
        self.state.lock().expect("state").sent.push(tx.clone());
        Ok(DIRECT_TX)
    }

    fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<TxReceipt>, PortError> {
        self.touch();
        let mut state = self.state.lock().expect("state");
        state.receipt_polls += 1;
        if state.receipt_polls <= state.receipt_after {
            return Ok(None);
        }
        Ok(Some(TxReceipt {
            transaction_hash: tx_hash,
            block_number: Some(100),
            success: !state.reverted,
        }))
    }

    fn drain_events(&self) -> Result<Vec<ProviderEvent>, PortError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Default)]
pub struct FakeRelayer {
    pub requests: Mutex<Vec<MetaTxRequest>>,
}

impl RelayerPort for FakeRelayer {
    fn send_meta_transaction(&self, request: &MetaTxRequest) -> Result<B256, PortError> {
        self.requests.lock().expect("requests").push(request.clone());
        Ok(RELAYED_TX)
    }
}

#[derive(Debug, Default)]
pub struct FakeBundler {
    pub ops: Mutex<Vec<UserOperation>>,
}

impl BundlerPort for FakeBundler {
    fn send_user_operation(
        &self,
        _endpoint: &str,
        op: &UserOperation,
        entry_point: Address,
    ) -> Result<B256, PortError> {
        self.ops.lock().expect("ops").push(op.clone());
        Ok(op.hash(entry_point, CHAIN_ID))
    }

    fn user_operation_receipt(
        &self,
        _endpoint: &str,
        user_op_hash: B256,
    ) -> Result<Option<UserOperationReceipt>, PortError> {
        Ok(Some(UserOperationReceipt {
            user_op_hash,
            success: true,
            transaction_hash: MINED_TX,
        }))
    }
}

#[derive(Debug, Default)]
pub struct FakePaymaster {
    pub calls: AtomicU64,
}

impl PaymasterPort for FakePaymaster {
    fn sponsor_user_operation(
        &self,
        _endpoint: &str,
        _op: &UserOperation,
        mode: PaymasterMode,
    ) -> Result<SponsorshipData, PortError> {
        assert_eq!(mode, PaymasterMode::Sponsored);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SponsorshipData {
            paymaster_and_data: Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]),
            call_gas_limit: Some(U256::from(123_456)),
            verification_gas_limit: None,
            pre_verification_gas: None,
        })
    }
}

/// Records JSON-ABI encodes and answers with the bare selector.
#[derive(Debug, Default)]
pub struct RecordingAbi {
    pub calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl AbiPort for RecordingAbi {
    fn encode_calldata(
        &self,
        _abi_json: &str,
        method_signature: &str,
        args: &[String],
    ) -> Result<(Bytes, [u8; 4]), PortError> {
        self.calls
            .lock()
            .expect("calls")
            .push((method_signature.to_owned(), args.to_vec()));
        let selector = self.selector_from_method_signature(method_signature)?;
        Ok((Bytes::from(selector.to_vec()), selector))
    }

    fn selector_from_method_signature(&self, method_signature: &str) -> Result<[u8; 4], PortError> {
        match method_signature {
            "depositWithPermit" => Ok(IDepositVault::depositWithPermitCall::SELECTOR),
            "executeMetaTransaction" => Ok(IDepositVault::executeMetaTransactionCall::SELECTOR),
            other => Err(PortError::NotFound(other.to_owned())),
        }
    }
}

#[derive(Debug, Default)]
pub struct TestClock {
    now: AtomicU64,
    pub sleeps: AtomicU64,
}

impl ClockPort for TestClock {
    fn now_ms(&self) -> Result<u64, PortError> {
        Ok(self.now.fetch_add(1, Ordering::SeqCst) + 1_739_750_400_000)
    }

    fn sleep_ms(&self, _ms: u64) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
    }
}

pub type TestOrchestrator =
    Orchestrator<FakeProvider, FakeRelayer, FakeBundler, FakePaymaster, RecordingAbi, TestClock>;

pub fn new_orchestrator(provider: FakeProvider) -> TestOrchestrator {
    Orchestrator::new(
        provider,
        FakeRelayer::default(),
        FakeBundler::default(),
        FakePaymaster::default(),
        RecordingAbi::default(),
        TestClock::default(),
        FlowSettings {
            receipt_poll_attempts: 5,
            receipt_poll_interval_ms: 10,
            permit_ttl_secs: None,
        },
    )
}
