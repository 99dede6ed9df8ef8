use std::sync::{Arc, Mutex, MutexGuard};

use alloy::primitives::utils::parse_units;
use alloy::primitives::{aliases::U192, Address, Bytes, B256, U256};
use alloy::sol_types::SolCall;
use thiserror::Error;

use crate::chain::ChainConfig;
use crate::contracts::{
    ForwardRequest, IDepositVault, IERC20Permit, IEntryPoint, IForwarder, ISmartAccountFactory,
    MetaTransaction, Permit,
};
use crate::domain::{
    ClientLibrary, FlowEvent, MetaTxRequest, Notice, PaymasterMode, PermitSignature,
    ProviderEvent, RelayTransport, SignMethod, SplitSignature, SubmissionPath, SubmitOutcome,
    SubmitRequest, TxReceipt, TxRequest, UserOperationReceipt, WalletSession,
};
use crate::ports::{
    AbiPort, BundlerPort, ClockPort, FlowObserver, PaymasterPort, PortError, ProviderPort,
    RelayerPort,
};
use crate::state_machine::{
    submission_transition, SubmissionAction, SubmissionStatus, TransitionError,
};
use crate::typed_data::{
    custom_personal_message, forward_request_personal_message, forward_request_typed_data,
    meta_transaction_typed_data, permit_typed_data, split_signature,
};
use crate::user_op::{
    dummy_signature, init_code, smart_account_call, UserOperation, DEFAULT_CALL_GAS_LIMIT,
    DEFAULT_PRE_VERIFICATION_GAS, DEFAULT_VERIFICATION_GAS_LIMIT,
};

pub const MSG_GETTING_SIGNATURE: &str = "Getting user signature";
pub const MSG_SENDING_VIA_RELAYER: &str = "Sending transaction via Biconomy";
pub const MSG_CONFIRMED: &str = "Transaction confirmed";

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Please connect wallet")]
    WalletNotConnected,
    #[error("Please enter the quote")]
    MissingAmount,
    #[error("wallet is on chain {actual}, configuration is for chain {expected}")]
    ChainMismatch { expected: u64, actual: u64 },
    #[error("transaction reverted: {0}")]
    Reverted(B256),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Port(#[from] PortError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSettings {
    pub receipt_poll_attempts: u32,
    pub receipt_poll_interval_ms: u64,
    /// `None` signs permits with an unbounded deadline.
    pub permit_ttl_secs: Option<u64>,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            receipt_poll_attempts: 60,
            receipt_poll_interval_ms: 2_000,
            permit_ttl_secs: None,
        }
    }
}

pub struct Orchestrator<P, R, B, M, A, C>
where
    P: ProviderPort,
    R: RelayerPort,
    B: BundlerPort,
    M: PaymasterPort,
    A: AbiPort,
    C: ClockPort,
{
    pub provider: P,
    pub relayer: R,
    pub bundler: B,
    pub paymaster: M,
    pub abi: A,
    pub clock: C,
    pub settings: FlowSettings,
}

struct Run<'a> {
    chain: &'a ChainConfig,
    request: &'a SubmitRequest,
    observer: &'a dyn FlowObserver,
    status: SubmissionStatus,
}

impl Run<'_> {
    fn advance(&mut self, action: SubmissionAction) -> Result<(), TransitionError> {
        let (next, reason) = submission_transition(self.status, action)?;
        tracing::debug!(
            panel = self.request.panel.label(),
            from = ?self.status,
            to = ?next,
            reason,
            "submission transition"
        );
        self.status = next;
        self.observer.on_event(FlowEvent::Status(next));
        Ok(())
    }

    fn notice(&self, notice: Notice) {
        self.observer.on_event(FlowEvent::Notice(notice));
    }
}

impl<P, R, B, M, A, C> Orchestrator<P, R, B, M, A, C>
where
    P: ProviderPort,
    R: RelayerPort,
    B: BundlerPort,
    M: PaymasterPort,
    A: AbiPort,
    C: ClockPort,
{
    pub fn new(
        provider: P,
        relayer: R,
        bundler: B,
        paymaster: M,
        abi: A,
        clock: C,
        settings: FlowSettings,
    ) -> Self {
        Self {
            provider,
            relayer,
            bundler,
            paymaster,
            abi,
            clock,
            settings,
        }
    }

    pub fn connect(&self) -> Result<WalletSession, PortError> {
        let accounts = self.provider.request_accounts()?;
        let chain_id = self.provider.chain_id()?;
        let account = accounts
            .first()
            .copied()
            .ok_or_else(|| PortError::Policy("NO_CONNECTED_ACCOUNT".to_owned()))?;
        tracing::info!(%account, chain_id, "wallet connected");
        Ok(WalletSession {
            account,
            accounts,
            chain_id,
        })
    }

    pub fn session(&self) -> Result<Option<WalletSession>, PortError> {
        self.provider.session()
    }

    /// Re-reads the wallet and drains `accountsChanged` / `chainChanged`
    /// events queued since the last call.
    pub fn recover_provider_events(&self) -> Result<Vec<ProviderEvent>, PortError> {
        if self.provider.session()?.is_none() {
            return Ok(Vec::new());
        }
        self.provider.refresh()?;
        let events = self.provider.drain_events()?;
        for event in &events {
            tracing::info!(
                kind = ?event.kind,
                value = %event.value,
                seq = event.sequence,
                "provider event"
            );
        }
        Ok(events)
    }

    pub fn submit(
        &self,
        chain: &ChainConfig,
        request: &SubmitRequest,
        observer: &dyn FlowObserver,
    ) -> Result<SubmitOutcome, SubmitError> {
        let mut run = Run {
            chain,
            request,
            observer,
            status: SubmissionStatus::Idle,
        };
        run.advance(SubmissionAction::Start)?;

        match self.run(&mut run) {
            Ok(outcome) => {
                run.advance(SubmissionAction::Confirmed)?;
                run.notice(Notice::success(MSG_CONFIRMED));
                tracing::info!(
                    panel = request.panel.label(),
                    tx_hash = %outcome.tx_hash,
                    path = ?outcome.path,
                    "submission confirmed"
                );
                Ok(outcome)
            }
            Err(err) => {
                tracing::error!(panel = request.panel.label(), error = %err, "submission failed");
                if run.advance(SubmissionAction::Fail).is_err() {
                    tracing::warn!(status = ?run.status, "failure reported from terminal state");
                }
                run.notice(Notice::error(err.to_string()));
                Err(err)
            }
        }
    }

    fn run(&self, run: &mut Run<'_>) -> Result<SubmitOutcome, SubmitError> {
        let session = self
            .provider
            .session()?
            .ok_or(SubmitError::WalletNotConnected)?;
        let amount = parse_amount(&run.request.amount, run.chain.token.decimals)?;
        if session.chain_id != run.chain.chain_id {
            return Err(SubmitError::ChainMismatch {
                expected: run.chain.chain_id,
                actual: session.chain_id,
            });
        }
        run.advance(SubmissionAction::Validated)?;

        if !run.request.meta_tx_enabled {
            return self.send_direct(run, session.account, amount);
        }

        run.notice(Notice::info(MSG_GETTING_SIGNATURE));
        let permit = self.sign_permit(run.chain, session.account, amount)?;
        let deposit = self.deposit_calldata(run.request.panel.client(), run.chain, &permit)?;

        match run.request.panel.transport() {
            RelayTransport::Custom => self.relay_custom(run, session.account, deposit),
            RelayTransport::Eip2771 => self.relay_eip2771(run, session.account, deposit),
        }
    }

    fn send_direct(
        &self,
        run: &mut Run<'_>,
        account: Address,
        amount: U256,
    ) -> Result<SubmitOutcome, SubmitError> {
        tracing::info!("Sending normal transaction");
        let permit = self.sign_permit(run.chain, account, amount)?;
        let data = self.deposit_calldata(run.request.panel.client(), run.chain, &permit)?;
        run.advance(SubmissionAction::Signed)?;

        let tx_hash = self.provider.send_transaction(&TxRequest {
            from: account,
            to: run.chain.contract.address,
            value: U256::ZERO,
            data,
        })?;
        run.observer.on_event(FlowEvent::TxHashGenerated(tx_hash));
        run.advance(SubmissionAction::Submitted)?;

        let receipt = self.wait_for_receipt(tx_hash)?;
        run.observer
            .on_event(FlowEvent::TxMined(receipt.transaction_hash));
        Ok(SubmitOutcome {
            panel: run.request.panel,
            path: SubmissionPath::Direct,
            tx_hash: receipt.transaction_hash,
            user_op_hash: None,
            smart_account: None,
        })
    }

    /// Signs an ERC-2612 permit letting the deposit contract pull `amount`.
    pub fn sign_permit(
        &self,
        chain: &ChainConfig,
        owner: Address,
        amount: U256,
    ) -> Result<PermitSignature, PortError> {
        let token = chain.token.address;
        let spender = chain.contract.address;
        let name = self.read(token, IERC20Permit::nameCall {})?._0;
        let nonce = self.read(token, IERC20Permit::noncesCall { owner })?._0;
        let deadline = match self.settings.permit_ttl_secs {
            Some(ttl) => U256::from((self.clock.now_ms()? / 1_000).saturating_add(ttl)),
            None => U256::MAX,
        };

        let permit = Permit {
            owner,
            spender,
            value: amount,
            nonce,
            deadline,
        };
        let typed = permit_typed_data(
            &name,
            &chain.token.permit_version,
            chain.chain_id,
            token,
            &permit,
        );
        let raw = self.provider.sign_payload(
            SignMethod::Eip712,
            &typed.to_payload_bytes(),
            owner,
        )?;
        let SplitSignature { v, r, s } = split_signature(&raw)?;
        tracing::debug!(%token, %owner, %nonce, "permit signed");
        Ok(PermitSignature {
            owner,
            spender,
            value: amount,
            nonce,
            deadline,
            v,
            r,
            s,
        })
    }

    /// `depositWithPermit` calldata in the panel's encoding style.
    pub fn deposit_calldata(
        &self,
        client: ClientLibrary,
        chain: &ChainConfig,
        permit: &PermitSignature,
    ) -> Result<Bytes, PortError> {
        match client {
            ClientLibrary::Ethers => Ok(Bytes::from(
                IDepositVault::depositWithPermitCall {
                    amount: permit.value,
                    receiver: permit.owner,
                    deadline: permit.deadline,
                    v: permit.v,
                    r: permit.r,
                    s: permit.s,
                }
                .abi_encode(),
            )),
            ClientLibrary::Web3 => {
                let args = vec![
                    permit.value.to_string(),
                    permit.owner.to_string(),
                    permit.deadline.to_string(),
                    permit.v.to_string(),
                    permit.r.to_string(),
                    permit.s.to_string(),
                ];
                self.encode_with_abi(chain, "depositWithPermit", &args)
            }
        }
    }

    fn execute_meta_transaction_calldata(
        &self,
        client: ClientLibrary,
        chain: &ChainConfig,
        user: Address,
        function_signature: &Bytes,
        sig: &SplitSignature,
    ) -> Result<Bytes, PortError> {
        match client {
            ClientLibrary::Ethers => Ok(Bytes::from(
                IDepositVault::executeMetaTransactionCall {
                    userAddress: user,
                    functionSignature: function_signature.clone(),
                    sigR: sig.r,
                    sigS: sig.s,
                    sigV: sig.v,
                }
                .abi_encode(),
            )),
            ClientLibrary::Web3 => {
                let args = vec![
                    user.to_string(),
                    function_signature.to_string(),
                    sig.r.to_string(),
                    sig.s.to_string(),
                    sig.v.to_string(),
                ];
                self.encode_with_abi(chain, "executeMetaTransaction", &args)
            }
        }
    }

    fn encode_with_abi(
        &self,
        chain: &ChainConfig,
        method: &str,
        args: &[String],
    ) -> Result<Bytes, PortError> {
        let abi_json = chain.contract.abi.to_string();
        let (data, _selector) = self.abi.encode_calldata(&abi_json, method, args)?;
        Ok(data)
    }

    fn relay_custom(
        &self,
        run: &mut Run<'_>,
        user: Address,
        deposit: Bytes,
    ) -> Result<SubmitOutcome, SubmitError> {
        let chain = run.chain;
        let contract = chain.contract.address;
        let method = run.request.panel.sign_method();
        let nonce = self
            .read(contract, IDepositVault::getNonceCall { user })?
            ._0;

        let raw = match method {
            SignMethod::Eip712 => {
                let message = MetaTransaction {
                    nonce,
                    from: user,
                    functionSignature: deposit.clone(),
                };
                let typed = meta_transaction_typed_data(&chain.contract, chain.chain_id, &message);
                self.provider
                    .sign_payload(method, &typed.to_payload_bytes(), user)?
            }
            SignMethod::PersonalSign => {
                let digest = custom_personal_message(nonce, contract, chain.chain_id, &deposit);
                self.provider.sign_payload(method, digest.as_slice(), user)?
            }
        };
        let sig = split_signature(&raw)?;
        run.advance(SubmissionAction::Signed)?;

        run.notice(Notice::info(MSG_SENDING_VIA_RELAYER));
        let data = self.execute_meta_transaction_calldata(
            run.request.panel.client(),
            chain,
            user,
            &deposit,
            &sig,
        )?;
        tracing::debug!(calldata = %data, "executeMetaTransaction encoded");
        let request = MetaTxRequest {
            base_url: chain.relayer.base_url.clone(),
            api_key: chain.relayer.api_key.clone(),
            api_id: chain.relayer.api_id.clone(),
            from: user,
            to: contract,
            params: vec![
                serde_json::Value::String(user.to_string()),
                serde_json::Value::String(deposit.to_string()),
                serde_json::Value::String(sig.r.to_string()),
                serde_json::Value::String(sig.s.to_string()),
                serde_json::Value::from(sig.v),
            ],
            signature_type: method,
            data,
        };
        let tx_hash = self.relayer.send_meta_transaction(&request)?;
        tracing::info!(%tx_hash, "txHashGenerated");
        run.observer.on_event(FlowEvent::TxHashGenerated(tx_hash));
        run.advance(SubmissionAction::Submitted)?;

        let receipt = self.wait_for_receipt(tx_hash)?;
        tracing::info!(tx_hash = %receipt.transaction_hash, block = ?receipt.block_number, "txMined");
        run.observer
            .on_event(FlowEvent::TxMined(receipt.transaction_hash));
        Ok(SubmitOutcome {
            panel: run.request.panel,
            path: SubmissionPath::Relayer,
            tx_hash: receipt.transaction_hash,
            user_op_hash: None,
            smart_account: None,
        })
    }

    fn relay_eip2771(
        &self,
        run: &mut Run<'_>,
        owner: Address,
        deposit: Bytes,
    ) -> Result<SubmitOutcome, SubmitError> {
        let chain = run.chain;
        let aa = &chain.account_abstraction;
        let method = run.request.panel.sign_method();

        let sender = self.smart_account_address(chain, owner)?;
        tracing::info!(%sender, "Smart account address");
        run.observer.on_event(FlowEvent::SmartAccount(sender));

        let forwarder = chain.forwarder.address;
        let forward_nonce = self
            .read(forwarder, IForwarder::getNonceCall { from: owner })?
            ._0;
        let forward = ForwardRequest {
            from: owner,
            to: chain.contract.address,
            value: U256::ZERO,
            gas: U256::from(chain.forwarder.gas),
            nonce: forward_nonce,
            data: deposit,
        };
        let forward_call = match method {
            SignMethod::Eip712 => {
                let typed = forward_request_typed_data(&chain.forwarder, chain.chain_id, &forward);
                let signature =
                    self.provider
                        .sign_payload(method, &typed.to_payload_bytes(), owner)?;
                IForwarder::executeCall {
                    req: forward,
                    signature,
                }
                .abi_encode()
            }
            SignMethod::PersonalSign => {
                let digest = forward_request_personal_message(&forward);
                let signature = self
                    .provider
                    .sign_payload(method, digest.as_slice(), owner)?;
                IForwarder::executePersonalSignCall {
                    req: forward,
                    signature,
                }
                .abi_encode()
            }
        };

        run.notice(Notice::info(MSG_SENDING_VIA_RELAYER));
        let mut op = self.build_user_op(chain, owner, sender, forward_call.into())?;
        let sponsorship =
            self.paymaster
                .sponsor_user_operation(&aa.paymaster_url, &op, PaymasterMode::Sponsored)?;
        op.apply_sponsorship(&sponsorship);

        let op_hash = op.hash(aa.entry_point, chain.chain_id);
        op.signature = self
            .provider
            .sign_payload(SignMethod::PersonalSign, op_hash.as_slice(), owner)?;
        run.advance(SubmissionAction::Signed)?;

        let submitted = self
            .bundler
            .send_user_operation(&aa.bundler_url, &op, aa.entry_point)?;
        if submitted != op_hash {
            tracing::debug!(local = %op_hash, bundler = %submitted, "bundler returned a different userOpHash");
        }
        tracing::info!(user_op_hash = %submitted, "userOpHash");
        run.observer.on_event(FlowEvent::UserOpSubmitted(submitted));
        run.advance(SubmissionAction::Submitted)?;

        let receipt = self.wait_for_user_op(&aa.bundler_url, submitted)?;
        if !receipt.success {
            return Err(SubmitError::Reverted(receipt.transaction_hash));
        }
        tracing::info!(tx_hash = %receipt.transaction_hash, "txHash");
        run.observer
            .on_event(FlowEvent::TxMined(receipt.transaction_hash));
        Ok(SubmitOutcome {
            panel: run.request.panel,
            path: SubmissionPath::Bundler,
            tx_hash: receipt.transaction_hash,
            user_op_hash: Some(submitted),
            smart_account: Some(sender),
        })
    }

    pub fn smart_account_address(
        &self,
        chain: &ChainConfig,
        owner: Address,
    ) -> Result<Address, PortError> {
        let aa = &chain.account_abstraction;
        Ok(self
            .read(
                aa.factory,
                ISmartAccountFactory::getAddressForCounterFactualAccountCall {
                    owner,
                    index: U256::from(aa.account_index),
                },
            )?
            ._0)
    }

    fn build_user_op(
        &self,
        chain: &ChainConfig,
        owner: Address,
        sender: Address,
        forward_call: Bytes,
    ) -> Result<UserOperation, PortError> {
        let aa = &chain.account_abstraction;
        let deployed = !self.provider.get_code(sender)?.is_empty();
        let init = if deployed {
            Bytes::new()
        } else {
            init_code(aa.factory, owner, aa.account_index)
        };
        let nonce = self
            .read(
                aa.entry_point,
                IEntryPoint::getNonceCall {
                    sender,
                    key: U192::ZERO,
                },
            )?
            ._0;
        let fees = self.provider.fee_estimate()?;

        Ok(UserOperation {
            sender,
            nonce,
            init_code: init,
            call_data: smart_account_call(chain.forwarder.address, U256::ZERO, forward_call),
            call_gas_limit: U256::from(DEFAULT_CALL_GAS_LIMIT),
            verification_gas_limit: U256::from(DEFAULT_VERIFICATION_GAS_LIMIT),
            pre_verification_gas: U256::from(DEFAULT_PRE_VERIFICATION_GAS),
            max_fee_per_gas: fees.max_fee_per_gas,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            paymaster_and_data: Bytes::new(),
            signature: dummy_signature(),
        })
    }

    fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt, SubmitError> {
        for attempt in 0..self.settings.receipt_poll_attempts {
            if let Some(receipt) = self.provider.transaction_receipt(tx_hash)? {
                if !receipt.success {
                    return Err(SubmitError::Reverted(receipt.transaction_hash));
                }
                return Ok(receipt);
            }
            tracing::debug!(%tx_hash, attempt, "receipt pending");
            self.clock.sleep_ms(self.settings.receipt_poll_interval_ms);
        }
        Err(PortError::NotFound(format!(
            "receipt for {tx_hash} after {} attempts",
            self.settings.receipt_poll_attempts
        ))
        .into())
    }

    fn wait_for_user_op(
        &self,
        endpoint: &str,
        user_op_hash: B256,
    ) -> Result<UserOperationReceipt, PortError> {
        for attempt in 0..self.settings.receipt_poll_attempts {
            if let Some(receipt) = self.bundler.user_operation_receipt(endpoint, user_op_hash)? {
                return Ok(receipt);
            }
            tracing::debug!(%user_op_hash, attempt, "user operation pending");
            self.clock.sleep_ms(self.settings.receipt_poll_interval_ms);
        }
        Err(PortError::NotFound(format!(
            "user operation receipt for {user_op_hash} after {} attempts",
            self.settings.receipt_poll_attempts
        )))
    }

    fn read<T: SolCall>(&self, to: Address, call: T) -> Result<T::Return, PortError> {
        let data = Bytes::from(call.abi_encode());
        let raw = self.provider.call(to, &data)?;
        T::abi_decode_returns(&raw, true)
            .map_err(|e| PortError::Validation(format!("{} decode failed: {e}", T::SIGNATURE)))
    }
}

/// Parses a token amount in display units. Empty, zero, negative or
/// malformed input is rejected the same way.
pub fn parse_amount(raw: &str, decimals: u8) -> Result<U256, SubmitError> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('-') {
        return Err(SubmitError::MissingAmount);
    }
    let amount = parse_units(raw, decimals)
        .map_err(|_| SubmitError::MissingAmount)?
        .get_absolute();
    if amount.is_zero() {
        return Err(SubmitError::MissingAmount);
    }
    Ok(amount)
}

/// Observer that records every event for later inspection or UI replay.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<FlowEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A worker that panicked mid-push leaves the log poisoned; the events
    /// recorded so far are still returned.
    fn events(&self) -> MutexGuard<'_, Vec<FlowEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| {
            tracing::error!("event log mutex poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn drain(&self) -> Vec<FlowEvent> {
        std::mem::take(&mut *self.events())
    }

    pub fn snapshot(&self) -> Vec<FlowEvent> {
        self.events().clone()
    }
}

impl FlowObserver for EventLog {
    fn on_event(&self, event: FlowEvent) {
        self.events().push(event);
    }
}
