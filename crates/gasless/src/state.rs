//! Per-panel UI state and toasts

use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

use gasless_core::orchestrator::MSG_GETTING_SIGNATURE;
use gasless_core::{
    ChainConfig, ChainRegistry, FlowEvent, Notice, NoticeLevel, PanelKind, SubmissionStatus,
    SubmitOutcome, SubmitRequest, TimestampMs,
};

use crate::relay_bridge::SubmissionHandle;

pub const DEFAULT_AMOUNT: &str = "1";

/// Storage key for [`PersistedUi`].
pub const PERSIST_KEY: &str = "gasless_ui";

/// Survives restarts through eframe storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedUi {
    pub active_tab: Option<PanelKind>,
}

pub fn now_ms() -> TimestampMs {
    let ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    TimestampMs(ms)
}

/// Form state of one panel
pub struct PanelState {
    pub kind: PanelKind,
    pub amount: String,
    pub meta_tx_enabled: bool,
    /// Empty until a relay returns a hash
    pub tx_hash: Option<B256>,
    pub backdrop_open: bool,
    pub loading_message: String,
    pub chain: ChainConfig,
    pub status: SubmissionStatus,
    pub last_error: Option<String>,
    pub in_flight: Option<SubmissionHandle>,
}

impl PanelState {
    pub fn new(kind: PanelKind, chain: ChainConfig) -> Self {
        Self {
            kind,
            amount: DEFAULT_AMOUNT.to_owned(),
            meta_tx_enabled: true,
            tx_hash: None,
            backdrop_open: false,
            loading_message: String::new(),
            chain,
            status: SubmissionStatus::Idle,
            last_error: None,
            in_flight: None,
        }
    }

    pub fn can_submit(&self) -> bool {
        !self.backdrop_open && self.in_flight.is_none()
    }

    /// Re-selects the configuration for `chain_id`. Returns true when it changed.
    pub fn sync_chain(&mut self, registry: &ChainRegistry, chain_id: Option<u64>) -> bool {
        let selected = registry.select(chain_id);
        if selected.chain_id == self.chain.chain_id {
            return false;
        }
        tracing::info!(
            panel = self.kind.label(),
            from = self.chain.chain_id,
            to = selected.chain_id,
            "chain configuration reselected"
        );
        self.chain = selected.clone();
        true
    }

    /// Clears the previous result and opens the backdrop.
    pub fn begin_submit(&mut self) -> SubmitRequest {
        self.tx_hash = None;
        self.last_error = None;
        self.status = SubmissionStatus::Idle;
        self.backdrop_open = true;
        self.loading_message = MSG_GETTING_SIGNATURE.to_owned();
        SubmitRequest {
            panel: self.kind,
            amount: self.amount.clone(),
            meta_tx_enabled: self.meta_tx_enabled,
        }
    }

    pub fn apply_event(&mut self, event: &FlowEvent, toasts: &mut Toasts, now: TimestampMs) {
        match event {
            FlowEvent::Notice(notice) => {
                if notice.level == NoticeLevel::Info {
                    self.loading_message = notice.message.clone();
                }
                toasts.push(notice.clone(), now);
            }
            FlowEvent::Status(status) => self.status = *status,
            FlowEvent::SmartAccount(address) => {
                tracing::debug!(panel = self.kind.label(), %address, "smart account resolved");
            }
            FlowEvent::UserOpSubmitted(hash) => {
                self.loading_message = format!("User operation {hash} submitted");
            }
            FlowEvent::TxHashGenerated(hash) | FlowEvent::TxMined(hash) => {
                self.tx_hash = Some(*hash);
            }
        }
    }

    /// Applies queued progress and closes the submission once its result lands.
    pub fn poll_submission(&mut self, toasts: &mut Toasts, now: TimestampMs) {
        let Some(handle) = self.in_flight.take() else {
            return;
        };
        let (events, result) = handle.poll();
        for event in &events {
            self.apply_event(event, toasts, now);
        }
        match result {
            Some(result) => self.finish(result),
            None => self.in_flight = Some(handle),
        }
    }

    /// Closes the backdrop with the final result.
    pub fn finish(&mut self, result: Result<SubmitOutcome, String>) {
        self.backdrop_open = false;
        self.loading_message.clear();
        match result {
            Ok(outcome) => self.tx_hash = Some(outcome.tx_hash),
            Err(message) => self.last_error = Some(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: NoticeLevel,
    pub message: String,
    pub created: TimestampMs,
}

impl Toast {
    pub fn is_expired(&self, now: TimestampMs, lifetime_ms: u64) -> bool {
        now.0.saturating_sub(self.created.0) >= lifetime_ms
    }
}

#[derive(Debug, Clone)]
pub struct Toasts {
    items: Vec<Toast>,
    lifetime_ms: u64,
}

impl Toasts {
    pub fn new(lifetime_ms: u64) -> Self {
        Self {
            items: Vec::new(),
            lifetime_ms,
        }
    }

    pub fn push(&mut self, notice: Notice, now: TimestampMs) {
        self.items.push(Toast {
            level: notice.level,
            message: notice.message,
            created: now,
        });
    }

    pub fn prune(&mut self, now: TimestampMs) {
        let lifetime = self.lifetime_ms;
        self.items.retain(|t| !t.is_expired(now, lifetime));
    }

    pub fn visible(&self) -> &[Toast] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasless_adapters::AdapterConfig;
    use gasless_core::domain::SubmissionPath;

    fn registry() -> ChainRegistry {
        AdapterConfig::default().load_registry().expect("registry")
    }

    fn panel() -> PanelState {
        let registry = registry();
        PanelState::new(PanelKind::EthersCustomEip712, registry.default_config().clone())
    }

    #[test]
    fn new_panel_has_form_defaults() {
        let p = panel();
        assert_eq!(p.amount, "1");
        assert!(p.meta_tx_enabled);
        assert!(p.tx_hash.is_none());
        assert!(p.can_submit());
    }

    #[test]
    fn chain_switch_reselects_configuration() {
        let registry = registry();
        let mut p = panel();
        assert_eq!(p.chain.chain_id, 5);

        assert!(p.sync_chain(&registry, Some(80001)));
        assert_eq!(p.chain.chain_id, 80001);
        assert!(!p.sync_chain(&registry, Some(80001)));

        // unknown chains fall back to the default record
        assert!(p.sync_chain(&registry, Some(424242)));
        assert_eq!(p.chain.chain_id, 5);
    }

    #[test]
    fn submit_resets_hash_and_relay_result_replaces_it() {
        let mut p = panel();
        let mut toasts = Toasts::new(5_000);
        p.tx_hash = Some(B256::repeat_byte(0x01));

        let request = p.begin_submit();
        assert_eq!(request.panel, PanelKind::EthersCustomEip712);
        assert_eq!(request.amount, "1");
        assert!(p.tx_hash.is_none());
        assert!(!p.can_submit());

        let relayed = B256::repeat_byte(0xaa);
        p.apply_event(&FlowEvent::TxHashGenerated(relayed), &mut toasts, TimestampMs(1));
        assert_eq!(p.tx_hash, Some(relayed));

        p.finish(Ok(SubmitOutcome {
            panel: p.kind,
            path: SubmissionPath::Relayer,
            tx_hash: relayed,
            user_op_hash: None,
            smart_account: None,
        }));
        assert_eq!(p.tx_hash, Some(relayed));
        assert!(p.can_submit());
    }

    #[test]
    fn failure_keeps_hash_empty_and_records_error() {
        let mut p = panel();
        let mut toasts = Toasts::new(5_000);
        p.begin_submit();
        p.apply_event(
            &FlowEvent::Notice(Notice::error("Please connect wallet")),
            &mut toasts,
            TimestampMs(10),
        );
        p.finish(Err("Please connect wallet".to_owned()));

        assert!(p.tx_hash.is_none());
        assert_eq!(p.last_error.as_deref(), Some("Please connect wallet"));
        assert_eq!(toasts.visible().len(), 1);
        assert_eq!(toasts.visible()[0].level, NoticeLevel::Error);
    }

    #[test]
    fn info_notices_drive_the_loading_message() {
        let mut p = panel();
        let mut toasts = Toasts::new(5_000);
        p.begin_submit();
        p.apply_event(
            &FlowEvent::Notice(Notice::info("Sending transaction via Biconomy")),
            &mut toasts,
            TimestampMs(0),
        );
        assert_eq!(p.loading_message, "Sending transaction via Biconomy");
    }

    #[test]
    fn toasts_expire_after_lifetime() {
        let mut toasts = Toasts::new(1_000);
        toasts.push(Notice::info("first"), TimestampMs(0));
        toasts.push(Notice::success("second"), TimestampMs(600));

        toasts.prune(TimestampMs(999));
        assert_eq!(toasts.visible().len(), 2);

        toasts.prune(TimestampMs(1_000));
        assert_eq!(toasts.visible().len(), 1);
        assert_eq!(toasts.visible()[0].message, "second");

        toasts.prune(TimestampMs(1_600));
        assert!(toasts.is_empty());
    }
}
