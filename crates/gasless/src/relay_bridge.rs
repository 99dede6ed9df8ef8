//! Bridge between the egui shell and the orchestrator.
//! Every wallet and relay call leaves the UI thread through here.

use std::sync::{Arc, Mutex};

use eframe::egui;
use eyre::WrapErr;

use gasless_adapters::{build_orchestrator, AdapterConfig, RuntimeOrchestrator};
use gasless_core::{
    ChainConfig, EventLog, FlowEvent, FlowObserver, SubmitOutcome, SubmitRequest, WalletSession,
};

/// One-shot result slot filled by a background task and taken by the UI.
pub struct Pending<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for Pending<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for Pending<T> {
    fn default() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
        }
    }
}

impl<T> Pending<T> {
    fn put(&self, value: T) {
        match self.slot.lock() {
            Ok(mut guard) => *guard = Some(value),
            Err(e) => tracing::error!("result slot lock poisoned: {e}"),
        }
    }

    pub fn take(&self) -> Option<T> {
        self.slot.lock().ok().and_then(|mut guard| guard.take())
    }
}

pub enum WalletUpdate {
    Unchanged,
    /// Accounts or chain changed; carries the fresh session.
    Changed(Option<WalletSession>),
}

/// Progress and result of one running submission.
pub struct SubmissionHandle {
    events: EventLog,
    result: Pending<Result<SubmitOutcome, String>>,
}

impl SubmissionHandle {
    fn new() -> Self {
        Self {
            events: EventLog::new(),
            result: Pending::default(),
        }
    }

    /// Queued progress plus the result once it has landed. The worker logs
    /// every event before it fills the result slot, so the slot is read
    /// first and a drain after a finished result is complete.
    pub fn poll(&self) -> (Vec<FlowEvent>, Option<Result<SubmitOutcome, String>>) {
        let result = self.result.take();
        (self.events.drain(), result)
    }
}

struct RepaintObserver {
    log: EventLog,
    ctx: egui::Context,
}

impl FlowObserver for RepaintObserver {
    fn on_event(&self, event: FlowEvent) {
        self.log.on_event(event);
        self.ctx.request_repaint();
    }
}

pub struct RelayBridge {
    orchestrator: Arc<RuntimeOrchestrator>,
    runtime: tokio::runtime::Runtime,
}

impl RelayBridge {
    pub fn new(config: &AdapterConfig) -> eyre::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("gasless-worker")
            .build()
            .wrap_err("failed to start background runtime")?;
        Ok(Self {
            orchestrator: Arc::new(build_orchestrator(config)),
            runtime,
        })
    }

    pub fn provider_mode(&self) -> &'static str {
        self.orchestrator.provider.mode_name()
    }

    pub fn session(&self) -> Option<WalletSession> {
        match self.orchestrator.session() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "wallet session unavailable");
                None
            }
        }
    }

    pub fn connect(&self, ctx: &egui::Context) -> Pending<Result<WalletSession, String>> {
        let pending = Pending::default();
        let slot = pending.clone();
        let orchestrator = Arc::clone(&self.orchestrator);
        let ctx = ctx.clone();
        self.runtime.spawn_blocking(move || {
            let result = orchestrator.connect().map_err(|e| {
                tracing::error!(error = %e, "wallet connect failed");
                e.to_string()
            });
            slot.put(result);
            ctx.request_repaint();
        });
        pending
    }

    pub fn poll_wallet(&self, ctx: &egui::Context) -> Pending<Result<WalletUpdate, String>> {
        let pending = Pending::default();
        let slot = pending.clone();
        let orchestrator = Arc::clone(&self.orchestrator);
        let ctx = ctx.clone();
        self.runtime.spawn_blocking(move || {
            let result = orchestrator
                .recover_provider_events()
                .and_then(|events| {
                    if events.is_empty() {
                        Ok(WalletUpdate::Unchanged)
                    } else {
                        orchestrator.session().map(WalletUpdate::Changed)
                    }
                })
                .map_err(|e| e.to_string());
            let changed = !matches!(result, Ok(WalletUpdate::Unchanged));
            slot.put(result);
            if changed {
                ctx.request_repaint();
            }
        });
        pending
    }

    pub fn submit(
        &self,
        ctx: &egui::Context,
        chain: ChainConfig,
        request: SubmitRequest,
    ) -> SubmissionHandle {
        let handle = SubmissionHandle::new();
        let observer = RepaintObserver {
            log: handle.events.clone(),
            ctx: ctx.clone(),
        };
        let slot = handle.result.clone();
        let orchestrator = Arc::clone(&self.orchestrator);
        let ctx = ctx.clone();
        tracing::info!(
            panel = request.panel.label(),
            chain_id = chain.chain_id,
            "submission started"
        );
        self.runtime.spawn_blocking(move || {
            let result = orchestrator
                .submit(&chain, &request, &observer)
                .map_err(|e| e.to_string());
            slot.put(result);
            ctx.request_repaint();
        });
        handle
    }
}
