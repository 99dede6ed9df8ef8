//! Main application state and update loop

use std::time::{Duration, Instant};

use eframe::egui;

use gasless_adapters::AdapterConfig;
use gasless_core::{ChainRegistry, Notice, PanelKind, WalletSession};

use crate::body::Body;
use crate::panel::{self, PanelAction};
use crate::relay_bridge::{Pending, RelayBridge, WalletUpdate};
use crate::state::{now_ms, PersistedUi, Toasts, PERSIST_KEY};
use crate::ui;

const WALLET_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct App {
    bridge: RelayBridge,
    registry: ChainRegistry,
    session: Option<WalletSession>,
    body: Body,
    toasts: Toasts,
    connecting: Option<Pending<Result<WalletSession, String>>>,
    wallet_poll: Option<Pending<Result<WalletUpdate, String>>>,
    last_wallet_poll: Instant,
}

impl App {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: &AdapterConfig,
        registry: ChainRegistry,
        bridge: RelayBridge,
    ) -> Self {
        let mut body = Body::new(registry.default_config());
        let persisted: PersistedUi = cc
            .storage
            .and_then(|s| eframe::get_value(s, PERSIST_KEY))
            .unwrap_or_default();
        if let Some(tab) = persisted.active_tab {
            body.select(tab);
        }

        tracing::info!(
            wallet = bridge.provider_mode(),
            chains = registry.len(),
            default_chain = registry.default_config().chain_id,
            "app initialised"
        );

        Self {
            session: bridge.session(),
            bridge,
            registry,
            body,
            toasts: Toasts::new(config.toast_lifetime_ms),
            connecting: None,
            wallet_poll: None,
            last_wallet_poll: Instant::now(),
        }
    }

    fn connect(&mut self, ctx: &egui::Context) {
        if self.connecting.is_none() {
            self.connecting = Some(self.bridge.connect(ctx));
        }
    }

    fn apply_session(&mut self, session: Option<WalletSession>) {
        let chain_id = session.as_ref().map(|s| s.chain_id);
        self.session = session;
        if self.body.sync_chain(&self.registry, chain_id) {
            let name = self.registry.select(chain_id).name.clone();
            self.toasts
                .push(Notice::info(format!("Switched to {name}")), now_ms());
        }
    }

    fn check_connect_result(&mut self) {
        let Some(result) = self.connecting.as_ref().and_then(|p| p.take()) else {
            return;
        };
        self.connecting = None;
        match result {
            Ok(session) => {
                if !self.registry.contains(session.chain_id) {
                    self.toasts.push(
                        Notice::error(format!(
                            "Chain {} is not configured, using {}",
                            session.chain_id,
                            self.registry.default_config().name
                        )),
                        now_ms(),
                    );
                }
                self.apply_session(Some(session));
            }
            Err(message) => self.toasts.push(Notice::error(message), now_ms()),
        }
    }

    fn check_wallet_events(&mut self, ctx: &egui::Context) {
        if let Some(result) = self.wallet_poll.as_ref().and_then(|p| p.take()) {
            self.wallet_poll = None;
            match result {
                Ok(WalletUpdate::Changed(session)) => self.apply_session(session),
                Ok(WalletUpdate::Unchanged) => {}
                Err(e) => tracing::warn!(error = %e, "wallet event recovery failed"),
            }
        }

        let due = self.last_wallet_poll.elapsed() >= WALLET_POLL_INTERVAL;
        if self.session.is_some() && self.wallet_poll.is_none() && due {
            self.last_wallet_poll = Instant::now();
            self.wallet_poll = Some(self.bridge.poll_wallet(ctx));
        }
    }

    fn check_submissions(&mut self) {
        let now = now_ms();
        for panel in self.body.panels_mut() {
            panel.poll_submission(&mut self.toasts, now);
        }
    }

    fn submit(&mut self, kind: PanelKind, ctx: &egui::Context) {
        let panel = self.body.panel_mut(kind);
        if !panel.can_submit() {
            return;
        }
        let request = panel.begin_submit();
        let handle = self.bridge.submit(ctx, panel.chain.clone(), request);
        panel.in_flight = Some(handle);
    }

    fn render_wallet_bar(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let mut connect_clicked = false;
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            match &self.session {
                Some(session) => {
                    let chain = self.registry.select(Some(session.chain_id));
                    ui.label(
                        egui::RichText::new(ui::short_address(&session.account)).monospace(),
                    )
                    .on_hover_text(session.account.to_string());
                    ui.label(format!("{} ·", chain.name));
                }
                None => {
                    let label = if self.connecting.is_some() {
                        "Connecting…"
                    } else {
                        "Connect Wallet"
                    };
                    connect_clicked =
                        ui::primary_button_enabled(ui, label, self.connecting.is_none())
                            .clicked();
                }
            }
        });
        if connect_clicked {
            self.connect(ctx);
        }
    }

    fn render_toasts(&self, ctx: &egui::Context) {
        if self.toasts.is_empty() {
            return;
        }
        egui::Area::new(egui::Id::new("toasts"))
            .order(egui::Order::Tooltip)
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-12.0, -12.0))
            .show(ctx, |ui| {
                for toast in self.toasts.visible() {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.set_max_width(360.0);
                        ui.horizontal(|ui| {
                            ui.label(ui::level_icon(toast.level));
                            ui.label(
                                egui::RichText::new(&toast.message)
                                    .color(ui::level_color(toast.level)),
                            );
                        });
                    });
                    ui.add_space(4.0);
                }
            });
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(egui::Visuals::dark());

        self.check_connect_result();
        self.check_wallet_events(ctx);
        self.check_submissions();
        self.toasts.prune(now_ms());

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.heading(
                    egui::RichText::new("⛽ Gasless")
                        .size(22.0)
                        .color(ui::ACCENT),
                );
                ui.label(
                    egui::RichText::new(format!("build {}", env!("GIT_HASH")))
                        .weak()
                        .small(),
                )
                .on_hover_text(env!("BUILD_TIME"));
                self.render_wallet_bar(ui, ctx);
            });
            ui.add_space(4.0);
        });

        egui::SidePanel::left("tabs")
            .resizable(false)
            .default_width(260.0)
            .show(ctx, |ui| self.body.show_tabs(ui));

        let mut submit = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.add_space(10.0);
                for kind in self.body.visible_panels() {
                    let state = self.body.panel_mut(kind);
                    if let PanelAction::Submit = panel::render(ui, state, self.session.as_ref()) {
                        submit = Some(kind);
                    }
                }
                ui.add_space(20.0);
            });
        });
        if let Some(kind) = submit {
            self.submit(kind, ctx);
        }

        panel::render_backdrop(ctx, self.body.panel(self.body.active()));
        self.render_toasts(ctx);

        if !self.toasts.is_empty() || self.session.is_some() {
            ctx.request_repaint_after(Duration::from_millis(500));
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let persisted = PersistedUi {
            active_tab: Some(self.body.active()),
        };
        eframe::set_value(storage, PERSIST_KEY, &persisted);
    }
}
