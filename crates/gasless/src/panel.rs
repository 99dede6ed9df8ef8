//! One deposit form. All eight panels share this layout.

use eframe::egui;

use gasless_core::{ClientLibrary, RelayTransport, SignMethod, WalletSession};

use crate::state::PanelState;
use crate::ui;

pub enum PanelAction {
    None,
    Submit,
}

fn describe(state: &PanelState) -> String {
    let client = match state.kind.client() {
        ClientLibrary::Web3 => "calls encoded from the contract's JSON ABI",
        ClientLibrary::Ethers => "calls encoded with typed bindings",
    };
    let transport = match state.kind.transport() {
        RelayTransport::Custom => "relayed through executeMetaTransaction",
        RelayTransport::Eip2771 => "forwarded by a sponsored smart-account user operation",
    };
    let sign = match state.kind.sign_method() {
        SignMethod::Eip712 => "EIP-712 typed data",
        SignMethod::PersonalSign => "personal_sign",
    };
    format!("Deposit with a signed permit: {client}, {transport}, signed with {sign}.")
}

pub fn render(
    ui: &mut egui::Ui,
    state: &mut PanelState,
    session: Option<&WalletSession>,
) -> PanelAction {
    let mut action = PanelAction::None;

    ui::styled_heading(ui, state.kind.label());
    ui.label(describe(state));
    ui.add_space(12.0);

    ui::card(ui, |ui| {
        egui::Grid::new(("panel_form", state.kind.index()))
            .num_columns(2)
            .spacing([10.0, 8.0])
            .show(ui, |ui| {
                ui.label("Network:");
                ui.label(format!("{} ({})", state.chain.name, state.chain.chain_id));
                ui.end_row();

                ui.label("Amount:");
                ui.add(
                    egui::TextEdit::singleline(&mut state.amount)
                        .hint_text("Enter quote")
                        .desired_width(150.0)
                        .font(egui::TextStyle::Monospace),
                );
                ui.end_row();

                ui.label("");
                ui.checkbox(&mut state.meta_tx_enabled, "Use meta transaction");
                ui.end_row();
            });

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui::primary_button_enabled(ui, "Submit", state.can_submit()).clicked() {
                action = PanelAction::Submit;
            }
            if session.is_none() {
                ui.label(egui::RichText::new("wallet not connected").weak().small());
            }
        });
    });

    if let Some(hash) = state.tx_hash {
        ui::section_header(ui, "Transaction");
        let url = state.chain.tx_url(hash);
        ui::link_with_copy(ui, "Check your transaction hash here", &url, &hash.to_string());
        ui.label(egui::RichText::new(hash.to_string()).monospace().small());
    }

    if let Some(error) = &state.last_error {
        ui.add_space(10.0);
        ui::error_message(ui, error);
    }

    action
}

/// Modal overlay shown while the panel's submission runs.
pub fn render_backdrop(ctx: &egui::Context, state: &PanelState) {
    if !state.backdrop_open {
        return;
    }
    let screen = ctx.screen_rect();
    egui::Area::new(egui::Id::new(("backdrop", state.kind.index())))
        .order(egui::Order::Foreground)
        .fixed_pos(screen.min)
        .show(ctx, |ui| {
            ui.painter()
                .rect_filled(screen, 0.0, egui::Color32::from_black_alpha(170));
            ui.allocate_rect(screen, egui::Sense::click());
        });
    egui::Window::new("Processing")
        .id(egui::Id::new(("backdrop_window", state.kind.index())))
        .order(egui::Order::Tooltip)
        .collapsible(false)
        .resizable(false)
        .title_bar(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(egui::RichText::new(&state.loading_message).size(15.0));
            });
            ui.label(
                egui::RichText::new(format!("{:?}", state.status))
                    .weak()
                    .small(),
            );
        });
}
