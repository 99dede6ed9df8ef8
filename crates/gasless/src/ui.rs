//! UI helper components

use alloy::primitives::Address;
use eframe::egui;

use gasless_core::NoticeLevel;

pub const ACCENT: egui::Color32 = egui::Color32::from_rgb(0, 212, 170);
const ERROR_RED: egui::Color32 = egui::Color32::from_rgb(220, 80, 80);
const SUCCESS_GREEN: egui::Color32 = egui::Color32::from_rgb(80, 200, 120);
const INFO_BLUE: egui::Color32 = egui::Color32::from_rgb(90, 160, 230);

pub fn open_url_new_tab(url: &str) {
    if let Err(e) = open::that(url) {
        tracing::warn!(%url, error = %e, "failed to open browser");
    }
}

pub fn copy_to_clipboard(text: &str) {
    match arboard::Clipboard::new() {
        Ok(mut clipboard) => {
            if let Err(e) = clipboard.set_text(text) {
                tracing::warn!(error = %e, "clipboard write failed");
            }
        }
        Err(e) => tracing::warn!(error = %e, "clipboard unavailable"),
    }
}

/// `0x1234…abcd`
pub fn short_address(address: &Address) -> String {
    let full = address.to_checksum(None);
    format!("{}…{}", &full[..6], &full[full.len() - 4..])
}

/// Styled heading with accent color
pub fn styled_heading(ui: &mut egui::Ui, text: &str) {
    ui.heading(egui::RichText::new(text).color(ACCENT));
}

pub fn section_header(ui: &mut egui::Ui, text: &str) {
    ui.add_space(10.0);
    ui.label(egui::RichText::new(text).strong().size(14.0));
    ui.separator();
}

pub fn error_message(ui: &mut egui::Ui, message: &str) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new("❌").size(16.0));
        ui.label(egui::RichText::new(message).color(ERROR_RED));
    });
}

pub fn level_color(level: NoticeLevel) -> egui::Color32 {
    match level {
        NoticeLevel::Error => ERROR_RED,
        NoticeLevel::Success => SUCCESS_GREEN,
        NoticeLevel::Info => INFO_BLUE,
    }
}

pub fn level_icon(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Error => "❌",
        NoticeLevel::Success => "✅",
        NoticeLevel::Info => "ℹ",
    }
}

/// Primary button with enabled state
pub fn primary_button_enabled(ui: &mut egui::Ui, text: &str, enabled: bool) -> egui::Response {
    let btn = egui::Button::new(egui::RichText::new(text).size(14.0).color(egui::Color32::WHITE))
        .min_size(egui::vec2(130.0, 34.0))
        .fill(egui::Color32::from_rgb(0, 180, 150));
    ui.add_enabled(enabled, btn)
}

/// Render content in a subtle card/frame
pub fn card(ui: &mut egui::Ui, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::none()
        .fill(ui.visuals().faint_bg_color)
        .rounding(6.0)
        .inner_margin(12.0)
        .show(ui, add_contents);
}

/// Link text that opens `url`, plus a copy button for `value`.
pub fn link_with_copy(ui: &mut egui::Ui, text: &str, url: &str, value: &str) {
    ui.horizontal(|ui| {
        if ui.link(text).on_hover_text(url).clicked() {
            open_url_new_tab(url);
        }
        if ui
            .small_button("📋")
            .on_hover_text("Copy to clipboard")
            .clicked()
        {
            copy_to_clipboard(value);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn short_address_keeps_checksum_ends() {
        let a = address!("5ff137d4b0fdcd49dca30c7cf57e578a026d2789");
        assert_eq!(short_address(&a), "0x5FF1…2789");
    }
}
