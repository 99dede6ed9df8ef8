//! Tabbed container holding the eight panels

use eframe::egui;

use gasless_core::{ChainConfig, ChainRegistry, PanelKind};

use crate::state::PanelState;

pub struct Body {
    active: PanelKind,
    panels: Vec<PanelState>,
}

impl Body {
    pub fn new(chain: &ChainConfig) -> Self {
        Self {
            active: PanelKind::ALL[0],
            panels: PanelKind::ALL
                .iter()
                .map(|kind| PanelState::new(*kind, chain.clone()))
                .collect(),
        }
    }

    pub fn active(&self) -> PanelKind {
        self.active
    }

    pub fn select(&mut self, kind: PanelKind) {
        if kind != self.active {
            tracing::debug!(tab = kind.index(), label = kind.label(), "tab selected");
        }
        self.active = kind;
    }

    /// Returns false for an index outside the tab strip.
    pub fn select_index(&mut self, index: usize) -> bool {
        match PanelKind::from_index(index) {
            Some(kind) => {
                self.select(kind);
                true
            }
            None => false,
        }
    }

    /// Panels rendered this frame: only the selected one.
    pub fn visible_panels(&self) -> Vec<PanelKind> {
        PanelKind::ALL
            .into_iter()
            .filter(|kind| *kind == self.active)
            .collect()
    }

    pub fn panel(&self, kind: PanelKind) -> &PanelState {
        &self.panels[kind.index()]
    }

    pub fn panel_mut(&mut self, kind: PanelKind) -> &mut PanelState {
        &mut self.panels[kind.index()]
    }

    pub fn panels_mut(&mut self) -> impl Iterator<Item = &mut PanelState> {
        self.panels.iter_mut()
    }

    /// Re-selects every panel's configuration for `chain_id`.
    pub fn sync_chain(&mut self, registry: &ChainRegistry, chain_id: Option<u64>) -> bool {
        let mut changed = false;
        for panel in &mut self.panels {
            changed |= panel.sync_chain(registry, chain_id);
        }
        changed
    }

    pub fn show_tabs(&mut self, ui: &mut egui::Ui) {
        ui.add_space(10.0);
        ui.label(egui::RichText::new("Approaches").size(16.0).strong());
        ui.separator();
        for kind in PanelKind::ALL {
            let busy = !self.panel(kind).can_submit();
            let label = if busy {
                format!("⏳ {}", kind.label())
            } else {
                kind.label().to_owned()
            };
            if ui.selectable_label(self.active == kind, label).clicked() {
                self.select(kind);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasless_adapters::AdapterConfig;

    fn body() -> Body {
        let registry = AdapterConfig::default().load_registry().expect("registry");
        Body::new(registry.default_config())
    }

    #[test]
    fn first_tab_is_selected_initially() {
        let b = body();
        assert_eq!(b.active(), PanelKind::Web3CustomEip712);
        assert_eq!(b.visible_panels(), vec![PanelKind::Web3CustomEip712]);
    }

    #[test]
    fn selecting_a_tab_shows_exactly_that_panel() {
        let mut b = body();
        for (index, kind) in PanelKind::ALL.into_iter().enumerate() {
            assert!(b.select_index(index));
            assert_eq!(b.visible_panels(), vec![kind]);
            assert_eq!(b.panel(kind).kind, kind);
        }
        assert!(!b.select_index(8));
        assert_eq!(b.active(), PanelKind::EthersEip2771Personal);
    }

    #[test]
    fn panel_state_is_local_to_each_tab() {
        let mut b = body();
        b.panel_mut(PanelKind::Web3CustomPersonal).amount = "42".to_owned();
        assert_eq!(b.panel(PanelKind::Web3CustomPersonal).amount, "42");
        assert_eq!(b.panel(PanelKind::EthersCustomPersonal).amount, "1");
    }

    #[test]
    fn chain_switch_reaches_every_panel() {
        let registry = AdapterConfig::default().load_registry().expect("registry");
        let mut b = Body::new(registry.default_config());
        assert!(b.sync_chain(&registry, Some(80001)));
        assert!(PanelKind::ALL
            .into_iter()
            .all(|kind| b.panel(kind).chain.chain_id == 80001));
    }
}
