//! Gasless: permit deposits relayed through a meta-transaction relayer or a
//! sponsored ERC-4337 user operation.

use eframe::egui;
use eyre::WrapErr;

use gasless_adapters::AdapterConfig;

mod app;
mod body;
mod panel;
mod relay_bridge;
mod state;
mod ui;

fn main() -> eyre::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!(git = env!("GIT_HASH"), built = env!("BUILD_TIME"), "Starting Gasless");

    let config = AdapterConfig::from_env();
    let registry = config
        .load_registry()
        .wrap_err("failed to load chain registry")?;
    let bridge = relay_bridge::RelayBridge::new(&config)?;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Gasless")
            .with_inner_size([960.0, 640.0])
            .with_min_inner_size([640.0, 420.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Gasless",
        native_options,
        Box::new(move |cc| Ok(Box::new(app::App::new(cc, &config, registry, bridge)))),
    )
    .map_err(|e| eyre::eyre!("gui terminated: {e}"))
}
