pub mod abi;
pub mod bundler;
pub mod clock;
pub mod config;
pub mod eip1193;
pub mod paymaster;
pub mod relayer;
pub mod rpc;

pub use abi::AbiAdapter;
pub use bundler::BundlerAdapter;
pub use clock::SystemClockAdapter;
pub use config::AdapterConfig;
pub use eip1193::Eip1193Adapter;
pub use paymaster::PaymasterAdapter;
pub use relayer::BiconomyRelayerAdapter;
pub use rpc::JsonRpcClient;

use gasless_core::Orchestrator;

pub type RuntimeOrchestrator = Orchestrator<
    Eip1193Adapter,
    BiconomyRelayerAdapter,
    BundlerAdapter,
    PaymasterAdapter,
    AbiAdapter,
    SystemClockAdapter,
>;

/// Wires every adapter from one configuration.
pub fn build_orchestrator(config: &AdapterConfig) -> RuntimeOrchestrator {
    Orchestrator::new(
        Eip1193Adapter::with_config(config),
        BiconomyRelayerAdapter::with_config(config),
        BundlerAdapter::with_config(config),
        PaymasterAdapter::with_config(config),
        AbiAdapter,
        SystemClockAdapter,
        config.flow_settings(),
    )
}
