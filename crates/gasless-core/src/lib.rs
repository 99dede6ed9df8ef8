pub mod chain;
pub mod contracts;
pub mod domain;
pub mod orchestrator;
pub mod ports;
pub mod state_machine;
pub mod typed_data;
pub mod user_op;

pub use chain::{ChainConfig, ChainRegistry};
pub use domain::{
    ClientLibrary, FlowEvent, Notice, NoticeLevel, PanelKind, RelayTransport, SignMethod,
    SubmitOutcome, SubmitRequest, TimestampMs, WalletSession,
};
pub use orchestrator::{EventLog, FlowSettings, Orchestrator, SubmitError};
pub use ports::{
    AbiPort, BundlerPort, ClockPort, FlowObserver, PaymasterPort, PortError, ProviderPort,
    RelayerPort,
};
pub use state_machine::{SubmissionAction, SubmissionStatus, TransitionError};
pub use user_op::UserOperation;
