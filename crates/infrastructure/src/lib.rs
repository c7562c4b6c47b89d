//! Infrastructure layer - Configuration, transports and receipt preview

pub mod config;
pub mod permissions;
pub mod printer;

pub use config::{FirstRankConfig, PrinterAgentConfig};
pub use permissions::StaticPermissionGate;
pub use printer::{
    PreviewRenderer, PrintRecord, SimulatedConfig, SimulatedTransport, TransportFactory,
    TransportKind,
};
