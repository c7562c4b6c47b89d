//! Domain layer - Print job model and printer session rules
//!
//! This crate contains:
//! - The print job document model and its wire encoding
//! - The printer session state machine
//! - Transport and permission interfaces (traits)
//! - The error taxonomy shared by all layers
//!
//! Principles:
//! - No dependencies on infrastructure
//! - Testable in isolation

pub mod error;
pub mod job;
pub mod printer;
pub mod session;

// Re-export commonly used types
pub use error::{PrinterError, Result};
pub use job::{Alignment, FontSize, InfoType, Job, JobError, PrintElement};
pub use printer::{
    BluetoothPermission, PermissionGate, Peripheral, PrinterTransport, TransportError,
};
pub use session::{ConnectionStatus, SessionState};
