use thiserror::Error;

use crate::job::JobError;

/// Failures surfaced to callers of the printer session and host façade.
///
/// Transport failures carry the native reason string verbatim. Nothing in
/// this layer retries; that is left to the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PrinterError {
    #[error("Bluetooth printer plugin not available")]
    PluginUnavailable,

    #[error("Bluetooth permission denied: {0}")]
    PermissionDenied(String),

    #[error("Failed to scan devices: {0}")]
    ScanFailed(String),

    #[error("Failed to connect: {0}")]
    ConnectionFailed(String),

    #[error("Failed to disconnect: {0}")]
    DisconnectFailed(String),

    #[error("Print failed: {0}")]
    PrintFailed(String),

    #[error("Not connected to a printer")]
    NotConnected,

    #[error("A connection attempt to {0} is already in progress")]
    ConnectionInProgress(String),

    #[error("A device scan is already in progress")]
    ScanInProgress,

    #[error("Already connected to {0}")]
    AlreadyConnected(String),

    #[error("Transport call failed: {0}")]
    Transport(String),

    #[error(transparent)]
    Job(#[from] JobError),
}

impl PrinterError {
    /// Errors raised locally, before any transport round-trip.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::PluginUnavailable
                | Self::NotConnected
                | Self::ConnectionInProgress(_)
                | Self::ScanInProgress
                | Self::AlreadyConnected(_)
                | Self::Job(_)
        )
    }

    /// The opaque reason reported by the transport, if this error wraps one.
    pub fn transport_reason(&self) -> Option<&str> {
        match self {
            Self::ScanFailed(reason)
            | Self::ConnectionFailed(reason)
            | Self::DisconnectFailed(reason)
            | Self::PrintFailed(reason)
            | Self::Transport(reason) => Some(reason),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PrinterError>;
