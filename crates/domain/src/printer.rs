use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Failure payload reported by the platform transport. Opaque to this layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    pub fn reason(&self) -> &str {
        &self.0
    }
}

/// A discovered Bluetooth printer, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Peripheral {
    pub name: String,
    pub uuid: String,
}

impl Peripheral {
    pub fn new(name: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: uuid.into(),
        }
    }
}

/// Platform Bluetooth service driving discovery, the printer link and the
/// native print engine.
///
/// Every call completes exactly once with success or failure. The only
/// exception is a scan with `keep_scanning`, which may push any number of
/// partial snapshots before its terminal result.
#[async_trait]
pub trait PrinterTransport: Send + Sync {
    /// Scan for printers. Each item pushed to `snapshots` is a full list as
    /// seen so far, not a delta.
    async fn scan_for_peripherals(
        &self,
        keep_scanning: bool,
        snapshots: mpsc::UnboundedSender<Vec<Peripheral>>,
    ) -> Result<Vec<Peripheral>, TransportError>;

    /// Stop an ongoing scan. Idempotent.
    async fn stop_scan(&self) -> Result<(), TransportError>;

    /// Peripherals discovered so far, returned immediately.
    async fn device_list(&self) -> Result<Vec<Peripheral>, TransportError>;

    async fn connect_peripheral(&self, uuid: &str) -> Result<(), TransportError>;

    async fn stop_connection(&self) -> Result<(), TransportError>;

    async fn is_connected(&self) -> Result<bool, TransportError>;

    /// Reconnect to the most recently connected peripheral.
    async fn auto_connect(&self) -> Result<Peripheral, TransportError>;

    /// Paper width in millimetres (58 or 80 on common printers).
    async fn set_printable_width(&self, width: u32) -> Result<(), TransportError>;

    async fn printable_width(&self) -> Result<u32, TransportError>;

    /// Max characters of the first column in 3- and 4-column text lists.
    async fn set_first_rank_max_length(
        &self,
        three_columns: u32,
        four_columns: u32,
    ) -> Result<(), TransportError>;

    /// Hand an encoded job to the native print engine, verbatim.
    async fn send_print_job(&self, message: &str) -> Result<(), TransportError>;
}

/// Runtime permissions required for Bluetooth discovery on Android 12+.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BluetoothPermission {
    Scan,
    Connect,
    FineLocation,
}

impl BluetoothPermission {
    pub const SCAN_SET: [Self; 3] = [Self::Scan, Self::Connect, Self::FineLocation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scan => "android.permission.BLUETOOTH_SCAN",
            Self::Connect => "android.permission.BLUETOOTH_CONNECT",
            Self::FineLocation => "android.permission.ACCESS_FINE_LOCATION",
        }
    }
}

impl std::fmt::Display for BluetoothPermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform permission prompt. A refusal is reported with the platform's reason.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn request(&self, permissions: &[BluetoothPermission]) -> Result<(), String>;
}
