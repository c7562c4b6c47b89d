use serde::{Deserialize, Serialize};

use crate::error::PrinterError;

const AUTO_CONNECT_TARGET: &str = "previously connected printer";

/// Coarse connection status of a printer session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No link and no discovery running
    #[default]
    Disconnected,
    /// Discovery running, no link
    Scanning,
    /// Link being established
    Connecting,
    /// Link up, print jobs accepted
    Connected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Scanning => "scanning",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Scanning | Self::Connecting)
    }

    /// A link is up or being established, so there is something to close.
    pub fn holds_link(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

/// Session state: status plus the device it refers to.
///
/// `device` is the connect target while `Connecting` (`None` for an
/// auto-connect) and the linked printer while `Connected`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    status: ConnectionStatus,
    device: Option<String>,
}

impl SessionState {
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.status.is_connected()
    }

    fn target_label(&self) -> String {
        self.device
            .clone()
            .unwrap_or_else(|| AUTO_CONNECT_TARGET.to_string())
    }

    /// Start discovery. Scanning while connected leaves the link untouched;
    /// a second scan while one is running is rejected.
    pub fn begin_scan(&self) -> Result<Self, PrinterError> {
        match self.status {
            ConnectionStatus::Disconnected => Ok(Self {
                status: ConnectionStatus::Scanning,
                device: None,
            }),
            ConnectionStatus::Scanning => Err(PrinterError::ScanInProgress),
            ConnectionStatus::Connected => Ok(self.clone()),
            ConnectionStatus::Connecting => {
                Err(PrinterError::ConnectionInProgress(self.target_label()))
            }
        }
    }

    /// Discovery finished, successfully or not. Never moves to `Connected`.
    pub fn finish_scan(&self) -> Self {
        match self.status {
            ConnectionStatus::Scanning => Self::default(),
            _ => self.clone(),
        }
    }

    /// Start a connection attempt. A second attempt while one is pending is
    /// rejected rather than queued.
    pub fn begin_connect(&self, target: Option<&str>) -> Result<Self, PrinterError> {
        match self.status {
            ConnectionStatus::Disconnected | ConnectionStatus::Scanning => Ok(Self {
                status: ConnectionStatus::Connecting,
                device: target.map(str::to_string),
            }),
            ConnectionStatus::Connecting => {
                Err(PrinterError::ConnectionInProgress(self.target_label()))
            }
            ConnectionStatus::Connected => {
                Err(PrinterError::AlreadyConnected(self.target_label()))
            }
        }
    }

    /// Complete the pending attempt for `uuid`.
    pub fn complete_connect(&self, uuid: &str) -> Result<Self, PrinterError> {
        match (self.status, self.device.as_deref()) {
            (ConnectionStatus::Connecting, None) => Ok(Self::connected(uuid)),
            (ConnectionStatus::Connecting, Some(target)) if target == uuid => {
                Ok(Self::connected(uuid))
            }
            _ => Err(PrinterError::ConnectionFailed(format!(
                "connection attempt to {uuid} was superseded"
            ))),
        }
    }

    /// Roll back a failed attempt for `target`. Leaves any newer state alone.
    pub fn abort_connect(&self, target: Option<&str>) -> Self {
        if self.status == ConnectionStatus::Connecting && self.device.as_deref() == target {
            Self::default()
        } else {
            self.clone()
        }
    }

    pub fn to_disconnected(&self) -> Self {
        Self::default()
    }

    fn connected(uuid: &str) -> Self {
        Self {
            status: ConnectionStatus::Connected,
            device: Some(uuid.to_string()),
        }
    }
}
