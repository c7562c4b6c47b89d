pub mod preview;
pub mod simulated;

pub use preview::PreviewRenderer;
pub use simulated::{PrintRecord, SimulatedConfig, SimulatedTransport};

use std::sync::Arc;

use domain::PrinterError;
use domain::printer::PrinterTransport;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// In-memory printer for development and tests.
    #[default]
    Simulated,
    /// Platform Bluetooth stack. Not linked into this build.
    Native,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simulated => "simulated",
            Self::Native => "native",
        }
    }
}

/// Factory for creating printer transports
pub struct TransportFactory;

impl TransportFactory {
    /// Create a transport from its kind and configuration.
    ///
    /// `PluginUnavailable` means the kind exists but cannot be used here;
    /// callers fall back to an unavailable service.
    pub fn create_transport(
        kind: TransportKind,
        config: serde_json::Value,
    ) -> Result<Arc<dyn PrinterTransport>, PrinterError> {
        match kind {
            TransportKind::Simulated => {
                let sim_config: SimulatedConfig = serde_json::from_value(config).map_err(|e| {
                    PrinterError::Transport(format!("Invalid simulated transport config: {}", e))
                })?;
                Ok(Arc::new(SimulatedTransport::new(sim_config)) as Arc<dyn PrinterTransport>)
            }
            TransportKind::Native => Err(PrinterError::PluginUnavailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_simulated_transport() {
        let config = json!({
            "scan_interval_ms": 10,
            "devices": [{"name": "Printer_2EC1", "uuid": "00:11:22:33:44:55"}]
        });

        assert!(TransportFactory::create_transport(TransportKind::Simulated, config).is_ok());
    }

    #[test]
    fn test_create_simulated_with_minimal_config() {
        let transport = TransportFactory::create_transport(TransportKind::Simulated, json!({}));
        assert!(transport.is_ok());
    }

    #[test]
    fn test_create_simulated_invalid_config() {
        let config = json!({"devices": "not a list"});

        let err = TransportFactory::create_transport(TransportKind::Simulated, config)
            .err()
            .unwrap();
        assert!(matches!(err, PrinterError::Transport(_)));
    }

    #[test]
    fn test_native_transport_unavailable() {
        let err = TransportFactory::create_transport(TransportKind::Native, json!({}))
            .err()
            .unwrap();
        assert_eq!(err, PrinterError::PluginUnavailable);
    }

    #[test]
    fn test_kind_names() {
        let kind: TransportKind = serde_json::from_value(json!("native")).unwrap();
        assert_eq!(kind, TransportKind::Native);
        assert_eq!(TransportKind::default().as_str(), "simulated");
    }
}
