use async_trait::async_trait;
use domain::printer::{BluetoothPermission, PermissionGate};
use tracing::{info, warn};

/// Grants or refuses every request according to a fixed setting.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermissionGate {
    granted: bool,
}

impl StaticPermissionGate {
    pub fn new(granted: bool) -> Self {
        Self { granted }
    }
}

#[async_trait]
impl PermissionGate for StaticPermissionGate {
    async fn request(&self, permissions: &[BluetoothPermission]) -> Result<(), String> {
        let names: Vec<&str> = permissions.iter().map(BluetoothPermission::as_str).collect();
        if self.granted {
            info!(permissions = ?names, "Bluetooth permissions granted");
            Ok(())
        } else {
            warn!(permissions = ?names, "Bluetooth permissions refused");
            Err(format!("Permissions denied: {}", names.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_granted() {
        let gate = StaticPermissionGate::new(true);
        assert!(gate.request(&BluetoothPermission::SCAN_SET).await.is_ok());
    }

    #[tokio::test]
    async fn test_refused_names_permissions() {
        let gate = StaticPermissionGate::new(false);
        let err = gate
            .request(&[BluetoothPermission::Scan, BluetoothPermission::Connect])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            "Permissions denied: android.permission.BLUETOOTH_SCAN, \
             android.permission.BLUETOOTH_CONNECT"
        );
    }
}
