use std::sync::Arc;

use domain::error::{PrinterError, Result};
use domain::job::{Alignment, DEFAULT_MAX_WIDTH, FontSize};
use domain::printer::{BluetoothPermission, PermissionGate, Peripheral, PrinterTransport};
use domain::session::SessionState;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::builder::JobBuilder;
use super::receipt::ReceiptData;
use super::session::{DeviceSession, ScanStream};

/// Host-facing printer API.
///
/// Built without a transport when the native plugin is missing; every
/// operation then fails with `PluginUnavailable` before doing anything else.
pub struct PrinterService {
    session: Option<DeviceSession>,
    permissions: Option<Arc<dyn PermissionGate>>,
}

impl PrinterService {
    pub fn new(transport: Arc<dyn PrinterTransport>) -> Self {
        info!("Bluetooth Printer plugin is available");
        Self {
            session: Some(DeviceSession::new(transport)),
            permissions: None,
        }
    }

    pub fn unavailable() -> Self {
        warn!("Bluetooth Printer plugin not available");
        Self {
            session: None,
            permissions: None,
        }
    }

    /// Permissions are requested through `gate` before every scan.
    pub fn with_permission_gate(mut self, gate: Arc<dyn PermissionGate>) -> Self {
        self.permissions = Some(gate);
        self
    }

    pub fn plugin_available(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Result<&DeviceSession> {
        self.session.as_ref().ok_or(PrinterError::PluginUnavailable)
    }

    pub fn state(&self) -> SessionState {
        self.session
            .as_ref()
            .map(DeviceSession::state)
            .unwrap_or_default()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        match &self.session {
            Some(session) => session.watch_state(),
            None => watch::channel(SessionState::default()).1,
        }
    }

    pub fn devices(&self) -> Vec<Peripheral> {
        self.session
            .as_ref()
            .map(DeviceSession::devices)
            .unwrap_or_default()
    }

    pub fn watch_devices(&self) -> watch::Receiver<Vec<Peripheral>> {
        match &self.session {
            Some(session) => session.watch_devices(),
            None => watch::channel(Vec::new()).1,
        }
    }

    /// Requests the Bluetooth runtime permissions. Without a gate they are
    /// assumed granted. Refusal is not retried.
    pub async fn request_permissions(&self) -> Result<()> {
        let Some(gate) = &self.permissions else {
            return Ok(());
        };
        gate.request(&BluetoothPermission::SCAN_SET)
            .await
            .map_err(|reason| {
                error!("Permission error: {}", reason);
                PrinterError::PermissionDenied(reason)
            })
    }

    pub async fn scan_devices(&self, keep_scanning: bool) -> Result<Vec<Peripheral>> {
        self.scan_updates(keep_scanning).await?.finish().await
    }

    pub async fn scan_updates(&self, keep_scanning: bool) -> Result<ScanStream> {
        let session = self.session()?;
        self.request_permissions().await?;
        session.scan_updates(keep_scanning)
    }

    pub async fn stop_scan(&self) -> Result<()> {
        self.session()?.stop_scan().await
    }

    pub async fn device_list(&self) -> Result<Vec<Peripheral>> {
        self.session()?.device_list().await
    }

    pub async fn connect_device(&self, uuid: &str) -> Result<()> {
        self.session()?.connect(uuid).await
    }

    pub async fn auto_connect(&self) -> Result<Peripheral> {
        self.session()?.auto_connect().await
    }

    /// Without a plugin there is no link to close, so this succeeds.
    pub async fn disconnect(&self) -> Result<()> {
        match &self.session {
            Some(session) => session.disconnect().await,
            None => Ok(()),
        }
    }

    pub async fn is_connected(&self) -> Result<bool> {
        self.session()?.is_connected().await
    }

    pub async fn set_printable_width(&self, width: u32) -> Result<()> {
        self.session()?.set_printable_width(width).await
    }

    pub async fn printable_width(&self) -> Result<u32> {
        self.session()?.printable_width().await
    }

    pub async fn set_first_rank_max_length(
        &self,
        three_columns: u32,
        four_columns: u32,
    ) -> Result<()> {
        self.session()?
            .set_first_rank_max_length(three_columns, four_columns)
            .await
    }

    /// Drains `builder` and sends the job.
    ///
    /// The builder is emptied before any check, so a failed print (missing
    /// plugin included) leaves nothing behind; resending means rebuilding.
    pub async fn print_job(&self, builder: &mut JobBuilder) -> Result<()> {
        let message = builder.drain_to_message()?;
        self.session()?.send_job(&message).await
    }

    /// Prints one left-aligned line of plain text.
    pub async fn print_text(&self, text: &str) -> Result<()> {
        let mut builder = JobBuilder::new();
        builder.append_text(text, Alignment::Left, FontSize::Small);
        self.print_job(&mut builder).await
    }

    /// Prints one centered image given as base64.
    pub async fn print_image(&self, base64_data: &str) -> Result<()> {
        let mut builder = JobBuilder::new();
        builder.append_image(base64_data, DEFAULT_MAX_WIDTH, Alignment::Center);
        self.print_job(&mut builder).await
    }

    pub async fn print_receipt(&self, receipt: &ReceiptData) -> Result<()> {
        let mut builder = JobBuilder::new();
        receipt.compose(&mut builder);
        self.print_job(&mut builder).await
    }

    /// Closes the link if one is up. Errors are logged, not returned.
    pub async fn shutdown(&self) {
        if !self.state().is_connected() {
            return;
        }
        if let Err(e) = self.disconnect().await {
            error!("Failed to disconnect on shutdown: {}", e);
        }
    }
}
