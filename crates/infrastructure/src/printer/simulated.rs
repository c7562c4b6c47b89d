use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::job::Job;
use domain::printer::{Peripheral, PrinterTransport, TransportError};
use serde::Deserialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::preview::PreviewRenderer;

#[derive(Debug, Deserialize, Clone)]
pub struct SimulatedConfig {
    #[serde(default)]
    pub devices: Vec<Peripheral>,
    #[serde(default = "default_scan_interval")]
    pub scan_interval_ms: u64,
    /// File every rendered receipt is appended to.
    #[serde(default)]
    pub preview_path: Option<String>,
    /// Peripheral remembered from an earlier session, used by auto-connect.
    #[serde(default)]
    pub paired_device: Option<String>,
}

fn default_scan_interval() -> u64 {
    500
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            scan_interval_ms: default_scan_interval(),
            preview_path: None,
            paired_device: None,
        }
    }
}

/// A job accepted by the simulated printer.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintRecord {
    pub message: String,
    pub preview: String,
    pub printed_at: DateTime<Utc>,
}

struct SimulatorState {
    connected: Option<String>,
    paired: Option<String>,
    discovered: Vec<Peripheral>,
    page_width: u32,
    first_rank: Option<(u32, u32)>,
    // Watched by every running keep-scanning run; replaced after each stop
    scan_token: CancellationToken,
    printed: Vec<PrintRecord>,
}

/// In-memory Bluetooth printer. Discovers the configured peripherals and
/// renders accepted jobs to text.
pub struct SimulatedTransport {
    devices: Vec<Peripheral>,
    scan_interval: Duration,
    preview_path: Option<PathBuf>,
    state: Mutex<SimulatorState>,
}

impl SimulatedTransport {
    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            devices: config.devices,
            scan_interval: Duration::from_millis(config.scan_interval_ms),
            preview_path: config.preview_path.map(PathBuf::from),
            state: Mutex::new(SimulatorState {
                connected: None,
                paired: config.paired_device,
                discovered: Vec::new(),
                page_width: 58,
                first_rank: None,
                scan_token: CancellationToken::new(),
                printed: Vec::new(),
            }),
        }
    }

    /// Jobs printed so far, oldest first.
    pub async fn printed(&self) -> Vec<PrintRecord> {
        self.state.lock().await.printed.clone()
    }

    fn find(&self, uuid: &str) -> Option<&Peripheral> {
        self.devices.iter().find(|d| d.uuid == uuid)
    }

    async fn append_preview(&self, preview: &str) -> Result<(), TransportError> {
        let Some(path) = &self.preview_path else {
            return Ok(());
        };

        // Open, write, close per job so the file is complete after each print
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| {
                error!("Failed to open preview file {:?}: {}", path, e);
                TransportError::new(e.to_string())
            })?;
        file.write_all(preview.as_bytes())
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| TransportError::new(e.to_string()))
    }
}

#[async_trait]
impl PrinterTransport for SimulatedTransport {
    async fn scan_for_peripherals(
        &self,
        keep_scanning: bool,
        snapshots: mpsc::UnboundedSender<Vec<Peripheral>>,
    ) -> Result<Vec<Peripheral>, TransportError> {
        if !keep_scanning {
            tokio::time::sleep(self.scan_interval).await;
            let found = self.devices.clone();
            self.state.lock().await.discovered = found.clone();
            return Ok(found);
        }

        let token = self.state.lock().await.scan_token.clone();

        let mut seen = 0;
        let mut found = Vec::new();
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.scan_interval) => {
                    seen = (seen + 1).min(self.devices.len());
                    found = self.devices[..seen].to_vec();
                    self.state.lock().await.discovered = found.clone();
                    if snapshots.send(found.clone()).is_err() {
                        debug!("Scan listener gone. Stopping scan.");
                        break;
                    }
                }
            }
        }
        Ok(found)
    }

    async fn stop_scan(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        let stopped = std::mem::replace(&mut state.scan_token, CancellationToken::new());
        stopped.cancel();
        debug!("Scan stopped");
        Ok(())
    }

    async fn device_list(&self) -> Result<Vec<Peripheral>, TransportError> {
        Ok(self.state.lock().await.discovered.clone())
    }

    async fn connect_peripheral(&self, uuid: &str) -> Result<(), TransportError> {
        let peripheral = self
            .find(uuid)
            .ok_or_else(|| TransportError::new(format!("Peripheral {} not found", uuid)))?;

        let mut state = self.state.lock().await;
        state.connected = Some(peripheral.uuid.clone());
        state.paired = Some(peripheral.uuid.clone());
        info!(device_id = %uuid, name = %peripheral.name, "Simulated printer connected");
        Ok(())
    }

    async fn stop_connection(&self) -> Result<(), TransportError> {
        if let Some(uuid) = self.state.lock().await.connected.take() {
            info!(device_id = %uuid, "Simulated printer disconnected");
        }
        Ok(())
    }

    async fn is_connected(&self) -> Result<bool, TransportError> {
        Ok(self.state.lock().await.connected.is_some())
    }

    async fn auto_connect(&self) -> Result<Peripheral, TransportError> {
        let paired = self.state.lock().await.paired.clone();
        let peripheral = paired
            .as_deref()
            .and_then(|uuid| self.find(uuid))
            .cloned()
            .ok_or_else(|| TransportError::new("No previously connected printer"))?;

        self.connect_peripheral(&peripheral.uuid).await?;
        Ok(peripheral)
    }

    async fn set_printable_width(&self, width: u32) -> Result<(), TransportError> {
        if width == 0 {
            return Err(TransportError::new("Page width must be positive"));
        }
        self.state.lock().await.page_width = width;
        Ok(())
    }

    async fn printable_width(&self) -> Result<u32, TransportError> {
        Ok(self.state.lock().await.page_width)
    }

    async fn set_first_rank_max_length(
        &self,
        three_columns: u32,
        four_columns: u32,
    ) -> Result<(), TransportError> {
        self.state.lock().await.first_rank = Some((three_columns, four_columns));
        Ok(())
    }

    async fn send_print_job(&self, message: &str) -> Result<(), TransportError> {
        let renderer = {
            let state = self.state.lock().await;
            if state.connected.is_none() {
                return Err(TransportError::new("Printer not connected"));
            }
            let renderer = PreviewRenderer::for_page_width(state.page_width);
            match state.first_rank {
                Some((three, four)) => renderer.with_first_rank(three, four),
                None => renderer,
            }
        };

        let job = Job::from_message(message).map_err(|e| {
            warn!("⚠️ Rejected print job: {}", e);
            TransportError::new(e.to_string())
        })?;
        let preview = renderer.render_to_string(job.elements());
        debug!("Receipt preview:\n{}", preview);

        self.append_preview(&preview).await?;

        let mut state = self.state.lock().await;
        state.printed.push(PrintRecord {
            message: message.to_string(),
            preview,
            printed_at: Utc::now(),
        });
        info!(elements = job.len(), "🖨️ Simulated printer accepted job");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(devices: &[(&str, &str)]) -> SimulatedTransport {
        SimulatedTransport::new(SimulatedConfig {
            devices: devices
                .iter()
                .map(|(name, uuid)| Peripheral::new(*name, *uuid))
                .collect(),
            scan_interval_ms: 1,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_connect_unknown_peripheral_fails() {
        let sim = transport(&[("Printer_A", "A")]);

        let err = sim.connect_peripheral("Z").await.unwrap_err();
        assert_eq!(err.reason(), "Peripheral Z not found");
        assert!(!sim.is_connected().await.unwrap());
    }

    #[tokio::test]
    async fn test_print_requires_connection() {
        let sim = transport(&[("Printer_A", "A")]);

        let err = sim.send_print_job("[]").await.unwrap_err();
        assert_eq!(err.reason(), "Printer not connected");
    }

    #[tokio::test]
    async fn test_malformed_job_is_rejected() {
        let sim = transport(&[("Printer_A", "A")]);
        sim.connect_peripheral("A").await.unwrap();

        assert!(sim.send_print_job("{not json").await.is_err());
        assert!(sim.send_print_job(r#"[{"infoType":42}]"#).await.is_err());
        assert!(sim.printed().await.is_empty());
    }

    #[tokio::test]
    async fn test_print_renders_at_configured_width() {
        let sim = transport(&[("Printer_A", "A")]);
        sim.connect_peripheral("A").await.unwrap();
        sim.set_printable_width(80).await.unwrap();

        sim.send_print_job(r#"[{"infoType":5},{"infoType":7,"text":"Bye"}]"#)
            .await
            .unwrap();

        let printed = sim.printed().await;
        assert_eq!(printed.len(), 1);
        let lines: Vec<&str> = printed[0].preview.lines().collect();
        assert_eq!(lines[0], "-".repeat(48));
        assert_eq!(lines[1].trim(), "Bye");
    }

    #[tokio::test]
    async fn test_auto_connect_uses_last_connection() {
        let sim = transport(&[("Printer_A", "A"), ("Printer_B", "B")]);
        assert!(sim.auto_connect().await.is_err());

        sim.connect_peripheral("B").await.unwrap();
        sim.stop_connection().await.unwrap();

        let peripheral = sim.auto_connect().await.unwrap();
        assert_eq!(peripheral.uuid, "B");
        assert!(sim.is_connected().await.unwrap());
    }

    #[tokio::test]
    async fn test_stop_scan_ends_every_running_scan() {
        let sim = std::sync::Arc::new(transport(&[("Printer_A", "A")]));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let first = tokio::spawn({
            let sim = sim.clone();
            let tx = tx.clone();
            async move { sim.scan_for_peripherals(true, tx).await }
        });
        let second = tokio::spawn({
            let sim = sim.clone();
            async move { sim.scan_for_peripherals(true, tx).await }
        });
        // Both scans are running once each has sent a snapshot
        rx.recv().await.unwrap();
        rx.recv().await.unwrap();

        sim.stop_scan().await.unwrap();

        let first = tokio::time::timeout(Duration::from_secs(2), first).await;
        let second = tokio::time::timeout(Duration::from_secs(2), second).await;
        assert_eq!(first.unwrap().unwrap().unwrap().len(), 1);
        assert_eq!(second.unwrap().unwrap().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_scan_after_stop_is_not_cancelled() {
        let sim = transport(&[("Printer_A", "A")]);
        sim.stop_scan().await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let scan = sim.scan_for_peripherals(true, tx);
        tokio::pin!(scan);
        tokio::select! {
            _ = &mut scan => panic!("scan ended without a stop"),
            snapshot = rx.recv() => assert_eq!(snapshot.unwrap().len(), 1),
        }
    }

    #[tokio::test]
    async fn test_zero_width_is_rejected() {
        let sim = transport(&[]);
        assert!(sim.set_printable_width(0).await.is_err());
        assert_eq!(sim.printable_width().await.unwrap(), 58);
    }
}
