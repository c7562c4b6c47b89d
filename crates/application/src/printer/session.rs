use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use domain::error::{PrinterError, Result};
use domain::printer::{Peripheral, PrinterTransport};
use domain::session::SessionState;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Item delivered by a [`ScanStream`].
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// Partial view: every peripheral seen so far.
    Snapshot(Vec<Peripheral>),
    /// Terminal result. Always the last event.
    Finished(Result<Vec<Peripheral>>),
}

/// Zero or more snapshots followed by exactly one terminal result.
pub struct ScanStream {
    events: mpsc::UnboundedReceiver<ScanEvent>,
}

impl ScanStream {
    pub async fn next(&mut self) -> Option<ScanEvent> {
        self.events.recv().await
    }

    /// Skips the remaining snapshots and waits for the terminal result.
    pub async fn finish(mut self) -> Result<Vec<Peripheral>> {
        while let Some(event) = self.next().await {
            if let ScanEvent::Finished(result) = event {
                return result;
            }
        }
        Err(PrinterError::ScanFailed("scan ended without a result".to_string()))
    }
}

/// Connection and print-command façade over a [`PrinterTransport`].
///
/// Cheap to clone; clones share the same session. State changes are
/// published through watch channels so hosts can observe them.
#[derive(Clone)]
pub struct DeviceSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    transport: Arc<dyn PrinterTransport>,
    state: watch::Sender<SessionState>,
    devices: watch::Sender<Vec<Peripheral>>,
    // Stop signal of the running scan, if any
    active_scan: Mutex<Option<CancellationToken>>,
}

impl DeviceSession {
    pub fn new(transport: Arc<dyn PrinterTransport>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                transport,
                state: watch::Sender::new(SessionState::default()),
                devices: watch::Sender::new(Vec::new()),
                active_scan: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Last known device list.
    pub fn devices(&self) -> Vec<Peripheral> {
        self.inner.devices.borrow().clone()
    }

    pub fn watch_devices(&self) -> watch::Receiver<Vec<Peripheral>> {
        self.inner.devices.subscribe()
    }

    /// Applies a state transition atomically with respect to other callers.
    fn transition<F>(&self, apply: F) -> Result<SessionState>
    where
        F: FnOnce(&SessionState) -> Result<SessionState>,
    {
        let mut outcome = Err(PrinterError::NotConnected);
        self.inner.state.send_if_modified(|state| match apply(state) {
            Ok(next) => {
                let changed = *state != next;
                outcome = Ok(next.clone());
                *state = next;
                changed
            }
            Err(e) => {
                outcome = Err(e);
                false
            }
        });
        outcome
    }

    fn active_scan(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.inner
            .active_scan
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_devices(&self, devices: Vec<Peripheral>) {
        self.inner.devices.send_replace(devices);
    }

    /// Starts discovery and returns its progress as a stream.
    ///
    /// Must be called inside a Tokio runtime. The transport call runs to
    /// completion; use [`DeviceSession::stop_scan`] to end a keep-scanning run.
    /// Only one scan runs at a time; a second one fails with `ScanInProgress`.
    pub fn scan_updates(&self, keep_scanning: bool) -> Result<ScanStream> {
        let stop = CancellationToken::new();
        {
            let mut active = self.active_scan();
            if active.is_some() {
                return Err(PrinterError::ScanInProgress);
            }
            self.transition(SessionState::begin_scan)?;
            *active = Some(stop.clone());
        }
        info!(keep_scanning, "🔍 Scanning for printers...");

        let (snapshot_tx, mut snapshot_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let session = self.clone();

        tokio::spawn(async move {
            let scan = session
                .inner
                .transport
                .scan_for_peripherals(keep_scanning, snapshot_tx);
            tokio::pin!(scan);

            // The scan is polled before the stop branch, so a stop requested
            // before the task started reaches a transport that knows the scan.
            let mut stop_forwarded = false;
            let result = loop {
                tokio::select! {
                    biased;
                    Some(snapshot) = snapshot_rx.recv() => {
                        session.forward_snapshot(&event_tx, snapshot);
                    }
                    result = &mut scan => break result,
                    _ = stop.cancelled(), if !stop_forwarded => {
                        stop_forwarded = true;
                        if let Err(e) = session.inner.transport.stop_scan().await {
                            warn!("⚠️ Failed to stop scan: {}", e);
                        }
                    }
                }
            };
            while let Ok(snapshot) = snapshot_rx.try_recv() {
                session.forward_snapshot(&event_tx, snapshot);
            }

            {
                let mut active = session.active_scan();
                *active = None;
                // Scanning never completes into Connected.
                let _ = session.transition(|state| Ok(state.finish_scan()));
            }

            let result = match result {
                Ok(devices) => {
                    info!(found = devices.len(), "Found {} device(s)", devices.len());
                    session.publish_devices(devices.clone());
                    Ok(devices)
                }
                Err(e) => {
                    error!("❌ Scan failed: {}", e);
                    Err(PrinterError::ScanFailed(e.0))
                }
            };
            // The caller may have dropped the stream; nothing left to notify.
            let _ = event_tx.send(ScanEvent::Finished(result));
        });

        Ok(ScanStream { events: event_rx })
    }

    fn forward_snapshot(
        &self,
        events: &mpsc::UnboundedSender<ScanEvent>,
        snapshot: Vec<Peripheral>,
    ) {
        debug!(seen = snapshot.len(), "Scan snapshot");
        self.publish_devices(snapshot.clone());
        let _ = events.send(ScanEvent::Snapshot(snapshot));
    }

    /// Scans and waits for the terminal device list.
    pub async fn scan(&self, keep_scanning: bool) -> Result<Vec<Peripheral>> {
        self.scan_updates(keep_scanning)?.finish().await
    }

    pub async fn stop_scan(&self) -> Result<()> {
        let active = self.active_scan().clone();
        if let Some(stop) = active {
            stop.cancel();
        }
        self.inner
            .transport
            .stop_scan()
            .await
            .map_err(|e| PrinterError::Transport(e.0))?;
        debug!("Scan stop requested");
        Ok(())
    }

    /// Already discovered peripherals, without starting a scan.
    pub async fn device_list(&self) -> Result<Vec<Peripheral>> {
        let devices = self
            .inner
            .transport
            .device_list()
            .await
            .map_err(|e| PrinterError::Transport(e.0))?;
        self.publish_devices(devices.clone());
        Ok(devices)
    }

    /// Connects to the peripheral with `uuid`.
    ///
    /// A second connect while one is pending fails with
    /// `ConnectionInProgress`; connecting while connected fails with
    /// `AlreadyConnected`. Neither touches the transport.
    pub async fn connect(&self, uuid: &str) -> Result<()> {
        self.transition(|state| state.begin_connect(Some(uuid)))?;
        info!(device_id = %uuid, "🔌 Connecting to printer...");

        match self.inner.transport.connect_peripheral(uuid).await {
            Ok(()) => {
                self.finish_connect(uuid).await?;
                info!(device_id = %uuid, "✅ Printer connected");
                Ok(())
            }
            Err(e) => {
                let _ = self.transition(|state| Ok(state.abort_connect(Some(uuid))));
                error!(device_id = %uuid, "❌ Connection failed: {}", e);
                Err(PrinterError::ConnectionFailed(e.0))
            }
        }
    }

    /// Reconnects to the previously connected peripheral.
    pub async fn auto_connect(&self) -> Result<Peripheral> {
        self.transition(|state| state.begin_connect(None))?;
        info!("🔌 Reconnecting to previous printer...");

        match self.inner.transport.auto_connect().await {
            Ok(peripheral) => {
                self.finish_connect(&peripheral.uuid).await?;
                info!(
                    device_id = %peripheral.uuid,
                    name = %peripheral.name,
                    "✅ Printer reconnected"
                );
                Ok(peripheral)
            }
            Err(e) => {
                let _ = self.transition(|state| Ok(state.abort_connect(None)));
                error!("❌ Auto-connect failed: {}", e);
                Err(PrinterError::ConnectionFailed(e.0))
            }
        }
    }

    async fn finish_connect(&self, uuid: &str) -> Result<()> {
        if let Err(e) = self.transition(|state| state.complete_connect(uuid)) {
            // Superseded, e.g. by a disconnect. Drop the link it produced.
            warn!(device_id = %uuid, "Connection completed after being superseded. Closing it.");
            if let Err(close_err) = self.inner.transport.stop_connection().await {
                error!(device_id = %uuid, "❌ Failed to close superseded link: {}", close_err);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Closes the link, or abandons a pending connect. Succeeds without a
    /// transport call when there is no link, including while scanning.
    pub async fn disconnect(&self) -> Result<()> {
        let status = self.state().status();
        if !status.holds_link() {
            debug!(status = status.as_str(), "Disconnect requested without a link");
            return Ok(());
        }

        if let Err(e) = self.inner.transport.stop_connection().await {
            error!("❌ Disconnect failed: {}", e);
            return Err(PrinterError::DisconnectFailed(e.0));
        }
        self.transition(|state| Ok(state.to_disconnected()))?;
        info!("Disconnected from printer");
        Ok(())
    }

    /// Asks the transport whether the link is up. A link the transport
    /// reports as gone moves the session back to `Disconnected`.
    pub async fn is_connected(&self) -> Result<bool> {
        let connected = self
            .inner
            .transport
            .is_connected()
            .await
            .map_err(|e| PrinterError::Transport(e.0))?;

        if !connected && self.state().is_connected() {
            warn!("⚠️ Printer link lost. Marking session disconnected.");
            self.transition(|state| Ok(state.to_disconnected()))?;
        }
        Ok(connected)
    }

    /// Forwards an encoded job to the print engine, unparsed.
    ///
    /// Fails with `NotConnected` without contacting the transport unless the
    /// session is connected.
    pub async fn send_job(&self, message: &str) -> Result<()> {
        let state = self.state();
        if !state.is_connected() {
            warn!("⚠️ Print requested while {}", state.status().as_str());
            return Err(PrinterError::NotConnected);
        }

        match self.inner.transport.send_print_job(message).await {
            Ok(()) => {
                info!(device_id = ?state.device(), bytes = message.len(), "✅ Print job sent");
                Ok(())
            }
            Err(e) => {
                error!(device_id = ?state.device(), "❌ Failed to print: {}", e);
                Err(PrinterError::PrintFailed(e.0))
            }
        }
    }

    pub async fn set_printable_width(&self, width: u32) -> Result<()> {
        self.inner
            .transport
            .set_printable_width(width)
            .await
            .map_err(|e| PrinterError::Transport(e.0))?;
        debug!(width, "Printable width set");
        Ok(())
    }

    pub async fn printable_width(&self) -> Result<u32> {
        self.inner
            .transport
            .printable_width()
            .await
            .map_err(|e| PrinterError::Transport(e.0))
    }

    pub async fn set_first_rank_max_length(
        &self,
        three_columns: u32,
        four_columns: u32,
    ) -> Result<()> {
        self.inner
            .transport
            .set_first_rank_max_length(three_columns, four_columns)
            .await
            .map_err(|e| PrinterError::Transport(e.0))?;
        debug!(three_columns, four_columns, "First column width set");
        Ok(())
    }
}
