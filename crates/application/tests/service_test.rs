use std::sync::{Arc, Mutex};

use application::printer::{PrinterService, ReceiptData, ReceiptItem};
use application::JobBuilder;
use async_trait::async_trait;
use domain::job::{Alignment, FontSize};
use domain::printer::{
    BluetoothPermission, PermissionGate, Peripheral, PrinterTransport, TransportError,
};
use domain::session::ConnectionStatus;
use domain::PrinterError;
use mockall::mock;
use serde_json::{Value, json};
use tokio::sync::mpsc;

mock! {
    pub Transport {}

    #[async_trait]
    impl PrinterTransport for Transport {
        async fn scan_for_peripherals(
            &self,
            keep_scanning: bool,
            snapshots: mpsc::UnboundedSender<Vec<Peripheral>>,
        ) -> Result<Vec<Peripheral>, TransportError>;
        async fn stop_scan(&self) -> Result<(), TransportError>;
        async fn device_list(&self) -> Result<Vec<Peripheral>, TransportError>;
        async fn connect_peripheral(&self, uuid: &str) -> Result<(), TransportError>;
        async fn stop_connection(&self) -> Result<(), TransportError>;
        async fn is_connected(&self) -> Result<bool, TransportError>;
        async fn auto_connect(&self) -> Result<Peripheral, TransportError>;
        async fn set_printable_width(&self, width: u32) -> Result<(), TransportError>;
        async fn printable_width(&self) -> Result<u32, TransportError>;
        async fn set_first_rank_max_length(
            &self,
            three_columns: u32,
            four_columns: u32,
        ) -> Result<(), TransportError>;
        async fn send_print_job(&self, message: &str) -> Result<(), TransportError>;
    }
}

struct DenyingGate;

#[async_trait]
impl PermissionGate for DenyingGate {
    async fn request(&self, _permissions: &[BluetoothPermission]) -> Result<(), String> {
        Err("android.permission.BLUETOOTH_SCAN denied".to_string())
    }
}

#[derive(Default)]
struct RecordingGate {
    requested: Mutex<Vec<BluetoothPermission>>,
}

#[async_trait]
impl PermissionGate for RecordingGate {
    async fn request(&self, permissions: &[BluetoothPermission]) -> Result<(), String> {
        self.requested.lock().unwrap().extend_from_slice(permissions);
        Ok(())
    }
}

fn connectable() -> MockTransport {
    let mut transport = MockTransport::new();
    transport.expect_connect_peripheral().returning(|_| Ok(()));
    transport
}

async fn connected_service(transport: MockTransport) -> PrinterService {
    let service = PrinterService::new(Arc::new(transport));
    service.connect_device("00:11:22:33:44:55").await.unwrap();
    service
}

#[tokio::test]
async fn test_every_operation_fails_without_plugin() {
    let service = PrinterService::unavailable();
    let mut builder = JobBuilder::new();
    builder.append_text("Hello", Alignment::Center, FontSize::Small);

    assert!(!service.plugin_available());
    assert_eq!(
        service.scan_devices(false).await.unwrap_err(),
        PrinterError::PluginUnavailable
    );
    assert_eq!(
        service.connect_device("A").await.unwrap_err(),
        PrinterError::PluginUnavailable
    );
    assert_eq!(
        service.print_job(&mut builder).await.unwrap_err(),
        PrinterError::PluginUnavailable
    );
    assert_eq!(
        service.set_printable_width(80).await.unwrap_err(),
        PrinterError::PluginUnavailable
    );
    // The job was drained all the same; no stale elements survive.
    assert!(builder.is_empty());
    assert_eq!(builder.drain_to_message().unwrap(), "[]");

    service.disconnect().await.unwrap();
    assert_eq!(service.state().status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_permission_refusal_blocks_scan() {
    let mut transport = MockTransport::new();
    transport.expect_scan_for_peripherals().never();

    let service =
        PrinterService::new(Arc::new(transport)).with_permission_gate(Arc::new(DenyingGate));

    let err = service.scan_devices(true).await.unwrap_err();
    assert_eq!(
        err,
        PrinterError::PermissionDenied("android.permission.BLUETOOTH_SCAN denied".into())
    );
    assert_eq!(service.state().status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_scan_requests_bluetooth_permissions() {
    let mut transport = MockTransport::new();
    transport
        .expect_scan_for_peripherals()
        .times(1)
        .returning(|_, _| Ok(vec![Peripheral::new("Printer_2EC1", "00:11:22:33:44:55")]));
    let gate = Arc::new(RecordingGate::default());

    let service = PrinterService::new(Arc::new(transport)).with_permission_gate(gate.clone());
    let devices = service.scan_devices(false).await.unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(service.devices(), devices);
    assert_eq!(
        *gate.requested.lock().unwrap(),
        BluetoothPermission::SCAN_SET.to_vec()
    );
}

#[tokio::test]
async fn test_print_while_disconnected_never_reaches_transport() {
    let mut transport = MockTransport::new();
    transport.expect_send_print_job().never();
    let service = PrinterService::new(Arc::new(transport));

    let mut builder = JobBuilder::new();
    builder.append_footer("Bye");

    assert_eq!(
        service.print_job(&mut builder).await.unwrap_err(),
        PrinterError::NotConnected
    );
    assert!(builder.is_empty());
}

#[tokio::test]
async fn test_print_job_sends_drained_message() {
    let sent = Arc::new(Mutex::new(Vec::<String>::new()));
    let mut transport = connectable();
    let sink = sent.clone();
    transport.expect_send_print_job().times(1).returning(move |message| {
        sink.lock().unwrap().push(message.to_string());
        Ok(())
    });
    let service = connected_service(transport).await;

    let mut builder = JobBuilder::new();
    builder
        .append_text("Hello", Alignment::Center, FontSize::Small)
        .append_separator_line()
        .append_footer("Bye");
    service.print_job(&mut builder).await.unwrap();

    assert!(builder.is_empty());
    assert_eq!(
        sent.lock().unwrap().as_slice(),
        [concat!(
            r#"[{"infoType":0,"text":"Hello","aligmentType":1,"fontType":0},"#,
            r#"{"infoType":5},{"infoType":7,"text":"Bye"}]"#
        )]
    );
}

#[tokio::test]
async fn test_print_failure_is_reported() {
    let mut transport = connectable();
    transport
        .expect_send_print_job()
        .returning(|_| Err(TransportError::new("Printer not connected")));
    let service = connected_service(transport).await;

    let err = service.print_text("Hello").await.unwrap_err();
    assert_eq!(err, PrinterError::PrintFailed("Printer not connected".into()));
}

#[tokio::test]
async fn test_print_receipt_layout() {
    let sent = Arc::new(Mutex::new(None::<String>));
    let mut transport = connectable();
    let sink = sent.clone();
    transport.expect_send_print_job().times(1).returning(move |message| {
        *sink.lock().unwrap() = Some(message.to_string());
        Ok(())
    });
    let service = connected_service(transport).await;

    let receipt = ReceiptData {
        store_name: Some("Corner Shop".into()),
        items: vec![ReceiptItem {
            name: "Coffee".into(),
            price: 3.5,
        }],
        total: Some(3.5),
        ..Default::default()
    };
    service.print_receipt(&receipt).await.unwrap();

    let message = sent.lock().unwrap().clone().unwrap();
    let records: Value = serde_json::from_str(&message).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(
        records[0],
        json!({"infoType": 0, "text": "Corner Shop", "aligmentType": 1, "fontType": 2})
    );
    assert_eq!(records[2]["text"], json!("Coffee                   3.50"));
    assert_eq!(records[4]["text"], json!("TOTAL: 3.50"));
    assert_eq!(records[4]["aligmentType"], json!(2));
    assert_eq!(records.last().unwrap(), &json!({"infoType": 8}));
}

#[tokio::test]
async fn test_disconnect_when_disconnected_skips_transport() {
    let mut transport = MockTransport::new();
    transport.expect_stop_connection().never();
    let service = PrinterService::new(Arc::new(transport));

    service.disconnect().await.unwrap();
    service.shutdown().await;
}

#[tokio::test]
async fn test_disconnect_failure_is_reported() {
    let mut transport = connectable();
    transport
        .expect_stop_connection()
        .returning(|| Err(TransportError::new("link busy")));
    let service = connected_service(transport).await;

    let err = service.disconnect().await.unwrap_err();
    assert_eq!(err, PrinterError::DisconnectFailed("link busy".into()));
}

#[tokio::test]
async fn test_shutdown_closes_open_link() {
    let mut transport = connectable();
    transport.expect_stop_connection().times(1).returning(|| Ok(()));
    let service = connected_service(transport).await;

    service.shutdown().await;
    assert_eq!(service.state().status(), ConnectionStatus::Disconnected);
}
