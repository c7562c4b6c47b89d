use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use application::printer::{PrinterService, ReceiptData, ReceiptItem, ScanEvent};
use domain::PrinterError;
use domain::printer::Peripheral;
use domain::session::ConnectionStatus;
use infrastructure::{SimulatedConfig, SimulatedTransport, StaticPermissionGate};
use tokio::time::timeout;

fn devices() -> Vec<Peripheral> {
    vec![
        Peripheral::new("Printer_2EC1", "00:11:22:33:44:55"),
        Peripheral::new("MTP-II", "66:77:88:99:AA:BB"),
    ]
}

fn simulator(preview_path: Option<String>) -> Arc<SimulatedTransport> {
    Arc::new(SimulatedTransport::new(SimulatedConfig {
        devices: devices(),
        scan_interval_ms: 5,
        preview_path,
        paired_device: None,
    }))
}

fn service(sim: Arc<SimulatedTransport>) -> PrinterService {
    PrinterService::new(sim).with_permission_gate(Arc::new(StaticPermissionGate::new(true)))
}

#[tokio::test]
async fn test_one_shot_scan_finds_all_devices() -> Result<()> {
    let service = service(simulator(None));

    let found = service.scan_devices(false).await?;

    assert_eq!(found, devices());
    assert_eq!(service.device_list().await?, devices());
    assert_eq!(service.state().status(), ConnectionStatus::Disconnected);
    Ok(())
}

#[tokio::test]
async fn test_keep_scanning_until_stopped() -> Result<()> {
    let service = service(simulator(None));

    let mut stream = service.scan_updates(true).await?;
    let mut snapshots = Vec::new();
    loop {
        let event = timeout(Duration::from_secs(2), stream.next())
            .await?
            .ok_or_else(|| anyhow!("scan ended early"))?;
        match event {
            ScanEvent::Snapshot(seen) => {
                let complete = seen.len() == devices().len();
                snapshots.push(seen);
                if complete {
                    break;
                }
            }
            ScanEvent::Finished(result) => return Err(anyhow!("unexpected finish: {:?}", result)),
        }
    }
    assert_eq!(snapshots[0].len(), 1);

    service.stop_scan().await?;
    let found = timeout(Duration::from_secs(2), stream.finish()).await??;

    assert_eq!(found, devices());
    assert_eq!(service.devices(), devices());
    Ok(())
}

#[tokio::test]
async fn test_refused_permissions_stop_scan() {
    let service = PrinterService::new(simulator(None))
        .with_permission_gate(Arc::new(StaticPermissionGate::new(false)));

    let err = service.scan_devices(false).await.unwrap_err();
    assert!(matches!(err, PrinterError::PermissionDenied(_)));
}

#[tokio::test]
async fn test_receipt_reaches_printer_and_preview_file() -> Result<()> {
    let path = std::env::temp_dir().join(format!("btprint-preview-{}.txt", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let sim = simulator(Some(path.to_string_lossy().into_owned()));
    let service = service(sim.clone());

    service.connect_device("66:77:88:99:AA:BB").await?;
    assert_eq!(service.state().device(), Some("66:77:88:99:AA:BB"));

    let receipt = ReceiptData {
        store_name: Some("Corner Shop".into()),
        items: vec![ReceiptItem {
            name: "Coffee".into(),
            price: 3.5,
        }],
        total: Some(3.5),
        ..Default::default()
    };
    service.print_receipt(&receipt).await?;

    let printed = sim.printed().await;
    assert_eq!(printed.len(), 1);
    let preview = &printed[0].preview;
    assert!(preview.contains("CORNER SHOP"));
    assert!(preview.contains("Coffee                   3.50"));
    assert!(preview.contains("TOTAL: 3.50"));
    assert!(preview.contains("Thank you for your business!"));
    assert!(preview.trim_end().ends_with("- - ✂ - -"));

    let on_disk = std::fs::read_to_string(&path)?;
    assert_eq!(&on_disk, preview);

    service.shutdown().await;
    assert!(!service.is_connected().await?);
    std::fs::remove_file(&path)?;
    Ok(())
}

#[tokio::test]
async fn test_connect_unknown_device_fails() {
    let service = service(simulator(None));

    let err = service.connect_device("FF:FF:FF:FF:FF:FF").await.unwrap_err();

    assert!(matches!(err, PrinterError::ConnectionFailed(_)));
    assert_eq!(service.state().status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_auto_connect_after_reconnect() -> Result<()> {
    let service = service(simulator(None));
    assert!(service.auto_connect().await.is_err());

    service.connect_device("00:11:22:33:44:55").await?;
    service.disconnect().await?;

    let peripheral = service.auto_connect().await?;
    assert_eq!(peripheral.name, "Printer_2EC1");
    assert!(service.state().is_connected());
    Ok(())
}

#[tokio::test]
async fn test_print_text_while_disconnected() {
    let sim = simulator(None);
    let service = service(sim.clone());

    let err = service.print_text("Hello").await.unwrap_err();

    assert_eq!(err, PrinterError::NotConnected);
    assert!(sim.printed().await.is_empty());
}

#[tokio::test]
async fn test_stop_right_after_keep_scanning_starts() -> Result<()> {
    let service = service(simulator(None));

    let stream = service.scan_updates(true).await?;
    service.stop_scan().await?;

    timeout(Duration::from_secs(2), stream.finish()).await??;
    assert_eq!(service.state().status(), ConnectionStatus::Disconnected);
    Ok(())
}

#[tokio::test]
async fn test_second_scan_waits_for_the_first_to_stop() -> Result<()> {
    let service = service(simulator(None));

    let stream = service.scan_updates(true).await?;
    let err = service.scan_devices(false).await.unwrap_err();
    assert_eq!(err, PrinterError::ScanInProgress);

    service.stop_scan().await?;
    timeout(Duration::from_secs(2), stream.finish()).await??;

    assert_eq!(service.scan_devices(false).await?, devices());
    Ok(())
}
