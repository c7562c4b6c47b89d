use anyhow::{Result, anyhow};
use clap::Parser;
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use application::printer::{PrinterService, ReceiptData, ReceiptItem, ScanEvent};
use domain::PrinterError;
use domain::printer::Peripheral;
use infrastructure::{PrinterAgentConfig, StaticPermissionGate, TransportFactory};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config directory
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// UUID of the printer to connect to. Defaults to the first one found.
    #[arg(long)]
    device: Option<String>,

    /// Receipt to print, as a JSON file
    #[arg(long, conflicts_with_all = ["text", "image"])]
    receipt: Option<PathBuf>,

    /// Print a single line of text
    #[arg(long, conflicts_with = "image")]
    text: Option<String>,

    /// Print an image from a file holding base64 data
    #[arg(long)]
    image: Option<PathBuf>,

    /// Keep scanning until the wanted printer shows up
    #[arg(long)]
    keep_scanning: bool,
}

fn build_service(config: &PrinterAgentConfig) -> Result<PrinterService> {
    match TransportFactory::create_transport(config.transport, config.transport_config.clone()) {
        Ok(transport) => Ok(PrinterService::new(transport).with_permission_gate(Arc::new(
            StaticPermissionGate::new(config.permissions_granted),
        ))),
        Err(PrinterError::PluginUnavailable) => {
            warn!(transport = config.transport.as_str(), "Transport not available in this build");
            Ok(PrinterService::unavailable())
        }
        Err(e) => Err(e.into()),
    }
}

/// Scans until `target` (or any printer, without a target) is seen.
async fn discover(
    service: &PrinterService,
    keep_scanning: bool,
    target: Option<&str>,
) -> Result<Vec<Peripheral>> {
    if !keep_scanning {
        return Ok(service.scan_devices(false).await?);
    }

    let wanted = |devices: &[Peripheral]| match target {
        Some(uuid) => devices.iter().any(|d| d.uuid == uuid),
        None => !devices.is_empty(),
    };

    let mut stream = service.scan_updates(true).await?;
    loop {
        tokio::select! {
            event = stream.next() => match event {
                Some(ScanEvent::Snapshot(devices)) => {
                    debug!(seen = devices.len(), "Devices so far: {:?}", devices);
                    if wanted(&devices) {
                        break;
                    }
                }
                Some(ScanEvent::Finished(result)) => return Ok(result?),
                None => return Err(anyhow!("Scan ended without a result")),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("🛑 Scan interrupted");
                break;
            }
        }
    }

    service.stop_scan().await?;
    Ok(stream.finish().await?)
}

async fn connect(
    service: &PrinterService,
    config: &PrinterAgentConfig,
    args: &Args,
) -> Result<()> {
    if config.auto_connect && args.device.is_none() {
        match service.auto_connect().await {
            Ok(peripheral) => {
                info!(name = %peripheral.name, "Reconnected to previous printer");
                return Ok(());
            }
            Err(e) => warn!("Auto-connect failed, scanning instead: {}", e),
        }
    }

    let devices = discover(service, config.keep_scanning, args.device.as_deref()).await?;
    for device in &devices {
        info!(name = %device.name, uuid = %device.uuid, "📡 Found printer");
    }

    let uuid = match &args.device {
        Some(uuid) => uuid.clone(),
        None => devices
            .first()
            .map(|d| d.uuid.clone())
            .ok_or_else(|| anyhow!("No printers found"))?,
    };
    service.connect_device(&uuid).await?;
    Ok(())
}

async fn print(service: &PrinterService, args: &Args) -> Result<()> {
    if let Some(path) = &args.receipt {
        let raw = tokio::fs::read_to_string(path).await?;
        let receipt: ReceiptData = serde_json::from_str(&raw)?;
        service.print_receipt(&receipt).await?;
    } else if let Some(text) = &args.text {
        service.print_text(text).await?;
    } else if let Some(path) = &args.image {
        let base64 = tokio::fs::read_to_string(path).await?;
        service.print_image(base64.trim()).await?;
    } else {
        service.print_receipt(&demo_receipt()).await?;
    }
    Ok(())
}

fn demo_receipt() -> ReceiptData {
    ReceiptData {
        store_name: Some("Demo Store".to_string()),
        store_address: Some("123 Main Street".to_string()),
        items: vec![
            ReceiptItem {
                name: "Coffee".to_string(),
                price: 3.50,
            },
            ReceiptItem {
                name: "Croissant".to_string(),
                price: 2.75,
            },
        ],
        total: Some(6.25),
        footer_lines: Vec::new(),
    }
}

async fn run() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,print_agent=debug,application=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🖨️ Bluetooth Print Agent Starting...");

    let args = Args::parse();

    info!("📂 Config directory: {}", args.config_dir);
    let mut config = PrinterAgentConfig::load(&args.config_dir)?;
    if args.keep_scanning {
        config.keep_scanning = true;
    }
    info!(
        transport = config.transport.as_str(),
        page_width = config.page_width,
        "✅ Configuration loaded"
    );

    let service = build_service(&config)?;

    let mut states = service.watch_state();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            debug!(
                status = state.status().as_str(),
                device = ?state.device(),
                "Session state changed"
            );
        }
    });

    service.set_printable_width(config.page_width).await?;
    if let Some(rank) = config.first_rank_max_length {
        service
            .set_first_rank_max_length(rank.three_columns, rank.four_columns)
            .await?;
    }

    connect(&service, &config, &args).await?;
    let printed = print(&service, &args).await;

    service.shutdown().await;
    printed?;

    info!("👋 Good bye!");
    Ok(())
}

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Failed to start runtime: {:?}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(run()) {
        eprintln!("\n❌ CRITICAL ERROR: {:?}", e);
        std::process::exit(1);
    }
}
