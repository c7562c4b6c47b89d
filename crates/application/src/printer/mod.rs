pub mod builder;
pub mod receipt;
pub mod service;
pub mod session;

pub use builder::JobBuilder;
pub use receipt::{ReceiptData, ReceiptItem};
pub use service::PrinterService;
pub use session::{DeviceSession, ScanEvent, ScanStream};
