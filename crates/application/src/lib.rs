//! Application layer - Print job composition and printer session use cases

pub mod printer;

pub use printer::{DeviceSession, JobBuilder, PrinterService, ReceiptData, ReceiptItem};
