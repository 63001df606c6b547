//! Input format readers
//!
//! Two record sources exist: SD-card session folders of numbered binary files
//! and BLE sniffer text logs. Both yield the same [`crate::record::RawRecord`]
//! stream; everything downstream (reconciliation, scaling, snippet selection)
//! is source-agnostic.

pub mod ble_log;
pub mod session;

pub use ble_log::BleLogReader;
pub use session::SessionReader;
