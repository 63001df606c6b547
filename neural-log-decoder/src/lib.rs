//! Neural Log Decoder Library
//!
//! A stateless, reusable library for decoding the raw outputs of a BLE/SD-card
//! neural acquisition experiment into tabular sample data.
//!
//! # Architecture
//!
//! This library is intentionally minimal and focused on decoding:
//! - Parses the fixed-layout binary sample records (36-byte word layout and
//!   244-byte packed layout) from SD session folders
//! - Parses BLE sniffer text logs and recovers the same records from their
//!   hex payloads
//! - Reconciles the wrapping 32-bit hardware millisecond counter into a
//!   monotonic elapsed-time series per source sequence
//! - Selects a centered analysis snippet and writes/reads the CSV tables,
//!   including the `status,failed` marker for unprocessable sources
//!
//! The library does NOT:
//! - Schedule batch work across configurations and frequencies
//! - Compute throughput / packet-loss / stability statistics
//! - Render plots or reports
//!
//! All higher-level functionality is in the application layer (neural-log-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use neural_log_decoder::{Decoder, DecoderConfig};
//! use std::path::Path;
//!
//! let config = DecoderConfig::new().with_snippet_seconds(10.0);
//! let decoder = Decoder::new(config);
//!
//! match decoder.decode_source(Path::new("throughputdata/session_1")) {
//!     Ok(table) => table.write_csv(Path::new("out/100_SD_Intan.csv")).unwrap(),
//!     Err(e) => eprintln!("decode failed: {}", e),
//! }
//! ```

// Public modules
pub mod config;
pub mod decoder;
pub mod formats;
pub mod reconcile;
pub mod record;
pub mod table;
pub mod types;

// Re-export main types for convenience
pub use config::DecoderConfig;
pub use decoder::Decoder;
pub use reconcile::TimestampReconciler;
pub use record::{
    ChannelMode, RawRecord, RecordLayout, ADC_SCALE_UV, CHANNEL_COUNT, PACKED_RECORD_BYTES,
    WORD_RECORD_BYTES,
};
pub use table::{write_failure_marker, SampleTable, TableSummary};
pub use types::{DecodeError, Result, Sample};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
