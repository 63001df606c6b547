//! Main decoder API
//!
//! The [`Decoder`] ties one configuration to the full per-source pipeline:
//! read raw records (SD session folder or BLE log), reconcile timestamps
//! into a monotonic elapsed-time series, scale channel values, and apply the
//! optional snippet window. Each call processes exactly one source sequence
//! with fresh reconciliation state.

use std::path::Path;

use crate::config::DecoderConfig;
use crate::formats::{BleLogReader, SessionReader};
use crate::reconcile::TimestampReconciler;
use crate::record::RawRecord;
use crate::table::SampleTable;
use crate::types::{DecodeError, Result};

/// The main decoder struct - entry point for all decoding operations
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    /// Create a decoder with the given configuration
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode one source sequence into a sample table.
    ///
    /// Dispatches on the source kind: a directory is an SD session folder, a
    /// file is a BLE sniffer log. Anything else is `MissingInput`.
    pub fn decode_source(&self, path: &Path) -> Result<SampleTable> {
        if path.is_dir() {
            log::debug!("source {:?} is a session folder", path);
            self.decode_session_dir(path)
        } else if path.is_file() {
            log::debug!("source {:?} is a BLE log", path);
            self.decode_ble_log(path)
        } else {
            Err(DecodeError::MissingInput(path.to_path_buf()))
        }
    }

    /// Decode an SD session folder of numbered binary files
    pub fn decode_session_dir(&self, dir: &Path) -> Result<SampleTable> {
        let reader = SessionReader::new(self.config.layout, self.config.session_prefix.clone());
        let records = reader.read_records(dir)?;
        self.assemble(records, dir)
    }

    /// Decode a BLE sniffer text log
    pub fn decode_ble_log(&self, path: &Path) -> Result<SampleTable> {
        let reader = BleLogReader::new(self.config.layout, self.config.ble_marker.clone());
        let records = reader.read_records(path)?;
        self.assemble(records, path)
    }

    /// Reconcile, scale and window a record stream from one source
    fn assemble(&self, records: Vec<RawRecord>, source: &Path) -> Result<SampleTable> {
        if records.is_empty() {
            return Err(DecodeError::EmptySource(format!("{:?}", source)));
        }

        let mut reconciler = TimestampReconciler::new();
        let mut table = SampleTable::new();
        for record in &records {
            let elapsed_s = reconciler.elapsed_s(record.timestamp_ms());
            table.push(record.to_sample(elapsed_s, self.config.channel_mode));
        }

        log::info!(
            "decoded {} samples spanning {:.3} s from {:?}",
            table.len(),
            table.duration_s(),
            source
        );

        match self.config.snippet_seconds {
            Some(window_s) => table.snippet(window_s),
            None => Ok(table),
        }
    }
}
