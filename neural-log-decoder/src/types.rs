//! Core types for the neural log decoder library
//!
//! This module defines the fundamental types the decoder produces when processing
//! session folders and BLE sniffer logs, plus the error taxonomy. Failures are
//! always contained at the level of one source: nothing here panics on bad input.

use std::path::PathBuf;

use crate::record::CHANNEL_COUNT;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Errors that can occur during decoding
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A record buffer or hex payload had the wrong byte length.
    ///
    /// The caller decides whether this means end-of-file (trailing short read)
    /// or corruption (mid-file). A single malformed record never aborts a
    /// whole source on its own.
    #[error("malformed record: expected {expected} bytes, got {actual}")]
    MalformedRecord { expected: usize, actual: usize },

    /// A log line matched the record pattern but its payload was not decodable hex.
    #[error("malformed hex payload: {0}")]
    MalformedPayload(String),

    /// No samples could be decoded from the source at all.
    ///
    /// Downstream this becomes the failure-marker table, not an abort.
    #[error("no samples decoded from {0}")]
    EmptySource(String),

    /// An expected file or folder is absent.
    #[error("input not found: {0}")]
    MissingInput(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One decoded, time-reconciled sample: elapsed time plus all channel readings.
///
/// `channels` always holds exactly [`CHANNEL_COUNT`] values and the order is
/// semantically meaningful: index = channel position in the wire record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Elapsed time in seconds since the start of the source sequence
    pub elapsed_s: f64,
    /// Channel readings, in record order (µV or raw codes, mode-dependent)
    pub channels: [f64; CHANNEL_COUNT],
}

impl Sample {
    pub fn new(elapsed_s: f64, channels: [f64; CHANNEL_COUNT]) -> Self {
        Self { elapsed_s, channels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DecodeError::MalformedRecord { expected: 36, actual: 30 };
        assert_eq!(
            format!("{}", err),
            "malformed record: expected 36 bytes, got 30"
        );
    }

    #[test]
    fn test_sample_channel_count() {
        let sample = Sample::new(0.0, [0.0; CHANNEL_COUNT]);
        assert_eq!(sample.channels.len(), 16);
    }
}
