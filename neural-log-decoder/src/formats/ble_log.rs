//! BLE sniffer log reader
//!
//! The sniffer writes one line per notification: an ISO-8601 UTC timestamp at
//! the start of the line, then attribute metadata containing a fixed marker
//! (`handle: 0x12, value (0x): ` by default), then the record bytes as a
//! hyphen- or space-separated hex string. The hex payload, separators
//! stripped, must decode to exactly one wire record.
//!
//! Lines without the timestamp prefix or the marker are other sniffer
//! traffic and are ignored silently. Lines that match but carry a bad
//! payload are skipped with a warning; one malformed line never aborts the
//! file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::NaiveDateTime;

use crate::record::{RawRecord, RecordLayout};
use crate::types::{DecodeError, Result};

/// Length of the `YYYY-MM-DDTHH:MM:SS.mmmZ` line prefix
const TIMESTAMP_PREFIX_LEN: usize = 24;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Parses sniffer log lines into raw records
pub struct BleLogReader {
    layout: RecordLayout,
    marker: String,
}

impl BleLogReader {
    pub fn new(layout: RecordLayout, marker: impl Into<String>) -> Self {
        Self {
            layout,
            marker: marker.into(),
        }
    }

    /// Read every decodable record from a log file, skipping malformed lines
    pub fn read_records(&self, path: &Path) -> Result<Vec<RawRecord>> {
        if !path.is_file() {
            return Err(DecodeError::MissingInput(path.to_path_buf()));
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            match self.parse_line(&line) {
                Some(Ok(record)) => records.push(record),
                Some(Err(e)) => {
                    log::warn!("skipping line {} of {:?}: {}", number + 1, path, e);
                }
                None => {}
            }
        }

        log::info!("read {} records from {:?}", records.len(), path);
        Ok(records)
    }

    /// Try to decode one log line.
    ///
    /// `None` means the line is not a record line at all; `Some(Err(_))`
    /// means it matched the grammar but its payload was malformed.
    pub fn parse_line(&self, line: &str) -> Option<Result<RawRecord>> {
        let prefix = line.get(..TIMESTAMP_PREFIX_LEN)?;
        NaiveDateTime::parse_from_str(prefix, TIMESTAMP_FORMAT).ok()?;

        let marker_at = line.find(self.marker.as_str())?;
        let payload = line[marker_at + self.marker.len()..].trim();

        Some(self.decode_payload(payload))
    }

    /// Strip separators from the hex payload and decode it as one record
    fn decode_payload(&self, payload: &str) -> Result<RawRecord> {
        let cleaned: String = payload
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .collect();

        let bytes = decode_hex(&cleaned)
            .ok_or_else(|| DecodeError::MalformedPayload(payload.to_string()))?;

        RawRecord::from_bytes(self.layout, &bytes)
    }
}

/// Decode a plain hex string into bytes; `None` on odd length or non-hex digits
fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CHANNEL_COUNT, WORD_RECORD_BYTES};

    const MARKER: &str = "handle: 0x12, value (0x): ";

    fn hex_payload(timestamp_ms: u32) -> String {
        let mut bytes = Vec::with_capacity(WORD_RECORD_BYTES);
        for i in 0..CHANNEL_COUNT as u16 {
            bytes.extend_from_slice(&i.to_le_bytes());
        }
        bytes.extend_from_slice(&timestamp_ms.to_le_bytes());
        bytes
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join("-")
    }

    fn log_reader() -> BleLogReader {
        BleLogReader::new(RecordLayout::Words, MARKER)
    }

    #[test]
    fn test_parse_valid_line() {
        let line = format!(
            "2024-03-01T10:15:30.123Z ATT Read {}{}",
            MARKER,
            hex_payload(777)
        );
        let record = log_reader().parse_line(&line).unwrap().unwrap();
        assert_eq!(record.timestamp_ms(), 777);
    }

    #[test]
    fn test_line_without_marker_ignored() {
        let line = "2024-03-01T10:15:30.123Z connection parameters updated";
        assert!(log_reader().parse_line(line).is_none());
    }

    #[test]
    fn test_line_without_timestamp_ignored() {
        let line = format!("random noise {}{}", MARKER, hex_payload(1));
        assert!(log_reader().parse_line(&line).is_none());
    }

    #[test]
    fn test_short_payload_is_malformed() {
        // 30 bytes instead of 36
        let payload = "00-".repeat(29) + "00";
        let line = format!("2024-03-01T10:15:30.123Z x {}{}", MARKER, payload);
        let result = log_reader().parse_line(&line).unwrap();
        assert!(matches!(
            result,
            Err(DecodeError::MalformedRecord { expected: 36, actual: 30 })
        ));
    }

    #[test]
    fn test_non_hex_payload_is_malformed() {
        let line = format!("2024-03-01T10:15:30.123Z x {}zz-zz", MARKER);
        let result = log_reader().parse_line(&line).unwrap();
        assert!(matches!(result, Err(DecodeError::MalformedPayload(_))));
    }

    #[test]
    fn test_space_separated_payload() {
        let payload = hex_payload(42).replace('-', " ");
        let line = format!("2024-03-01T10:15:30.123Z x {}{}", MARKER, payload);
        let record = log_reader().parse_line(&line).unwrap().unwrap();
        assert_eq!(record.timestamp_ms(), 42);
    }

    #[test]
    fn test_malformed_line_does_not_stop_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b1.txt");
        let bad_payload = "00-".repeat(29) + "00";
        let content = format!(
            "2024-03-01T10:15:30.123Z x {}{}\n2024-03-01T10:15:30.223Z x {}{}\n",
            MARKER,
            bad_payload,
            MARKER,
            hex_payload(1234)
        );
        std::fs::write(&path, content).unwrap();

        let records = log_reader().read_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp_ms(), 1234);
    }

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex("0aFF"), Some(vec![0x0A, 0xFF]));
        assert_eq!(decode_hex("0a1"), None);
        assert_eq!(decode_hex("zz"), None);
        assert_eq!(decode_hex(""), Some(Vec::new()));
    }
}
