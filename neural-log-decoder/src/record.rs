//! Wire-exact record layouts
//!
//! The acquisition firmware emits one fixed-size record per sample, in one of
//! two layouts, both little-endian:
//!
//! - **Words** (canonical, 36 bytes): 16 × 16-bit channel codes followed by a
//!   32-bit millisecond timestamp.
//! - **Packed** (byte-oriented, 244 bytes): 32-bit millisecond timestamp
//!   followed by 16 channels × 15 single-byte values.
//!
//! Decoding is exact-length: anything other than the expected record size is
//! a [`DecodeError::MalformedRecord`]. Channel codes are kept bit-exact so
//! that `from_bytes` / `to_bytes` round-trips byte for byte; signed
//! interpretation and physical scaling happen only in [`RawRecord::to_sample`].

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};

use crate::types::{DecodeError, Result, Sample};

/// Number of independent measurement streams per record
pub const CHANNEL_COUNT: usize = 16;

/// Amplifier scale factor in µV per bit (RHD2000 series)
pub const ADC_SCALE_UV: f64 = 0.195;

/// Canonical record size: 16 little-endian 16-bit codes + u32 timestamp
pub const WORD_RECORD_BYTES: usize = 2 * CHANNEL_COUNT + 4;

/// Byte values carried per channel in the packed layout
pub const PACKED_BYTES_PER_CHANNEL: usize = 15;

/// Packed record size: u32 timestamp + 16 channels of 15 bytes
pub const PACKED_RECORD_BYTES: usize = 4 + CHANNEL_COUNT * PACKED_BYTES_PER_CHANNEL;

/// Which wire layout a source uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordLayout {
    /// 36-byte records: channel words first, timestamp last
    #[default]
    Words,
    /// 244-byte records: timestamp first, byte-packed channels after
    Packed,
}

impl RecordLayout {
    /// Exact record size in bytes for this layout
    pub fn record_bytes(&self) -> usize {
        match self {
            RecordLayout::Words => WORD_RECORD_BYTES,
            RecordLayout::Packed => PACKED_RECORD_BYTES,
        }
    }
}

/// How channel codes are interpreted when building a [`Sample`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMode {
    /// Reinterpret codes as signed 16-bit and scale by [`ADC_SCALE_UV`] to µV
    #[default]
    SignedMicrovolts,
    /// Unsigned raw ADC codes, no scaling
    RawCodes,
}

/// One raw record as read off the wire, before scaling or time reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRecord {
    Words {
        /// Bit-exact channel codes in record order
        codes: [u16; CHANNEL_COUNT],
        /// Hardware millisecond counter value
        timestamp_ms: u32,
    },
    Packed {
        /// Hardware millisecond counter value
        timestamp_ms: u32,
        /// Per-channel byte values in record order
        channels: [[u8; PACKED_BYTES_PER_CHANNEL]; CHANNEL_COUNT],
    },
}

impl RawRecord {
    /// Decode one record from an exact-length buffer.
    ///
    /// Zero-length input is the caller's end-of-input signal and is still
    /// reported as `MalformedRecord` here; callers treat `actual == 0` as
    /// normal termination and any other mismatch as corruption.
    pub fn from_bytes(layout: RecordLayout, buf: &[u8]) -> Result<Self> {
        let expected = layout.record_bytes();
        if buf.len() != expected {
            return Err(DecodeError::MalformedRecord {
                expected,
                actual: buf.len(),
            });
        }

        let mut cursor = Cursor::new(buf);
        match layout {
            RecordLayout::Words => {
                let mut codes = [0u16; CHANNEL_COUNT];
                for code in codes.iter_mut() {
                    *code = cursor.read_u16::<LittleEndian>()?;
                }
                let timestamp_ms = cursor.read_u32::<LittleEndian>()?;
                Ok(RawRecord::Words { codes, timestamp_ms })
            }
            RecordLayout::Packed => {
                let timestamp_ms = cursor.read_u32::<LittleEndian>()?;
                let mut channels = [[0u8; PACKED_BYTES_PER_CHANNEL]; CHANNEL_COUNT];
                let data = &buf[4..];
                for (ch, chunk) in channels
                    .iter_mut()
                    .zip(data.chunks_exact(PACKED_BYTES_PER_CHANNEL))
                {
                    ch.copy_from_slice(chunk);
                }
                Ok(RawRecord::Packed { timestamp_ms, channels })
            }
        }
    }

    /// Re-encode this record into its exact wire bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            RawRecord::Words { codes, timestamp_ms } => {
                let mut buf = Vec::with_capacity(WORD_RECORD_BYTES);
                for code in codes {
                    buf.extend_from_slice(&code.to_le_bytes());
                }
                buf.extend_from_slice(&timestamp_ms.to_le_bytes());
                buf
            }
            RawRecord::Packed { timestamp_ms, channels } => {
                let mut buf = Vec::with_capacity(PACKED_RECORD_BYTES);
                buf.extend_from_slice(&timestamp_ms.to_le_bytes());
                for ch in channels {
                    buf.extend_from_slice(ch);
                }
                buf
            }
        }
    }

    /// The layout this record was decoded from
    pub fn layout(&self) -> RecordLayout {
        match self {
            RawRecord::Words { .. } => RecordLayout::Words,
            RawRecord::Packed { .. } => RecordLayout::Packed,
        }
    }

    /// Raw hardware timestamp in milliseconds
    pub fn timestamp_ms(&self) -> u32 {
        match self {
            RawRecord::Words { timestamp_ms, .. } => *timestamp_ms,
            RawRecord::Packed { timestamp_ms, .. } => *timestamp_ms,
        }
    }

    /// Channel readings as numbers, per the given mode.
    ///
    /// Packed records carry 15 byte values per channel; the leading byte is
    /// taken as the channel's representative reading.
    pub fn channel_readings(&self, mode: ChannelMode) -> [f64; CHANNEL_COUNT] {
        let mut readings = [0.0; CHANNEL_COUNT];
        match self {
            RawRecord::Words { codes, .. } => {
                for (out, code) in readings.iter_mut().zip(codes) {
                    *out = match mode {
                        ChannelMode::SignedMicrovolts => (*code as i16) as f64 * ADC_SCALE_UV,
                        ChannelMode::RawCodes => *code as f64,
                    };
                }
            }
            RawRecord::Packed { channels, .. } => {
                // Packed byte values are unsigned; only the scale factor is mode-dependent
                for (out, ch) in readings.iter_mut().zip(channels) {
                    *out = match mode {
                        ChannelMode::SignedMicrovolts => ch[0] as f64 * ADC_SCALE_UV,
                        ChannelMode::RawCodes => ch[0] as f64,
                    };
                }
            }
        }
        readings
    }

    /// Build a [`Sample`] from this record using an already-reconciled
    /// elapsed time in seconds
    pub fn to_sample(&self, elapsed_s: f64, mode: ChannelMode) -> Sample {
        Sample::new(elapsed_s, self.channel_readings(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_record_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        for i in 0..CHANNEL_COUNT as u16 {
            buf.extend_from_slice(&(i * 100).to_le_bytes());
        }
        buf.extend_from_slice(&1234u32.to_le_bytes());
        buf
    }

    #[test]
    fn test_word_record_round_trip() {
        let buf = word_record_bytes();
        let record = RawRecord::from_bytes(RecordLayout::Words, &buf).unwrap();
        assert_eq!(record.timestamp_ms(), 1234);
        assert_eq!(record.to_bytes(), buf);
    }

    #[test]
    fn test_word_record_negative_codes_round_trip() {
        let mut buf = Vec::new();
        for _ in 0..CHANNEL_COUNT {
            buf.extend_from_slice(&(-5i16 as u16).to_le_bytes());
        }
        buf.extend_from_slice(&0u32.to_le_bytes());

        let record = RawRecord::from_bytes(RecordLayout::Words, &buf).unwrap();
        assert_eq!(record.to_bytes(), buf);

        let readings = record.channel_readings(ChannelMode::SignedMicrovolts);
        assert!((readings[0] - (-5.0 * ADC_SCALE_UV)).abs() < 1e-12);
    }

    #[test]
    fn test_packed_record_round_trip() {
        let mut buf = Vec::with_capacity(PACKED_RECORD_BYTES);
        buf.extend_from_slice(&9999u32.to_le_bytes());
        for i in 0..(CHANNEL_COUNT * PACKED_BYTES_PER_CHANNEL) {
            buf.push((i % 200) as u8);
        }

        let record = RawRecord::from_bytes(RecordLayout::Packed, &buf).unwrap();
        assert_eq!(record.timestamp_ms(), 9999);
        assert_eq!(record.layout(), RecordLayout::Packed);
        assert_eq!(record.to_bytes(), buf);
    }

    #[test]
    fn test_wrong_length_is_malformed() {
        for len in [0usize, 1, 30, 35, 37, 243, 245] {
            let buf = vec![0u8; len];
            let err = RawRecord::from_bytes(RecordLayout::Words, &buf).unwrap_err();
            match err {
                DecodeError::MalformedRecord { expected, actual } => {
                    assert_eq!(expected, WORD_RECORD_BYTES);
                    assert_eq!(actual, len);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_scaling_modes() {
        let mut buf = Vec::new();
        // code 1000 in every channel
        for _ in 0..CHANNEL_COUNT {
            buf.extend_from_slice(&1000u16.to_le_bytes());
        }
        buf.extend_from_slice(&0u32.to_le_bytes());
        let record = RawRecord::from_bytes(RecordLayout::Words, &buf).unwrap();

        let scaled = record.channel_readings(ChannelMode::SignedMicrovolts);
        assert!((scaled[7] - 195.0).abs() < 1e-9);

        let raw = record.channel_readings(ChannelMode::RawCodes);
        assert_eq!(raw[7], 1000.0);
    }

    #[test]
    fn test_record_sizes() {
        assert_eq!(RecordLayout::Words.record_bytes(), 36);
        assert_eq!(RecordLayout::Packed.record_bytes(), 244);
    }
}
