//! Decoder configuration
//!
//! All knobs the decoder needs are carried explicitly in this struct; there is
//! no process-wide state shared between source sequences. Construction is
//! builder style so callers only name what they change.

use serde::{Deserialize, Serialize};

use crate::record::{ChannelMode, RecordLayout};

/// Configuration for one decoding pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// How channel codes are interpreted (physical µV vs raw codes)
    #[serde(default)]
    pub channel_mode: ChannelMode,

    /// Wire layout of the records in this source
    #[serde(default)]
    pub layout: RecordLayout,

    /// Analysis window length in seconds; `None` keeps the whole table
    #[serde(default)]
    pub snippet_seconds: Option<f64>,

    /// Marker substring a BLE sniffer line must contain before its hex payload
    #[serde(default = "default_ble_marker")]
    pub ble_marker: String,

    /// Filename prefix of binary session files (`<prefix><N>.bin`)
    #[serde(default = "default_session_prefix")]
    pub session_prefix: String,
}

fn default_ble_marker() -> String {
    "handle: 0x12, value (0x): ".to_string()
}

fn default_session_prefix() -> String {
    "data_".to_string()
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            channel_mode: ChannelMode::default(),
            layout: RecordLayout::default(),
            snippet_seconds: None,
            ble_marker: default_ble_marker(),
            session_prefix: default_session_prefix(),
        }
    }
}

impl DecoderConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the channel interpretation mode
    pub fn with_channel_mode(mut self, mode: ChannelMode) -> Self {
        self.channel_mode = mode;
        self
    }

    /// Builder method: set the record wire layout
    pub fn with_layout(mut self, layout: RecordLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Builder method: set the snippet window in seconds
    pub fn with_snippet_seconds(mut self, seconds: f64) -> Self {
        self.snippet_seconds = Some(seconds);
        self
    }

    /// Builder method: override the BLE line marker
    pub fn with_ble_marker(mut self, marker: impl Into<String>) -> Self {
        self.ble_marker = marker.into();
        self
    }

    /// Builder method: override the session file prefix
    pub fn with_session_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.session_prefix = prefix.into();
        self
    }
}
