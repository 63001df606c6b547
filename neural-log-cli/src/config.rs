//! Experiment configuration loading and parsing
//!
//! The sweep layout — which frequencies were recorded, which configuration
//! maps to which file or session folder, and which combinations are known to
//! have failed on-device — is experiment data, not code. It lives in a TOML
//! file and is deserialized into the typed structs below.

use anyhow::{bail, Context, Result};
use neural_log_decoder::{ChannelMode, DecoderConfig, RecordLayout};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main experiment configuration (loaded from experiment.toml)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExperimentConfig {
    pub sweep: SweepConfig,
    #[serde(default)]
    pub decode: DecodeConfig,
    #[serde(rename = "configuration")]
    pub configurations: Vec<ConfigurationEntry>,
    #[serde(default, rename = "expected_failure")]
    pub expected_failures: Vec<ExpectedFailure>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SweepConfig {
    /// Sampling frequencies in Hz, one recording per configuration each
    pub frequencies_hz: Vec<u32>,
    /// Analysis window length in seconds
    pub snippet_seconds: f64,
    /// Packet-loss threshold for the stability analysis
    #[serde(default = "default_max_packet_loss")]
    pub max_allowed_packet_loss: u64,
}

fn default_max_packet_loss() -> u64 {
    100
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DecodeConfig {
    #[serde(default)]
    pub channel_mode: ChannelMode,
    #[serde(default)]
    pub layout: RecordLayout,
}

/// One acquisition configuration and the input it recorded per frequency
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfigurationEntry {
    /// Display name, e.g. "BLE+SD (Intan) SD"
    pub name: String,
    #[serde(rename = "source")]
    pub sources: Vec<SourceEntry>,
}

/// Input path (relative to the base folder) for one frequency
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceEntry {
    pub frequency_hz: u32,
    /// Session folder name or BLE log filename
    pub path: String,
}

/// A (frequency, configuration) pair known to have failed during recording
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ExpectedFailure {
    pub frequency_hz: u32,
    pub configuration: String,
}

impl ExperimentConfig {
    /// The decoder configuration shared by every unit of this experiment
    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig::new()
            .with_channel_mode(self.decode.channel_mode)
            .with_layout(self.decode.layout)
            .with_snippet_seconds(self.sweep.snippet_seconds)
    }

    /// Look up the input path for one (configuration, frequency) pair
    pub fn source_path(&self, configuration: &str, frequency_hz: u32) -> Option<&str> {
        self.configurations
            .iter()
            .find(|c| c.name == configuration)?
            .sources
            .iter()
            .find(|s| s.frequency_hz == frequency_hz)
            .map(|s| s.path.as_str())
    }

    pub fn is_expected_failure(&self, configuration: &str, frequency_hz: u32) -> bool {
        self.expected_failures.iter().any(|f| {
            f.frequency_hz == frequency_hz && f.configuration == configuration
        })
    }
}

/// Turn a configuration display name into a filename-safe stem,
/// e.g. "BLE+SD (Intan) SD" -> "BLEplusSD_Intan_SD"
pub fn sanitize_name(name: &str) -> String {
    name.replace('+', "plus")
        .replace(' ', "_")
        .replace(['(', ')'], "")
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<ExperimentConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: ExperimentConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    if config.sweep.frequencies_hz.is_empty() {
        bail!("config {:?} lists no sampling frequencies", path);
    }
    if config.sweep.snippet_seconds <= 0.0 {
        bail!("snippet_seconds must be positive");
    }
    if config.configurations.is_empty() {
        bail!("config {:?} lists no configurations", path);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [sweep]
        frequencies_hz = [100, 250]
        snippet_seconds = 10.0
        max_allowed_packet_loss = 100

        [decode]
        channel_mode = "signed_microvolts"
        layout = "words"

        [[configuration]]
        name = "BLE+SD (Intan) SD"
        source = [
            { frequency_hz = 100, path = "session_1" },
            { frequency_hz = 250, path = "session_2" },
        ]

        [[configuration]]
        name = "BLE (Intan)"
        source = [
            { frequency_hz = 100, path = "b10.txt" },
        ]

        [[expected_failure]]
        frequency_hz = 250
        configuration = "BLE (Intan)"
    "#;

    #[test]
    fn test_config_deserialization() {
        let config: ExperimentConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.sweep.frequencies_hz, vec![100, 250]);
        assert_eq!(config.configurations.len(), 2);
        assert_eq!(config.source_path("BLE+SD (Intan) SD", 250), Some("session_2"));
        assert_eq!(config.source_path("BLE (Intan)", 250), None);
        assert!(config.is_expected_failure("BLE (Intan)", 250));
        assert!(!config.is_expected_failure("BLE (Intan)", 100));
    }

    #[test]
    fn test_decoder_config_mapping() {
        let config: ExperimentConfig = toml::from_str(SAMPLE).unwrap();
        let decoder_config = config.decoder_config();
        assert_eq!(decoder_config.snippet_seconds, Some(10.0));
        assert_eq!(decoder_config.channel_mode, ChannelMode::SignedMicrovolts);
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("BLE+SD (Intan) SD"), "BLEplusSD_Intan_SD");
        assert_eq!(sanitize_name("SD (Intan)"), "SD_Intan");
    }

    #[test]
    fn test_rejects_empty_sweep() {
        let toml_content = r#"
            [sweep]
            frequencies_hz = []
            snippet_seconds = 10.0

            [[configuration]]
            name = "x"
            source = []
        "#;
        let config: ExperimentConfig = toml::from_str(toml_content).unwrap();
        assert!(config.sweep.frequencies_hz.is_empty());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experiment.toml");
        std::fs::write(&path, toml_content).unwrap();
        assert!(load_config(&path).is_err());
    }
}
