//! Throughput, packet-loss and stability analysis
//!
//! Works entirely off the per-unit output CSVs written by the batch step, so
//! it can rerun without re-decoding. Expected packet counts derive from the
//! snippet window: `snippet_seconds × frequency`. A marker table or missing
//! file counts as all packets lost.

use std::collections::BTreeMap;
use std::path::Path;

use neural_log_decoder::TableSummary;
use rayon::prelude::*;
use serde::Serialize;

use crate::batch::UnitResult;
use crate::config::ExperimentConfig;

/// Per-unit analysis numbers
#[derive(Debug, Clone, Serialize)]
pub struct UnitStats {
    pub frequency_hz: u32,
    pub configuration: String,
    pub expected_packets: u64,
    pub actual_packets: u64,
    /// Samples per second over the observed duration (0 when duration is 0)
    pub throughput_hz: f64,
    /// `expected - actual`, floored at zero
    pub packets_lost: u64,
    /// `actual / expected` (0 when nothing was expected)
    pub efficiency: f64,
    /// Mean interval between consecutive samples, if at least two exist
    pub mean_interval_s: Option<f64>,
    /// `mean_interval_s - 1/frequency`, the sampling-period deviation
    pub interval_deviation_s: Option<f64>,
}

/// Highest stable frequency per configuration (`None`: never stable)
pub type StabilityMap = BTreeMap<String, Option<u32>>;

/// Compute stats for every unit by reading its output CSV back.
///
/// Units are independent, so the read-back map runs on the rayon pool like
/// the decode step.
pub fn analyze_units(results: &[UnitResult], config: &ExperimentConfig) -> Vec<UnitStats> {
    results
        .par_iter()
        .map(|result| {
            let expected = expected_packets(config, result.unit.frequency_hz);
            unit_stats(
                &result.unit.output,
                result.unit.frequency_hz,
                &result.unit.configuration,
                expected,
            )
        })
        .collect()
}

/// Expected sample count for one frequency over the snippet window
pub fn expected_packets(config: &ExperimentConfig, frequency_hz: u32) -> u64 {
    (config.sweep.snippet_seconds * f64::from(frequency_hz)) as u64
}

fn unit_stats(
    csv_path: &Path,
    frequency_hz: u32,
    configuration: &str,
    expected_packets: u64,
) -> UnitStats {
    let summary = match TableSummary::read_csv(csv_path) {
        Ok(summary) => summary,
        Err(e) => {
            // Unreadable output counts as all packets lost
            log::error!("could not read {:?}: {}", csv_path, e);
            TableSummary {
                rows: 0,
                first_timestamp: None,
                last_timestamp: None,
                mean_interval_s: None,
            }
        }
    };

    let actual_packets = summary.rows as u64;
    let duration = summary.duration_s();
    let throughput_hz = if duration > 0.0 {
        summary.rows as f64 / duration
    } else {
        0.0
    };
    let packets_lost = expected_packets.saturating_sub(actual_packets);
    let efficiency = if expected_packets > 0 {
        actual_packets as f64 / expected_packets as f64
    } else {
        0.0
    };
    let interval_deviation_s = summary
        .mean_interval_s
        .map(|mean| mean - 1.0 / f64::from(frequency_hz));

    UnitStats {
        frequency_hz,
        configuration: configuration.to_string(),
        expected_packets,
        actual_packets,
        throughput_hz,
        packets_lost,
        efficiency,
        mean_interval_s: summary.mean_interval_s,
        interval_deviation_s,
    }
}

/// Highest frequency whose packet loss stays within the allowed budget,
/// per configuration
pub fn analyze_stability(stats: &[UnitStats], max_allowed_packet_loss: u64) -> StabilityMap {
    let mut stability: StabilityMap = BTreeMap::new();
    for stat in stats {
        let entry = stability.entry(stat.configuration.clone()).or_insert(None);
        if stat.packets_lost <= max_allowed_packet_loss {
            *entry = Some(entry.unwrap_or(0).max(stat.frequency_hz));
        }
    }

    for (configuration, highest) in &stability {
        match highest {
            Some(freq) => {
                log::info!("highest stable frequency for {}: {} Hz", configuration, freq)
            }
            None => log::info!("no stable frequency found for {}", configuration),
        }
    }
    stability
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{Unit, UnitOutcome};
    use neural_log_decoder::write_failure_marker;
    use std::io::Write;

    fn write_csv(path: &Path, timestamps: &[f64]) {
        let mut file = std::fs::File::create(path).unwrap();
        writeln!(file, "timestamp,ch1,ch2").unwrap();
        for t in timestamps {
            writeln!(file, "{},0,0", t).unwrap();
        }
    }

    fn stats_for(path: &Path, frequency_hz: u32, expected: u64) -> UnitStats {
        unit_stats(path, frequency_hz, "SD (Intan)", expected)
    }

    #[test]
    fn test_unit_stats_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("100_SD_Intan.csv");
        // 11 samples over exactly 1 second
        let timestamps: Vec<f64> = (0..=10).map(|i| i as f64 * 0.1).collect();
        write_csv(&path, &timestamps);

        let stats = stats_for(&path, 100, 100);
        assert_eq!(stats.actual_packets, 11);
        assert_eq!(stats.packets_lost, 89);
        assert!((stats.throughput_hz - 11.0).abs() < 1e-9);
        assert!((stats.efficiency - 0.11).abs() < 1e-9);
        assert!((stats.mean_interval_s.unwrap() - 0.1).abs() < 1e-9);
        assert!((stats.interval_deviation_s.unwrap() - 0.09).abs() < 1e-9);
    }

    #[test]
    fn test_marker_counts_as_all_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("250_SD_Intan.csv");
        write_failure_marker(&path).unwrap();

        let stats = stats_for(&path, 250, 2500);
        assert_eq!(stats.actual_packets, 0);
        assert_eq!(stats.packets_lost, 2500);
        assert_eq!(stats.throughput_hz, 0.0);
        assert_eq!(stats.efficiency, 0.0);
        assert!(stats.mean_interval_s.is_none());
    }

    #[test]
    fn test_missing_file_counts_as_all_lost() {
        let stats = stats_for(Path::new("/nonexistent.csv"), 100, 1000);
        assert_eq!(stats.packets_lost, 1000);
    }

    #[test]
    fn test_surplus_packets_floor_loss_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&path, &[0.0, 0.5, 1.0, 1.5]);

        let stats = stats_for(&path, 100, 2);
        assert_eq!(stats.packets_lost, 0);
    }

    #[test]
    fn test_stability_picks_highest_within_budget() {
        let mk = |frequency_hz: u32, packets_lost: u64| UnitStats {
            frequency_hz,
            configuration: "BLE (Intan)".to_string(),
            expected_packets: 0,
            actual_packets: 0,
            throughput_hz: 0.0,
            packets_lost,
            efficiency: 0.0,
            mean_interval_s: None,
            interval_deviation_s: None,
        };
        let stats = vec![mk(100, 0), mk(250, 50), mk(500, 101), mk(1000, 2000)];

        let stability = analyze_stability(&stats, 100);
        assert_eq!(stability["BLE (Intan)"], Some(250));
    }

    #[test]
    fn test_stability_none_when_always_lossy() {
        let stats = vec![UnitStats {
            frequency_hz: 100,
            configuration: "SD (Intan)".to_string(),
            expected_packets: 1000,
            actual_packets: 0,
            throughput_hz: 0.0,
            packets_lost: 1000,
            efficiency: 0.0,
            mean_interval_s: None,
            interval_deviation_s: None,
        }];
        let stability = analyze_stability(&stats, 100);
        assert_eq!(stability["SD (Intan)"], None);
    }

    #[test]
    fn test_analyze_units_reads_outputs_back() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("100_SD_Intan.csv");
        write_csv(&out, &[0.0, 0.01, 0.02]);

        let toml_content = r#"
            [sweep]
            frequencies_hz = [100]
            snippet_seconds = 10.0

            [[configuration]]
            name = "SD (Intan)"
            source = [{ frequency_hz = 100, path = "session_1" }]
        "#;
        let config: ExperimentConfig = toml::from_str(toml_content).unwrap();

        let results = vec![UnitResult {
            unit: Unit {
                frequency_hz: 100,
                configuration: "SD (Intan)".to_string(),
                input: None,
                output: out,
                expected_failure: false,
            },
            outcome: UnitOutcome::Processed { rows: 3 },
        }];

        let stats = analyze_units(&results, &config);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].expected_packets, 1000);
        assert_eq!(stats[0].actual_packets, 3);
    }
}
