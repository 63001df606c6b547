//! Processing summary output
//!
//! Two artifacts land in the output folder after a batch run: a
//! human-readable `summary.txt` and a machine-readable `summary.json` with
//! the full per-unit numbers. Failing to write these is the one hard error
//! of the whole run — everything upstream degrades to failure markers, but a
//! run that cannot record any outcome at all has produced nothing.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::analysis::{StabilityMap, UnitStats};
use crate::batch::{BatchSummary, UnitOutcome, UnitResult};

/// Everything `summary.json` carries
#[derive(Debug, Serialize)]
pub struct AnalysisReport<'a> {
    pub generated_at: String,
    pub batch: BatchSummary,
    pub units: &'a [UnitStats],
    pub stability: &'a StabilityMap,
}

impl<'a> AnalysisReport<'a> {
    pub fn new(batch: BatchSummary, units: &'a [UnitStats], stability: &'a StabilityMap) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            batch,
            units,
            stability,
        }
    }
}

/// Write `summary.json` and `summary.txt` into the output folder
pub fn write_summary(
    output_folder: &Path,
    report: &AnalysisReport<'_>,
    results: &[UnitResult],
) -> Result<()> {
    let json_path = output_folder.join("summary.json");
    let json = serde_json::to_string_pretty(report).context("serializing summary")?;
    fs::write(&json_path, json).with_context(|| format!("writing {:?}", json_path))?;

    let txt_path = output_folder.join("summary.txt");
    let text = render_text(report, results);
    fs::write(&txt_path, text).with_context(|| format!("writing {:?}", txt_path))?;

    log::info!("processing summary: {}", report.batch);
    Ok(())
}

fn render_text(report: &AnalysisReport<'_>, results: &[UnitResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Processing Summary ({})", report.generated_at);
    let _ = writeln!(out, "{}", report.batch);
    let _ = writeln!(out);

    let failures: Vec<_> = results
        .iter()
        .filter_map(|r| match &r.outcome {
            UnitOutcome::UnexpectedFailure { reason } => Some((&r.unit, reason)),
            _ => None,
        })
        .collect();
    if !failures.is_empty() {
        let _ = writeln!(out, "Unexpected failures:");
        for (unit, reason) in failures {
            let _ = writeln!(
                out,
                "  {} Hz, {}: {}",
                unit.frequency_hz, unit.configuration, reason
            );
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(
        out,
        "{:>8}  {:<28} {:>10} {:>10} {:>8} {:>12} {:>10}",
        "freq", "configuration", "expected", "actual", "lost", "throughput", "efficiency"
    );
    for stat in report.units {
        let _ = writeln!(
            out,
            "{:>6}Hz  {:<28} {:>10} {:>10} {:>8} {:>10.1}Hz {:>9.1}%",
            stat.frequency_hz,
            stat.configuration,
            stat.expected_packets,
            stat.actual_packets,
            stat.packets_lost,
            stat.throughput_hz,
            stat.efficiency * 100.0
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Highest stable sampling frequency:");
    for (configuration, highest) in report.stability {
        match highest {
            Some(freq) => {
                let _ = writeln!(out, "  {}: {} Hz", configuration, freq);
            }
            None => {
                let _ = writeln!(out, "  {}: none", configuration);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stats() -> Vec<UnitStats> {
        vec![UnitStats {
            frequency_hz: 100,
            configuration: "SD (Intan)".to_string(),
            expected_packets: 1000,
            actual_packets: 995,
            throughput_hz: 99.5,
            packets_lost: 5,
            efficiency: 0.995,
            mean_interval_s: Some(0.01005),
            interval_deviation_s: Some(0.00005),
        }]
    }

    #[test]
    fn test_write_summary_files() {
        let dir = tempfile::tempdir().unwrap();
        let stats = sample_stats();
        let mut stability = StabilityMap::new();
        stability.insert("SD (Intan)".to_string(), Some(100));

        let batch = BatchSummary {
            total_units: 1,
            processed: 1,
            expected_failures: 0,
            unexpected_failures: 0,
        };
        let report = AnalysisReport::new(batch, &stats, &stability);
        write_summary(dir.path(), &report, &[]).unwrap();

        let json = std::fs::read_to_string(dir.path().join("summary.json")).unwrap();
        assert!(json.contains("\"actual_packets\": 995"));
        assert!(json.contains("\"SD (Intan)\": 100"));

        let text = std::fs::read_to_string(dir.path().join("summary.txt")).unwrap();
        assert!(text.contains("1 units: 1 processed"));
        assert!(text.contains("SD (Intan): 100 Hz"));
    }

    #[test]
    fn test_text_lists_unexpected_failures() {
        let results = vec![UnitResult {
            unit: crate::batch::Unit {
                frequency_hz: 500,
                configuration: "BLE (Intan)".to_string(),
                input: None,
                output: std::path::PathBuf::from("500_BLE_Intan.csv"),
                expected_failure: false,
            },
            outcome: UnitOutcome::UnexpectedFailure {
                reason: "input not found".to_string(),
            },
        }];
        let batch = BatchSummary::from_results(&results);
        let stats = Vec::new();
        let stability = StabilityMap::new();
        let report = AnalysisReport::new(batch, &stats, &stability);

        let text = render_text(&report, &results);
        assert!(text.contains("500 Hz, BLE (Intan): input not found"));
    }
}
