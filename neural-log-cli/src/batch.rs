//! Batch processing of (frequency, configuration) units
//!
//! Every unit is independent: it reads its own input and writes its own
//! output CSV, so the whole batch maps onto a fixed-size rayon pool with no
//! shared mutable state. Failures are contained per unit — a unit that
//! cannot be processed gets the failure-marker table and an outcome, and the
//! rest of the batch proceeds.

use std::fmt;
use std::path::PathBuf;

use neural_log_decoder::{write_failure_marker, DecodeError, Decoder, DecoderConfig};
use rayon::prelude::*;

use crate::config::{sanitize_name, ExperimentConfig};

/// One independent unit of work: decode one source, write one CSV
#[derive(Debug, Clone)]
pub struct Unit {
    pub frequency_hz: u32,
    pub configuration: String,
    /// Input session folder or BLE log; `None` when the config lists no
    /// source for this pair
    pub input: Option<PathBuf>,
    pub output: PathBuf,
    /// Known on-device failure: write the marker without touching input
    pub expected_failure: bool,
}

/// What happened to one unit
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    /// Decoded and written successfully
    Processed { rows: usize },
    /// Known failure, marker written as designed
    ExpectedFailure,
    /// Anything else: missing input, decode error, I/O error
    UnexpectedFailure { reason: String },
}

/// A unit together with its outcome
#[derive(Debug, Clone)]
pub struct UnitResult {
    pub unit: Unit,
    pub outcome: UnitOutcome,
}

/// Aggregated batch outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct BatchSummary {
    pub total_units: usize,
    pub processed: usize,
    pub expected_failures: usize,
    pub unexpected_failures: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[UnitResult]) -> Self {
        let mut summary = BatchSummary {
            total_units: results.len(),
            ..Default::default()
        };
        for result in results {
            match result.outcome {
                UnitOutcome::Processed { .. } => summary.processed += 1,
                UnitOutcome::ExpectedFailure => summary.expected_failures += 1,
                UnitOutcome::UnexpectedFailure { .. } => summary.unexpected_failures += 1,
            }
        }
        summary
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} units: {} processed, {} expected failures, {} unexpected failures",
            self.total_units, self.processed, self.expected_failures, self.unexpected_failures
        )
    }
}

/// Expand the experiment config into the flat unit list.
///
/// Output name: `<frequency>_<sanitized configuration>.csv`.
pub fn plan_units(
    config: &ExperimentConfig,
    base_folder: &std::path::Path,
    output_folder: &std::path::Path,
) -> Vec<Unit> {
    let mut units = Vec::new();
    for entry in &config.configurations {
        for &frequency_hz in &config.sweep.frequencies_hz {
            let output = output_folder.join(format!(
                "{}_{}.csv",
                frequency_hz,
                sanitize_name(&entry.name)
            ));
            let input = config
                .source_path(&entry.name, frequency_hz)
                .map(|p| base_folder.join(p));
            units.push(Unit {
                frequency_hz,
                configuration: entry.name.clone(),
                input,
                output,
                expected_failure: config.is_expected_failure(&entry.name, frequency_hz),
            });
        }
    }
    units
}

/// Run all units on the rayon pool and collect per-unit results
pub fn run_units(units: Vec<Unit>, decoder_config: &DecoderConfig) -> Vec<UnitResult> {
    units
        .into_par_iter()
        .map(|unit| {
            let decoder = Decoder::new(decoder_config.clone());
            let outcome = process_unit(&unit, &decoder);
            UnitResult { unit, outcome }
        })
        .collect()
}

/// Process a single unit; never propagates, always yields an outcome
fn process_unit(unit: &Unit, decoder: &Decoder) -> UnitOutcome {
    if unit.expected_failure {
        log::info!(
            "expected failure for {} Hz, {}",
            unit.frequency_hz,
            unit.configuration
        );
        return match write_failure_marker(&unit.output) {
            Ok(()) => UnitOutcome::ExpectedFailure,
            Err(e) => marker_write_failed(unit, e),
        };
    }

    let input = match &unit.input {
        Some(path) => path.clone(),
        None => {
            log::warn!(
                "no input configured for {} Hz, {}",
                unit.frequency_hz,
                unit.configuration
            );
            return fail_with_marker(unit, "no input configured".to_string());
        }
    };

    match decoder.decode_source(&input) {
        Ok(table) => match table.write_csv(&unit.output) {
            Ok(()) => {
                log::info!(
                    "processed {} Hz, {}: {} rows",
                    unit.frequency_hz,
                    unit.configuration,
                    table.len()
                );
                UnitOutcome::Processed { rows: table.len() }
            }
            Err(e) => fail_with_marker(unit, format!("writing {:?}: {}", unit.output, e)),
        },
        Err(DecodeError::MissingInput(path)) => {
            log::warn!("file or folder not found: {:?}", path);
            fail_with_marker(unit, format!("input not found: {:?}", path))
        }
        Err(e) => {
            log::error!(
                "error processing {:?} for {} Hz, {}: {}",
                input,
                unit.frequency_hz,
                unit.configuration,
                e
            );
            fail_with_marker(unit, e.to_string())
        }
    }
}

/// Record a failure: write the marker table, keep the reason
fn fail_with_marker(unit: &Unit, reason: String) -> UnitOutcome {
    match write_failure_marker(&unit.output) {
        Ok(()) => UnitOutcome::UnexpectedFailure { reason },
        Err(e) => marker_write_failed(unit, e),
    }
}

fn marker_write_failed(unit: &Unit, error: DecodeError) -> UnitOutcome {
    log::error!(
        "could not write failure marker {:?}: {}",
        unit.output,
        error
    );
    UnitOutcome::UnexpectedFailure {
        reason: format!("failure marker not written: {}", error),
    }
}
