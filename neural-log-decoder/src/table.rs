//! Typed sample table and tabular CSV output
//!
//! A [`SampleTable`] is the decoder's end product for one source sequence:
//! an ordered list of time-reconciled samples. This module also owns the CSV
//! surface other tools consume: the `timestamp,ch1..ch16` data table, the
//! degenerate `status,failed` marker written when a source cannot be
//! processed, and the read-back summary used for throughput analysis. A
//! marker file reads back exactly like a zero-row table.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::record::CHANNEL_COUNT;
use crate::types::{DecodeError, Result, Sample};

/// Ordered sequence of decoded samples from one source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleTable {
    samples: Vec<Sample>,
}

impl SampleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Earliest elapsed time, if any samples exist
    pub fn first_timestamp(&self) -> Option<f64> {
        self.samples.first().map(|s| s.elapsed_s)
    }

    /// Latest elapsed time, if any samples exist
    pub fn last_timestamp(&self) -> Option<f64> {
        self.samples.last().map(|s| s.elapsed_s)
    }

    /// Observed duration in seconds (0.0 for empty or single-sample tables)
    pub fn duration_s(&self) -> f64 {
        match (self.first_timestamp(), self.last_timestamp()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// Select a contiguous window of `window_s` seconds centered at the
    /// sequence midpoint.
    ///
    /// Tables shorter than the window are returned whole. An empty table, an
    /// empty selection, or a selection with non-positive duration is
    /// [`DecodeError::EmptySource`]: the caller turns that into the failure
    /// marker rather than emitting misleading data.
    pub fn snippet(&self, window_s: f64) -> Result<SampleTable> {
        if self.is_empty() {
            return Err(DecodeError::EmptySource("empty table".to_string()));
        }

        let first = self.first_timestamp().unwrap_or(0.0);
        let duration = self.duration_s();

        let selected = if duration < window_s {
            log::warn!(
                "total duration {:.3} s is shorter than the {:.3} s window, using entire table",
                duration,
                window_s
            );
            self.clone()
        } else {
            let mid = first + duration / 2.0;
            let start = mid - window_s / 2.0;
            let end = mid + window_s / 2.0;
            let samples = self
                .samples
                .iter()
                .filter(|s| s.elapsed_s >= start && s.elapsed_s <= end)
                .copied()
                .collect();
            SampleTable::from_samples(samples)
        };

        if selected.is_empty() {
            return Err(DecodeError::EmptySource(
                "no samples within snippet window".to_string(),
            ));
        }
        if selected.duration_s() <= 0.0 {
            return Err(DecodeError::EmptySource(
                "snippet window has non-positive duration".to_string(),
            ));
        }
        Ok(selected)
    }

    /// Write the table as CSV: `timestamp,ch1..ch16`, one row per sample,
    /// in time order
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "timestamp")?;
        for i in 1..=CHANNEL_COUNT {
            write!(writer, ",ch{}", i)?;
        }
        writeln!(writer)?;

        for sample in &self.samples {
            write!(writer, "{}", sample.elapsed_s)?;
            for value in &sample.channels {
                write!(writer, ",{}", value)?;
            }
            writeln!(writer)?;
        }

        writer.flush()?;
        log::info!("wrote {} rows to {:?}", self.len(), path);
        Ok(())
    }
}

/// Write the degenerate failure-marker table: a single `status` column with
/// the single value `failed`.
///
/// This is the designed "no data" signal; downstream consumers treat it the
/// same as a zero-row table.
pub fn write_failure_marker(path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "status")?;
    writeln!(writer, "failed")?;
    writer.flush()?;
    log::info!("wrote failure marker to {:?}", path);
    Ok(())
}

/// Read-back summary of one output CSV, used by throughput analysis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableSummary {
    /// Number of data rows
    pub rows: usize,
    /// Earliest timestamp, if any rows exist
    pub first_timestamp: Option<f64>,
    /// Latest timestamp, if any rows exist
    pub last_timestamp: Option<f64>,
    /// Mean interval between consecutive rows, if at least two exist
    pub mean_interval_s: Option<f64>,
}

impl TableSummary {
    /// Observed duration in seconds (0.0 when under two rows)
    pub fn duration_s(&self) -> f64 {
        match (self.first_timestamp, self.last_timestamp) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// Summarize a previously written output CSV.
    ///
    /// A failure-marker file (header `status`) or a file without a
    /// `timestamp` column reads back as zero rows.
    pub fn read_csv(path: &Path) -> Result<TableSummary> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => line?,
            None => return Ok(TableSummary::empty()),
        };
        if !header.starts_with("timestamp") {
            // Marker table or foreign file: treated as zero rows
            return Ok(TableSummary::empty());
        }

        let mut rows = 0usize;
        let mut first = None;
        let mut prev = None;
        let mut last = None;
        let mut interval_sum = 0.0;
        let mut interval_count = 0usize;

        for line in lines {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let field = line.split(',').next().unwrap_or("");
            let ts: f64 = match field.parse() {
                Ok(v) => v,
                Err(_) => {
                    log::warn!("unparsable timestamp {:?} in {:?}, skipping row", field, path);
                    continue;
                }
            };

            rows += 1;
            if first.is_none() {
                first = Some(ts);
            }
            if let Some(p) = prev {
                interval_sum += ts - p;
                interval_count += 1;
            }
            prev = Some(ts);
            last = Some(ts);
        }

        let mean_interval_s = if interval_count > 0 {
            Some(interval_sum / interval_count as f64)
        } else {
            None
        };

        Ok(TableSummary {
            rows,
            first_timestamp: first,
            last_timestamp: last,
            mean_interval_s,
        })
    }

    fn empty() -> TableSummary {
        TableSummary {
            rows: 0,
            first_timestamp: None,
            last_timestamp: None,
            mean_interval_s: None,
        }
    }
}
