//! Timestamp reconciliation
//!
//! The hardware timestamp is a 32-bit millisecond counter that restarts from
//! near zero when it overflows or when the firmware begins a fresh recording
//! file. This module folds the raw per-record timestamps of one ordered source
//! sequence into a single monotonically non-decreasing elapsed-time series.
//!
//! The correction is a heuristic: any backward jump is taken as evidence the
//! counter restarted after reaching the previous raw value, so the previous
//! raw value is added to a running offset. It cannot distinguish a genuine
//! wrap from a single out-of-order record with a smaller timestamp; the tests
//! pin that behavior as intended rather than papering over it.

/// Reconciles wrapping hardware timestamps into monotonic elapsed time.
///
/// One reconciler serves exactly one source sequence. It starts `Idle`,
/// moves to `Accumulating` on the first record, and is reset (or dropped)
/// when the next sequence begins. State is never persisted.
#[derive(Debug, Clone, Default)]
pub struct TimestampReconciler {
    state: State,
}

#[derive(Debug, Clone, Default)]
enum State {
    /// Before the first record of a sequence
    #[default]
    Idle,
    /// After the first record
    Accumulating {
        /// Cumulative elapsed milliseconds from completed counter runs
        base_offset_ms: u64,
        /// Last raw counter value seen
        last_timestamp_ms: u64,
    },
}

impl TimestampReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all state, ready for a new source sequence
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }

    /// Fold one raw counter value into the absolute elapsed milliseconds.
    ///
    /// Never fails; always produces a value. A raw value smaller than the
    /// previous one bumps the base offset by the previous raw value first.
    pub fn absolute_ms(&mut self, raw_ms: u32) -> u64 {
        let raw = u64::from(raw_ms);
        match self.state {
            State::Idle => {
                self.state = State::Accumulating {
                    base_offset_ms: 0,
                    last_timestamp_ms: raw,
                };
                raw
            }
            State::Accumulating {
                mut base_offset_ms,
                last_timestamp_ms,
            } => {
                if raw < last_timestamp_ms {
                    log::debug!(
                        "timestamp drop {} -> {} ms, assuming counter restart",
                        last_timestamp_ms,
                        raw
                    );
                    base_offset_ms += last_timestamp_ms;
                }
                self.state = State::Accumulating {
                    base_offset_ms,
                    last_timestamp_ms: raw,
                };
                base_offset_ms + raw
            }
        }
    }

    /// Same as [`absolute_ms`](Self::absolute_ms) but in seconds, the unit
    /// used by the output table
    pub fn elapsed_s(&mut self, raw_ms: u32) -> f64 {
        self.absolute_ms(raw_ms) as f64 / 1000.0
    }
}
