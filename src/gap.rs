//! Gap detection for framed recordings
//!
//! When an activity record starts more than one nominal interval after the
//! last written sample, the missing time is filled with pairs that hold the
//! last recorded sample.

use crate::types::{Sample, SamplePair};

/// Synthetic pairs to emit before a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    pub pair: SamplePair,
    pub count: u64,
}

#[derive(Debug, Clone)]
pub struct GapFiller {
    interval_ms: f64,
    last: Option<(i64, Sample)>,
}

impl GapFiller {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            last: None,
        }
    }

    /// Remember a written pair and the timestamp of its second sample
    pub fn record(&mut self, pair: &SamplePair, timestamp_ms: i64) {
        self.last = Some((timestamp_ms, pair.second));
    }

    /// Pairs missing before a record starting at `record_start`.
    ///
    /// Each pair covers two nominal intervals. Nothing is filled before the
    /// first real sample.
    pub fn detect(&self, record_start: i64) -> Option<Gap> {
        let (last_ts, last) = self.last?;
        if self.interval_ms <= 0.0 {
            return None;
        }
        let gap = (record_start - last_ts) as f64;
        if gap <= self.interval_ms {
            return None;
        }
        let count = (gap / (2.0 * self.interval_ms)).floor() as u64;
        (count > 0).then(|| Gap {
            pair: SamplePair::repeated(last),
            count,
        })
    }
}
