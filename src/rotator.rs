//! Hourly output rollover

/// Milliseconds per hour
pub const HOUR_MS: i64 = 3_600_000;

/// Start of the UTC hour containing `timestamp_ms`
pub fn hour_bucket(timestamp_ms: i64) -> i64 {
    timestamp_ms.div_euclid(HOUR_MS) * HOUR_MS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationDecision {
    /// Keep writing to the current sink
    Continue,
    /// Close the current sinks and open new ones named for `bucket`
    Rotate { previous: i64, bucket: i64 },
}

/// Tracks the current hour bucket and decides when to roll over.
///
/// Evaluated once per sample pair with the pair's first timestamp, so both
/// samples of a pair always share a file.
#[derive(Debug, Clone)]
pub struct OutputRotator {
    split: bool,
    current: Option<i64>,
}

impl OutputRotator {
    pub fn new(split: bool) -> Self {
        Self {
            split,
            current: None,
        }
    }

    pub fn observe(&mut self, timestamp_ms: i64) -> RotationDecision {
        let bucket = hour_bucket(timestamp_ms);
        match self.current {
            None => {
                self.current = Some(bucket);
                RotationDecision::Continue
            }
            Some(previous) if self.split && previous != bucket => {
                self.current = Some(bucket);
                RotationDecision::Rotate { previous, bucket }
            }
            Some(_) => RotationDecision::Continue,
        }
    }
}
