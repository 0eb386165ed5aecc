//! Per-minute activity counts

/// Milliseconds per minute
pub const MINUTE_MS: i64 = 60_000;

pub fn minute_bucket(timestamp_ms: i64) -> i64 {
    timestamp_ms.div_euclid(MINUTE_MS) * MINUTE_MS
}

/// Completed minute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountRow {
    /// Start of the minute
    pub timestamp: i64,
    /// Truncated sum of vector magnitudes
    pub count: i64,
}

/// Running sum of sample vector magnitudes within the current UTC minute
#[derive(Debug, Clone, Default)]
pub struct ActivityCounter {
    bucket: Option<i64>,
    sum: f64,
}

impl ActivityCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one sample. Returns the previous minute when this sample opens a
    /// new one.
    pub fn push(&mut self, timestamp_ms: i64, values: [f64; 3]) -> Option<CountRow> {
        let bucket = minute_bucket(timestamp_ms);
        let completed = match self.bucket {
            Some(current) if current != bucket => self.take(),
            _ => None,
        };
        self.bucket = Some(bucket);
        let [x, y, z] = values;
        self.sum += (x * x + y * y + z * z).sqrt();
        completed
    }

    /// Emit the pending minute, if any, and reset
    pub fn flush(&mut self) -> Option<CountRow> {
        self.take()
    }

    fn take(&mut self) -> Option<CountRow> {
        let timestamp = self.bucket.take()?;
        let count = std::mem::take(&mut self.sum) as i64;
        Some(CountRow { timestamp, count })
    }
}
