//! Per-sample timestamp generation
//!
//! Sample rates rarely divide 1000 ms evenly. The sequencer splits the
//! interval into a whole-millisecond quotient plus a reduced fraction and
//! spreads the fraction's extra milliseconds evenly across its cycle, so the
//! k-th emission lands exactly on `round(k * 1000 / rate)` with no drift.

/// .NET ticks at the Unix epoch
pub const EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// 100 ns ticks per millisecond
pub const TICKS_PER_MILLI: i64 = 10_000;

/// Convert .NET ticks to milliseconds since the Unix epoch
pub fn ticks_to_millis(ticks: i64) -> i64 {
    (ticks - EPOCH_TICKS) / TICKS_PER_MILLI
}

/// Nominal interval in milliseconds, rounded to two decimals
pub fn nominal_interval_ms(sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    (100_000.0 / f64::from(sample_rate)).round() / 100.0
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Half-up rounding of `numerator / denominator` for non-negative operands
fn round_ratio(numerator: u64, denominator: u64) -> u64 {
    (2 * numerator + denominator) / (2 * denominator)
}

#[derive(Debug, Clone)]
pub struct TimestampSequencer {
    /// Whole milliseconds per sample
    quotient: i64,
    /// Fractional millisecond per sample as `numerator / denominator`
    numerator: u64,
    denominator: u64,
    /// Position within the fraction's cycle; wraps, never reset
    phase: u64,
    /// Timestamp the next sample will receive
    next: i64,
    last_emitted: Option<i64>,
    nominal: f64,
}

impl TimestampSequencer {
    /// Sequencer whose first emission is `start_ms`. A zero rate never advances.
    pub fn new(sample_rate: u32, start_ms: i64) -> Self {
        let rate = u64::from(sample_rate.max(1));
        let remainder = 1000 % rate;
        let (numerator, denominator) = if remainder == 0 {
            (0, 1)
        } else {
            let divisor = gcd(remainder, rate);
            (remainder / divisor, rate / divisor)
        };

        Self {
            quotient: if sample_rate == 0 { 0 } else { (1000 / rate) as i64 },
            numerator: if sample_rate == 0 { 0 } else { numerator },
            denominator,
            phase: 0,
            next: start_ms,
            last_emitted: None,
            nominal: nominal_interval_ms(sample_rate),
        }
    }

    /// Timestamp of the next emission
    pub fn peek(&self) -> i64 {
        self.next
    }

    /// Timestamp the emission `steps` after the next one will receive
    pub fn peek_ahead(&self, steps: usize) -> i64 {
        let mut ahead = self.clone();
        for _ in 0..steps {
            ahead.advance();
        }
        ahead.next
    }

    pub fn last_emitted(&self) -> Option<i64> {
        self.last_emitted
    }

    /// Nominal interval `d` in milliseconds
    pub fn nominal_interval(&self) -> f64 {
        self.nominal
    }

    /// Emit the current timestamp and step to the next one
    pub fn advance(&mut self) -> i64 {
        let emitted = self.next;
        let extra = round_ratio((self.phase + 1) * self.numerator, self.denominator)
            - round_ratio(self.phase * self.numerator, self.denominator);
        self.phase = (self.phase + 1) % self.denominator;
        self.next += self.quotient + extra as i64;
        self.last_emitted = Some(emitted);
        emitted
    }

    /// Re-anchor the sequence to an absolute time.
    ///
    /// The anchor is clamped to the last emitted timestamp so that time never
    /// moves backwards. Returns the timestamp actually adopted.
    pub fn anchor(&mut self, timestamp_ms: i64) -> i64 {
        self.next = match self.last_emitted {
            Some(last) => timestamp_ms.max(last),
            None => timestamp_ms,
        };
        self.next
    }
}
