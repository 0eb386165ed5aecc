//! CSV row rendering

use crate::mhealth;
use crate::types::{Dialect, Sample, ValueMode};

/// Render a value with at most three decimals, rounding half up.
///
/// Trailing zero decimals are dropped and a bare decimal point is never
/// written. Values that round to zero print as `0` without a sign.
pub fn format_3_decimals(value: f64) -> String {
    let scaled = (value.abs() * 1000.0 + 0.5) as i64;
    let integer = scaled / 1000;
    let fraction = scaled % 1000;

    let mut out = String::with_capacity(12);
    if value < 0.0 && scaled != 0 {
        out.push('-');
    }
    out.push_str(&integer.to_string());
    if fraction != 0 {
        let tenths = fraction / 100;
        let hundredths = (fraction / 10) % 10;
        let thousandths = fraction % 10;
        out.push('.');
        out.push_str(&tenths.to_string());
        if hundredths != 0 || thousandths != 0 {
            out.push_str(&hundredths.to_string());
        }
        if thousandths != 0 {
            out.push_str(&thousandths.to_string());
        }
    }
    out
}

/// Renders data rows, summary rows and headers for one run
#[derive(Debug, Clone)]
pub struct RowFormatter {
    values: ValueMode,
    with_timestamp: bool,
    dialect: Dialect,
    scale: f64,
}

impl RowFormatter {
    pub fn new(values: ValueMode, with_timestamp: bool, dialect: Dialect, scale: f64) -> Self {
        Self {
            values,
            with_timestamp,
            dialect,
            scale,
        }
    }

    /// Axis values in the unit written to the output
    pub fn axis_values(&self, sample: &Sample) -> [f64; 3] {
        match self.values {
            ValueMode::G => sample.to_g(self.scale),
            ValueMode::Adc => sample.to_raw(),
        }
    }

    pub fn sensor_header(&self) -> String {
        format!(
            "{}{}",
            mhealth::sensor_header(self.with_timestamp),
            self.dialect.line_ending()
        )
    }

    pub fn count_header(&self) -> String {
        format!(
            "{}{}",
            mhealth::count_header(self.with_timestamp),
            self.dialect.line_ending()
        )
    }

    pub fn sample_row(&self, timestamp_ms: i64, sample: &Sample) -> String {
        let values = match self.values {
            ValueMode::Adc => format!("{},{},{}", sample.x, sample.y, sample.z),
            ValueMode::G => {
                let [x, y, z] = sample.to_g(self.scale);
                format!(
                    "{},{},{}",
                    format_3_decimals(x),
                    format_3_decimals(y),
                    format_3_decimals(z)
                )
            }
        };
        self.with_prefix(timestamp_ms, &values)
    }

    pub fn count_row(&self, timestamp_ms: i64, count: i64) -> String {
        self.with_prefix(timestamp_ms, &count.to_string())
    }

    fn with_prefix(&self, timestamp_ms: i64, body: &str) -> String {
        let eol = self.dialect.line_ending();
        if self.with_timestamp {
            format!(
                "{},{body}{eol}",
                mhealth::format_timestamp(timestamp_ms, self.dialect)
            )
        } else {
            format!("{body}{eol}")
        }
    }
}
