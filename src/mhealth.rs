//! mHealth naming and text conventions
//!
//! File names follow
//! `<DEVICE>-AccelerationCalibrated-<fw>.<serial>.<yyyy-MM-dd-HH-mm-ss-SSS>-<tz>.sensor.csv`
//! where dots in the firmware become `x` and the offset is written as
//! `P0530` / `M0400`.

use chrono::{DateTime, Local, Offset, TimeZone, Utc};

use crate::types::{DeviceType, Dialect};

pub const SENSOR_TAG: &str = "-AccelerationCalibrated-";
pub const COUNT_TAG: &str = "-ActivityCount-";
const COUNT_SUFFIX: &str = "-ActivityCount";
const COUNT_MARKER: &str = "ActivityCount";

const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S-%3f";

pub fn sensor_header(with_timestamp: bool) -> &'static str {
    if with_timestamp {
        "HEADER_TIMESTAMP,X,Y,Z"
    } else {
        "X,Y,Z"
    }
}

pub fn count_header(with_timestamp: bool) -> &'static str {
    if with_timestamp {
        "HEADER_TIMESTAMP,ACTIVITY_COUNT"
    } else {
        "ACTIVITY_COUNT"
    }
}

fn utc(timestamp_ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(timestamp_ms).single()
}

/// Render a data timestamp in the dialect's format (UTC).
///
/// Out-of-range instants fall back to the raw millisecond count.
pub fn format_timestamp(timestamp_ms: i64, dialect: Dialect) -> String {
    let pattern = match dialect {
        Dialect::Mhealth => "%Y-%m-%d %H:%M:%S%.3f",
        Dialect::Actigraph => "%-m/%-d/%Y %H:%M:%S%.3f",
    };
    match utc(timestamp_ms) {
        Some(instant) => instant.format(pattern).to_string(),
        None => timestamp_ms.to_string(),
    }
}

/// Encode a `±HH:MM[:SS]` offset as `PHHMM` / `MHHMM`.
///
/// An unsigned offset is taken as positive. Anything else yields `None`.
pub fn encode_timezone(offset: &str) -> Option<String> {
    let offset = offset.trim();
    let (sign, rest) = match offset.chars().next()? {
        '+' => ('P', &offset[1..]),
        '-' => ('M', &offset[1..]),
        c if c.is_ascii_digit() => ('P', offset),
        _ => return None,
    };

    let mut parts = rest.split(':');
    let hours = parts.next()?;
    let minutes = parts.next()?;
    let two_digits = |s: &str| s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(hours) || !two_digits(minutes) {
        return None;
    }
    if let Some(seconds) = parts.next() {
        if !two_digits(seconds) || parts.next().is_some() {
            return None;
        }
    }
    Some(format!("{sign}{hours}{minutes}"))
}

/// Encode an offset given in seconds east of UTC
pub fn encode_offset_seconds(seconds: i32) -> String {
    let sign = if seconds < 0 { 'M' } else { 'P' };
    let minutes = seconds.unsigned_abs() / 60;
    format!("{sign}{:02}{:02}", minutes / 60, minutes % 60)
}

/// Host offset at the given instant, for devices that do not record one
pub fn local_offset(timestamp_ms: i64) -> String {
    let seconds = utc(timestamp_ms)
        .map(|instant| {
            Local
                .offset_from_utc_datetime(&instant.naive_utc())
                .fix()
                .local_minus_utc()
        })
        .unwrap_or(0);
    encode_offset_seconds(seconds)
}

/// Everything needed to name a device's output files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNaming {
    pub device_type: DeviceType,
    pub firmware: String,
    pub serial_number: String,
    /// Encoded offset, e.g. `M0400`
    pub timezone: String,
}

impl FileNaming {
    pub fn new(
        device_type: DeviceType,
        firmware: &str,
        serial_number: &str,
        timezone: Option<&str>,
        start_ms: i64,
    ) -> Self {
        let timezone = match timezone {
            Some(raw) => encode_timezone(raw).unwrap_or_else(|| {
                log::warn!("Unrecognized timezone {raw:?}; using host offset");
                local_offset(start_ms)
            }),
            None => local_offset(start_ms),
        };
        Self {
            device_type,
            firmware: firmware.replace('.', "x"),
            serial_number: serial_number.to_string(),
            timezone,
        }
    }

    pub fn sensor_file_name(&self, timestamp_ms: i64) -> String {
        let stamp = match utc(timestamp_ms) {
            Some(instant) => instant.format(FILE_TIMESTAMP_FORMAT).to_string(),
            None => timestamp_ms.to_string(),
        };
        format!(
            "{}{}{}.{}.{}-{}.sensor.csv",
            self.device_type, SENSOR_TAG, self.firmware, self.serial_number, stamp, self.timezone
        )
    }

    pub fn count_file_name(&self, timestamp_ms: i64) -> String {
        summary_file_name(&self.sensor_file_name(timestamp_ms))
    }
}

/// Derive the activity count file name from a sensor file name
pub fn summary_file_name(sensor_file: &str) -> String {
    let mut tokens: Vec<String> = sensor_file.split('.').map(str::to_string).collect();
    if let Some(first) = tokens.get_mut(0) {
        *first = first.replace(SENSOR_TAG, COUNT_TAG);
    }
    if let Some(second) = tokens.get_mut(1) {
        if !second.contains(COUNT_MARKER) {
            second.push_str(COUNT_SUFFIX);
        }
    }
    tokens.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn naming() -> FileNaming {
        FileNaming::new(
            DeviceType::WGt3xBt,
            "1.9.2",
            "MOS2E22140412",
            Some("-04:00:00"),
            0,
        )
    }

    #[test]
    fn test_sensor_file_name() {
        // 2017-10-01T12:34:56.789Z
        assert_eq!(
            naming().sensor_file_name(1_506_861_296_789),
            "WGT3XBT-AccelerationCalibrated-1x9x2.MOS2E22140412.2017-10-01-12-34-56-789-M0400.sensor.csv"
        );
    }

    #[test]
    fn test_summary_file_name() {
        assert_eq!(
            naming().count_file_name(1_506_861_296_789),
            "WGT3XBT-ActivityCount-1x9x2.MOS2E22140412-ActivityCount.2017-10-01-12-34-56-789-M0400.sensor.csv"
        );
        let already = "A-AccelerationCalibrated-1.S-ActivityCount.x.sensor.csv";
        assert_eq!(
            summary_file_name(already),
            "A-ActivityCount-1.S-ActivityCount.x.sensor.csv"
        );
        // marker anywhere in the serial token counts as already suffixed
        let inner = "A-AccelerationCalibrated-1.X-ActivityCount-foo.x.sensor.csv";
        assert_eq!(
            summary_file_name(inner),
            "A-ActivityCount-1.X-ActivityCount-foo.x.sensor.csv"
        );
    }

    #[test]
    fn test_local_offset_matches_host() {
        let ts = 1_506_816_000_000;
        let instant = Utc.timestamp_millis_opt(ts).unwrap();
        let expected = encode_offset_seconds(instant.with_timezone(&Local).offset().local_minus_utc());
        assert_eq!(local_offset(ts), expected);

        let missing = FileNaming::new(DeviceType::Gt3xPlus, "2.5.0", "NEO1A12345", None, ts);
        assert_eq!(missing.timezone, expected);
        let garbled = FileNaming::new(DeviceType::Gt3xPlus, "2.5.0", "NEO1A12345", Some("EST"), ts);
        assert_eq!(garbled.timezone, expected);
    }

    #[test]
    fn test_encode_timezone() {
        assert_eq!(encode_timezone("-04:00:00").as_deref(), Some("M0400"));
        assert_eq!(encode_timezone("+05:30").as_deref(), Some("P0530"));
        assert_eq!(encode_timezone("00:00:00").as_deref(), Some("P0000"));
        assert_eq!(encode_timezone("EST"), None);
        assert_eq!(encode_timezone("-4:00"), None);
        assert_eq!(encode_timezone(""), None);
        assert_eq!(encode_offset_seconds(-4 * 3600), "M0400");
        assert_eq!(encode_offset_seconds(19_800), "P0530");
    }

    #[test]
    fn test_format_timestamp_dialects() {
        let ts = 1_506_816_000_033;
        assert_eq!(format_timestamp(ts, Dialect::Mhealth), "2017-10-01 00:00:00.033");
        assert_eq!(format_timestamp(ts, Dialect::Actigraph), "10/1/2017 00:00:00.033");
    }

    #[test]
    fn test_headers() {
        assert_eq!(sensor_header(true), "HEADER_TIMESTAMP,X,Y,Z");
        assert_eq!(sensor_header(false), "X,Y,Z");
        assert_eq!(count_header(true), "HEADER_TIMESTAMP,ACTIVITY_COUNT");
        assert_eq!(count_header(false), "ACTIVITY_COUNT");
    }
}
