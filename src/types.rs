//! Core types for the GT3X conversion pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: device metadata, decoded samples, run options, and the summary
//! reported at the end of a conversion.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hardware family, derived from the serial number prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceType {
    #[serde(rename = "GT3XPLUS")]
    Gt3xPlus,
    #[serde(rename = "ACTISLEEPPLUS")]
    ActiSleepPlus,
    #[serde(rename = "WGT3XPLUS")]
    WGt3xPlus,
    #[serde(rename = "WGT3XBT")]
    WGt3xBt,
    #[serde(rename = "WACTISLEEPPLUS")]
    WActiSleepPlus,
    #[serde(rename = "WACTISLEEPBT")]
    WActiSleepBt,
    #[serde(rename = "GT9XLINK")]
    Gt9xLink,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl DeviceType {
    /// Name used in mHealth file names
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Gt3xPlus => "GT3XPLUS",
            DeviceType::ActiSleepPlus => "ACTISLEEPPLUS",
            DeviceType::WGt3xPlus => "WGT3XPLUS",
            DeviceType::WGt3xBt => "WGT3XBT",
            DeviceType::WActiSleepPlus => "WACTISLEEPPLUS",
            DeviceType::WActiSleepBt => "WACTISLEEPBT",
            DeviceType::Gt9xLink => "GT9XLINK",
            DeviceType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-device recording encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceVariant {
    /// Fixed-width packed stream in `activity.bin`
    Legacy,
    /// Framed log records in `log.bin`
    Framed,
    Unknown,
}

impl DeviceVariant {
    /// Container entry holding the sample stream for this variant
    pub fn data_entry(&self) -> Option<&'static str> {
        match self {
            DeviceVariant::Legacy => Some(crate::source::ACTIVITY_ENTRY),
            DeviceVariant::Framed => Some(crate::source::LOG_ENTRY),
            DeviceVariant::Unknown => None,
        }
    }
}

/// Device metadata parsed from `info.txt`.
///
/// All timestamps are milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceMetadata {
    pub serial_number: String,
    pub firmware: String,
    /// Sample rate in Hz
    pub sample_rate: u32,
    pub start_date: i64,
    pub stop_date: Option<i64>,
    pub download_date: Option<i64>,
    pub last_sample_time: Option<i64>,
    pub board_revision: Option<u32>,
    pub battery_voltage: Option<f64>,
    /// Device type as reported by the device itself (informational)
    pub reported_device_type: Option<String>,
    /// Acceleration scale reported by newer devices
    pub acceleration_scale: Option<f64>,
    pub acceleration_min: Option<f64>,
    pub acceleration_max: Option<f64>,
    /// Timezone offset as written by the device, e.g. `-04:00:00`
    pub timezone: Option<String>,
}

/// One tri-axial sample in raw ADC units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl Sample {
    pub fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// Axis values in G for the given acceleration scale
    pub fn to_g(&self, scale: f64) -> [f64; 3] {
        [
            f64::from(self.x) / scale,
            f64::from(self.y) / scale,
            f64::from(self.z) / scale,
        ]
    }

    pub fn to_raw(&self) -> [f64; 3] {
        [f64::from(self.x), f64::from(self.y), f64::from(self.z)]
    }
}

/// Two samples decoded from one 9-byte nonet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplePair {
    pub first: Sample,
    pub second: Sample,
}

impl SamplePair {
    pub fn new(first: Sample, second: Sample) -> Self {
        Self { first, second }
    }

    /// Pair holding the same sample twice (used for gap filling)
    pub fn repeated(sample: Sample) -> Self {
        Self {
            first: sample,
            second: sample,
        }
    }
}

/// Unit of the axis values written to the output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueMode {
    /// Samples divided by the acceleration scale
    #[default]
    G,
    /// Raw 12-bit ADC values
    Adc,
}

/// Output text dialect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `yyyy-MM-dd HH:mm:ss.SSS` timestamps, `\n` line endings
    #[default]
    Mhealth,
    /// `M/d/yyyy HH:mm:ss.SSS` timestamps, `\r\n` line endings
    Actigraph,
}

impl Dialect {
    pub fn line_ending(&self) -> &'static str {
        match self {
            Dialect::Mhealth => "\n",
            Dialect::Actigraph => "\r\n",
        }
    }
}

/// Options controlling a conversion run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    pub values: ValueMode,
    pub with_timestamp: bool,
    /// Start a new output file every UTC hour
    pub split: bool,
    pub dialect: Dialect,
    /// Also write per-minute activity count files
    pub activity_counts: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            values: ValueMode::G,
            with_timestamp: true,
            split: false,
            dialect: Dialect::Mhealth,
            activity_counts: false,
        }
    }
}

impl ConvertOptions {
    /// Load options from a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, crate::error::ConvertError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Log stream that ended inside a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truncation {
    /// Framer state at end of stream
    pub state: String,
    /// Bytes of the incomplete record that were read
    pub pending_bytes: usize,
}

/// Report produced by a conversion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionSummary {
    pub run_id: String,
    pub serial_number: String,
    pub device_type: DeviceType,
    pub firmware: String,
    pub variant: DeviceVariant,
    pub sample_rate: u32,
    pub bytes_read: u64,
    pub pairs_written: u64,
    pub synthetic_pairs: u64,
    pub records_accepted: u64,
    pub records_rejected: u64,
    pub records_ignored: u64,
    pub trailing_bytes_dropped: u64,
    pub truncated: Option<Truncation>,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
    pub files: Vec<String>,
}

impl ConversionSummary {
    pub fn new(metadata: &DeviceMetadata, device_type: DeviceType, variant: DeviceVariant) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            serial_number: metadata.serial_number.clone(),
            device_type,
            firmware: metadata.firmware.clone(),
            variant,
            sample_rate: metadata.sample_rate,
            bytes_read: 0,
            pairs_written: 0,
            synthetic_pairs: 0,
            records_accepted: 0,
            records_rejected: 0,
            records_ignored: 0,
            trailing_bytes_dropped: 0,
            truncated: None,
            first_timestamp: None,
            last_timestamp: None,
            files: Vec::new(),
        }
    }
}
