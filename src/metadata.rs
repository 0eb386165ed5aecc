//! `info.txt` parsing
//!
//! The metadata entry is a list of `Key: Value` lines. Dates are .NET ticks.

use std::collections::HashMap;
use std::io::Read;
use std::str::FromStr;

use crate::error::ConvertError;
use crate::timestamp::ticks_to_millis;
use crate::types::DeviceMetadata;

/// Split each line on its first colon into trimmed key and value
pub fn parse_pairs(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

struct Fields(HashMap<String, String>);

impl Fields {
    fn text(&self, key: &str) -> Option<String> {
        self.0.get(key).filter(|v| !v.is_empty()).cloned()
    }

    fn required_text(&self, key: &str) -> Result<String, ConvertError> {
        self.text(key)
            .ok_or_else(|| ConvertError::MissingField(key.to_string()))
    }

    fn number<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConvertError> {
        match self.0.get(key).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(value) => value
                .replace(',', ".")
                .parse()
                .map(Some)
                .map_err(|_| ConvertError::InvalidField {
                    key: key.to_string(),
                    value: value.clone(),
                }),
        }
    }

    fn required_number<T: FromStr>(&self, key: &str) -> Result<T, ConvertError> {
        self.number(key)?
            .ok_or_else(|| ConvertError::MissingField(key.to_string()))
    }

    /// Zero ticks means the date was never set
    fn date(&self, key: &str) -> Result<Option<i64>, ConvertError> {
        Ok(self
            .number::<i64>(key)?
            .filter(|&ticks| ticks > 0)
            .map(ticks_to_millis))
    }
}

pub fn parse_info(text: &str) -> Result<DeviceMetadata, ConvertError> {
    let fields = Fields(parse_pairs(text));

    let sample_rate: u32 = fields.required_number("Sample Rate")?;
    if sample_rate == 0 {
        return Err(ConvertError::InvalidField {
            key: "Sample Rate".to_string(),
            value: "0".to_string(),
        });
    }
    let start_date = fields
        .date("Start Date")?
        .ok_or_else(|| ConvertError::MissingField("Start Date".to_string()))?;

    Ok(DeviceMetadata {
        serial_number: fields.required_text("Serial Number")?,
        firmware: fields.required_text("Firmware")?,
        sample_rate,
        start_date,
        stop_date: fields.date("Stop Date")?,
        download_date: fields.date("Download Date")?,
        last_sample_time: fields.date("Last Sample Time")?,
        board_revision: fields.number("Board Revision")?,
        battery_voltage: fields.number("Battery Voltage")?,
        reported_device_type: fields.text("Device Type"),
        acceleration_scale: fields.number("Acceleration Scale")?,
        acceleration_min: fields.number("Acceleration Min")?,
        acceleration_max: fields.number("Acceleration Max")?,
        timezone: fields.text("TimeZone"),
    })
}

pub fn read_info<R: Read>(mut reader: R) -> Result<DeviceMetadata, ConvertError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    parse_info(&String::from_utf8_lossy(&bytes))
}
