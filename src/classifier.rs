//! Device classification
//!
//! Maps serial number and firmware strings to the recording variant, the
//! hardware family and the acceleration scale used to convert ADC values to G.

use crate::types::{DeviceType, DeviceVariant};

/// Scale of NEO (GT3X+) and CLE (wGT3X+) devices
pub const SCALE_NEO_CLE: f64 = 341.0;

/// Scale of MOS (wGT3X-BT family) devices
pub const SCALE_MOS: f64 = 256.0;

/// Serial prefixes whose variant depends on the firmware version
const FIRMWARE_DEPENDENT_PREFIXES: [&str; 2] = ["NEO", "MRA"];

/// Serial prefixes that always record framed logs
const FRAMED_PREFIXES: [&str; 6] = ["CLE", "MOS0", "MOS2", "MOS3", "MOS4", "TAS"];

/// Decide which encoding a device used.
///
/// NEO and MRA devices record the legacy stream up to firmware 2.6.x and the
/// framed log from 2.7 on. An unparseable firmware string on those prefixes,
/// or an unrecognized prefix, yields [`DeviceVariant::Unknown`].
pub fn classify(serial: &str, firmware: &str) -> DeviceVariant {
    if serial.is_empty() || firmware.is_empty() {
        return DeviceVariant::Unknown;
    }

    if FIRMWARE_DEPENDENT_PREFIXES
        .iter()
        .any(|prefix| serial.starts_with(prefix))
    {
        return match parse_major_minor(firmware) {
            Some((major, _)) if major > 2 => DeviceVariant::Framed,
            Some((2, minor)) if minor > 6 => DeviceVariant::Framed,
            Some(_) => DeviceVariant::Legacy,
            None => DeviceVariant::Unknown,
        };
    }

    if FRAMED_PREFIXES.iter().any(|prefix| serial.starts_with(prefix)) {
        return DeviceVariant::Framed;
    }

    DeviceVariant::Unknown
}

/// Leading `major.minor` of a firmware string. A missing minor counts as 0.
fn parse_major_minor(firmware: &str) -> Option<(u32, u32)> {
    let mut parts = firmware.trim().split('.');
    let major = parts.next()?.trim().parse().ok()?;
    let minor = match parts.next() {
        Some(minor) => minor.trim().parse().ok()?,
        None => 0,
    };
    Some((major, minor))
}

pub fn device_type(serial: &str) -> DeviceType {
    const TABLE: [(&str, DeviceType); 8] = [
        ("NEO", DeviceType::Gt3xPlus),
        ("MRA", DeviceType::ActiSleepPlus),
        ("CLE", DeviceType::WGt3xPlus),
        ("MOS0", DeviceType::WGt3xBt),
        ("MOS2", DeviceType::WGt3xBt),
        ("MOS3", DeviceType::WActiSleepPlus),
        ("MOS4", DeviceType::WActiSleepBt),
        ("TAS", DeviceType::Gt9xLink),
    ];

    TABLE
        .iter()
        .find(|(prefix, _)| serial.starts_with(prefix))
        .map(|(_, device_type)| *device_type)
        .unwrap_or(DeviceType::Unknown)
}

/// Where an acceleration scale came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccelerationScale {
    /// Fixed constant of the NEO/CLE hardware family
    NeoCle,
    /// Fixed constant of the MOS hardware family
    Mos,
    /// Value reported in the device metadata
    Reported(f64),
}

impl AccelerationScale {
    pub fn value(&self) -> f64 {
        match self {
            AccelerationScale::NeoCle => SCALE_NEO_CLE,
            AccelerationScale::Mos => SCALE_MOS,
            AccelerationScale::Reported(scale) => *scale,
        }
    }
}

/// Select the acceleration scale for a device.
///
/// Legacy recordings always use the NEO/CLE constant. Framed recordings use
/// the family constant where one is known, then the reported value. A device
/// outside both families that reports no usable scale falls back to the
/// NEO/CLE constant.
pub fn acceleration_scale(
    serial: &str,
    variant: DeviceVariant,
    reported: Option<f64>,
) -> AccelerationScale {
    if variant == DeviceVariant::Legacy || serial.starts_with("NEO") || serial.starts_with("CLE") {
        return AccelerationScale::NeoCle;
    }
    if serial.starts_with("MOS") {
        return AccelerationScale::Mos;
    }
    match reported {
        Some(scale) if scale.is_finite() && scale > 0.0 => AccelerationScale::Reported(scale),
        _ => {
            log::warn!(
                "No usable acceleration scale reported for {serial}; using {SCALE_NEO_CLE}"
            );
            AccelerationScale::NeoCle
        }
    }
}
