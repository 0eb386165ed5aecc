//! Builders for synthetic recordings used across the test suite

use std::io::Write;
use std::path::Path;

use crate::framer::{encode_record, RecordType};
use crate::timestamp::{EPOCH_TICKS, TICKS_PER_MILLI};
use crate::types::{Sample, SamplePair};
use crate::unpacker::pack;

/// `info.txt` with the fields the converter needs
pub fn info_txt(
    serial: &str,
    firmware: &str,
    sample_rate: u32,
    start_ms: i64,
    timezone: Option<&str>,
) -> String {
    let ticks = start_ms * TICKS_PER_MILLI + EPOCH_TICKS;
    let mut text = format!(
        "Serial Number: {serial}\r\n\
         Firmware: {firmware}\r\n\
         Battery Voltage: 4.10\r\n\
         Sample Rate: {sample_rate}\r\n\
         Start Date: {ticks}\r\n\
         Stop Date: 0\r\n\
         Download Date: {ticks}\r\n\
         Board Revision: 4\r\n"
    );
    if let Some(tz) = timezone {
        text.push_str(&format!("TimeZone: {tz}\r\n"));
    }
    text
}

/// `count` distinct pairs with small positive and negative values
pub fn pairs(count: usize) -> Vec<SamplePair> {
    (0..count)
        .map(|i| {
            let v = i as i16;
            SamplePair::new(Sample::new(v, -v, 256), Sample::new(v + 1, -(v + 1), 256))
        })
        .collect()
}

/// Concatenated nonets
pub fn nonets(pairs: &[SamplePair]) -> Vec<u8> {
    pairs.iter().flat_map(pack).collect()
}

/// A valid activity record holding `pairs`
pub fn activity_record(seconds: u32, pairs: &[SamplePair]) -> Vec<u8> {
    encode_record(RecordType::Activity, seconds, &nonets(pairs))
}

/// Write a zip container with the given entries
pub fn write_container(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, bytes) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap();
}
