//! Pipeline orchestration
//!
//! This module provides the public API for the converter. It drives a
//! recording through every stage: classification → decoding → timestamping →
//! gap filling → rotation → row formatting.

use std::fs;
use std::io::{ErrorKind, Read};
use std::path::Path;

use serde::Serialize;

use crate::activity_count::ActivityCounter;
use crate::classifier::{acceleration_scale, classify, device_type};
use crate::error::ConvertError;
use crate::format::RowFormatter;
use crate::framer::{FrameEvent, LogRecord, RecordFramer, RecordType};
use crate::gap::GapFiller;
use crate::metadata::read_info;
use crate::mhealth::FileNaming;
use crate::rotator::{OutputRotator, RotationDecision};
use crate::sink::OutputSink;
use crate::source::{check_entries, EntrySource, Gt3xArchive, INFO_ENTRY};
use crate::timestamp::TimestampSequencer;
use crate::types::{
    ConversionSummary, ConvertOptions, DeviceMetadata, DeviceType, DeviceVariant, SamplePair,
};
use crate::unpacker::NonetBuffer;

const READ_CHUNK: usize = 64 * 1024;

/// Read the device metadata of a recording without converting it.
///
/// # Arguments
/// * `input` - Path to a `.gt3x` file
///
/// # Returns
/// The parsed metadata and the variant it classifies as
pub fn read_metadata(input: &Path) -> Result<(DeviceMetadata, DeviceVariant), ConvertError> {
    let mut archive = Gt3xArchive::open(input)?;
    read_source_metadata(&mut archive)
}

pub fn read_source_metadata<S: EntrySource + ?Sized>(
    source: &mut S,
) -> Result<(DeviceMetadata, DeviceVariant), ConvertError> {
    if !source.entry_sizes().contains_key(INFO_ENTRY) {
        return Err(ConvertError::MissingEntry(INFO_ENTRY.to_string()));
    }
    let metadata = read_info(source.open_entry(INFO_ENTRY)?)?;
    let variant = classify(&metadata.serial_number, &metadata.firmware);
    Ok((metadata, variant))
}

/// Metadata with everything derived from it, as reported by `info`
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    #[serde(flatten)]
    pub metadata: DeviceMetadata,
    pub device_type: DeviceType,
    pub variant: DeviceVariant,
    pub acceleration_scale: f64,
}

impl DeviceInfo {
    pub fn new(metadata: DeviceMetadata, variant: DeviceVariant) -> Self {
        let scale = acceleration_scale(
            &metadata.serial_number,
            variant,
            metadata.acceleration_scale,
        );
        Self {
            device_type: device_type(&metadata.serial_number),
            variant,
            acceleration_scale: scale.value(),
            metadata,
        }
    }
}

/// Converts recordings to mHealth CSV files.
///
/// # Example
/// ```ignore
/// let converter = Converter::new(ConvertOptions::default());
/// let summary = converter.convert_file(Path::new("in.gt3x"), Path::new("out"))?;
/// println!("{} files", summary.files.len());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    /// Convert a `.gt3x` file, writing output into `out_dir`
    pub fn convert_file(
        &self,
        input: &Path,
        out_dir: &Path,
    ) -> Result<ConversionSummary, ConvertError> {
        log::info!("Converting {}", input.display());
        let mut archive = Gt3xArchive::open(input)?;
        self.convert_source(&mut archive, out_dir)
    }

    /// Convert any entry source.
    ///
    /// Structural problems (missing entries, bad metadata, unknown device) are
    /// reported before any output file is created.
    pub fn convert_source<S: EntrySource + ?Sized>(
        &self,
        source: &mut S,
        out_dir: &Path,
    ) -> Result<ConversionSummary, ConvertError> {
        let (metadata, variant) = read_source_metadata(source)?;
        let data_entry = variant
            .data_entry()
            .ok_or_else(|| ConvertError::UnknownDevice {
                serial: metadata.serial_number.clone(),
                firmware: metadata.firmware.clone(),
            })?;
        check_entries(&source.entry_sizes(), variant)?;

        let device = device_type(&metadata.serial_number);
        let scale = acceleration_scale(
            &metadata.serial_number,
            variant,
            metadata.acceleration_scale,
        );
        log::info!(
            "{} {} firmware {} ({:?}), {} Hz, scale {}",
            device,
            metadata.serial_number,
            metadata.firmware,
            variant,
            metadata.sample_rate,
            scale.value()
        );

        fs::create_dir_all(out_dir)?;
        let naming = FileNaming::new(
            device,
            &metadata.firmware,
            &metadata.serial_number,
            metadata.timezone.as_deref(),
            metadata.start_date,
        );
        let formatter = RowFormatter::new(
            self.options.values,
            self.options.with_timestamp,
            self.options.dialect,
            scale.value(),
        );
        let sink = OutputSink::create(
            out_dir,
            naming,
            formatter,
            self.options.activity_counts,
            metadata.start_date,
        )?;

        let summary = ConversionSummary::new(&metadata, device, variant);
        let mut run = Run::new(&metadata, &self.options, sink, summary);
        let reader = source.open_entry(data_entry)?;
        if variant == DeviceVariant::Legacy {
            run.decode_legacy(reader)?;
        } else {
            run.decode_framed(reader)?;
        }
        run.finish()
    }
}

/// State owned by one conversion
struct Run {
    sink: OutputSink,
    sequencer: TimestampSequencer,
    rotator: OutputRotator,
    gaps: GapFiller,
    counter: Option<ActivityCounter>,
    summary: ConversionSummary,
}

impl Run {
    fn new(
        metadata: &DeviceMetadata,
        options: &ConvertOptions,
        sink: OutputSink,
        summary: ConversionSummary,
    ) -> Self {
        let sequencer = TimestampSequencer::new(metadata.sample_rate, metadata.start_date);
        let gaps = GapFiller::new(sequencer.nominal_interval());
        Self {
            sink,
            sequencer,
            rotator: OutputRotator::new(options.split),
            gaps,
            counter: options.activity_counts.then(ActivityCounter::new),
            summary,
        }
    }

    fn decode_legacy<R: Read>(&mut self, reader: R) -> Result<(), ConvertError> {
        let mut nonets = NonetBuffer::new();
        let bytes_read = for_each_byte(reader, |byte| match nonets.push(byte) {
            Some(pair) => self.emit(pair, false),
            None => Ok(()),
        })?;
        self.summary.bytes_read = bytes_read;

        let dropped = nonets.clear();
        if dropped > 0 {
            log::warn!("Dropped {dropped} trailing bytes after the last complete sample pair");
            self.summary.trailing_bytes_dropped += dropped as u64;
        }
        Ok(())
    }

    fn decode_framed<R: Read>(&mut self, reader: R) -> Result<(), ConvertError> {
        let mut framer = RecordFramer::new();
        let bytes_read = for_each_byte(reader, |byte| match framer.push(byte) {
            Some(FrameEvent::Record(record)) => self.accept(record),
            Some(FrameEvent::Corrupt(record)) => {
                log::debug!(
                    "Checksum mismatch in {:?} record at {}s; dropped",
                    record.header.record_type,
                    record.header.timestamp
                );
                self.summary.records_rejected += 1;
                Ok(())
            }
            None => Ok(()),
        })?;
        self.summary.bytes_read = bytes_read;

        if let Err(truncated) = framer.finish() {
            log::warn!(
                "Log ended mid-record ({}, {} bytes pending)",
                truncated.state,
                truncated.pending_bytes
            );
            self.summary.truncated = Some(truncated);
        }
        Ok(())
    }

    fn accept(&mut self, record: LogRecord) -> Result<(), ConvertError> {
        self.summary.records_accepted += 1;
        match record.header.record_type {
            RecordType::Activity => self.activity(&record),
            other => {
                log::trace!("Ignoring {other:?} record");
                self.summary.records_ignored += 1;
                Ok(())
            }
        }
    }

    fn activity(&mut self, record: &LogRecord) -> Result<(), ConvertError> {
        let start = record.header.timestamp_ms();

        if let Some(gap) = self.gaps.detect(start) {
            // held pairs never reach past the record's own start
            let mut filled = 0;
            while filled < gap.count && self.sequencer.peek_ahead(1) <= start {
                self.emit(gap.pair, true)?;
                filled += 1;
            }
            log::debug!(
                "Gap before record at {}s: filled {} of {} pairs",
                record.header.timestamp,
                filled,
                gap.count
            );
        }
        self.sequencer.anchor(start);

        let mut nonets = NonetBuffer::new();
        for &byte in &record.payload {
            if let Some(pair) = nonets.push(byte) {
                self.emit(pair, false)?;
            }
        }
        let dropped = nonets.clear();
        if dropped > 0 {
            log::warn!(
                "Activity record at {}s has {} bytes past its last sample pair",
                record.header.timestamp,
                dropped
            );
            self.summary.trailing_bytes_dropped += dropped as u64;
        }
        Ok(())
    }

    /// Timestamp, route and write one pair
    fn emit(&mut self, pair: SamplePair, synthetic: bool) -> Result<(), ConvertError> {
        let first_ts = self.sequencer.advance();
        let second_ts = self.sequencer.advance();

        if let RotationDecision::Rotate { previous, bucket } = self.rotator.observe(first_ts) {
            log::info!("Hour changed ({previous} -> {bucket}); rotating output");
            self.flush_counts()?;
            self.sink.rotate(bucket)?;
        }

        for (timestamp, sample) in [(first_ts, &pair.first), (second_ts, &pair.second)] {
            let line = self.sink.formatter().sample_row(timestamp, sample);
            self.sink.write_sample(&line)?;

            if let Some(counter) = self.counter.as_mut() {
                let values = self.sink.formatter().axis_values(sample);
                if let Some(row) = counter.push(timestamp, values) {
                    let line = self.sink.formatter().count_row(row.timestamp, row.count);
                    self.sink.write_count(&line)?;
                }
            }
        }

        self.gaps.record(&pair, second_ts);
        if synthetic {
            self.summary.synthetic_pairs += 1;
        } else {
            self.summary.pairs_written += 1;
        }
        self.summary.first_timestamp.get_or_insert(first_ts);
        self.summary.last_timestamp = Some(second_ts);
        Ok(())
    }

    fn flush_counts(&mut self) -> Result<(), ConvertError> {
        if let Some(row) = self.counter.as_mut().and_then(ActivityCounter::flush) {
            let line = self.sink.formatter().count_row(row.timestamp, row.count);
            self.sink.write_count(&line)?;
        }
        Ok(())
    }

    fn finish(mut self) -> Result<ConversionSummary, ConvertError> {
        self.flush_counts()?;
        let files = self.sink.finish()?;
        self.summary.files = files.iter().map(|p| p.display().to_string()).collect();
        log::info!(
            "Wrote {} pairs ({} synthetic) to {} files",
            self.summary.pairs_written,
            self.summary.synthetic_pairs,
            self.summary.files.len()
        );
        Ok(self.summary)
    }
}

/// Feed every byte of `reader` to `f`, returning the number of bytes read
fn for_each_byte<R: Read>(
    mut reader: R,
    mut f: impl FnMut(u8) -> Result<(), ConvertError>,
) -> Result<u64, ConvertError> {
    let mut buffer = vec![0u8; READ_CHUNK];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        total += n as u64;
        for &byte in &buffer[..n] {
            f(byte)?;
        }
    }
    Ok(total)
}
