//! Output files
//!
//! A run writes one sensor file and, when activity counts are enabled, one
//! summary file alongside it. Both roll over together.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::ConvertError;
use crate::format::RowFormatter;
use crate::mhealth::FileNaming;

struct OpenFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl OpenFile {
    fn create(path: PathBuf, header: &str) -> Result<Self, ConvertError> {
        let mut writer = BufWriter::new(File::create(&path)?);
        writer.write_all(header.as_bytes())?;
        log::info!("Writing {}", path.display());
        Ok(Self { path, writer })
    }

    fn close(mut self) -> Result<PathBuf, ConvertError> {
        self.writer.flush()?;
        Ok(self.path)
    }
}

pub struct OutputSink {
    dir: PathBuf,
    naming: FileNaming,
    formatter: RowFormatter,
    with_counts: bool,
    sensor: Option<OpenFile>,
    counts: Option<OpenFile>,
    files: Vec<PathBuf>,
}

impl OutputSink {
    /// Open the first file set, named for `start_ms`
    pub fn create(
        dir: &Path,
        naming: FileNaming,
        formatter: RowFormatter,
        with_counts: bool,
        start_ms: i64,
    ) -> Result<Self, ConvertError> {
        let mut sink = Self {
            dir: dir.to_path_buf(),
            naming,
            formatter,
            with_counts,
            sensor: None,
            counts: None,
            files: Vec::new(),
        };
        sink.open(start_ms)?;
        Ok(sink)
    }

    pub fn formatter(&self) -> &RowFormatter {
        &self.formatter
    }

    fn open(&mut self, timestamp_ms: i64) -> Result<(), ConvertError> {
        let path = self.dir.join(self.naming.sensor_file_name(timestamp_ms));
        self.sensor = Some(OpenFile::create(path, &self.formatter.sensor_header())?);
        if self.with_counts {
            let path = self.dir.join(self.naming.count_file_name(timestamp_ms));
            self.counts = Some(OpenFile::create(path, &self.formatter.count_header())?);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), ConvertError> {
        if let Some(file) = self.sensor.take() {
            self.files.push(file.close()?);
        }
        if let Some(file) = self.counts.take() {
            self.files.push(file.close()?);
        }
        Ok(())
    }

    /// Close the current files and open a set named for `bucket_ms`
    pub fn rotate(&mut self, bucket_ms: i64) -> Result<(), ConvertError> {
        self.close()?;
        self.open(bucket_ms)
    }

    pub fn write_sample(&mut self, line: &str) -> Result<(), ConvertError> {
        if let Some(file) = self.sensor.as_mut() {
            file.writer.write_all(line.as_bytes())?;
        }
        Ok(())
    }

    /// Silently ignored when activity counts are disabled
    pub fn write_count(&mut self, line: &str) -> Result<(), ConvertError> {
        if let Some(file) = self.counts.as_mut() {
            file.writer.write_all(line.as_bytes())?;
        }
        Ok(())
    }

    /// Flush and close everything, returning every file written
    pub fn finish(mut self) -> Result<Vec<PathBuf>, ConvertError> {
        self.close()?;
        Ok(std::mem::take(&mut self.files))
    }
}
