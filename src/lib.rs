//! GT3X Convert - Decoder for GT3X accelerometer recordings
//!
//! Reads both on-device encodings (the legacy packed `activity.bin` stream and
//! the framed `log.bin` record log) and writes mHealth CSV files through a
//! deterministic pipeline: classification → decoding → timestamping → gap
//! filling → hourly rotation → row formatting.
//!
//! ## Modules
//!
//! - **Decoding**: `classifier`, `unpacker`, `framer`
//! - **Timing**: `timestamp`, `gap`, `rotator`
//! - **Output**: `mhealth`, `format`, `activity_count`, `sink`
//! - **Input**: `source`, `metadata`

pub mod activity_count;
pub mod classifier;
pub mod error;
pub mod format;
pub mod framer;
pub mod gap;
pub mod metadata;
pub mod mhealth;
pub mod pipeline;
pub mod rotator;
pub mod sink;
pub mod source;
pub mod timestamp;
pub mod types;
pub mod unpacker;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

#[cfg(test)]
mod test_support;

pub use error::ConvertError;
pub use pipeline::{read_metadata, Converter, DeviceInfo};
pub use source::{EntrySource, Gt3xArchive, MemorySource};
pub use types::{
    ConversionSummary, ConvertOptions, DeviceMetadata, DeviceType, DeviceVariant, Dialect,
    ValueMode,
};

/// Converter version reported by the CLI and FFI
pub const CONVERTER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "gt3x-convert";
