//! Error types for GT3X conversion

use thiserror::Error;

/// Errors that abort a conversion run.
///
/// Truncated log records and checksum failures are not errors: they are
/// counted in the [`ConversionSummary`](crate::types::ConversionSummary).
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Input is not a GT3X container")]
    NotAContainer,

    #[error("Missing container entry: {0}")]
    MissingEntry(String),

    #[error("Missing required metadata field: {0}")]
    MissingField(String),

    #[error("Invalid metadata value for {key}: {value}")]
    InvalidField { key: String, value: String },

    #[error("Unknown device (serial {serial}, firmware {firmware})")]
    UnknownDevice { serial: String, firmware: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConvertError {
    /// Structural errors are detected before any output is written.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ConvertError::NotAContainer
                | ConvertError::MissingEntry(_)
                | ConvertError::MissingField(_)
                | ConvertError::InvalidField { .. }
                | ConvertError::UnknownDevice { .. }
        )
    }
}
