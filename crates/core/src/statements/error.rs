//! Statement parsing errors.

use thiserror::Error;

/// Errors raised while reading bank files.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatementError {
    /// The content does not look like the declared format.
    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    /// The file has no usable records.
    #[error("File has no records")]
    Empty,

    /// Unknown format name.
    #[error("Unsupported statement format: {0}")]
    UnsupportedFormat(String),
}

impl StatementError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidFormat(_) => "invalid_file",
            Self::Empty => "empty_file",
            Self::UnsupportedFormat(_) => "unsupported_format",
        }
    }
}
