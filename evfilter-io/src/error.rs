//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON configuration.
    #[error("configuration error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid file format.
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    /// A data row that could not be parsed.
    #[error("line {line}: {message}")]
    Parse {
        /// One-based line number in the input.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] evfilter_core::Error),
}

impl From<evfilter_core::ConfigError> for Error {
    fn from(err: evfilter_core::ConfigError) -> Self {
        Self::Core(err.into())
    }
}
