//! Error types for evfilter-core.

use crate::record::GroupKey;
use thiserror::Error;

/// Result type alias for evfilter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for evfilter operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A group key reappeared after its group was already closed.
    #[error("group {key} reappeared after it was closed; input must be sorted by group key")]
    PreconditionViolation { key: GroupKey },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// Malformed input record.
    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Errors raised while validating configuration or resolving mass hypotheses.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// No mass is known for the requested PDG code.
    #[error("unknown PDG code: {0}")]
    UnknownPdgCode(i32),

    /// A `[min, max]` option with `min > max`.
    #[error("invalid range for {name}: [{min}, {max}]")]
    InvalidRange {
        name: &'static str,
        min: f64,
        max: f64,
    },

    /// A threshold that must be finite was NaN or infinite.
    #[error("threshold {name} must be finite, got {value}")]
    NonFiniteThreshold { name: &'static str, value: f64 },

    /// Histogram binning that cannot hold any value.
    #[error("invalid binning for {label}: {bins} bins over [{min}, {max})")]
    InvalidBinning {
        label: String,
        bins: usize,
        min: f64,
        max: f64,
    },
}

/// Errors describing a single malformed record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    /// A kinematic or shape attribute is NaN or infinite.
    #[error("non-finite {field} ({value}) in record of group {key}")]
    NonFinite {
        key: GroupKey,
        field: &'static str,
        value: f64,
    },
}
