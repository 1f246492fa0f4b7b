//! Error types for spectral data operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while loading or operating on spectral data.
#[derive(Debug, Error)]
pub enum Error {
    /// A data file could not be opened.
    #[error("failed to open file {path}: {source}")]
    Open {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A data file is not valid JSON, or does not follow the schema.
    #[error("JSON parsing of {path} failed: {message}")]
    Parse {
        /// Path of the file.
        path: PathBuf,
        /// Underlying parser message.
        message: String,
    },

    /// The wavelength keys of a data file are not uniformly spaced.
    #[error("inconsistent wavelength step detected in {path}: expected {expected}, got {got}")]
    InconsistentStep {
        /// Path of the file.
        path: PathBuf,
        /// Step implied by the first two wavelength keys.
        expected: f64,
        /// The offending step.
        got: f64,
    },

    /// Binary spectrum arithmetic with mismatched shapes.
    #[error("spectrum shape mismatch: {lhs:?} vs {rhs:?}")]
    ShapeMismatch {
        /// Left-hand shape.
        lhs: crate::Shape,
        /// Right-hand shape.
        rhs: crate::Shape,
    },

    /// A requested data set does not exist.
    #[error("the requested data set '{0}' not found in spectral data")]
    SetNotFound(String),

    /// A requested channel does not exist within a data set.
    #[error("the requested channel '{channel}' not found in the data set '{set}' of spectral data")]
    ChannelNotFound {
        /// Set name that was searched.
        set: String,
        /// Channel name that was requested.
        channel: String,
    },

    /// A correlated color temperature outside the supported range of an SPD
    /// generator.
    #[error(
        "the correlated color temperature {cct} is out of range for {generator}: \
         expected {min} to {max}"
    )]
    TemperatureOutOfRange {
        /// The requested CCT in Kelvin.
        cct: i32,
        /// Generator name ("daylight" or "blackbody").
        generator: &'static str,
        /// Lowest supported CCT.
        min: i32,
        /// Highest supported CCT.
        max: i32,
    },
}
