//! Error types for the solvers.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the spectral and metadata solvers.
#[derive(Debug, Error)]
pub enum Error {
    /// No spectral sensitivity data found for a camera.
    #[error("no spectral sensitivity data found for camera make: '{make}', model: '{model}'")]
    CameraNotFound {
        /// Requested manufacturer.
        make: String,
        /// Requested model.
        model: String,
    },

    /// No illuminant matching the requested type string.
    #[error("no illuminant found matching '{0}'")]
    IlluminantNotFound(String),

    /// A data file was not found in any database root.
    #[error("data file '{0}' not found in the database search path")]
    FileNotFound(PathBuf),

    /// An operation was invoked before its required inputs were loaded.
    #[error("{field} needs to be initialised prior to calling {operation}")]
    Precondition {
        /// The missing solver field.
        field: &'static str,
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// The nonlinear fit reported no successful steps.
    #[error("failed to calculate the input transform matrix")]
    Optimization,

    /// A matrix that must be invertible is singular.
    #[error("singular matrix in {0}")]
    SingularMatrix(&'static str),

    /// An underlying spectral data error.
    #[error(transparent)]
    Spectral(#[from] rta_spectral::Error),
}
