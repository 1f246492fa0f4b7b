//! Error types for conversion orchestration.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while configuring or running a conversion.
#[derive(Debug, Error)]
pub enum Error {
    /// The file metadata carries no camera manufacturer and no override was
    /// given.
    #[error(
        "Missing the camera manufacturer name in the file metadata. You can \
         provide a camera make using the --custom-camera-make parameter"
    )]
    MissingCameraMake,

    /// The file metadata carries no camera model and no override was given.
    #[error(
        "Missing the camera model name in the file metadata. You can provide \
         a camera model using the --custom-camera-model parameter"
    )]
    MissingCameraModel,

    /// A required database resource is absent.
    #[error(
        "Failed to find {what}. Please check the database search path in \
         RAWTOACES_DATA_PATH"
    )]
    DataMissing {
        /// Description of the missing resource.
        what: String,
    },

    /// No suitable illuminant for the measured white balance.
    #[error("failed to find a suitable illuminant")]
    NoSuitableIlluminant,

    /// The output file already exists and overwriting is disabled.
    #[error("file {0} already exists. Use --overwrite to allow overwriting existing files")]
    OutputExists(PathBuf),

    /// The output directory does not exist and creating it is disabled.
    #[error("the output directory {0} does not exist. Use --create-dirs to create it")]
    OutputDirMissing(PathBuf),

    /// Creating the output directory failed.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// The directory being created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// No raw decoder has been linked into this build.
    #[error("no raw decoder is available to read '{0}'; link a raw loader implementation")]
    DecoderUnavailable(PathBuf),

    /// An underlying solver error.
    #[error(transparent)]
    Solver(#[from] rta_solver::Error),

    /// An underlying spectral data error.
    #[error(transparent)]
    Spectral(#[from] rta_spectral::Error),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
