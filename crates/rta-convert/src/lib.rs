//! # rta-convert
//!
//! Conversion orchestration for rawtoaces: everything between the command
//! line and the solvers.
//!
//! - [`Settings`] - every user choice of a conversion run, with
//!   cross-parameter validation.
//! - [`ImageSpec`] / [`ParamList`] - the metadata and decoder-hint attribute
//!   model shared with the external raw decoder and container writer.
//! - [`ImageConverter`] - picks the white-balance and matrix methods, runs
//!   the spectral or metadata solver, and produces the multipliers and
//!   matrices the pixel pipeline applies.
//! - [`database_paths`] / [`collect_image_files`] / [`make_output_path`] -
//!   environment and filesystem plumbing for the batch driver.
//!
//! # Usage
//!
//! ```rust
//! use rta_convert::{ImageConverter, ImageSpec, ParamList, Settings};
//!
//! let mut converter = ImageConverter::new(Settings::default());
//! let spec = ImageSpec::new(); // normally read by the raw decoder
//! let hints = converter.configure(&spec, &ParamList::new())?;
//! assert!(hints.contains("raw:ColorSpace"));
//! # Ok::<(), rta_convert::Error>(())
//! ```

#![warn(missing_docs)]

mod converter;
mod decode;
mod error;
mod paths;
mod settings;
mod spec;
mod timer;

pub use converter::{aces_container_attributes, ImageConverter};
pub use decode::{RawLoader, UnavailableLoader};
pub use error::{Error, Result};
pub use paths::{
    collect_image_files, database_paths, make_output_path, DATA_PATH_ENV, LEGACY_DATA_PATH_ENV,
};
pub use settings::{CropMode, MatrixMethod, Settings, WbMethod, DEMOSAIC_ALGORITHMS};
pub use spec::{fix_metadata, AttrValue, ImageSpec, ParamList};
pub use timer::UsageTimer;
