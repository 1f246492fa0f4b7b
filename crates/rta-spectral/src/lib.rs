//! # rta-spectral
//!
//! Spectral data model for the rawtoaces color engine.
//!
//! This crate covers everything between the JSON data files on disk and the
//! solvers:
//!
//! - [`Spectrum`] / [`Shape`] - a regularly-sampled spectral curve with
//!   elementwise arithmetic, integration and resampling onto the reference
//!   grid (380-780 nm, 5 nm step).
//! - [`SpectralData`] - a named, versioned bundle of spectral curves loaded
//!   from the rawtoaces JSON schema (camera sensitivities, illuminants,
//!   observer CMFs, training patches).
//! - [`illuminant`] - analytic daylight (CIE D-series) and Planckian
//!   blackbody SPD generators.
//! - [`Database`] - the filesystem resolver over one or more data roots laid
//!   out as `<root>/{camera,illuminant,cmf,training}/*.json`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use rta_spectral::SpectralData;
//!
//! let camera = SpectralData::load(Path::new("camera/arri_d21.json"), true)?;
//! let red = camera.main("R")?;
//! println!("integral: {}", red.integrate());
//! # Ok::<(), rta_spectral::Error>(())
//! ```
//!
//! # Used By
//!
//! - `rta-solver` - white balance and IDT computation
//! - `rta-convert` - camera / illuminant enumeration

#![warn(missing_docs)]

mod data;
mod database;
mod error;
pub mod illuminant;
mod spectrum;

pub use data::{SpectralChannel, SpectralData, SpectralSet};
pub use database::Database;
pub use error::{Error, Result};
pub use spectrum::{Shape, Spectrum};
