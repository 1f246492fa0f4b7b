//! # rta-solver
//!
//! The two input-transform solvers of the rawtoaces engine.
//!
//! - [`SpectralSolver`] derives white-balance multipliers and a 3x3 input
//!   device transform (IDT) from camera spectral sensitivities, an observer,
//!   training spectra and an illuminant, fitting the matrix in CIELAB by
//!   nonlinear least squares.
//! - [`MetadataSolver`] implements the DNG calibration math: Robertson CCT
//!   inversion, calibration-matrix interpolation by color temperature, and a
//!   Bradford adaptation to the ACES white point, producing an IDT from
//!   metadata alone.
//!
//! The shared colorimetry (Robertson table, CIE 1960 uv, CIELAB, the ACES
//! primaries and the canonical conversion matrices) lives in [`colorimetry`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use rta_spectral::Database;
//! use rta_solver::SpectralSolver;
//!
//! let db = Database::new(vec![PathBuf::from("/usr/local/share/rawtoaces/data")]);
//! let mut solver = SpectralSolver::new(db);
//! solver.find_camera("ARRI", "D21")?;
//! solver.find_illuminant("D65")?;
//! solver.calculate_wb()?;
//! solver.calculate_idt_matrix()?;
//! println!("{:?}", solver.idt_matrix());
//! # Ok::<(), rta_solver::Error>(())
//! ```

#![warn(missing_docs)]

pub mod colorimetry;
mod error;
mod fit;
mod metadata;
mod spectral;

pub use error::{Error, Result};
pub use metadata::{Calibration, Metadata, MetadataSolver};
pub use spectral::SpectralSolver;
