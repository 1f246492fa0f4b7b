//! # rta-math
//!
//! Math utilities for the rawtoaces color pipeline.
//!
//! This crate provides the mathematical primitives used by the spectral and
//! metadata solvers:
//!
//! - [`Mat3`] - 3x3 matrices for color space transformations
//! - [`Vec3`] - 3D vectors for XYZ/RGB triplets
//! - Bradford chromatic adaptation ([`adapt_matrix`])
//! - 1D linear interpolation onto arbitrary grids ([`interp_linear`])
//!
//! # Design
//!
//! All matrix operations assume **row-major** storage and **column vectors**:
//!
//! ```text
//! result = matrix * vector
//! ```
//!
//! Everything is `f64`; the solvers accumulate spectral integrals and run a
//! nonlinear fit, both of which lose too much precision in `f32`.
//!
//! # Usage
//!
//! ```rust
//! use rta_math::{Mat3, Vec3};
//!
//! // XYZ scaling by a diagonal matrix
//! let m = Mat3::diagonal(2.0, 1.0, 0.5);
//! let v = Vec3::new(1.0, 1.0, 1.0);
//! assert_eq!(m * v, Vec3::new(2.0, 1.0, 0.5));
//! ```
//!
//! # Used By
//!
//! - `rta-solver` - IDT fit, DNG calibration math, chromatic adaptation
//! - `rta-convert` - transform assembly

#![warn(missing_docs)]

mod adapt;
mod interp;
mod mat3;
mod vec3;

pub use adapt::*;
pub use interp::*;
pub use mat3::*;
pub use vec3::*;
