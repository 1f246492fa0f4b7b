//! Regularly-sampled spectral curves.
//!
//! [`Spectrum`] stores a curve sampled on a uniform wavelength grid described
//! by a [`Shape`]. All spectral data is resampled to [`Shape::REFERENCE`]
//! (380-780 nm in 5 nm steps, 81 samples) before any solver math runs, so the
//! binary operations only need to handle equal shapes.

use crate::{Error, Result};

/// The sampling grid of a [`Spectrum`]: first and last wavelength plus the
/// step, all in nanometers.
///
/// Only regular (uniform-step) grids are supported. A step of zero denotes an
/// empty, unallocated spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Shape {
    /// The leftmost sample's wavelength in nanometers.
    pub first: f64,
    /// The rightmost sample's wavelength in nanometers.
    pub last: f64,
    /// The sampling step in nanometers.
    pub step: f64,
}

impl Shape {
    /// The reference shape used internally by rawtoaces: 380-780 nm, 5 nm.
    pub const REFERENCE: Shape = Shape {
        first: 380.0,
        last: 780.0,
        step: 5.0,
    };

    /// An empty shape; a spectrum with this shape holds no samples.
    pub const EMPTY: Shape = Shape {
        first: 0.0,
        last: 0.0,
        step: 0.0,
    };

    /// Creates a new shape.
    pub const fn new(first: f64, last: f64, step: f64) -> Self {
        Self { first, last, step }
    }

    /// Number of samples implied by this shape:
    /// `(last - first + step) / step`, or zero when the step is zero.
    pub fn sample_count(&self) -> usize {
        if self.step == 0.0 {
            0
        } else {
            ((self.last - self.first + self.step) / self.step) as usize
        }
    }
}

/// A spectral curve sampled on a uniform grid.
///
/// # Example
///
/// ```rust
/// use rta_spectral::{Shape, Spectrum};
///
/// let a = Spectrum::constant(2.0, Shape::REFERENCE);
/// let b = Spectrum::constant(3.0, Shape::REFERENCE);
/// let product = a.try_mul(&b).unwrap();
/// assert_eq!(product.integrate(), 6.0 * 81.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// The sampling grid.
    pub shape: Shape,
    /// The sample values, `shape.sample_count()` of them.
    pub values: Vec<f64>,
}

impl Spectrum {
    /// Creates a spectrum filled with a constant value.
    ///
    /// Pass [`Shape::EMPTY`] to create a spectrum without allocating samples.
    pub fn constant(value: f64, shape: Shape) -> Self {
        Self {
            shape,
            values: vec![value; shape.sample_count()],
        }
    }

    /// Creates a zero-filled spectrum on the reference grid.
    pub fn zeros() -> Self {
        Self::constant(0.0, Shape::REFERENCE)
    }

    /// Creates a spectrum from a shape and a value vector.
    ///
    /// The vector length must match `shape.sample_count()`.
    pub fn from_values(shape: Shape, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), shape.sample_count());
        Self { shape, values }
    }

    fn zip_with(&self, rhs: &Spectrum, f: impl Fn(f64, f64) -> f64) -> Result<Spectrum> {
        if self.shape != rhs.shape {
            return Err(Error::ShapeMismatch {
                lhs: self.shape,
                rhs: rhs.shape,
            });
        }

        let values = self
            .values
            .iter()
            .zip(rhs.values.iter())
            .map(|(&l, &r)| f(l, r))
            .collect();

        Ok(Spectrum {
            shape: self.shape,
            values,
        })
    }

    /// Elementwise addition. Fails if the shapes differ.
    pub fn try_add(&self, rhs: &Spectrum) -> Result<Spectrum> {
        self.zip_with(rhs, |l, r| l + r)
    }

    /// Elementwise subtraction. Fails if the shapes differ.
    pub fn try_sub(&self, rhs: &Spectrum) -> Result<Spectrum> {
        self.zip_with(rhs, |l, r| l - r)
    }

    /// Elementwise multiplication. Fails if the shapes differ.
    pub fn try_mul(&self, rhs: &Spectrum) -> Result<Spectrum> {
        self.zip_with(rhs, |l, r| l * r)
    }

    /// Elementwise division. Fails if the shapes differ.
    pub fn try_div(&self, rhs: &Spectrum) -> Result<Spectrum> {
        self.zip_with(rhs, |l, r| l / r)
    }

    /// Scales all samples by a factor, in place.
    pub fn scale(&mut self, factor: f64) {
        for v in self.values.iter_mut() {
            *v *= factor;
        }
    }

    /// Integrates the spectral curve.
    ///
    /// This is a plain sum of the samples. The step weight is left out on
    /// purpose: it cancels across every ratio the solvers compute.
    pub fn integrate(&self) -> f64 {
        self.values.iter().sum()
    }

    /// The maximum sample value, or zero for an empty spectrum.
    pub fn max_value(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
        }
    }

    /// Resamples the spectrum onto [`Shape::REFERENCE`] in place.
    ///
    /// The source and target grids are walked simultaneously. Each target
    /// sample is an exact copy when the wavelengths align, a linear
    /// interpolation of the bracketing source pair when it falls strictly
    /// between two source samples, and a clamped copy of the nearest edge
    /// sample when it lies outside the source range.
    ///
    /// A no-op when the spectrum already has the reference shape.
    pub fn reshape(&mut self) {
        if self.shape == Shape::REFERENCE || self.values.is_empty() {
            return;
        }

        let src_first = self.shape.first;
        let src_step = self.shape.step;

        let dst_first = Shape::REFERENCE.first;
        let dst_last = Shape::REFERENCE.last;
        let dst_step = Shape::REFERENCE.step;

        let mut out = Vec::with_capacity(Shape::REFERENCE.sample_count());
        let mut src = 0usize;

        let mut wl_src = src_first;
        let mut wl_dst = dst_first;

        while wl_dst <= dst_last {
            if wl_src < wl_dst {
                if src < self.values.len() - 1 {
                    let next_wl_src = src_first + src_step * (src + 1) as f64;
                    if next_wl_src <= wl_dst {
                        // The next source wavelength is still not big enough,
                        // advancing.
                        src += 1;
                        wl_src = next_wl_src;
                    } else {
                        // The target wavelength is between two source samples,
                        // linearly interpolating.
                        let ratio = (wl_dst - wl_src) / (next_wl_src - wl_src);
                        let v = self.values[src] * (1.0 - ratio) + self.values[src + 1] * ratio;
                        out.push(v);
                        wl_dst = dst_first + dst_step * out.len() as f64;
                    }
                } else {
                    // We have passed all available source samples,
                    // copying the last sample.
                    out.push(self.values[src]);
                    wl_dst = dst_first + dst_step * out.len() as f64;
                }
            } else {
                // Either an exact match, or we haven't reached the source
                // range yet; copy the current sample.
                out.push(self.values[src]);
                wl_dst = dst_first + dst_step * out.len() as f64;
            }
        }

        self.values = out;
        self.shape = Shape::REFERENCE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(shape: Shape) -> Spectrum {
        let values = (0..shape.sample_count()).map(|i| i as f64).collect();
        Spectrum::from_values(shape, values)
    }

    #[test]
    fn test_sample_count_invariant() {
        assert_eq!(Shape::REFERENCE.sample_count(), 81);
        assert_eq!(Shape::new(20.0, 50.0, 10.0).sample_count(), 4);
        assert_eq!(Shape::EMPTY.sample_count(), 0);

        let s = Spectrum::constant(1.0, Shape::new(400.0, 700.0, 10.0));
        assert_eq!(s.values.len(), 31);
    }

    #[test]
    fn test_arithmetic_elementwise() {
        let a = ramp(Shape::REFERENCE);
        let b = Spectrum::constant(2.0, Shape::REFERENCE);

        let sum = a.try_add(&b).unwrap();
        assert_eq!(sum.values[10], 12.0);

        let product = a.try_mul(&b).unwrap();
        assert_eq!(product.values[10], 20.0);

        // + and * are commutative
        assert_eq!(sum, b.try_add(&a).unwrap());
        assert_eq!(product, b.try_mul(&a).unwrap());
    }

    #[test]
    fn test_arithmetic_shape_mismatch() {
        let a = Spectrum::constant(1.0, Shape::REFERENCE);
        let b = Spectrum::constant(1.0, Shape::new(380.0, 780.0, 10.0));
        assert!(matches!(
            a.try_mul(&b),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_integrate_and_max() {
        let s = ramp(Shape::new(0.0, 3.0, 1.0));
        assert_eq!(s.integrate(), 0.0 + 1.0 + 2.0 + 3.0);
        assert_eq!(s.max_value(), 3.0);
        assert_eq!(Spectrum::constant(0.0, Shape::EMPTY).max_value(), 0.0);
    }

    #[test]
    fn test_reshape_reference_is_noop() {
        let s = ramp(Shape::REFERENCE);
        let mut t = s.clone();
        t.reshape();
        assert_eq!(s, t);
    }

    #[test]
    fn test_reshape_interpolates() {
        // 10 nm source grid over the full range; reference samples at
        // odd multiples of 5 nm are midpoints.
        let src = ramp(Shape::new(380.0, 780.0, 10.0));
        let mut dst = src.clone();
        dst.reshape();

        assert_eq!(dst.shape, Shape::REFERENCE);
        assert_eq!(dst.values.len(), 81);
        assert_eq!(dst.values[0], 0.0);
        assert_eq!(dst.values[2], 1.0);
        assert!((dst.values[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_reshape_clamps_ends() {
        // Source covers 400-700 only; outside values clamp to the edges.
        let src = Spectrum::from_values(
            Shape::new(400.0, 700.0, 5.0),
            (0..61).map(|i| 10.0 + i as f64).collect(),
        );
        let mut dst = src.clone();
        dst.reshape();

        assert_eq!(dst.values[0], 10.0); // 380 nm clamps to the 400 nm sample
        assert_eq!(dst.values[80], 70.0); // 780 nm clamps to the 700 nm sample
        assert_eq!(dst.values[4], 10.0); // 400 nm exact
    }

    #[test]
    fn test_reshape_idempotent() {
        let src = ramp(Shape::new(390.0, 770.0, 10.0));
        let mut once = src.clone();
        once.reshape();
        let mut twice = once.clone();
        twice.reshape();

        for (a, b) in once.values.iter().zip(twice.values.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
