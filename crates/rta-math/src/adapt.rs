//! Chromatic Adaptation Transforms (CAT).
//!
//! Adapting colors between illuminants: a white object under tungsten light
//! and under daylight should both come out "white" after adaptation. The
//! solvers use the Bradford transform throughout, both for mapping training
//! patches to the ACES white point and for the DNG metadata path.
//!
//! # Usage
//!
//! ```rust
//! use rta_math::{adapt_matrix, BRADFORD, D65_WHITE, ACES_WHITE};
//!
//! let d65_to_aces = adapt_matrix(BRADFORD, D65_WHITE, ACES_WHITE);
//! let adapted = d65_to_aces * D65_WHITE;
//! assert!((adapted.x - ACES_WHITE.x).abs() < 1e-3);
//! ```

use crate::{Mat3, Vec3};

/// CIE Standard Illuminant D65 white point (daylight, ~6500K).
pub const D65_WHITE: Vec3 = Vec3::new(0.95047, 1.0, 1.08883);

/// ACES white point, derived from the AP0 white chromaticity
/// (0.32168, 0.33767).
pub const ACES_WHITE: Vec3 = Vec3::new(0.9526460745698463, 1.0, 1.0088251843515859);

/// Bradford chromatic adaptation matrix.
///
/// Transforms XYZ to a "sharpened" cone response space.
///
/// # Reference
///
/// Lam, K.M. (1985). Metamerism and Colour Constancy.
pub const BRADFORD: Mat3 = Mat3::from_rows([
    [0.8951, 0.2664, -0.1614],
    [-0.7502, 1.7135, 0.0367],
    [0.0389, -0.0685, 1.0296],
]);

/// Computes a chromatic adaptation matrix between two white points.
///
/// The resulting matrix transforms XYZ values from the source illuminant
/// to the destination illuminant.
///
/// # Arguments
///
/// * `method` - The CAT matrix to use (normally [`BRADFORD`])
/// * `src_white` - Source white point in XYZ
/// * `dst_white` - Destination white point in XYZ
pub fn adapt_matrix(method: Mat3, src_white: Vec3, dst_white: Vec3) -> Mat3 {
    let method_inv = method.inverse().unwrap_or(Mat3::IDENTITY);

    // Transform white points to cone space
    let src_cone = method * src_white;
    let dst_cone = method * dst_white;

    let scale = Mat3::diagonal(
        dst_cone.x / src_cone.x,
        dst_cone.y / src_cone.y,
        dst_cone.z / src_cone.z,
    );

    // M^-1 * S * M
    method_inv * scale * method
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapt_identity() {
        // Adapting a white point to itself is the identity.
        let same = adapt_matrix(BRADFORD, D65_WHITE, D65_WHITE);

        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((same.m[i][j] - expected).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_adapt_maps_white_point() {
        let m = adapt_matrix(BRADFORD, D65_WHITE, ACES_WHITE);
        let result = m * D65_WHITE;
        assert!((result.x - ACES_WHITE.x).abs() < 1e-9);
        assert!((result.y - ACES_WHITE.y).abs() < 1e-9);
        assert!((result.z - ACES_WHITE.z).abs() < 1e-9);
    }

    #[test]
    fn test_adapt_roundtrip() {
        let fwd = adapt_matrix(BRADFORD, D65_WHITE, ACES_WHITE);
        let back = adapt_matrix(BRADFORD, ACES_WHITE, D65_WHITE);
        let roundtrip = back * fwd;

        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!(
                    (roundtrip.m[i][j] - expected).abs() < 1e-9,
                    "roundtrip[{}][{}] = {}",
                    i,
                    j,
                    roundtrip.m[i][j]
                );
            }
        }
    }

    #[test]
    fn test_aces_white_from_chromaticity() {
        // ACES_WHITE must match x/y = 0.32168/0.33767 exactly.
        let (x, y) = (0.32168, 0.33767);
        assert!((ACES_WHITE.x - x / y).abs() < 1e-12);
        assert!((ACES_WHITE.z - (1.0 - x - y) / y).abs() < 1e-12);
    }
}
