//! The metadata (DNG) solver.
//!
//! DNG files carry two reference calibrations, each tied to an EXIF light
//! source. The solver interpolates between them by color temperature, guided
//! by the camera's neutral-RGB reading, then builds the input transform as a
//! Bradford adaptation to the ACES white point followed by the canonical
//! D65-XYZ-to-AP0 matrix.

use tracing::warn;

use rta_math::{Mat3, Vec3};

use crate::colorimetry::{
    calculate_cat, cct_to_mired, cct_to_xyz, light_source_to_cct, rgb_to_xyz_matrix, xyz_to_cct,
    ACES_CHROMATICITIES, XYZ_D65_TO_ACES_RGB,
};
use crate::{Error, Result};

/// One DNG reference calibration.
#[derive(Debug, Clone, Default)]
pub struct Calibration {
    /// EXIF LightSource code of the calibration illuminant.
    pub illuminant: u16,
    /// The XYZ-to-camera color matrix (DNG `ColorMatrix`), row-major.
    pub xyz_to_rgb_matrix: [f64; 9],
    /// The camera calibration matrix (DNG `CameraCalibration`), row-major.
    ///
    /// Extracted from the tag's 4-wide row stride (`i * 4 + j`), matching the
    /// stored shape of the DNG tag.
    pub camera_calibration_matrix: [f64; 9],
}

/// DNG-style metadata needed to derive an input transform.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    /// Baseline exposure in stops.
    pub baseline_exposure: f64,
    /// The neutral RGB reading: the reciprocal of the camera multipliers.
    /// `None` when the file carries no camera multipliers.
    pub neutral_rgb: Option<[f64; 3]>,
    /// The two reference calibrations.
    pub calibration: [Calibration; 2],
}

/// Computes IDT and CAT matrices from DNG metadata alone.
///
/// # Example
///
/// ```rust
/// use rta_solver::{Metadata, MetadataSolver};
///
/// let mut metadata = Metadata::default();
/// metadata.calibration[0].illuminant = 17; // standard light A
/// metadata.calibration[0].xyz_to_rgb_matrix =
///     [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
/// metadata.calibration[1].illuminant = 21; // D65
/// metadata.calibration[1].xyz_to_rgb_matrix =
///     [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
/// metadata.neutral_rgb = Some([1.0, 1.0, 1.0]);
///
/// let solver = MetadataSolver::new(metadata);
/// let idt = solver.calculate_idt_matrix()?;
/// # Ok::<(), rta_solver::Error>(())
/// ```
pub struct MetadataSolver {
    metadata: Metadata,
}

impl MetadataSolver {
    /// Creates a solver for the given metadata.
    pub fn new(metadata: Metadata) -> Self {
        Self { metadata }
    }

    /// Interpolates the XYZ-to-camera matrix for the shot's white point.
    ///
    /// Candidate Mired values between the two calibration illuminants are
    /// scanned; for each candidate the interpolated matrix is inverted and
    /// applied to the neutral RGB, and the resulting XYZ is taken back to
    /// Mired. The first bracketing sign change of the discrepancy is
    /// interpolated to its zero; failing that, the candidate with the
    /// smallest absolute discrepancy wins.
    fn find_xyz_to_camera_matrix(&self) -> [f64; 9] {
        let metadata = &self.metadata;

        if metadata.calibration[0].illuminant == 0 {
            warn!("no calibration illuminants were found");
            return metadata.calibration[0].xyz_to_rgb_matrix;
        }

        let Some(neutral_rgb) = metadata.neutral_rgb else {
            warn!("no neutral RGB values were found");
            return metadata.calibration[0].xyz_to_rgb_matrix;
        };
        let neutral = Vec3::from_array(neutral_rgb);

        let cct1 = light_source_to_cct(metadata.calibration[0].illuminant);
        let cct2 = light_source_to_cct(metadata.calibration[1].illuminant);

        let mir1 = cct_to_mired(cct1);
        let mir2 = cct_to_mired(cct2);

        let max_mired = cct_to_mired(2000.0);
        let min_mired = cct_to_mired(50000.0);

        let matrix_start = &metadata.calibration[0].xyz_to_rgb_matrix;
        let matrix_end = &metadata.calibration[1].xyz_to_rgb_matrix;

        let low_mired = mir1.min(mir2).clamp(min_mired, max_mired);
        let high_mired = mir1.max(mir2).clamp(min_mired, max_mired);
        let mired_step = ((high_mired - low_mired) / 50.0).max(5.0);

        let mut estimated_mired = low_mired;
        let mut smallest_error = f64::INFINITY;
        let mut last_mired = 0.0;
        let mut last_error = 0.0;

        let mut current_mired = low_mired;
        while current_mired < high_mired {
            let candidate = weighted_matrix(current_mired, mir1, mir2, matrix_start, matrix_end);
            let Some(inverse) = Mat3::from_flat(candidate).inverse() else {
                current_mired += mired_step;
                continue;
            };

            let current_error =
                current_mired - cct_to_mired(xyz_to_cct(inverse * neutral));

            if current_error.abs() <= 1e-9 {
                estimated_mired = current_mired;
                break;
            }

            // A sign change between consecutive candidates brackets the
            // zero; interpolate to it.
            if (current_mired - low_mired).abs() > 1e-9 && current_error * last_error <= 0.0 {
                estimated_mired = current_mired
                    + current_error / (current_error - last_error)
                        * (current_mired - last_mired);
                break;
            }

            if current_error.abs() < smallest_error {
                estimated_mired = current_mired;
                smallest_error = current_error.abs();
            }

            last_error = current_error;
            last_mired = current_mired;
            current_mired += mired_step;
        }

        weighted_matrix(estimated_mired, mir1, mir2, matrix_start, matrix_end)
    }

    /// The camera-to-XYZ matrix and the camera white point (Y normalised
    /// to 1).
    ///
    /// The white point comes from pushing the neutral RGB through the
    /// inverted matrix; without a neutral reading it falls back to the XYZ
    /// of the first calibration illuminant's color temperature.
    fn camera_xyz_matrix_and_white_point(&self) -> Result<(Mat3, Vec3)> {
        let xyz_to_camera = Mat3::from_flat(self.find_xyz_to_camera_matrix());
        let camera_to_xyz = xyz_to_camera
            .inverse()
            .ok_or(Error::SingularMatrix("the XYZ-to-camera matrix"))?
            * 2f64.powf(self.metadata.baseline_exposure);

        let white_point = match self.metadata.neutral_rgb {
            Some(neutral) => camera_to_xyz * Vec3::from_array(neutral),
            None => cct_to_xyz(light_source_to_cct(
                self.metadata.calibration[0].illuminant,
            )),
        };

        if white_point.y.abs() < 1e-12 {
            return Err(Error::SingularMatrix("the camera white point"));
        }

        Ok((camera_to_xyz, white_point / white_point.y))
    }

    /// The Bradford adaptation from the camera white point to the ACES
    /// output white point.
    ///
    /// The output white point is `M_aces * (1, 1, 1)`, with `M_aces` built
    /// from the AP0 chromaticities.
    pub fn calculate_cat_matrix(&self) -> Result<Mat3> {
        let (_, camera_white_point) = self.camera_xyz_matrix_and_white_point()?;

        let output_rgb_to_xyz = rgb_to_xyz_matrix(&ACES_CHROMATICITIES);
        let output_white_point = output_rgb_to_xyz * Vec3::ONE;

        Ok(calculate_cat(camera_white_point, output_white_point))
    }

    /// The input device transform: `M_xyzD65_to_acesRGB * CAT`.
    pub fn calculate_idt_matrix(&self) -> Result<Mat3> {
        let cat_matrix = self.calculate_cat_matrix()?;
        let idt = XYZ_D65_TO_ACES_RGB * cat_matrix;

        if idt.element_sum().abs() <= 1e-9 {
            return Err(Error::SingularMatrix("the DNG input transform"));
        }

        Ok(idt)
    }
}

/// Linear interpolation between two calibration matrices by Mired position.
///
/// The weight `(mired_start - target) / (mired_start - mired_end)` is clamped
/// to [0, 1]; identical calibration temperatures collapse to the first
/// matrix.
fn weighted_matrix(
    mired_target: f64,
    mired_start: f64,
    mired_end: f64,
    matrix_start: &[f64; 9],
    matrix_end: &[f64; 9],
) -> [f64; 9] {
    if (mired_start - mired_end).abs() < 1e-12 {
        return *matrix_start;
    }

    let weight = ((mired_start - mired_target) / (mired_start - mired_end)).clamp(0.0, 1.0);

    let mut result = [0.0; 9];
    for i in 0..9 {
        result[i] = matrix_start[i] + weight * (matrix_end[i] - matrix_start[i]);
    }
    result
}
