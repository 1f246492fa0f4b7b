//! Nonlinear least-squares fit of the IDT matrix.
//!
//! Six free parameters beta describe a 3x3 matrix whose rows are constrained
//! to sum to one:
//!
//! ```text
//! | b0  b1  1-b0-b1 |
//! | b2  b3  1-b2-b3 |
//! | b4  b5  1-b4-b5 |
//! ```
//!
//! The fit minimises, over all training patches, the CIELAB difference
//! between the patch's appearance under the ACES white point and
//! `LAB(XYZ_aces(M * RGB))`. The residuals are driven through a
//! Levenberg-Marquardt minimiser with tight tolerances and a fixed
//! iteration cap, so termination is guaranteed.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::storage::Owned;
use nalgebra::{DMatrix, DVector, Dyn};

use rta_math::{Mat3, Vec3, ACES_WHITE};

use crate::colorimetry::{aces_rgb_to_xyz_matrix, xyz_to_lab};
use crate::{Error, Result};

/// Assembles the row-sum-constrained matrix from the six fit parameters.
fn beta_matrix(beta: &DVector<f64>) -> Mat3 {
    Mat3::from_rows([
        [beta[0], beta[1], 1.0 - beta[0] - beta[1]],
        [beta[2], beta[3], 1.0 - beta[2] - beta[3]],
        [beta[4], beta[5], 1.0 - beta[4] - beta[5]],
    ])
}

struct IdtProblem {
    rgb: Vec<Vec3>,
    target_lab: Vec<Vec3>,
    rgb_to_xyz: Mat3,
    beta: DVector<f64>,
}

impl IdtProblem {
    fn residuals_for(&self, beta: &DVector<f64>) -> DVector<f64> {
        let m = beta_matrix(beta);
        let mut residuals = DVector::zeros(self.rgb.len() * 3);

        for (i, (&rgb, &target)) in self.rgb.iter().zip(self.target_lab.iter()).enumerate() {
            let xyz = self.rgb_to_xyz * (m * rgb);
            let lab = xyz_to_lab(xyz, ACES_WHITE);
            residuals[i * 3] = target.x - lab.x;
            residuals[i * 3 + 1] = target.y - lab.y;
            residuals[i * 3 + 2] = target.z - lab.z;
        }

        residuals
    }
}

impl LeastSquaresProblem<f64, Dyn, Dyn> for IdtProblem {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, beta: &DVector<f64>) {
        self.beta.copy_from(beta);
    }

    fn params(&self) -> DVector<f64> {
        self.beta.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        Some(self.residuals_for(&self.beta))
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        // Central differences; the residuals are smooth in beta and the
        // parameters stay O(1), so a fixed step is adequate.
        const H: f64 = 1e-7;

        let rows = self.rgb.len() * 3;
        let mut jacobian = DMatrix::zeros(rows, 6);

        for p in 0..6 {
            let mut forward = self.beta.clone();
            forward[p] += H;
            let mut backward = self.beta.clone();
            backward[p] -= H;

            let rf = self.residuals_for(&forward);
            let rb = self.residuals_for(&backward);

            for r in 0..rows {
                jacobian[(r, p)] = (rf[r] - rb[r]) / (2.0 * H);
            }
        }

        Some(jacobian)
    }
}

/// Fits the 3x3 IDT matrix to the given per-patch camera RGB and reference
/// XYZ values.
///
/// `xyz` must already be adapted to the ACES white point. Starting point is
/// the identity-like beta (1, 0, 0, 1, 0, 0). Fails with
/// [`Error::Optimization`] when the minimiser reports no success.
pub fn solve_idt(rgb: &[Vec3], xyz: &[Vec3], verbosity: i32) -> Result<Mat3> {
    let target_lab: Vec<Vec3> = xyz.iter().map(|&v| xyz_to_lab(v, ACES_WHITE)).collect();

    let problem = IdtProblem {
        rgb: rgb.to_vec(),
        target_lab,
        rgb_to_xyz: aces_rgb_to_xyz_matrix(),
        beta: DVector::from_vec(vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0]),
    };

    let (problem, report) = LevenbergMarquardt::new()
        .with_ftol(1e-17)
        .with_xtol(1e-17)
        .with_gtol(1e-17)
        .with_patience(300)
        .minimize(problem);

    if verbosity > 1 {
        eprintln!(
            "Optimization finished: {:?}, {} evaluations, cost {:.6e}",
            report.termination, report.number_of_evaluations, report.objective_function
        );
    }

    if !report.termination.was_successful() {
        return Err(Error::Optimization);
    }

    let matrix = beta_matrix(&problem.beta);

    if verbosity > 1 {
        eprintln!("The IDT matrix is ...");
        for row in matrix.m {
            eprintln!("   {:.6} {:.6} {:.6}", row[0], row[1], row[2]);
        }
    }

    Ok(matrix)
}
