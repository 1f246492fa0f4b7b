//! End-to-end solver tests over synthetic spectral data.
//!
//! The camera, observer and training spectra are smooth synthetic curves on
//! the reference grid; realistic enough to drive the full white-balance and
//! IDT pipeline without shipping measured data.

use std::fs;

use rta_math::Mat3;
use rta_spectral::{Database, Shape, SpectralData, Spectrum};
use rta_solver::{Metadata, MetadataSolver, SpectralSolver};

fn gaussian(center: f64, width: f64, amplitude: f64) -> Vec<f64> {
    (0..81)
        .map(|i| {
            let wl = 380.0 + 5.0 * i as f64;
            amplitude * (-((wl - center) / width).powi(2)).exp()
        })
        .collect()
}

fn spectral_data(channels: &[(&str, Vec<f64>)]) -> SpectralData {
    let mut data = SpectralData::default();
    data.data.insert(
        "main".to_string(),
        channels
            .iter()
            .map(|(name, values)| {
                (
                    name.to_string(),
                    Spectrum::from_values(Shape::REFERENCE, values.clone()),
                )
            })
            .collect(),
    );
    data
}

fn synthetic_camera() -> SpectralData {
    spectral_data(&[
        ("R", gaussian(600.0, 55.0, 0.9)),
        ("G", gaussian(540.0, 50.0, 1.0)),
        ("B", gaussian(460.0, 45.0, 0.8)),
    ])
}

fn synthetic_observer() -> SpectralData {
    spectral_data(&[
        ("X", gaussian(595.0, 55.0, 1.05)),
        ("Y", gaussian(555.0, 50.0, 1.0)),
        ("Z", gaussian(445.0, 40.0, 1.75)),
    ])
}

fn synthetic_training() -> SpectralData {
    let flat_02 = vec![0.2; 81];
    let flat_09 = vec![0.9; 81];
    let ramp_up: Vec<f64> = (0..81).map(|i| 0.1 + 0.8 * i as f64 / 80.0).collect();
    let ramp_down: Vec<f64> = ramp_up.iter().rev().copied().collect();

    spectral_data(&[
        ("patch01", flat_02),
        ("patch02", flat_09),
        ("patch03", ramp_up),
        ("patch04", ramp_down),
        ("patch05", gaussian(550.0, 60.0, 0.8)),
        ("patch06", gaussian(450.0, 60.0, 0.7)),
    ])
}

fn solver_with_synthetic_data(illuminant: &str) -> SpectralSolver {
    let mut solver = SpectralSolver::new(Database::new(vec![]));
    solver.camera = Some(synthetic_camera());
    solver.observer = Some(synthetic_observer());
    solver.training_data = Some(synthetic_training());
    solver.find_illuminant(illuminant).unwrap();
    solver
}

#[test]
fn test_wb_green_is_unity() {
    let mut solver = solver_with_synthetic_data("D65");
    solver.calculate_wb().unwrap();

    let wb = solver.wb_multipliers();
    assert_eq!(wb[1], 1.0);
    assert!(wb[0] > 0.0 && wb[2] > 0.0);
}

#[test]
fn test_wb_tracks_illuminant_color() {
    // A warm illuminant lifts the red integral, so the red multiplier
    // drops relative to a cool one.
    let mut warm = solver_with_synthetic_data("2000K");
    warm.calculate_wb().unwrap();

    let mut cool = solver_with_synthetic_data("D120");
    cool.calculate_wb().unwrap();

    assert!(warm.wb_multipliers()[0] < cool.wb_multipliers()[0]);
    assert!(warm.wb_multipliers()[2] > cool.wb_multipliers()[2]);
}

#[test]
fn test_idt_rows_sum_to_one() {
    let mut solver = solver_with_synthetic_data("D65");
    solver.calculate_wb().unwrap();
    solver.calculate_idt_matrix().unwrap();

    let idt = solver.idt_matrix();
    for row in idt.m {
        let sum: f64 = row.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "row sums to {sum}");
    }
    assert!(idt.is_finite());
    // The fit must have moved away from the starting point.
    assert!(idt != Mat3::IDENTITY);
}

#[test]
fn test_find_illuminant_by_wb_is_deterministic() {
    // White balance computed under a library member must lead the
    // auto-identification back to that member.
    let mut reference = solver_with_synthetic_data("D65");
    reference.calculate_wb().unwrap();
    let wb = reference.wb_multipliers();

    let mut solver = SpectralSolver::new(Database::new(vec![]));
    solver.camera = Some(synthetic_camera());
    solver.find_illuminant_by_wb(wb).unwrap();
    let first_choice = solver.illuminant.as_ref().unwrap().data_type.clone();
    assert_eq!(first_choice, "d65");

    // Re-running with the same ratios yields the same choice.
    solver.find_illuminant_by_wb(wb).unwrap();
    assert_eq!(solver.illuminant.as_ref().unwrap().data_type, first_choice);
}

#[test]
fn test_auto_identified_wb_matches_candidate() {
    let mut solver = SpectralSolver::new(Database::new(vec![]));
    solver.camera = Some(synthetic_camera());
    solver.find_illuminant_by_wb([1.5, 1.0, 1.2]).unwrap();

    // The stored multipliers are the winner's own white balance.
    let wb = solver.wb_multipliers();
    assert_eq!(wb[1], 1.0);
    assert!(solver.illuminant.is_some());
}

#[test]
fn test_database_illuminant_found_by_type() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("illuminant")).unwrap();

    // A flat emitter on a coarse grid; resampled on load.
    let mut bins = String::new();
    for wl in (380..=780).step_by(20) {
        bins.push_str(&format!("\"{wl}\": [1.0],"));
    }
    bins.pop();
    let json = format!(
        r#"{{
            "header": {{ "type": "flat-emitter" }},
            "spectral_data": {{
                "index": {{ "main": ["power"] }},
                "data": {{ "main": {{ {bins} }} }}
            }}
        }}"#
    );
    fs::write(dir.path().join("illuminant/flat.json"), json).unwrap();

    let mut solver = SpectralSolver::new(Database::new(vec![dir.path().to_path_buf()]));
    solver.find_illuminant("FLAT-EMITTER").unwrap();

    let illuminant = solver.illuminant.as_ref().unwrap();
    assert_eq!(illuminant.data_type, "flat-emitter");
    assert_eq!(illuminant.main("power").unwrap().values.len(), 81);
}

#[test]
fn test_spectral_pipeline_with_database_camera() {
    // The full find_camera -> find_illuminant -> WB -> IDT path through the
    // filesystem.
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("camera")).unwrap();

    let camera = synthetic_camera();
    let mut bins = String::new();
    for i in 0..81 {
        let wl = 380 + 5 * i;
        let r = camera.main("R").unwrap().values[i];
        let g = camera.main("G").unwrap().values[i];
        let b = camera.main("B").unwrap().values[i];
        bins.push_str(&format!("\"{wl}\": [{r}, {g}, {b}],"));
    }
    bins.pop();
    let json = format!(
        r#"{{
            "header": {{ "manufacturer": "Testco", "model": "Alpha One" }},
            "spectral_data": {{
                "index": {{ "main": ["R", "G", "B"] }},
                "data": {{ "main": {{ {bins} }} }}
            }}
        }}"#
    );
    fs::write(dir.path().join("camera/testco_alpha.json"), json).unwrap();

    let mut solver = SpectralSolver::new(Database::new(vec![dir.path().to_path_buf()]));
    solver.find_camera("testco", "ALPHA ONE").unwrap();
    solver.observer = Some(synthetic_observer());
    solver.training_data = Some(synthetic_training());
    solver.find_illuminant("3200K").unwrap();
    solver.calculate_wb().unwrap();
    solver.calculate_idt_matrix().unwrap();

    assert!(solver.idt_matrix().is_finite());
}

#[test]
fn test_metadata_solver_with_plausible_calibration() {
    // An sRGB-like XYZ-to-camera matrix for both calibrations and a typical
    // daylight neutral reading.
    let xyz_to_cam = [
        3.2404542, -1.5371385, -0.4985314, -0.9692660, 1.8760108, 0.0415560, 0.0556434,
        -0.2040259, 1.0572252,
    ];

    let mut metadata = Metadata::default();
    metadata.calibration[0].illuminant = 17; // standard light A
    metadata.calibration[0].xyz_to_rgb_matrix = xyz_to_cam;
    metadata.calibration[1].illuminant = 21; // D65
    metadata.calibration[1].xyz_to_rgb_matrix = xyz_to_cam;
    metadata.neutral_rgb = Some([0.5, 1.0, 0.65]);

    let solver = MetadataSolver::new(metadata);
    let idt = solver.calculate_idt_matrix().unwrap();

    assert!(idt.is_finite());
    assert!(idt.determinant().abs() > 1e-6);

    let cat = solver.calculate_cat_matrix().unwrap();
    assert!(cat.is_finite());
}
