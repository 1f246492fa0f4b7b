//! End-to-end orchestration tests over a synthetic on-disk database:
//! the full spectral path of `configure`, both with a named illuminant and
//! with auto-identification from camera multipliers.

use std::fs;
use std::path::Path;

use rta_convert::{ImageConverter, ImageSpec, MatrixMethod, ParamList, Settings, WbMethod};

fn gaussian(wl: f64, center: f64, width: f64, amplitude: f64) -> f64 {
    amplitude * (-((wl - center) / width).powi(2)).exp()
}

fn write_json(path: &Path, header: &str, channels: &[(&str, fn(f64) -> f64)]) {
    let names: Vec<String> = channels.iter().map(|(n, _)| format!("\"{n}\"")).collect();

    let mut bins = String::new();
    for i in 0..81 {
        let wl = 380.0 + 5.0 * i as f64;
        let values: Vec<String> = channels.iter().map(|(_, f)| f(wl).to_string()).collect();
        bins.push_str(&format!("\"{}\": [{}],", wl as i32, values.join(", ")));
    }
    bins.pop();

    let json = format!(
        r#"{{
            "header": {{ {header} }},
            "spectral_data": {{
                "units": "relative",
                "index": {{ "main": [{}] }},
                "data": {{ "main": {{ {bins} }} }}
            }}
        }}"#,
        names.join(", ")
    );
    fs::write(path, json).unwrap();
}

/// Lays out a complete synthetic database: one camera, the 1931 observer
/// stand-in and a handful of training patches.
fn write_database(root: &Path) {
    fs::create_dir_all(root.join("camera")).unwrap();
    fs::create_dir_all(root.join("cmf")).unwrap();
    fs::create_dir_all(root.join("training")).unwrap();

    write_json(
        &root.join("camera/testco_alpha.json"),
        r#""manufacturer": "Testco", "model": "Alpha""#,
        &[
            ("R", |wl| gaussian(wl, 600.0, 55.0, 0.9)),
            ("G", |wl| gaussian(wl, 540.0, 50.0, 1.0)),
            ("B", |wl| gaussian(wl, 460.0, 45.0, 0.8)),
        ],
    );

    write_json(
        &root.join("cmf/cmf_1931.json"),
        r#""type": "observer""#,
        &[
            ("X", |wl| gaussian(wl, 595.0, 55.0, 1.05)),
            ("Y", |wl| gaussian(wl, 555.0, 50.0, 1.0)),
            ("Z", |wl| gaussian(wl, 445.0, 40.0, 1.75)),
        ],
    );

    write_json(
        &root.join("training/training_spectral.json"),
        r#""type": "training""#,
        &[
            ("patch01", |_| 0.2),
            ("patch02", |_| 0.9),
            ("patch03", |wl| 0.1 + 0.8 * (wl - 380.0) / 400.0),
            ("patch04", |wl| 0.9 - 0.8 * (wl - 380.0) / 400.0),
            ("patch05", |wl| gaussian(wl, 550.0, 60.0, 0.8)),
            ("patch06", |wl| gaussian(wl, 450.0, 60.0, 0.7)),
        ],
    );
}

fn spec_for_camera(make: &str, model: &str) -> ImageSpec {
    let mut spec = ImageSpec::new();
    spec.attributes.set_str("cameraMake", make);
    spec.attributes.set_str("cameraModel", model);
    spec
}

#[test]
fn test_spectral_path_with_named_illuminant() {
    let dir = tempfile::tempdir().unwrap();
    write_database(dir.path());

    let settings = Settings {
        wb_method: WbMethod::Illuminant,
        matrix_method: MatrixMethod::Spectral,
        illuminant: "D65".to_string(),
        database_directories: vec![dir.path().to_path_buf()],
        ..Default::default()
    };

    let mut converter = ImageConverter::new(settings);
    let spec = spec_for_camera("Testco", "Alpha");
    let options = converter.configure(&spec, &ParamList::new()).unwrap();

    // Spectral mode decodes in the raw camera space; WB and IDT apply later.
    assert_eq!(options.get_str("raw:ColorSpace"), Some("raw"));
    assert_eq!(options.get_int("raw:use_camera_matrix"), Some(0));

    // The solved WB is handed to the decoder with the green duplicated into
    // the fourth slot.
    let user_mul = options.get_float_vec("raw:user_mul", 4).unwrap();
    assert_eq!(user_mul[1], 1.0);
    assert_eq!(user_mul[3], 1.0);

    let wb = converter.wb_multipliers();
    assert_eq!(wb.len(), 3);
    assert_eq!(wb[1], 1.0);

    let idt = converter.idt_matrix().unwrap();
    for row in idt.m {
        let sum: f64 = row.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    // Spectral mode embeds the adaptation in the IDT.
    assert!(converter.cat_matrix().is_none());
    assert_eq!(converter.matrix_pipeline().len(), 1);
}

#[test]
fn test_spectral_path_auto_illuminant_from_pre_mul() {
    let dir = tempfile::tempdir().unwrap();
    write_database(dir.path());

    let settings = Settings {
        matrix_method: MatrixMethod::Spectral,
        database_directories: vec![dir.path().to_path_buf()],
        ..Default::default()
    };

    let mut spec = spec_for_camera("Testco", "Alpha");
    spec.attributes
        .set_float_vec("raw:pre_mul", &[1.5, 1.0, 1.2, 1.0]);

    let mut converter = ImageConverter::new(settings);
    converter.configure(&spec, &ParamList::new()).unwrap();

    // Auto-identification picked some candidate and kept its multipliers.
    let wb = converter.wb_multipliers();
    assert_eq!(wb.len(), 3);
    assert_eq!(wb[1], 1.0);
    assert!(converter.idt_matrix().is_some());

    // Deterministic: a second run with the same inputs chooses identically.
    let mut converter2 = ImageConverter::new(Settings {
        matrix_method: MatrixMethod::Spectral,
        database_directories: vec![dir.path().to_path_buf()],
        ..Default::default()
    });
    converter2.configure(&spec, &ParamList::new()).unwrap();
    assert_eq!(converter.wb_multipliers(), converter2.wb_multipliers());
    assert_eq!(converter.idt_matrix(), converter2.idt_matrix());
}

#[test]
fn test_auto_matrix_resolves_to_spectral_when_camera_known() {
    let dir = tempfile::tempdir().unwrap();
    write_database(dir.path());

    let settings = Settings {
        database_directories: vec![dir.path().to_path_buf()],
        ..Default::default()
    };

    let mut spec = spec_for_camera("Testco", "Alpha");
    spec.attributes
        .set_float_vec("raw:pre_mul", &[1.5, 1.0, 1.2, 1.0]);

    let mut converter = ImageConverter::new(settings);
    let options = converter.configure(&spec, &ParamList::new()).unwrap();

    // Auto resolved to spectral: raw colorspace, solved IDT present.
    assert_eq!(options.get_str("raw:ColorSpace"), Some("raw"));
    assert!(converter.idt_matrix().is_some());
}

#[test]
fn test_auto_matrix_falls_back_for_unknown_camera() {
    let dir = tempfile::tempdir().unwrap();
    write_database(dir.path());

    let settings = Settings {
        database_directories: vec![dir.path().to_path_buf()],
        ..Default::default()
    };

    let spec = spec_for_camera("Othercorp", "Beta");
    let mut converter = ImageConverter::new(settings);
    let options = converter.configure(&spec, &ParamList::new()).unwrap();

    // Fallback to metadata; non-DNG gets the fixed CAT.
    assert_eq!(options.get_str("raw:ColorSpace"), Some("XYZ"));
    assert!(converter.idt_matrix().is_none());
    assert!(converter.cat_matrix().is_some());
}

#[test]
fn test_spectral_path_missing_training_data() {
    let dir = tempfile::tempdir().unwrap();
    write_database(dir.path());
    fs::remove_file(dir.path().join("training/training_spectral.json")).unwrap();

    let settings = Settings {
        matrix_method: MatrixMethod::Spectral,
        database_directories: vec![dir.path().to_path_buf()],
        ..Default::default()
    };

    let mut converter = ImageConverter::new(settings);
    let err = converter
        .configure(&spec_for_camera("Testco", "Alpha"), &ParamList::new())
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("training data"));
    assert!(message.contains("RAWTOACES_DATA_PATH"));
}

#[test]
fn test_custom_camera_override_used_for_lookup() {
    let dir = tempfile::tempdir().unwrap();
    write_database(dir.path());

    let settings = Settings {
        matrix_method: MatrixMethod::Spectral,
        custom_camera_make: "Testco".to_string(),
        custom_camera_model: "Alpha".to_string(),
        database_directories: vec![dir.path().to_path_buf()],
        ..Default::default()
    };

    // No metadata at all; the override supplies the identity.
    let mut spec = ImageSpec::new();
    spec.attributes
        .set_float_vec("raw:pre_mul", &[1.5, 1.0, 1.2, 1.0]);

    let mut converter = ImageConverter::new(settings);
    converter.configure(&spec, &ParamList::new()).unwrap();
    assert!(converter.idt_matrix().is_some());
}
