//! The conversion orchestrator.
//!
//! [`ImageConverter::configure`] reads the image metadata, applies the chosen
//! white-balance and matrix methods, invokes the spectral or metadata solver
//! as needed and leaves behind three things: the hints for the raw decoder,
//! the white-balance multipliers, and the IDT/CAT matrices for the pixel
//! pipeline.
//!
//! Matrix application order for the pixel code: the IDT first (when
//! present), then the CAT followed by the canonical XYZ-to-ACES matrix (when
//! a CAT is present).

use std::fmt;
use std::path::Path;

use tracing::debug;

use rta_math::Mat3;
use rta_solver::colorimetry::{cat_d65_to_aces, XYZ_TO_ACES};
use rta_solver::{Calibration, Metadata, MetadataSolver, SpectralSolver};
use rta_spectral::Database;

use crate::settings::{CropMode, MatrixMethod, Settings, WbMethod};
use crate::spec::{ImageSpec, ParamList};
use crate::{Error, Result};

/// The camera identity used for the spectral data lookup.
#[derive(Debug, Clone, Default)]
struct CameraIdentifier {
    make: String,
    model: String,
}

impl fmt::Display for CameraIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "make: '{}', model: '{}'", self.make, self.model)
    }
}

/// Resolves the camera identity from the settings override or the file
/// metadata, failing with a directive message when neither has it.
fn camera_identifier(spec: &ImageSpec, settings: &Settings) -> Result<CameraIdentifier> {
    let make = if !settings.custom_camera_make.is_empty() {
        settings.custom_camera_make.clone()
    } else {
        spec.attributes
            .get_str("cameraMake")
            .filter(|s| !s.is_empty())
            .ok_or(Error::MissingCameraMake)?
            .to_string()
    };

    let model = if !settings.custom_camera_model.is_empty() {
        settings.custom_camera_model.clone()
    } else {
        spec.attributes
            .get_str("cameraModel")
            .filter(|s| !s.is_empty())
            .ok_or(Error::MissingCameraModel)?
            .to_string()
    };

    Ok(CameraIdentifier { make, model })
}

/// Orchestrates the conversion of raw images to ACES.
///
/// One converter handles one image at a time; batch drivers run independent
/// converters per image. The solved transform of the current image is
/// available through [`wb_multipliers`](Self::wb_multipliers),
/// [`idt_matrix`](Self::idt_matrix) and [`cat_matrix`](Self::cat_matrix)
/// after a successful [`configure`](Self::configure).
#[derive(Debug, Default)]
pub struct ImageConverter {
    /// The conversion settings.
    pub settings: Settings,

    // Solved transform of the current image.
    wb_multipliers: Vec<f64>,
    idt_matrix: Option<Mat3>,
    cat_matrix: Option<Mat3>,
}

impl ImageConverter {
    /// Creates a converter with the given settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    fn database(&self) -> Database {
        let mut db = Database::new(self.settings.database_directories.clone());
        db.verbosity = self.settings.verbosity;
        db
    }

    /// All illuminants supported by this configuration: the synthetic
    /// families plus the database entries.
    pub fn supported_illuminants(&self) -> Vec<String> {
        self.database().illuminants()
    }

    /// All camera models with spectral sensitivity data in the database.
    pub fn supported_cameras(&self) -> Vec<String> {
        self.database().cameras()
    }

    /// The white-balance multipliers of the current image (3 or 4 values;
    /// empty until configured).
    pub fn wb_multipliers(&self) -> &[f64] {
        &self.wb_multipliers
    }

    /// The IDT matrix of the current image; `None` means identity.
    pub fn idt_matrix(&self) -> Option<Mat3> {
        self.idt_matrix
    }

    /// The CAT matrix of the current image; `None` means no chromatic
    /// adaptation step.
    pub fn cat_matrix(&self) -> Option<Mat3> {
        self.cat_matrix
    }

    /// The matrices the pixel pipeline must apply, in order.
    ///
    /// The IDT comes first; a CAT is followed by the canonical XYZ-to-ACES
    /// matrix, matching the ACES container expectation that pixels end up in
    /// AP0.
    pub fn matrix_pipeline(&self) -> Vec<Mat3> {
        let mut stages = Vec::new();
        if let Some(idt) = self.idt_matrix {
            stages.push(idt);
        }
        if let Some(cat) = self.cat_matrix {
            stages.push(cat);
            stages.push(XYZ_TO_ACES);
        }
        stages
    }

    /// Configures the conversion of one image from its metadata.
    ///
    /// Returns the hints to hand to the raw decoder when reading the pixels.
    /// On failure the converter's transform state is unspecified and the
    /// image should be skipped.
    pub fn configure(&mut self, image_spec: &ImageSpec, hints: &ParamList) -> Result<ParamList> {
        self.wb_multipliers.clear();
        self.idt_matrix = None;
        self.cat_matrix = None;

        let settings = &self.settings;

        let mut options = hints.clone();
        options.set_int("raw:use_camera_wb", 0);
        options.set_int("raw:use_auto_wb", 0);

        options.set_int("raw:auto_bright", settings.auto_bright as i32);
        options.set_float("raw:adjust_maximum_thr", settings.adjust_maximum_threshold);
        options.set_int("raw:user_black", settings.black_level);
        options.set_int("raw:user_sat", settings.saturation_level);
        options.set_int("raw:half_size", settings.half_size as i32);
        options.set_int("raw:user_flip", settings.flip);
        options.set_int("raw:HighlightMode", settings.highlight_mode);
        options.set_str("raw:Demosaic", &settings.demosaic_algorithm);
        options.set_float("raw:threshold", settings.denoise_threshold);

        if settings.crop_box[2] != 0 && settings.crop_box[3] != 0 {
            options.set_int_vec("raw:cropbox", &settings.crop_box);
        }

        if settings.chromatic_aberration[0] != 1.0 && settings.chromatic_aberration[1] != 1.0 {
            options.set_float_vec("raw:aber", &settings.chromatic_aberration);
        }

        let is_dng = image_spec.is_dng();

        match settings.wb_method {
            WbMethod::Metadata => {
                if let Some(cam_mul) = image_spec.attributes.get_float_vec("raw:cam_mul", 4) {
                    options.set_float_vec("raw:user_mul", cam_mul);
                    self.wb_multipliers = cam_mul.iter().map(|&v| f64::from(v)).collect();
                }
            }
            WbMethod::Illuminant => {
                // Applied after the spectral solve below.
            }
            WbMethod::Box => {
                let is_empty_box = settings.wb_box[2] == 0 || settings.wb_box[3] == 0;
                if is_empty_box {
                    // Use the whole image (auto white balancing).
                    options.set_int("raw:use_auto_wb", 1);
                } else {
                    options.set_int_vec("raw:greybox", &settings.wb_box);
                }
            }
            WbMethod::Custom => {
                let custom_wb: Vec<f32> =
                    settings.custom_wb.iter().map(|&v| v as f32).collect();
                options.set_float_vec("raw:user_mul", &custom_wb);
                self.wb_multipliers = settings.custom_wb.to_vec();
            }
        }

        // Auto matrix method: spectral when the database knows the camera,
        // metadata otherwise.
        let mut matrix_method = settings.matrix_method;
        if matrix_method == MatrixMethod::Auto {
            let identifier = camera_identifier(image_spec, settings);

            let found = match &identifier {
                Ok(id) => {
                    let mut solver = SpectralSolver::new(self.database());
                    solver.find_camera(&id.make, &id.model).is_ok()
                }
                Err(_) => false,
            };

            if found {
                matrix_method = MatrixMethod::Spectral;
            } else {
                matrix_method = MatrixMethod::Metadata;
                if settings.verbosity > 0 {
                    let described = identifier
                        .map(|id| id.to_string())
                        .unwrap_or_else(|_| "make: '', model: ''".to_string());
                    eprintln!(
                        "Info: Falling back to metadata matrix method because no \
                         spectral data was found for camera {described}"
                    );
                }
            }
        }

        match matrix_method {
            MatrixMethod::Spectral => {
                options.set_str("raw:ColorSpace", "raw");
                options.set_int("raw:use_camera_matrix", 0);
            }
            MatrixMethod::Metadata => {
                options.set_str("raw:ColorSpace", "XYZ");
                options.set_int("raw:use_camera_matrix", if is_dng { 1 } else { 3 });
            }
            MatrixMethod::Adobe => {
                options.set_str("raw:ColorSpace", "XYZ");
                options.set_int("raw:use_camera_matrix", 1);
            }
            MatrixMethod::Custom => {
                options.set_str("raw:ColorSpace", "raw");
                options.set_int("raw:use_camera_matrix", 0);
                self.idt_matrix = Some(Mat3::from_rows(self.settings.custom_matrix));
            }
            MatrixMethod::Auto => unreachable!("auto resolves above"),
        }

        let is_spectral_wb = self.settings.wb_method == WbMethod::Illuminant;
        let is_spectral_matrix = matrix_method == MatrixMethod::Spectral;

        if is_spectral_wb || is_spectral_matrix {
            self.prepare_transform_spectral(image_spec)?;

            if is_spectral_wb {
                let mut user_mul = [0.0f32; 4];
                for (i, &v) in self.wb_multipliers.iter().take(4).enumerate() {
                    user_mul[i] = v as f32;
                }
                if self.wb_multipliers.len() == 3 {
                    user_mul[3] = self.wb_multipliers[1] as f32;
                }
                options.set_float_vec("raw:user_mul", &user_mul);
            }
        }

        if matrix_method == MatrixMethod::Metadata {
            if is_dng {
                options.set_int("raw:use_camera_matrix", 1);
                options.set_int("raw:use_camera_wb", 1);
                self.prepare_transform_dng(image_spec)?;
            } else {
                self.prepare_transform_non_dng();
            }
        } else if matrix_method == MatrixMethod::Adobe {
            self.prepare_transform_non_dng();
        }

        if self.settings.verbosity > 1 {
            self.print_configuration();
        }

        Ok(options)
    }

    /// Runs the spectral solver: camera lookup, training and observer data,
    /// illuminant resolution (named or auto-identified), white balance and
    /// the IDT fit.
    ///
    /// No CAT is produced; in spectral mode the adaptation is embedded in
    /// the IDT.
    fn prepare_transform_spectral(&mut self, image_spec: &ImageSpec) -> Result<()> {
        let settings = &self.settings;
        let identifier = camera_identifier(image_spec, settings)?;

        let mut solver = SpectralSolver::new(self.database());
        solver.verbosity = settings.verbosity;

        solver
            .find_camera(&identifier.make, &identifier.model)
            .map_err(|_| Error::DataMissing {
                what: format!("spectral data for camera {identifier}"),
            })?;

        let training_path = "training/training_spectral.json";
        solver.training_data = Some(solver.load_spectral_data(Path::new(training_path)).map_err(
            |_| Error::DataMissing {
                what: format!("training data '{training_path}'"),
            },
        )?);

        let observer_path = "cmf/cmf_1931.json";
        solver.observer = Some(solver.load_spectral_data(Path::new(observer_path)).map_err(
            |_| Error::DataMissing {
                what: format!("observer '{observer_path}'"),
            },
        )?);

        let illuminant = settings.illuminant.to_lowercase();

        if illuminant.is_empty() {
            // Auto-detect the illuminant from white balance multipliers,
            // taken from the WB solved so far or from the camera metadata.
            let mut multipliers = [0.0f64; 4];

            if self.wb_multipliers.len() == 4 {
                multipliers[..3].copy_from_slice(&self.wb_multipliers[..3]);
            } else if let Some(pre_mul) =
                image_spec.attributes.get_float_vec("raw:pre_mul", 4)
            {
                for (dst, &src) in multipliers.iter_mut().zip(pre_mul.iter()) {
                    *dst = f64::from(src);
                }
            }

            // Average the green channels of 4-channel data.
            if multipliers[3] != 0.0 {
                multipliers[1] = (multipliers[1] + multipliers[3]) / 2.0;
            }
            let mut wb = [multipliers[0], multipliers[1], multipliers[2]];

            let min = wb[0].min(wb[1]).min(wb[2]);
            if min > 0.0 && min != 1.0 {
                for v in wb.iter_mut() {
                    *v /= min;
                }
            }

            solver
                .find_illuminant_by_wb(wb)
                .map_err(|_| Error::NoSuitableIlluminant)?;

            self.wb_multipliers = solver.wb_multipliers().to_vec();

            if settings.verbosity > 0 {
                let found = solver
                    .illuminant
                    .as_ref()
                    .map(|i| i.data_type.clone())
                    .unwrap_or_default();
                eprintln!("Found illuminant: '{found}'.");
            }
        } else {
            solver
                .find_illuminant(&illuminant)
                .map_err(|_| Error::DataMissing {
                    what: format!("illuminant type = '{illuminant}'"),
                })?;

            solver.calculate_wb()?;
            self.wb_multipliers = solver.wb_multipliers().to_vec();

            if settings.verbosity > 0 {
                eprintln!("White balance coefficients:");
                let formatted: Vec<String> = self
                    .wb_multipliers
                    .iter()
                    .map(|v| format!("{v:.6}"))
                    .collect();
                eprintln!("{}", formatted.join(" "));
            }
        }

        solver.calculate_idt_matrix()?;
        self.idt_matrix = Some(solver.idt_matrix());

        if settings.verbosity > 0 {
            eprintln!("Input Device Transform (IDT) matrix:");
            for row in solver.idt_matrix().m {
                eprintln!("  {:.6} {:.6} {:.6}", row[0], row[1], row[2]);
            }
        }

        // CAT is embedded in the IDT in spectral mode.
        self.cat_matrix = None;

        Ok(())
    }

    /// Extracts the DNG calibration tags and runs the metadata solver.
    fn prepare_transform_dng(&mut self, image_spec: &ImageSpec) -> Result<()> {
        let attrs = &image_spec.attributes;

        let mut metadata = Metadata {
            baseline_exposure: attrs
                .get_float("raw:dng:baseline_exposure")
                .map_or(0.0, f64::from),
            neutral_rgb: attrs.get_float_vec("raw:cam_mul", 4).map(|cam_mul| {
                [
                    1.0 / f64::from(cam_mul[0]),
                    1.0 / f64::from(cam_mul[1]),
                    1.0 / f64::from(cam_mul[2]),
                ]
            }),
            calibration: [Calibration::default(), Calibration::default()],
        };

        for (k, calibration) in metadata.calibration.iter_mut().enumerate() {
            let index = k + 1;

            calibration.illuminant = attrs
                .get_int(&format!("raw:dng:calibration_illuminant{index}"))
                .unwrap_or(0) as u16;

            // The DNG ColorMatrix tag is stored 4x3; only the top 3x3 block
            // carries the XYZ-to-camera matrix.
            if let Some(matrix) = attrs.get_float_vec(&format!("raw:dng:color_matrix{index}"), 12)
            {
                for i in 0..3 {
                    for j in 0..3 {
                        calibration.xyz_to_rgb_matrix[i * 3 + j] = f64::from(matrix[i * 3 + j]);
                    }
                }
            }

            // CameraCalibration is 3x3 stored with a 4-wide row stride.
            if let Some(matrix) =
                attrs.get_float_vec(&format!("raw:dng:camera_calibration{index}"), 16)
            {
                for i in 0..3 {
                    for j in 0..3 {
                        calibration.camera_calibration_matrix[i * 3 + j] =
                            f64::from(matrix[i * 4 + j]);
                    }
                }
            }
        }

        let solver = MetadataSolver::new(metadata);
        let idt = solver.calculate_idt_matrix()?;

        if self.settings.verbosity > 0 {
            eprintln!("Input transform matrix:");
            for row in idt.m {
                eprintln!("{:.6} {:.6} {:.6}", row[0], row[1], row[2]);
            }
        }

        self.idt_matrix = Some(idt);
        // Do not apply a CAT for DNG; the adaptation is part of the IDT.
        self.cat_matrix = None;

        Ok(())
    }

    /// Non-DNG metadata and Adobe modes: the decoder emits D65 XYZ, so the
    /// transform is just the fixed CAT to the ACES white point.
    fn prepare_transform_non_dng(&mut self) {
        self.idt_matrix = None;
        self.cat_matrix = Some(cat_d65_to_aces());
        debug!("using the fixed D65-to-ACES adaptation");
    }

    fn print_configuration(&self) {
        let settings = &self.settings;

        eprintln!("Configuration:");

        let wb = match settings.wb_method {
            WbMethod::Metadata => "metadata",
            WbMethod::Illuminant => "illuminant",
            WbMethod::Box => "box",
            WbMethod::Custom => "custom",
        };
        eprintln!("  WB method: {wb}");

        let matrix = match settings.matrix_method {
            MatrixMethod::Auto => "auto",
            MatrixMethod::Spectral => "spectral",
            MatrixMethod::Metadata => "metadata",
            MatrixMethod::Adobe => "Adobe",
            MatrixMethod::Custom => "custom",
        };
        eprintln!("  Matrix method: {matrix}");

        if !settings.illuminant.is_empty() {
            eprintln!("  Illuminant: {}", settings.illuminant);
        }

        if !settings.custom_camera_make.is_empty() || !settings.custom_camera_model.is_empty() {
            eprintln!(
                "  Camera override: {} / {}",
                settings.custom_camera_make, settings.custom_camera_model
            );
        }

        if settings.wb_method == WbMethod::Box {
            eprintln!(
                "  WB box: [{}, {}, {}, {}]",
                settings.wb_box[0], settings.wb_box[1], settings.wb_box[2], settings.wb_box[3]
            );
        }

        if settings.wb_method == WbMethod::Custom {
            eprintln!(
                "  Custom WB: [{}, {}, {}, {}]",
                settings.custom_wb[0],
                settings.custom_wb[1],
                settings.custom_wb[2],
                settings.custom_wb[3]
            );
        }

        if settings.matrix_method == MatrixMethod::Custom {
            eprintln!("  Custom matrix:");
            for row in settings.custom_matrix {
                eprintln!("    [{} {} {}]", row[0], row[1], row[2]);
            }
        }

        let crop = match settings.crop_mode {
            CropMode::Off => "off",
            CropMode::Soft => "soft",
            CropMode::Hard => "hard",
        };
        eprintln!("  Crop mode: {crop}");

        if settings.crop_box[2] > 0 && settings.crop_box[3] > 0 {
            eprintln!(
                "  Crop box: [{}, {}, {}, {}]",
                settings.crop_box[0],
                settings.crop_box[1],
                settings.crop_box[2],
                settings.crop_box[3]
            );
        }

        eprintln!("  Demosaic: {}", settings.demosaic_algorithm);
        eprintln!("  Headroom: {}", settings.headroom);
        eprintln!("  Scale: {}", settings.scale);
        eprintln!(
            "  Output dir: {}",
            settings
                .output_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "<same as input>".to_string())
        );
        eprintln!("  Overwrite: {}", if settings.overwrite { "yes" } else { "no" });
        eprintln!(
            "  Create dirs: {}",
            if settings.create_dirs { "yes" } else { "no" }
        );
        eprintln!("  Verbosity: {}", settings.verbosity);
    }
}

/// The ACES Image Container attributes (SMPTE ST 2065-4) the writer must
/// apply: AP0 chromaticities, the container flag, no compression, HALF
/// pixels, scene-linear AP0 color space.
pub fn aces_container_attributes() -> ParamList {
    let mut attrs = ParamList::new();
    attrs.set_int("acesImageContainerFlag", 1);
    attrs.set_str("compression", "none");
    attrs.set_str("oiio:ColorSpace", "lin_ap0_scene");
    attrs.set_str("format", "half");
    attrs.set_float_vec(
        "chromaticities",
        &[0.7347, 0.2653, 0.0, 1.0, 0.0001, -0.077, 0.32168, 0.33767],
    );
    attrs
}
