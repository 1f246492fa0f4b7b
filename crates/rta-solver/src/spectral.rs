//! The spectral solver.
//!
//! Holds four spectral data slots (camera, illuminant, observer, training
//! data) and derives white-balance multipliers and the IDT matrix from them.
//! Camera and illuminant are located through the [`Database`]; the illuminant
//! can also be synthesised (D-series / blackbody) or auto-identified from
//! measured white-balance ratios.

use std::path::Path;

use tracing::{debug, warn};

use rta_math::{Mat3, Vec3, ACES_WHITE};
use rta_spectral::illuminant::generate_illuminant;
use rta_spectral::{Database, SpectralData, Spectrum};

use crate::colorimetry::calculate_cat;
use crate::fit::solve_idt;
use crate::{Error, Result};

/// Derives white balance and the input device transform from spectral data.
///
/// The candidate illuminant library used by white-balance auto-identification
/// is built eagerly at construction: daylight from 4000 K to 25000 K in
/// 500 K steps, blackbody from 1500 K to just under 4000 K in 500 K steps,
/// plus every illuminant file found in the database. After construction a
/// solver only mutates through its explicit setter calls.
pub struct SpectralSolver {
    /// Diagnostic verbosity, 0 = silent.
    pub verbosity: i32,
    /// Camera spectral sensitivities (channels `R`, `G`, `B`).
    pub camera: Option<SpectralData>,
    /// Illuminant spectral power distribution (channel `power`).
    pub illuminant: Option<SpectralData>,
    /// Observer color matching functions (channels `X`, `Y`, `Z`).
    pub observer: Option<SpectralData>,
    /// Training patch reflectances, one channel per patch.
    pub training_data: Option<SpectralData>,

    db: Database,
    wb_multipliers: [f64; 3],
    idt_matrix: Mat3,
    all_illuminants: Vec<SpectralData>,
}

impl SpectralSolver {
    /// Creates a solver over the given database.
    pub fn new(db: Database) -> Self {
        let mut all_illuminants = Vec::new();

        for cct in (4000..=25000).step_by(500) {
            let type_name = format!("d{}", cct / 100);
            match generate_illuminant(cct, &type_name, true) {
                Ok(illuminant) => all_illuminants.push(illuminant),
                Err(e) => warn!("skipping daylight candidate {cct} K: {e}"),
            }
        }

        for cct in (1500..4000).step_by(500) {
            let type_name = format!("{cct}k");
            match generate_illuminant(cct, &type_name, false) {
                Ok(illuminant) => all_illuminants.push(illuminant),
                Err(e) => warn!("skipping blackbody candidate {cct} K: {e}"),
            }
        }

        for file in db.collect_files("illuminant") {
            match SpectralData::load(&file, true) {
                Ok(illuminant) => all_illuminants.push(illuminant),
                Err(e) => warn!("skipping illuminant file {}: {e}", file.display()),
            }
        }

        Self {
            verbosity: 0,
            camera: None,
            illuminant: None,
            observer: None,
            training_data: None,
            db,
            wb_multipliers: [1.0, 1.0, 1.0],
            idt_matrix: Mat3::IDENTITY,
            all_illuminants,
        }
    }

    /// The database this solver resolves files through.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// The white-balance multipliers from the latest solve, `(R, G, B)` with
    /// G normalised to 1.
    pub fn wb_multipliers(&self) -> [f64; 3] {
        self.wb_multipliers
    }

    /// The IDT matrix from the latest solve; identity until
    /// [`calculate_idt_matrix`](Self::calculate_idt_matrix) succeeds.
    pub fn idt_matrix(&self) -> Mat3 {
        self.idt_matrix
    }

    /// Loads a spectral data file by path, searching the database roots for
    /// relative paths.
    pub fn load_spectral_data(&self, path: &Path) -> Result<SpectralData> {
        let resolved = self
            .db
            .find_file(path)
            .ok_or_else(|| Error::FileNotFound(path.to_path_buf()))?;
        Ok(SpectralData::load(&resolved, true)?)
    }

    /// Finds the camera with the given make and model, case-insensitively,
    /// among the `camera` files of the database, and loads it into the
    /// `camera` slot.
    pub fn find_camera(&mut self, make: &str, model: &str) -> Result<()> {
        for file in self.db.collect_files("camera") {
            let data = match SpectralData::load(&file, true) {
                Ok(data) => data,
                Err(e) => {
                    warn!("skipping camera file {}: {e}", file.display());
                    continue;
                }
            };

            if data.manufacturer.eq_ignore_ascii_case(make)
                && data.model.eq_ignore_ascii_case(model)
            {
                debug!("camera data found in {}", file.display());
                self.camera = Some(data);
                return Ok(());
            }
        }

        Err(Error::CameraNotFound {
            make: make.to_string(),
            model: model.to_string(),
        })
    }

    /// Resolves an illuminant from its type string and loads it into the
    /// `illuminant` slot.
    ///
    /// Strings starting with `D`/`d` (and not ending in `K`/`k`) synthesise a
    /// daylight SPD from the trailing digits, e.g. `D65` or `D6025`. Strings
    /// ending in `K`/`k` synthesise a blackbody, e.g. `3200K`. Anything else
    /// is matched case-insensitively against the `illuminant` files of the
    /// database.
    pub fn find_illuminant(&mut self, type_name: &str) -> Result<()> {
        if type_name.is_empty() {
            return Err(Error::IlluminantNotFound(String::new()));
        }

        let starts_with_d = type_name.chars().next().is_some_and(|c| c.eq_ignore_ascii_case(&'d'));
        let ends_with_k = type_name.chars().last().is_some_and(|c| c.eq_ignore_ascii_case(&'k'));

        // daylight ("D" + numeric value)
        let is_daylight = starts_with_d && !ends_with_k;
        // blackbody (numeric value + "K")
        let is_blackbody = !starts_with_d && ends_with_k;

        if is_daylight {
            let cct: i32 = type_name[1..].parse().unwrap_or(0);
            self.illuminant = Some(generate_illuminant(cct, &format!("d{cct}"), true)?);
            return Ok(());
        }

        if is_blackbody {
            let cct: i32 = type_name[..type_name.len() - 1].parse().unwrap_or(0);
            self.illuminant = Some(generate_illuminant(cct, &format!("{cct}k"), false)?);
            return Ok(());
        }

        for file in self.db.collect_files("illuminant") {
            let Ok(data) = SpectralData::load(&file, true) else {
                continue;
            };
            if data.data_type.eq_ignore_ascii_case(type_name) {
                self.illuminant = Some(data);
                return Ok(());
            }
        }

        Err(Error::IlluminantNotFound(type_name.to_string()))
    }

    /// Auto-identifies the illuminant best matching a set of measured
    /// white-balance ratios.
    ///
    /// For every candidate in the illuminant library the white balance the
    /// camera would produce under it is computed; the candidate minimising
    /// the squared Euclidean distance to `wb` wins, and its multipliers are
    /// kept. Requires the `camera` slot to be populated.
    pub fn find_illuminant_by_wb(&mut self, wb: [f64; 3]) -> Result<()> {
        let camera = require_channels(
            &self.camera,
            3,
            "camera",
            "SpectralSolver::find_illuminant_by_wb",
        )?;

        let mut best_sse = f64::MAX;
        let mut best: Option<(SpectralData, [f64; 3])> = None;

        for candidate in &mut self.all_illuminants {
            let wb_candidate = calculate_wb_pair(camera, candidate)?;
            let sse = calculate_sse(&wb_candidate, &wb);

            if sse < best_sse {
                best_sse = sse;
                best = Some((candidate.clone(), wb_candidate));
            }
        }

        let (illuminant, multipliers) =
            best.ok_or_else(|| Error::IlluminantNotFound("<auto>".to_string()))?;

        if self.verbosity > 1 {
            eprintln!(
                "The illuminant calculated to be the best match to the camera metadata is '{}'.",
                illuminant.data_type
            );
        }

        self.illuminant = Some(illuminant);
        self.wb_multipliers = multipliers;

        Ok(())
    }

    /// Calculates the white-balance multipliers for the loaded camera and
    /// illuminant.
    ///
    /// The illuminant is first normalised against the camera's strongest
    /// channel, then the multipliers are the green-normalised reciprocal
    /// channel integrals: `(g/r, 1, g/b)`.
    pub fn calculate_wb(&mut self) -> Result<()> {
        let camera = require_channels(&self.camera, 3, "camera", "SpectralSolver::calculate_wb")?;
        let illuminant = require_channels_mut(
            &mut self.illuminant,
            1,
            "illuminant",
            "SpectralSolver::calculate_wb",
        )?;

        self.wb_multipliers = calculate_wb_pair(camera, illuminant)?;
        Ok(())
    }

    /// Calculates the IDT matrix for the loaded camera, illuminant, observer
    /// and training data, using the current white-balance multipliers.
    pub fn calculate_idt_matrix(&mut self) -> Result<()> {
        const OP: &str = "SpectralSolver::calculate_idt_matrix";

        let camera = require_channels(&self.camera, 3, "camera", OP)?;
        let illuminant = require_channels(&self.illuminant, 1, "illuminant", OP)?;
        let observer = require_channels(&self.observer, 3, "observer", OP)?;

        let training = self.training_data.as_ref().filter(|t| t.main_channel_count() > 0);
        let training = training.ok_or(Error::Precondition {
            field: "training data",
            operation: OP,
        })?;

        let ti = calculate_ti(illuminant, training)?;
        let rgb = calculate_rgb(camera, self.wb_multipliers, &ti)?;
        let xyz = calculate_xyz(observer, illuminant, &ti)?;

        self.idt_matrix = solve_idt(&rgb, &xyz, self.verbosity)?;
        Ok(())
    }
}

fn require_channels<'a>(
    slot: &'a Option<SpectralData>,
    count: usize,
    field: &'static str,
    operation: &'static str,
) -> Result<&'a SpectralData> {
    slot.as_ref()
        .filter(|d| d.main_channel_count() == count)
        .ok_or(Error::Precondition { field, operation })
}

fn require_channels_mut<'a>(
    slot: &'a mut Option<SpectralData>,
    count: usize,
    field: &'static str,
    operation: &'static str,
) -> Result<&'a mut SpectralData> {
    slot.as_mut()
        .filter(|d| d.main_channel_count() == count)
        .ok_or(Error::Precondition { field, operation })
}

/// Scales the illuminant so that its integral against the camera's strongest
/// channel equals one.
fn scale_illuminant(camera: &SpectralData, illuminant: &mut SpectralData) -> Result<()> {
    let max_r = camera.main("R")?.max_value();
    let max_g = camera.main("G")?.max_value();
    let max_b = camera.main("B")?.max_value();

    let strongest = if max_r >= max_g && max_r >= max_b {
        "R"
    } else if max_g >= max_r && max_g >= max_b {
        "G"
    } else {
        "B"
    };

    let camera_spectrum = camera.main(strongest)?;
    let power = illuminant.main_mut("power")?;

    let scale = 1.0 / camera_spectrum.try_mul(power)?.integrate();
    power.scale(scale);

    Ok(())
}

/// White balance of a camera/illuminant pair: `(g/r, 1, g/b)` of the
/// channel integrals, after illuminant normalisation.
fn calculate_wb_pair(camera: &SpectralData, illuminant: &mut SpectralData) -> Result<[f64; 3]> {
    scale_illuminant(camera, illuminant)?;

    let power = illuminant.main("power")?;

    let r = camera.main("R")?.try_mul(power)?.integrate();
    let g = camera.main("G")?.try_mul(power)?.integrate();
    let b = camera.main("B")?.try_mul(power)?.integrate();

    // Normalise to the green channel.
    Ok([g / r, 1.0, g / b])
}

/// Per-patch products of the training reflectances with the illuminant.
fn calculate_ti(illuminant: &SpectralData, training: &SpectralData) -> Result<Vec<Spectrum>> {
    let power = illuminant.main("power")?;

    let set = training
        .data
        .get("main")
        .ok_or(Error::Spectral(rta_spectral::Error::SetNotFound(
            String::from("main"),
        )))?;

    set.iter()
        .map(|(_, spectrum)| spectrum.try_mul(power).map_err(Error::from))
        .collect()
}

/// White-balanced camera responses for each training patch.
fn calculate_rgb(
    camera: &SpectralData,
    wb_multipliers: [f64; 3],
    training_illuminants: &[Spectrum],
) -> Result<Vec<Vec3>> {
    let camera_r = camera.main("R")?;
    let camera_g = camera.main("G")?;
    let camera_b = camera.main("B")?;

    training_illuminants
        .iter()
        .map(|ti| {
            Ok(Vec3::new(
                ti.try_mul(camera_r)?.integrate() * wb_multipliers[0],
                ti.try_mul(camera_g)?.integrate() * wb_multipliers[1],
                ti.try_mul(camera_b)?.integrate() * wb_multipliers[2],
            ))
        })
        .collect()
}

/// Reference XYZ of each training patch under the illuminant, adapted from
/// the illuminant's white point to the ACES white point.
fn calculate_xyz(
    observer: &SpectralData,
    illuminant: &SpectralData,
    training_illuminants: &[Spectrum],
) -> Result<Vec<Vec3>> {
    let observer_x = observer.main("X")?;
    let observer_y = observer.main("Y")?;
    let observer_z = observer.main("Z")?;
    let power = illuminant.main("power")?;

    let y = observer_y.try_mul(power)?.integrate();
    let scale = 1.0 / y;

    let source_white = Vec3::new(
        observer_x.try_mul(power)?.integrate() / y,
        1.0,
        observer_z.try_mul(power)?.integrate() / y,
    );

    let cat = calculate_cat(source_white, ACES_WHITE);

    training_illuminants
        .iter()
        .map(|ti| {
            let xyz = Vec3::new(
                ti.try_mul(observer_x)?.integrate() * scale,
                ti.try_mul(observer_y)?.integrate() * scale,
                ti.try_mul(observer_z)?.integrate() * scale,
            );
            Ok(cat * xyz)
        })
        .collect()
}

/// Squared Euclidean distance between two white-balance triplets.
fn calculate_sse(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}
