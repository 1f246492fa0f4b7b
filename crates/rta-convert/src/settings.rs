//! Converter settings.
//!
//! [`Settings`] enumerates every user choice of the conversion: the white
//! balance and matrix methods, cropping, the decoder options passed through
//! to the raw library, and the output options. The CLI fills one in from its
//! arguments; [`Settings::validate`] applies the cross-parameter rules and
//! resets ignored parameters to their defaults with a warning.

use std::path::PathBuf;
use std::str::FromStr;

/// White balancing method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WbMethod {
    /// Use the white-balancing multipliers from the file metadata.
    #[default]
    Metadata,
    /// White balance to a named illuminant; requires camera spectral data.
    Illuminant,
    /// Average over a region of the image; an empty box means the whole
    /// image.
    Box,
    /// Custom multipliers supplied by the user.
    Custom,
}

impl FromStr for WbMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metadata" => Ok(Self::Metadata),
            "illuminant" => Ok(Self::Illuminant),
            "box" => Ok(Self::Box),
            "custom" => Ok(Self::Custom),
            other => Err(format!(
                "Unsupported white balancing method: '{other}'. The following \
                 methods are supported: metadata, illuminant, box, custom."
            )),
        }
    }
}

/// IDT matrix computation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatrixMethod {
    /// Spectral when camera data is available, metadata otherwise.
    #[default]
    Auto,
    /// Solve the matrix from camera spectral sensitivities.
    Spectral,
    /// Use the matrices from the file metadata (DNG).
    Metadata,
    /// Use the Adobe coefficients supplied by the raw library.
    Adobe,
    /// A custom matrix supplied by the user.
    Custom,
}

impl FromStr for MatrixMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "spectral" => Ok(Self::Spectral),
            "metadata" => Ok(Self::Metadata),
            "Adobe" => Ok(Self::Adobe),
            "custom" => Ok(Self::Custom),
            other => Err(format!(
                "Unsupported matrix method: '{other}'. The following methods \
                 are supported: auto, spectral, metadata, Adobe, custom."
            )),
        }
    }
}

/// Cropping mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropMode {
    /// Write out the full sensor area.
    Off,
    /// Write out the full sensor area, mark the crop as the display window.
    #[default]
    Soft,
    /// Write out only the crop area.
    Hard,
}

impl FromStr for CropMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(Self::Off),
            "soft" => Ok(Self::Soft),
            "hard" => Ok(Self::Hard),
            other => Err(format!(
                "Unsupported cropping mode: '{other}'. The following modes \
                 are supported: off, soft, hard."
            )),
        }
    }
}

/// All user choices of a conversion run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// White balancing method.
    pub wb_method: WbMethod,
    /// IDT matrix method.
    pub matrix_method: MatrixMethod,
    /// Cropping mode.
    pub crop_mode: CropMode,

    /// The illuminant for `WbMethod::Illuminant`, e.g. `D55` or `3200K`.
    pub illuminant: String,
    /// White balancing box (x, y, width, height) for `WbMethod::Box`.
    pub wb_box: [i32; 4],
    /// Custom multipliers for `WbMethod::Custom` (R, G, B, G).
    pub custom_wb: [f64; 4],
    /// Custom matrix for `MatrixMethod::Custom`, rows.
    pub custom_matrix: [[f64; 3]; 3],

    /// Camera make override for the spectral data lookup.
    pub custom_camera_make: String,
    /// Camera model override for the spectral data lookup.
    pub custom_camera_model: String,

    /// Highlight headroom factor.
    pub headroom: f64,
    /// Additional scaling factor applied to the pixels.
    pub scale: f64,

    // Raw decoder options, passed through as hints:
    /// Enable automatic exposure adjustment.
    pub auto_bright: bool,
    /// Scaling factor on the metadata linearity threshold.
    pub adjust_maximum_threshold: f32,
    /// Black level override, negative leaves the metadata value.
    pub black_level: i32,
    /// Saturation level override, zero leaves the metadata value.
    pub saturation_level: i32,
    /// Decode at half resolution.
    pub half_size: bool,
    /// Highlight mode: 0 = clip, 1 = unclip, 2 = blend, 3..9 = rebuild.
    pub highlight_mode: i32,
    /// EXIF orientation override, zero keeps the metadata value.
    pub flip: i32,
    /// Custom crop box (x, y, width, height).
    pub crop_box: [i32; 4],
    /// Red and blue chromatic aberration scales; 1.0 disables correction.
    pub chromatic_aberration: [f32; 2],
    /// Wavelet denoising threshold.
    pub denoise_threshold: f32,
    /// Demosaicing algorithm name.
    pub demosaic_algorithm: String,

    // Global options:
    /// The database root directories.
    pub database_directories: Vec<PathBuf>,
    /// Allow overwriting existing output files.
    pub overwrite: bool,
    /// Create missing output directories.
    pub create_dirs: bool,
    /// Output directory; empty writes next to the input.
    pub output_dir: Option<PathBuf>,

    // Diagnostics:
    /// Log per-step execution times.
    pub use_timing: bool,
    /// Diagnostic verbosity, incremented per `-v`.
    pub verbosity: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wb_method: WbMethod::default(),
            matrix_method: MatrixMethod::default(),
            crop_mode: CropMode::default(),
            illuminant: String::new(),
            wb_box: [0; 4],
            custom_wb: [1.0; 4],
            custom_matrix: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            custom_camera_make: String::new(),
            custom_camera_model: String::new(),
            headroom: 6.0,
            scale: 1.0,
            auto_bright: false,
            adjust_maximum_threshold: 0.75,
            black_level: -1,
            saturation_level: 0,
            half_size: false,
            highlight_mode: 0,
            flip: 0,
            crop_box: [0; 4],
            chromatic_aberration: [1.0, 1.0],
            denoise_threshold: 0.0,
            demosaic_algorithm: "AHD".to_string(),
            database_directories: Vec::new(),
            overwrite: false,
            create_dirs: false,
            output_dir: None,
            use_timing: false,
            verbosity: 0,
        }
    }
}

/// The demosaicing algorithms the raw decoder accepts.
pub const DEMOSAIC_ALGORITHMS: [&str; 13] = [
    "linear", "VNG", "PPG", "AHD", "DCB", "AHD-Mod", "AFD", "VCD", "Mixed", "LMMSE", "AMaZE",
    "DHT", "AAHD",
];

const IDENTITY: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

impl Settings {
    /// Applies the cross-parameter consistency rules.
    ///
    /// Each incompatible parameter/mode combination produces a warning on
    /// stderr and resets the parameter to its default; nothing here is
    /// fatal.
    pub fn validate(&mut self) {
        let illuminant_defined = !self.illuminant.is_empty();
        let wb_is_illuminant = self.wb_method == WbMethod::Illuminant;

        if wb_is_illuminant && !illuminant_defined {
            eprintln!(
                "Warning: the white balancing method was set to \"illuminant\", \
                 but no \"--illuminant\" parameter provided. D55 will be used \
                 as default."
            );
            self.illuminant = "D55".to_string();
        } else if !wb_is_illuminant && illuminant_defined {
            eprintln!(
                "Warning: the \"--illuminant\" parameter provided but the \
                 white balancing mode different from \"illuminant\" requested. \
                 The custom illuminant will be ignored."
            );
            self.illuminant.clear();
        }

        if self.wb_method != WbMethod::Box && self.wb_box != [0; 4] {
            eprintln!(
                "Warning: the \"--wb-box\" parameter provided, but the white \
                 balancing mode is different from \"box\". The box will be \
                 ignored."
            );
            self.wb_box = [0; 4];
        }

        if self.wb_method != WbMethod::Custom && self.custom_wb != [1.0; 4] {
            eprintln!(
                "Warning: the \"--custom-wb\" parameter provided, but the \
                 white balancing mode is different from \"custom\". The \
                 scalers will be ignored."
            );
            self.custom_wb = [1.0; 4];
        }

        if self.matrix_method != MatrixMethod::Custom && self.custom_matrix != IDENTITY {
            eprintln!(
                "Warning: the \"--custom-mat\" parameter provided, but the \
                 matrix mode is different from \"custom\". The matrix will be \
                 ignored."
            );
            self.custom_matrix = IDENTITY;
        }
    }
}
