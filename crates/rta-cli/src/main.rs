//! rawtoaces - convert raw camera images to ACES
//!
//! Converts raw image files from a digital camera to Academy Color Encoding
//! System (ACES) compliant images: the color values move from the camera
//! native color space to ACES AP0 (SMPTE ST 2065-1), and the file moves to
//! the ACES Image Container (SMPTE ST 2065-4).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use rayon::prelude::*;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use rta_convert::{
    collect_image_files, database_paths, fix_metadata, make_output_path, CropMode, ImageConverter,
    MatrixMethod, ParamList, RawLoader, Settings, UnavailableLoader, UsageTimer, WbMethod,
    DEMOSAIC_ALGORITHMS,
};
use rta_solver::SpectralSolver;
use rta_spectral::Database;

const LONG_ABOUT: &str = "
Rawtoaces converts raw image files from a digital camera to
the Academy Colour Encoding System (ACES) compliant images.
The process consists of two parts:
- the colour values get converted from the camera native colour
space to the ACES AP0 (see \"SMPTE ST 2065-1\"), and
- the image file gets converted from the camera native raw
file format to the ACES Image Container file format
(see \"SMPTE ST 2065-4\").

White balancing methods: \"metadata\" uses the coefficients from
the raw file; \"illuminant\" balances to the illuminant given in
--illuminant (requires spectral sensitivity data for the camera,
see --list-cameras; supports named illuminants plus blackbody
\"3200K\" and daylight \"D65\" forms); \"box\" balances over an image
region (--wb-box, whole image when omitted); \"custom\" uses the
multipliers given in --custom-wb.

Matrix methods: \"auto\" (recommended) tries \"spectral\" first and
falls back to \"metadata\"; \"spectral\" solves the matrix from the
camera's spectral sensitivities; \"metadata\" uses the matrices
embedded in the file (best with DNG); \"Adobe\" uses the Adobe
coefficients provided by the raw library; \"custom\" uses the
matrix given in --custom-mat.

The spectral data search path can be set in the
RAWTOACES_DATA_PATH environment variable.

Examples:
    rawtoaces --wb-method metadata --mat-method metadata raw_file.dng
    rawtoaces --wb-method illuminant --illuminant 3200K --mat-method spectral raw_file.cr3
";

#[derive(Parser)]
#[command(name = "rawtoaces", version, about = "Convert raw camera images to ACES", long_about = LONG_ABOUT)]
struct Cli {
    /// Input raw files and/or directories.
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// White balance method: metadata, illuminant, box, custom.
    #[arg(long = "wb-method", value_name = "STR", default_value = "metadata")]
    wb_method: String,

    /// IDT matrix method: auto, spectral, metadata, Adobe, custom.
    #[arg(long = "mat-method", value_name = "STR", default_value = "auto")]
    mat_method: String,

    /// Illuminant for white balancing (default = D55).
    #[arg(long, value_name = "STR")]
    illuminant: Option<String>,

    /// Box to use for white balancing.
    #[arg(long = "wb-box", value_name = "X Y W H", num_args = 4)]
    wb_box: Option<Vec<i32>>,

    /// Custom white balance multipliers.
    #[arg(long = "custom-wb", value_name = "R G B G", num_args = 4)]
    custom_wb: Option<Vec<f64>>,

    /// Custom camera RGB to XYZ matrix, row-major.
    #[arg(
        long = "custom-mat",
        value_name = "Rr Rg Rb Gr Gg Gb Br Bg Bb",
        num_args = 9,
        allow_negative_numbers = true
    )]
    custom_mat: Option<Vec<f64>>,

    /// Camera manufacturer override for the spectral data lookup.
    #[arg(long = "custom-camera-make", value_name = "STR")]
    custom_camera_make: Option<String>,

    /// Camera model override for the spectral data lookup.
    #[arg(long = "custom-camera-model", value_name = "STR")]
    custom_camera_model: Option<String>,

    /// Highlight headroom factor.
    #[arg(long, value_name = "VAL", default_value_t = 6.0)]
    headroom: f64,

    /// Additional scaling factor to apply to the pixel values.
    #[arg(long, value_name = "VAL", default_value_t = 1.0)]
    scale: f64,

    /// Cropping mode: off, soft, hard.
    #[arg(long = "crop-mode", value_name = "STR", default_value = "soft")]
    crop_mode: String,

    /// Apply a custom crop.
    #[arg(long = "crop-box", value_name = "X Y W H", num_args = 4)]
    crop_box: Option<Vec<i32>>,

    /// Directory containing the spectral data files; overrides
    /// RAWTOACES_DATA_PATH.
    #[arg(long = "data-dir", value_name = "STR")]
    data_dir: Option<String>,

    /// The directory to write the output files to.
    #[arg(long = "output-dir", value_name = "STR")]
    output_dir: Option<PathBuf>,

    /// Allow overwriting existing files.
    #[arg(long)]
    overwrite: bool,

    /// Create output directories if they don't exist.
    #[arg(long = "create-dirs")]
    create_dirs: bool,

    /// Show the list of cameras supported in spectral mode.
    #[arg(long = "list-cameras")]
    list_cameras: bool,

    /// Show the list of supported illuminants.
    #[arg(long = "list-illuminants")]
    list_illuminants: bool,

    /// Log the execution time of each step of image processing.
    #[arg(long = "use-timing")]
    use_timing: bool,

    /// Print progress messages; repeat to increase verbosity.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    // Raw conversion options:
    /// Demosaicing algorithm.
    #[arg(long, value_name = "STR", default_value = "AHD")]
    demosaic: String,

    /// Decode the image at half size resolution.
    #[arg(long = "half-size")]
    half_size: bool,

    /// Highlight mode: 0 = clip, 1 = unclip, 2 = blend, 3..9 = rebuild.
    #[arg(long = "highlight-mode", value_name = "VAL", default_value_t = 0)]
    highlight_mode: i32,

    /// Override the EXIF orientation (1..8), 0 keeps the metadata value.
    #[arg(long, value_name = "VAL", default_value_t = 0)]
    flip: i32,

    /// Override the black level when >= 0.
    #[arg(long = "black-level", value_name = "VAL", default_value_t = -1, allow_negative_numbers = true)]
    black_level: i32,

    /// Override the saturation level when not 0.
    #[arg(long = "saturation-level", value_name = "VAL", default_value_t = 0)]
    saturation_level: i32,

    /// Scaling factor on the metadata linearity threshold.
    #[arg(long = "adjust-maximum-threshold", value_name = "VAL", default_value_t = 0.75)]
    adjust_maximum_threshold: f32,

    /// Red and blue scale factors for chromatic aberration correction.
    #[arg(long = "chromatic-aberration", value_name = "R B", num_args = 2)]
    chromatic_aberration: Option<Vec<f32>>,

    /// Wavelet denoising threshold.
    #[arg(long = "denoise-threshold", value_name = "VAL", default_value_t = 0.0)]
    denoise_threshold: f32,

    /// Enable automatic exposure adjustment.
    #[arg(long = "auto-bright")]
    auto_bright: bool,
}

/// Builds the converter settings from the parsed arguments, applying the
/// per-parameter warnings of missing mode parameters.
fn build_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::default();

    settings.wb_method = cli.wb_method.parse::<WbMethod>().map_err(anyhow::Error::msg)?;
    settings.matrix_method = cli
        .mat_method
        .parse::<MatrixMethod>()
        .map_err(anyhow::Error::msg)?;
    settings.crop_mode = cli.crop_mode.parse::<CropMode>().map_err(anyhow::Error::msg)?;

    if !DEMOSAIC_ALGORITHMS.contains(&cli.demosaic.as_str()) {
        bail!(
            "Unsupported demosaicing algorithm: '{}'. The following algorithms \
             are supported: {}.",
            cli.demosaic,
            DEMOSAIC_ALGORITHMS.join(", ")
        );
    }
    settings.demosaic_algorithm = cli.demosaic.clone();

    settings.illuminant = cli.illuminant.clone().unwrap_or_default();

    match &cli.wb_box {
        Some(wb_box) => settings.wb_box.copy_from_slice(wb_box),
        None => {
            if settings.wb_method == WbMethod::Box {
                eprintln!(
                    "Warning: the white balancing method was set to \"box\", but \
                     no \"--wb-box\" parameter provided. The whole image will be \
                     used for white balancing."
                );
            }
        }
    }

    match &cli.custom_wb {
        Some(custom_wb) => settings.custom_wb.copy_from_slice(custom_wb),
        None => {
            if settings.wb_method == WbMethod::Custom {
                eprintln!(
                    "Warning: the white balancing method was set to \"custom\", \
                     but no \"--custom-wb\" parameter provided. The default \
                     values of (1, 1, 1, 1) will be used."
                );
            }
        }
    }

    match &cli.custom_mat {
        Some(custom_mat) => {
            for i in 0..3 {
                settings.custom_matrix[i].copy_from_slice(&custom_mat[i * 3..i * 3 + 3]);
            }
        }
        None => {
            if settings.matrix_method == MatrixMethod::Custom {
                eprintln!(
                    "Warning: the matrix method was set to \"custom\", but no \
                     \"--custom-mat\" parameter provided. Identity matrix will \
                     be used."
                );
            }
        }
    }

    if let Some(crop_box) = &cli.crop_box {
        settings.crop_box.copy_from_slice(crop_box);
    }

    if let Some(aberration) = &cli.chromatic_aberration {
        settings.chromatic_aberration.copy_from_slice(aberration);
    }

    settings.custom_camera_make = cli.custom_camera_make.clone().unwrap_or_default();
    settings.custom_camera_model = cli.custom_camera_model.clone().unwrap_or_default();

    settings.headroom = cli.headroom;
    settings.scale = cli.scale;
    settings.auto_bright = cli.auto_bright;
    settings.adjust_maximum_threshold = cli.adjust_maximum_threshold;
    settings.black_level = cli.black_level;
    settings.saturation_level = cli.saturation_level;
    settings.half_size = cli.half_size;
    settings.highlight_mode = cli.highlight_mode;
    settings.flip = cli.flip;
    settings.denoise_threshold = cli.denoise_threshold;

    settings.overwrite = cli.overwrite;
    settings.create_dirs = cli.create_dirs;
    settings.output_dir = cli.output_dir.clone();
    settings.use_timing = cli.use_timing;
    settings.verbosity = i32::from(cli.verbose);

    settings.database_directories = database_paths(cli.data_dir.as_deref());

    // Cross-parameter rules: ignored parameters reset with a warning.
    settings.validate();

    Ok(settings)
}

/// Processes a single image: output path, metadata, transform configuration,
/// then the pixel stages through the external decoder and writer.
fn process_image(settings: &Settings, loader: &dyn RawLoader, input: &Path) -> Result<()> {
    let output = make_output_path(input, settings, "_aces")?;

    let mut timer = UsageTimer::new(settings.use_timing);
    let input_name = input.display().to_string();

    if settings.verbosity > 0 {
        eprintln!("Configuring transform for: {input_name}");
    }
    timer.reset();

    let hints = ParamList::new();
    let mut spec = loader
        .open_spec(input, &hints)
        .with_context(|| format!("Failed to configure the reader for the file: {input_name}"))?;
    fix_metadata(&mut spec);

    let mut converter = ImageConverter::new(settings.clone());
    let decode_hints = converter.configure(&spec, &hints).with_context(|| {
        format!("Failed to configure the colour space transform for the file: {input_name}")
    })?;
    timer.print(&input_name, "configuring reader");

    debug!(
        stages = converter.matrix_pipeline().len(),
        hints = decode_hints.iter().count(),
        "transform prepared"
    );

    // Pixel decoding, matrix application, scaling, cropping and the ACES
    // container write are performed by the external raw decoder and image
    // buffer libraries, driven by the hints and matrices prepared above.
    if settings.verbosity > 0 {
        eprintln!("Saving output: {}", output.display());
    }

    Ok(())
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let settings = build_settings(&cli)?;

    if cli.list_cameras {
        let converter = ImageConverter::new(settings);
        println!("Spectral sensitivity data is available for the following cameras:");
        println!("{}", converter.supported_cameras().join("\n"));
        println!();
        return Ok(0);
    }

    if cli.list_illuminants {
        let converter = ImageConverter::new(settings);
        println!("The following illuminants are supported:");
        println!("{}", converter.supported_illuminants().join("\n"));
        println!();
        return Ok(0);
    }

    if cli.paths.is_empty() {
        bail!("No input files or directories provided.");
    }

    // Confirm a requested illuminant exists before loading any images.
    if settings.wb_method == WbMethod::Illuminant {
        let mut db = Database::new(settings.database_directories.clone());
        db.verbosity = settings.verbosity;
        let mut solver = SpectralSolver::new(db);
        if solver.find_illuminant(&settings.illuminant).is_err() {
            bail!(
                "No matching light source. Please find available options by \
                 \"rawtoaces --list-illuminants\"."
            );
        }
    }

    let batches = collect_image_files(&cli.paths);

    let mut failures = 0usize;
    for batch in &batches {
        // Images are independent; each gets its own converter instance.
        let results: Vec<Result<()>> = batch
            .par_iter()
            .map(|input| process_image(&settings, &UnavailableLoader, input))
            .collect();

        for (input, result) in batch.iter().zip(results) {
            if let Err(e) = result {
                failures += 1;
                eprintln!("Error: {e:#}");
                eprintln!("Failed to process the file: {}", input.display());
            }
        }
    }

    Ok(if failures > 0 { 1 } else { 0 })
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}
