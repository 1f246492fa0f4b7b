//! Database path resolution and batch file collection.
//!
//! The database roots come, in precedence order, from the caller (CLI
//! `--data-dir`), the `RAWTOACES_DATA_PATH` environment variable, the
//! deprecated `AMPAS_DATA_PATH` variable, or the platform default. Batch
//! collection turns the positional CLI paths into per-directory batches of
//! input files.

use std::path::{Path, PathBuf};

use crate::settings::Settings;
use crate::{Error, Result};

/// The primary environment variable naming the database roots.
pub const DATA_PATH_ENV: &str = "RAWTOACES_DATA_PATH";

/// The deprecated environment variable; honoured with a warning.
pub const LEGACY_DATA_PATH_ENV: &str = "AMPAS_DATA_PATH";

#[cfg(windows)]
const PATH_SEPARATOR: char = ';';
#[cfg(not(windows))]
const PATH_SEPARATOR: char = ':';

fn default_data_path() -> String {
    if cfg!(windows) {
        ".".to_string()
    } else {
        format!(
            "/usr/local/share/rawtoaces/data{PATH_SEPARATOR}/usr/local/include/rawtoaces/data"
        )
    }
}

/// Resolves the database root directories.
///
/// `override_path` (when non-empty) wins over everything; otherwise the
/// environment variables and finally the platform default apply. A single
/// string may name several roots separated by `:` (POSIX) or `;` (Windows).
pub fn database_paths(override_path: Option<&str>) -> Vec<PathBuf> {
    let path = match override_path {
        Some(path) if !path.is_empty() => path.to_string(),
        _ => match std::env::var(DATA_PATH_ENV) {
            Ok(path) => path,
            Err(_) => match std::env::var(LEGACY_DATA_PATH_ENV) {
                Ok(path) => {
                    eprintln!(
                        "Warning: The environment variable {LEGACY_DATA_PATH_ENV} is now \
                         deprecated. Please use {DATA_PATH_ENV} instead."
                    );
                    path
                }
                Err(_) => default_data_path(),
            },
        },
    };

    path.split(PATH_SEPARATOR)
        .filter(|part| !part.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// File names never treated as inputs.
const IGNORE_FILENAMES: [&str; 1] = [".DS_Store"];

/// Extensions never treated as inputs (our own outputs and previews).
const IGNORE_EXTENSIONS: [&str; 3] = ["exr", "jpg", "jpeg"];

fn check_and_add_file(path: &Path, batch: &mut Vec<PathBuf>) {
    let is_regular_file = path.is_file() || path.is_symlink();
    if !is_regular_file {
        eprintln!("Not a regular file: {}", path.display());
        return;
    }

    if let Some(filename) = path.file_name().and_then(|f| f.to_str()) {
        if IGNORE_FILENAMES.contains(&filename) {
            return;
        }
    }

    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        let extension = extension.to_ascii_lowercase();
        if IGNORE_EXTENSIONS.contains(&extension.as_str()) {
            return;
        }
    }

    batch.push(path.to_path_buf());
}

/// Collects the input files of the given paths into batches.
///
/// The first batch gathers every path that is itself a file; each directory
/// path contributes one further batch with its (non-recursive) contents.
/// Missing paths are diagnosed and skipped, as are unwanted files (system
/// litter, `.exr`/`.jpg`/`.jpeg`).
pub fn collect_image_files(paths: &[PathBuf]) -> Vec<Vec<PathBuf>> {
    let mut batches: Vec<Vec<PathBuf>> = vec![Vec::new()];

    for path in paths {
        if !path.exists() {
            eprintln!("File or directory not found: {}", path.display());
            continue;
        }

        if path.is_dir() {
            let mut batch = Vec::new();
            if let Ok(entries) = std::fs::read_dir(path) {
                let mut files: Vec<PathBuf> =
                    entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
                files.sort();
                for file in files {
                    check_and_add_file(&file, &mut batch);
                }
            }
            batches.push(batch);
        } else {
            check_and_add_file(path, &mut batches[0]);
        }
    }

    batches
}

/// Builds the output path for an input file and checks it is writable.
///
/// The input extension is replaced by `<suffix>.exr`. With an output
/// directory configured the file lands there (relative directories resolve
/// against the input file's directory), creating it when allowed. Existing
/// outputs are an error unless overwriting is enabled.
pub fn make_output_path(input: &Path, settings: &Settings, suffix: &str) -> Result<PathBuf> {
    let stem = input.file_stem().unwrap_or(input.as_os_str());
    let filename = format!("{}{}{}", Path::new(stem).display(), suffix, ".exr");

    let directory = input.parent().unwrap_or(Path::new(""));

    let mut output = match &settings.output_dir {
        None => directory.join(&filename),
        Some(output_dir) => {
            let target = if output_dir.is_absolute() {
                output_dir.clone()
            } else {
                directory.join(output_dir)
            };

            if !target.exists() {
                if settings.create_dirs {
                    std::fs::create_dir(&target).map_err(|source| Error::CreateDir {
                        path: target.clone(),
                        source,
                    })?;
                } else {
                    return Err(Error::OutputDirMissing(target));
                }
            }

            target.join(&filename)
        }
    };

    if let Ok(canonical) = output.parent().unwrap_or(Path::new("")).canonicalize() {
        output = canonical.join(&filename);
    }

    if !settings.overwrite && output.exists() {
        return Err(Error::OutputExists(output));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_collect_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("shot.cr3");
        fs::write(&file, b"raw").unwrap();

        let batches = collect_image_files(&[file.clone()]);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], vec![file]);
    }

    #[test]
    fn test_collect_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.cr3"), b"raw").unwrap();
        fs::write(dir.path().join("b.dng"), b"raw").unwrap();
        fs::write(dir.path().join("done_aces.exr"), b"exr").unwrap();
        fs::write(dir.path().join("preview.JPG"), b"jpg").unwrap();
        fs::write(dir.path().join(".DS_Store"), b"junk").unwrap();

        let batches = collect_image_files(&[dir.path().to_path_buf()]);

        // Empty loose-files batch followed by the directory batch.
        assert_eq!(batches.len(), 2);
        assert!(batches[0].is_empty());

        let names: Vec<String> = batches[1]
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.cr3", "b.dng"]);
    }

    #[test]
    fn test_collect_missing_path() {
        let batches = collect_image_files(&[PathBuf::from("/nonexistent/image.cr3")]);
        assert_eq!(batches.len(), 1);
        assert!(batches[0].is_empty());
    }

    #[test]
    fn test_output_path_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("shot.cr3");
        fs::write(&input, b"raw").unwrap();

        let settings = Settings::default();
        let output = make_output_path(&input, &settings, "_aces").unwrap();
        assert_eq!(output.file_name().unwrap(), "shot_aces.exr");
        assert_eq!(output.parent().unwrap(), dir.path().canonicalize().unwrap());
    }

    #[test]
    fn test_output_collision_requires_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("shot.cr3");
        fs::write(&input, b"raw").unwrap();
        fs::write(dir.path().join("shot_aces.exr"), b"old").unwrap();

        let mut settings = Settings::default();
        let err = make_output_path(&input, &settings, "_aces").unwrap_err();
        assert!(matches!(err, Error::OutputExists(_)));

        settings.overwrite = true;
        assert!(make_output_path(&input, &settings, "_aces").is_ok());
    }

    #[test]
    fn test_output_dir_creation() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("shot.cr3");
        fs::write(&input, b"raw").unwrap();

        let mut settings = Settings {
            output_dir: Some(PathBuf::from("converted")),
            ..Default::default()
        };

        // Missing directory without --create-dirs
        let err = make_output_path(&input, &settings, "_aces").unwrap_err();
        assert!(matches!(err, Error::OutputDirMissing(_)));

        settings.create_dirs = true;
        let output = make_output_path(&input, &settings, "_aces").unwrap();
        assert!(output.parent().unwrap().ends_with("converted"));
        assert!(dir.path().join("converted").is_dir());
    }

    #[test]
    fn test_database_paths_override_and_split() {
        let paths = database_paths(Some("/a/b:/c/d"));
        #[cfg(not(windows))]
        assert_eq!(paths, vec![PathBuf::from("/a/b"), PathBuf::from("/c/d")]);

        // Empty override falls through to env/default resolution; the
        // result is never empty.
        assert!(!database_paths(Some("")).is_empty());
    }
}
