//! Filesystem database resolver.
//!
//! A database is an ordered list of root directories, each laid out as
//! `<root>/<type>/<name>.json` with `type` one of `camera`, `illuminant`,
//! `cmf` or `training`. Earlier roots win on relative-path lookups; file
//! collections concatenate in root order.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::SpectralData;

/// An ordered set of data root directories.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::PathBuf;
/// use rta_spectral::Database;
///
/// let db = Database::new(vec![PathBuf::from("/usr/local/share/rawtoaces/data")]);
/// for camera in db.cameras() {
///     println!("{camera}");
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Database {
    roots: Vec<PathBuf>,
    /// Diagnostic verbosity; at 1 and above missing subdirectories and
    /// non-directory roots are reported.
    pub verbosity: i32,
}

impl Database {
    /// Creates a database over the given root directories.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            verbosity: 0,
        }
    }

    /// The configured root directories, in precedence order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Collects all `.json` files of a given type.
    ///
    /// For each root that exists and is a directory, `<root>/<kind>/*.json`
    /// entries are gathered; results concatenate in root order and are
    /// sorted within each root for deterministic enumeration. Missing
    /// subdirectories are non-fatal.
    pub fn collect_files(&self, kind: &str) -> Vec<PathBuf> {
        let mut result = Vec::new();

        for root in &self.roots {
            if !root.is_dir() {
                if self.verbosity > 0 {
                    warn!("database location '{}' is not a directory", root.display());
                }
                continue;
            }

            let type_path = root.join(kind);
            if !type_path.exists() {
                if self.verbosity > 0 {
                    warn!("directory '{}' does not exist", type_path.display());
                }
                continue;
            }

            let Ok(entries) = std::fs::read_dir(&type_path) else {
                continue;
            };

            let mut files: Vec<PathBuf> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect();
            files.sort();
            result.extend(files);
        }

        result
    }

    /// Resolves a relative path against the roots; the first root containing
    /// the file wins. Absolute paths are returned as-is when they exist.
    pub fn find_file(&self, relative: &Path) -> Option<PathBuf> {
        if relative.is_absolute() {
            return relative.exists().then(|| relative.to_path_buf());
        }

        self.roots
            .iter()
            .map(|root| root.join(relative))
            .find(|candidate| candidate.exists())
    }

    /// Enumerates the cameras with spectral sensitivity data, formatted as
    /// `"<manufacturer> / <model>"`.
    pub fn cameras(&self) -> Vec<String> {
        let mut result = Vec::new();

        for file in self.collect_files("camera") {
            match SpectralData::load(&file, false) {
                Ok(data) => result.push(format!("{} / {}", data.manufacturer, data.model)),
                Err(e) => warn!("skipping camera file {}: {e}", file.display()),
            }
        }

        result
    }

    /// Enumerates the supported illuminants: the two synthetic families
    /// first, then the type string of every illuminant data file.
    pub fn illuminants(&self) -> Vec<String> {
        let mut result = vec![
            "Day-light (e.g., D60, D6025)".to_string(),
            "Blackbody (e.g., 3200K)".to_string(),
        ];

        for file in self.collect_files("illuminant") {
            match SpectralData::load(&file, false) {
                Ok(data) => result.push(data.data_type),
                Err(e) => warn!("skipping illuminant file {}: {e}", file.display()),
            }
        }

        result
    }
}
