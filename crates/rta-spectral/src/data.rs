//! Spectral data files.
//!
//! [`SpectralData`] mirrors the JSON schema of the
//! [rawtoaces-data](https://github.com/AcademySoftwareFoundation/rawtoaces-data)
//! repository: a `header` object with descriptive metadata, and a
//! `spectral_data` object holding named sets of named channels, keyed by
//! wavelength:
//!
//! ```json
//! {
//!   "header": { "manufacturer": "...", "model": "...", "type": "..." },
//!   "spectral_data": {
//!     "units": "relative",
//!     "index": { "main": ["R", "G", "B"] },
//!     "data":  { "main": { "380": [0.1, 0.2, 0.3], "385": [...] } }
//!   }
//! }
//! ```
//!
//! Schema version 0.1.0 files use `header.illuminant` where 1.0.0 uses
//! `header.type`; the loader falls back accordingly.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::{Error, Result, Shape, Spectrum};

/// A spectral channel: a channel name and the corresponding [`Spectrum`].
/// One curve of an RGB or XYZ triplet.
pub type SpectralChannel = (String, Spectrum);

/// A spectral set: an ordered sequence of channels, like an RGB or XYZ
/// triplet, or the patch list of a training data file. Order is significant.
pub type SpectralSet = Vec<SpectralChannel>;

/// A named, versioned bundle of spectral curves.
///
/// All header fields are optional in the files and default to empty strings.
/// The body is a mapping from set name to [`SpectralSet`]; the set every
/// consumer relies on is `"main"`.
#[derive(Debug, Clone, Default)]
pub struct SpectralData {
    /// Device manufacturer, for camera files.
    pub manufacturer: String,
    /// Device model, for camera files.
    pub model: String,
    /// The data type string, e.g. an illuminant name like `"d65"`.
    pub data_type: String,
    /// Free-form description.
    pub description: String,
    /// Document creator.
    pub document_creator: String,
    /// Unique document identifier.
    pub unique_identifier: String,
    /// Measurement equipment description.
    pub measurement_equipment: String,
    /// Measuring laboratory.
    pub laboratory: String,
    /// Document creation date.
    pub creation_date: String,
    /// Free-form comments.
    pub comments: String,
    /// Data license.
    pub license: String,
    /// Measurement units.
    pub units: String,
    /// Reflection measurement geometry.
    pub reflection_geometry: String,
    /// Transmission measurement geometry.
    pub transmission_geometry: String,
    /// Measurement bandwidth (FWHM).
    pub bandwidth_fwhm: String,
    /// Whether a bandwidth correction has been applied.
    pub bandwidth_corrected: String,
    /// The spectral data storage, keyed by set name.
    pub data: BTreeMap<String, SpectralSet>,
}

fn parse_string(obj: &Value, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

impl SpectralData {
    /// Loads a spectral data file.
    ///
    /// When `reshape` is true (the normal case), every channel is resampled
    /// to [`Shape::REFERENCE`] after loading. Enumeration code that only
    /// needs the header can pass `false` to keep the file's native grid.
    ///
    /// Any parse error leaves no partially-initialised object behind; the
    /// error names the file and the underlying problem.
    pub fn load(path: &Path, reshape: bool) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let root: Value = serde_json::from_str(&text).map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let parse_error = |message: String| Error::Parse {
            path: path.to_path_buf(),
            message,
        };

        let mut out = SpectralData::default();

        let header = root.get("header").cloned().unwrap_or(Value::Null);
        out.manufacturer = parse_string(&header, "manufacturer");
        out.model = parse_string(&header, "model");
        out.data_type = parse_string(&header, "type");
        out.description = parse_string(&header, "description");
        out.document_creator = parse_string(&header, "document_creator");
        out.unique_identifier = parse_string(&header, "unique_identifier");
        out.measurement_equipment = parse_string(&header, "measurement_equipment");
        out.laboratory = parse_string(&header, "laboratory");
        out.creation_date = parse_string(&header, "document_creation_date");
        out.comments = parse_string(&header, "comments");
        out.license = parse_string(&header, "license");

        // Schema 1.0.0 replaced 'header/illuminant' with 'header/type' in the
        // illuminant files. If both are present, the type takes precedence.
        if out.data_type.is_empty() && parse_string(&header, "schema_version") == "0.1.0" {
            out.data_type = parse_string(&header, "illuminant");
        }

        let spectral = root.get("spectral_data").cloned().unwrap_or(Value::Null);
        out.units = parse_string(&spectral, "units");
        out.reflection_geometry = parse_string(&spectral, "reflection_geometry");
        out.transmission_geometry = parse_string(&spectral, "transmission_geometry");
        out.bandwidth_fwhm = parse_string(&spectral, "bandwidth_FWHM");
        out.bandwidth_corrected = parse_string(&spectral, "bandwidth_corrected");

        // The index declares set names and their channel order.
        let index = spectral
            .get("index")
            .and_then(Value::as_object)
            .ok_or_else(|| parse_error("missing 'spectral_data/index' object".into()))?;

        for (set_name, channel_names) in index {
            let channel_names = channel_names
                .as_array()
                .ok_or_else(|| parse_error(format!("index of set '{set_name}' is not an array")))?;

            let mut set = SpectralSet::new();
            for name in channel_names {
                let name = name
                    .as_str()
                    .ok_or_else(|| parse_error(format!("bad channel name in set '{set_name}'")))?;
                set.push((name.to_string(), Spectrum::constant(0.0, Shape::EMPTY)));
            }
            out.data.insert(set_name.clone(), set);
        }

        // The data object holds one wavelength-keyed map per set. Wavelength
        // keys determine the shape; the step must be uniform.
        let data = spectral
            .get("data")
            .and_then(Value::as_object)
            .ok_or_else(|| parse_error("missing 'spectral_data/data' object".into()))?;

        let mut shape: Option<Shape> = None;

        for (set_name, bins) in data {
            let set = out
                .data
                .get_mut(set_name)
                .ok_or_else(|| parse_error(format!("set '{set_name}' missing from the index")))?;
            let count = set.len();

            let bins = bins
                .as_object()
                .ok_or_else(|| parse_error(format!("data of set '{set_name}' is not an object")))?;

            // Collect and numerically sort the wavelength keys; JSON object
            // ordering is not guaranteed to survive parsing.
            let mut rows: Vec<(f64, &Value)> = Vec::with_capacity(bins.len());
            for (key, values) in bins {
                let wavelength: f64 = key
                    .parse()
                    .map_err(|_| parse_error(format!("bad wavelength key '{key}'")))?;
                rows.push((wavelength, values));
            }
            rows.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut prev_wavelength: Option<f64> = None;
            let mut set_shape = Shape::EMPTY;

            for (wavelength, values) in &rows {
                if let Some(prev) = prev_wavelength {
                    let new_step = wavelength - prev;
                    if set_shape.step != 0.0 && new_step != set_shape.step {
                        return Err(Error::InconsistentStep {
                            path: path.to_path_buf(),
                            expected: set_shape.step,
                            got: new_step,
                        });
                    }
                    set_shape.step = new_step;
                } else {
                    set_shape.first = *wavelength;
                }
                prev_wavelength = Some(*wavelength);
                set_shape.last = *wavelength;

                let values = values.as_array().ok_or_else(|| {
                    parse_error(format!("values at {wavelength} nm are not an array"))
                })?;
                if values.len() < count {
                    return Err(parse_error(format!(
                        "expected {count} values at {wavelength} nm, got {}",
                        values.len()
                    )));
                }

                for (j, channel) in set.iter_mut().enumerate() {
                    let v = values[j].as_f64().ok_or_else(|| {
                        parse_error(format!("non-numeric sample at {wavelength} nm"))
                    })?;
                    channel.1.values.push(v);
                }
            }

            match shape {
                None => shape = Some(set_shape),
                Some(s) if s != set_shape => {
                    return Err(parse_error(
                        "data sets use different wavelength grids".into(),
                    ));
                }
                Some(_) => {}
            }
        }

        if let Some(shape) = shape {
            for set in out.data.values_mut() {
                for (_, spectrum) in set.iter_mut() {
                    spectrum.shape = shape;
                    if reshape {
                        spectrum.reshape();
                    }
                }
            }
        }

        Ok(out)
    }

    /// Returns the [`Spectrum`] of a given channel in a given set.
    pub fn get(&self, set_name: &str, channel_name: &str) -> Result<&Spectrum> {
        let set = self
            .data
            .get(set_name)
            .ok_or_else(|| Error::SetNotFound(set_name.to_string()))?;

        set.iter()
            .find(|(name, _)| name == channel_name)
            .map(|(_, spectrum)| spectrum)
            .ok_or_else(|| Error::ChannelNotFound {
                set: set_name.to_string(),
                channel: channel_name.to_string(),
            })
    }

    /// Returns a mutable [`Spectrum`] of a given channel in a given set.
    pub fn get_mut(&mut self, set_name: &str, channel_name: &str) -> Result<&mut Spectrum> {
        let set = self
            .data
            .get_mut(set_name)
            .ok_or_else(|| Error::SetNotFound(set_name.to_string()))?;

        set.iter_mut()
            .find(|(name, _)| name == channel_name)
            .map(|(_, spectrum)| spectrum)
            .ok_or_else(|| Error::ChannelNotFound {
                set: set_name.to_string(),
                channel: channel_name.to_string(),
            })
    }

    /// Convenience accessor for a channel of the `"main"` set.
    pub fn main(&self, channel_name: &str) -> Result<&Spectrum> {
        self.get("main", channel_name)
    }

    /// Mutable convenience accessor for a channel of the `"main"` set.
    pub fn main_mut(&mut self, channel_name: &str) -> Result<&mut Spectrum> {
        self.get_mut("main", channel_name)
    }

    /// Number of channels in the `"main"` set, zero when the set is absent.
    pub fn main_channel_count(&self) -> usize {
        self.data.get("main").map_or(0, Vec::len)
    }
}
