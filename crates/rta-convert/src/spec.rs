//! Image metadata and decoder-hint attribute lists.
//!
//! The raw decoder and the ACES container writer are external collaborators;
//! the orchestrator talks to both through flat attribute lists. [`ParamList`]
//! is that list, [`ImageSpec`] wraps one as the metadata of an image being
//! converted, and [`fix_metadata`] normalises the vendor attribute names the
//! raw plugin emits.

use std::collections::BTreeMap;

/// A single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// A string attribute.
    Str(String),
    /// An integer attribute.
    Int(i32),
    /// A float attribute.
    Float(f32),
    /// An integer array attribute (boxes, crop rectangles).
    IntVec(Vec<i32>),
    /// A float array attribute (multipliers, matrices).
    FloatVec(Vec<f32>),
}

/// An ordered list of named attributes.
///
/// Used both for image metadata and for the hints handed to the raw decoder.
///
/// # Example
///
/// ```rust
/// use rta_convert::ParamList;
///
/// let mut hints = ParamList::new();
/// hints.set_int("raw:use_camera_wb", 0);
/// hints.set_str("raw:ColorSpace", "XYZ");
/// assert_eq!(hints.get_int("raw:use_camera_wb"), Some(0));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamList {
    attrs: BTreeMap<String, AttrValue>,
}

impl ParamList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an attribute.
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// Whether an attribute is present.
    pub fn contains(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    /// Sets an attribute, replacing any previous value.
    pub fn set(&mut self, name: &str, value: AttrValue) {
        self.attrs.insert(name.to_string(), value);
    }

    /// Removes an attribute.
    pub fn erase(&mut self, name: &str) {
        self.attrs.remove(name);
    }

    /// Sets a string attribute.
    pub fn set_str(&mut self, name: &str, value: &str) {
        self.set(name, AttrValue::Str(value.to_string()));
    }

    /// Sets an integer attribute.
    pub fn set_int(&mut self, name: &str, value: i32) {
        self.set(name, AttrValue::Int(value));
    }

    /// Sets a float attribute.
    pub fn set_float(&mut self, name: &str, value: f32) {
        self.set(name, AttrValue::Float(value));
    }

    /// Sets an integer array attribute.
    pub fn set_int_vec(&mut self, name: &str, value: &[i32]) {
        self.set(name, AttrValue::IntVec(value.to_vec()));
    }

    /// Sets a float array attribute.
    pub fn set_float_vec(&mut self, name: &str, value: &[f32]) {
        self.set(name, AttrValue::FloatVec(value.to_vec()));
    }

    /// A string attribute, `None` when absent or of another type.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(AttrValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// An integer attribute, `None` when absent or of another type.
    pub fn get_int(&self, name: &str) -> Option<i32> {
        match self.get(name) {
            Some(AttrValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// A float attribute, `None` when absent or of another type.
    pub fn get_float(&self, name: &str) -> Option<f32> {
        match self.get(name) {
            Some(AttrValue::Float(v)) => Some(*v),
            Some(AttrValue::Int(v)) => Some(*v as f32),
            _ => None,
        }
    }

    /// A float array attribute of an exact length, `None` otherwise.
    pub fn get_float_vec(&self, name: &str, len: usize) -> Option<&[f32]> {
        match self.get(name) {
            Some(AttrValue::FloatVec(v)) if v.len() == len => Some(v),
            _ => None,
        }
    }

    /// Iterates over all attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.attrs.iter()
    }
}

/// The metadata of an image being converted.
///
/// Carries only what the orchestrator consumes: the attribute list the
/// decoder reported for the file. Pixel geometry stays with the external
/// image-buffer library.
#[derive(Debug, Clone, Default)]
pub struct ImageSpec {
    /// The image's metadata attributes.
    pub attributes: ParamList,
}

impl ImageSpec {
    /// Creates an empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the source file is a DNG, judged by the `raw:dng:version`
    /// attribute.
    pub fn is_dng(&self) -> bool {
        self.attributes.get_int("raw:dng:version").unwrap_or(0) > 0
    }
}

/// Normalises metadata attribute names where the raw plugin's names differ
/// from the standard OpenEXR / ACES Container names.
///
/// `Make` is copied to `cameraMake` and `Model` to `cameraModel`, but only
/// when the destination is absent; the source is erased after a copy. When
/// the destination already exists the source stays, so a caller can still
/// observe the conflict.
pub fn fix_metadata(spec: &mut ImageSpec) {
    const STANDARD_MAPPING: [(&str, &str); 2] =
        [("Make", "cameraMake"), ("Model", "cameraModel")];

    for (src_name, dst_name) in STANDARD_MAPPING {
        let src = spec.attributes.get_str(src_name).map(String::from);

        if let Some(value) = src {
            if !spec.attributes.contains(dst_name) {
                spec.attributes.set_str(dst_name, &value);
                spec.attributes.erase(src_name);
            }
        }
    }
}
