//! The raw decoder seam.
//!
//! Raw decoding is an external collaborator; the orchestrator only needs the
//! metadata it reports. [`RawLoader`] is that contract. Builds without a
//! linked decoder use [`UnavailableLoader`], which fails with a clear
//! diagnostic; tests construct [`ImageSpec`](crate::ImageSpec) values
//! directly.

use std::path::Path;

use crate::spec::{ImageSpec, ParamList};
use crate::{Error, Result};

/// Opens raw files and reports their metadata.
pub trait RawLoader {
    /// Reads the metadata of a raw file, honouring the decoder hints.
    fn open_spec(&self, path: &Path, hints: &ParamList) -> Result<ImageSpec>;
}

/// The placeholder loader used when no decoder implementation is linked.
#[derive(Debug, Default)]
pub struct UnavailableLoader;

impl RawLoader for UnavailableLoader {
    fn open_spec(&self, path: &Path, _hints: &ParamList) -> Result<ImageSpec> {
        Err(Error::DecoderUnavailable(path.to_path_buf()))
    }
}
