//! Reading and writing the plain-text inputs of a field model.
//!
//! Tabular formats (SHC coefficient files, the RC index and the layered
//! conductivity model) implement the [`traits::CoefficientFile`] trait; the
//! TOML model manifest that ties them together lives in [`manifest`].

pub mod conductivity;
pub mod manifest;
pub mod rc_index;
pub mod shc;
pub mod traits;

use self::traits::CoefficientFile;
use std::path::Path;

/// Loads an SHC file with the given decimal year convention and comment
/// prefix.
pub fn load_shcfile(path: &Path, leap_year: bool, comment: &str) -> Result<shc::ShcData, shc::ShcError> {
    let options = shc::ShcOptions {
        leap_year,
        comment: comment.to_string(),
        header: None,
    };
    shc::ShcFile::read_from_path(path, &options)
}

/// Saves coefficients to an SHC file. `header = None` writes the default
/// header, an empty string writes none.
pub fn save_shcfile(
    path: &Path,
    data: &shc::ShcData,
    leap_year: bool,
    header: Option<&str>,
) -> Result<(), shc::ShcError> {
    let options = shc::ShcOptions {
        leap_year,
        header: header.map(str::to_string),
        ..shc::ShcOptions::default()
    };
    shc::ShcFile::write_to_path(data, &options, path)
}

pub fn load_rc_datfile(path: &Path) -> Result<Vec<rc_index::RcRecord>, rc_index::RcIndexError> {
    rc_index::RcIndexFile::read_from_path(path, &())
}

pub fn load_conductivity(
    path: &Path,
) -> Result<conductivity::ConductivityModel, conductivity::ConductivityError> {
    conductivity::ConductivityFile::read_from_path(path, &())
}
