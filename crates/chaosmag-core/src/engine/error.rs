use thiserror::Error;

use super::config::ConfigError as RequestError;
use super::spectrum::SpectrumError;
use crate::core::config::ConfigError;
use crate::core::coordinates::{CoordinateError, Reference};
use crate::core::harmonics::HarmonicsError;
use crate::core::induction::InductionError;
use crate::core::io::conductivity::ConductivityError;
use crate::core::io::manifest::ManifestError;
use crate::core::io::rc_index::RcIndexError;
use crate::core::io::shc::ShcError;
use crate::core::math::bspline::BsplineError;
use crate::core::rotation::RotationError;
use crate::core::time::TimeError;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Requested degree {requested} exceeds the model degree {available}")]
    DegreeTooHigh { requested: usize, available: usize },

    #[error("No rotation spectrum available for the {0} frame")]
    MissingSpectrum(Reference),

    #[error("No RC index available")]
    MissingRcIndex,

    #[error("Least-squares fit failed: {0}")]
    LeastSquares(String),

    #[error("Invalid request: {source}")]
    Request {
        #[from]
        source: RequestError,
    },

    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Time conversion failed: {source}")]
    Time {
        #[from]
        source: TimeError,
    },

    #[error("Spline error: {source}")]
    Spline {
        #[from]
        source: BsplineError,
    },

    #[error("Synthesis failed: {source}")]
    Harmonics {
        #[from]
        source: HarmonicsError,
    },

    #[error("Coordinate transform failed: {source}")]
    Coordinates {
        #[from]
        source: CoordinateError,
    },

    #[error("Induction response failed: {source}")]
    Induction {
        #[from]
        source: InductionError,
    },

    #[error("Rotation failed: {source}")]
    Rotation {
        #[from]
        source: RotationError,
    },

    #[error("SHC file error: {source}")]
    Shc {
        #[from]
        source: ShcError,
    },

    #[error("RC index error: {source}")]
    RcIndex {
        #[from]
        source: RcIndexError,
    },

    #[error("Conductivity model error: {source}")]
    Conductivity {
        #[from]
        source: ConductivityError,
    },

    #[error("Model manifest error: {source}")]
    Manifest {
        #[from]
        source: ManifestError,
    },

    #[error("Rotation spectrum error: {source}")]
    Spectrum {
        #[from]
        source: SpectrumError,
    },
}
