//! # Coordinates
//!
//! Geographic (GEO) positions and the reference frames the magnetospheric
//! field is described in.
//!
//! - [`spherical`] - spherical/Cartesian conversion, azimuth and local time
//! - [`sun`] - solar position and zenith angle
//! - [`dipole`] - dipole axis, IGRF epochs and dipole tilt
//! - [`solar_wind`] - IMF clock angle and coupling functions
//! - [`geodetic`] - reference ellipsoid and geodetic conversions
//! - [`frames`] - base vectors of GSM, SM, MAG and local USE frames
//! - [`transform`] - mapping points and vectors between GEO and a frame

pub mod dipole;
pub mod frames;
pub mod geodetic;
pub mod solar_wind;
pub mod spherical;
pub mod sun;
pub mod transform;

pub use dipole::{Dipole, IgrfEpoch};
pub use frames::Frame;
pub use geodetic::Ellipsoid;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CoordinateError {
    #[error("Time {0} (MJD2000) is outside the supported range 1901 to 2099")]
    TimeOutOfRange(f64),
    #[error("Base vectors are not defined at the poles (theta = {0})")]
    AtPole(f64),
    #[error("Unknown reference system '{0}' (expected one of gsm, sm, mag)")]
    UnknownReference(String),
    #[error("Degenerate dipole axis")]
    DegenerateDipole,
}

/// Geocentric spherical position: radius (km), colatitude and longitude
/// (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub radius: f64,
    pub theta: f64,
    pub phi: f64,
}

impl Position {
    pub const fn new(radius: f64, theta: f64, phi: f64) -> Self {
        Self { radius, theta, phi }
    }
}

/// Target reference systems for points, vectors and SH expansions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reference {
    /// Geocentric solar magnetospheric.
    Gsm,
    /// Solar magnetic.
    Sm,
    /// Centered dipole (geomagnetic).
    Mag,
}

impl Reference {
    /// Whether the frame rotates with respect to GEO and thus depends on time.
    pub fn is_time_dependent(&self) -> bool {
        matches!(self, Reference::Gsm | Reference::Sm)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reference::Gsm => "GSM",
            Reference::Sm => "SM",
            Reference::Mag => "MAG",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Reference {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gsm" => Ok(Reference::Gsm),
            "sm" => Ok(Reference::Sm),
            "mag" => Ok(Reference::Mag),
            _ => Err(CoordinateError::UnknownReference(s.to_string())),
        }
    }
}
