use super::CoordinateError;
use super::spherical::spherical_to_cartesian;
use super::sun::sun_position;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// IGRF-12 dipole coefficients `[g10, g11, h11]` (nT), epoch 2015.
pub const IGRF12_DIPOLE: [f64; 3] = [-29442.0, -1501.0, 4797.1];
/// IGRF-13 dipole coefficients `[g10, g11, h11]` (nT), epoch 2020.
pub const IGRF13_DIPOLE: [f64; 3] = [-29404.8, -1450.9, 4652.5];
/// IGRF-11 geomagnetic north pole `(theta, phi)` (degrees), epoch 2010.
pub const IGRF11_POLE: (f64, f64) = (11.32, 289.59);

/// Orientation of the centered dipole.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dipole {
    /// Degree-1 Gauss coefficients `[g10, g11, h11]`.
    Coefficients([f64; 3]),
    /// Colatitude and longitude (degrees) of the geomagnetic north pole.
    Pole { theta: f64, phi: f64 },
}

impl Default for Dipole {
    fn default() -> Self {
        Dipole::Coefficients(IGRF12_DIPOLE)
    }
}

impl From<[f64; 3]> for Dipole {
    fn from(coeffs: [f64; 3]) -> Self {
        Dipole::Coefficients(coeffs)
    }
}

/// Unit vector pointing to the geomagnetic north pole, which is
/// anti-parallel to the dipole moment.
pub fn dipole_to_vec(dipole: &Dipole) -> Result<Vector3<f64>, CoordinateError> {
    match *dipole {
        Dipole::Coefficients([g10, g11, h11]) => {
            let moment = Vector3::new(g11, h11, g10);
            let norm = moment.norm();
            if norm == 0.0 || !norm.is_finite() {
                return Err(CoordinateError::DegenerateDipole);
            }
            Ok(-moment / norm)
        }
        Dipole::Pole { theta, phi } => Ok(spherical_to_cartesian(1.0, theta, phi)),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IgrfEpoch {
    #[serde(rename = "2010")]
    Igrf11,
    #[default]
    #[serde(rename = "2015")]
    Igrf12,
    #[serde(rename = "2020")]
    Igrf13,
}

impl IgrfEpoch {
    pub fn dipole(&self) -> Dipole {
        match self {
            IgrfEpoch::Igrf11 => Dipole::Pole {
                theta: IGRF11_POLE.0,
                phi: IGRF11_POLE.1,
            },
            IgrfEpoch::Igrf12 => Dipole::Coefficients(IGRF12_DIPOLE),
            IgrfEpoch::Igrf13 => Dipole::Coefficients(IGRF13_DIPOLE),
        }
    }
}

impl fmt::Display for IgrfEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year = match self {
            IgrfEpoch::Igrf11 => 2010,
            IgrfEpoch::Igrf12 => 2015,
            IgrfEpoch::Igrf13 => 2020,
        };
        write!(f, "{}", year)
    }
}

impl FromStr for IgrfEpoch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "2010" => Ok(IgrfEpoch::Igrf11),
            "2015" => Ok(IgrfEpoch::Igrf12),
            "2020" => Ok(IgrfEpoch::Igrf13),
            other => Err(format!(
                "Unsupported IGRF epoch '{}' (expected 2010, 2015 or 2020)",
                other
            )),
        }
    }
}

/// Unit vector to the geomagnetic north pole of the given IGRF generation.
pub fn igrf_dipole(epoch: IgrfEpoch) -> Vector3<f64> {
    match epoch.dipole() {
        Dipole::Pole { theta, phi } => spherical_to_cartesian(1.0, theta, phi),
        Dipole::Coefficients([g10, g11, h11]) => -Vector3::new(g11, h11, g10).normalize(),
    }
}

/// Dipole tilt angle (degrees): the angle between the sun direction and the
/// plane perpendicular to the IGRF-12 dipole axis.
pub fn dipole_tilt(time: f64) -> Result<f64, CoordinateError> {
    let (theta, phi) = sun_position(time)?;
    let sun = spherical_to_cartesian(1.0, theta, phi);
    Ok(sun.dot(&igrf_dipole(IgrfEpoch::default())).asin().to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coordinates::spherical::cartesian_to_spherical;
    use crate::core::time::mjd2000;
    use approx::assert_relative_eq;

    #[test]
    fn igrf12_pole_position() {
        let (_, theta, phi) = cartesian_to_spherical(&igrf_dipole(IgrfEpoch::Igrf12));
        assert_relative_eq!(theta, 9.69, epsilon = 0.01);
        assert_relative_eq!(phi + 360.0, 287.37, epsilon = 0.01);
    }

    #[test]
    fn pole_and_coefficient_forms_agree() {
        let vec = dipole_to_vec(&Dipole::Coefficients(IGRF12_DIPOLE)).unwrap();
        let (_, theta, phi) = cartesian_to_spherical(&vec);
        let from_pole = dipole_to_vec(&Dipole::Pole { theta, phi }).unwrap();
        assert_relative_eq!(vec, from_pole, epsilon = 1e-12);
        assert_relative_eq!(vec.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn axial_dipole_points_north() {
        let vec = dipole_to_vec(&Dipole::Coefficients([-30000.0, 0.0, 0.0])).unwrap();
        assert_relative_eq!(vec, Vector3::z(), epsilon = 1e-15);
        assert_eq!(
            dipole_to_vec(&Dipole::Coefficients([0.0, 0.0, 0.0])),
            Err(CoordinateError::DegenerateDipole)
        );
    }

    #[test]
    fn epoch_parses_from_year() {
        assert_eq!("2020".parse::<IgrfEpoch>(), Ok(IgrfEpoch::Igrf13));
        assert_eq!(IgrfEpoch::default().to_string(), "2015");
        assert!("1990".parse::<IgrfEpoch>().is_err());
    }

    #[test]
    fn dipole_tilt_follows_season() {
        for hour in [0, 6, 12, 18] {
            let june = dipole_tilt(mjd2000(2012, 6, 21, hour, 0, 0, 0).unwrap()).unwrap();
            let december = dipole_tilt(mjd2000(2012, 12, 21, hour, 0, 0, 0).unwrap()).unwrap();
            assert!(june > 0.0 && june < 36.0, "june tilt {}", june);
            assert!(december < 0.0 && december > -36.0, "december tilt {}", december);
        }
    }
}
