use super::dipole::{Dipole, dipole_to_vec};
use super::spherical::spherical_to_cartesian;
use super::sun::sun_position;
use super::{CoordinateError, Reference};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Orthonormal base vectors of a reference system, each expressed in
/// Cartesian GEO components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub e1: Vector3<f64>,
    pub e2: Vector3<f64>,
    pub e3: Vector3<f64>,
}

impl Frame {
    pub const fn new(e1: Vector3<f64>, e2: Vector3<f64>, e3: Vector3<f64>) -> Self {
        Self { e1, e2, e3 }
    }

    /// The GEO frame itself.
    pub fn identity() -> Self {
        Self::new(Vector3::x(), Vector3::y(), Vector3::z())
    }

    /// Matrix with the base vectors as rows: maps GEO components to frame
    /// components.
    pub fn to_frame_matrix(&self) -> Matrix3<f64> {
        Matrix3::from_rows(&[self.e1.transpose(), self.e2.transpose(), self.e3.transpose()])
    }

    /// Matrix with the base vectors as columns: maps frame components to
    /// GEO components.
    pub fn from_frame_matrix(&self) -> Matrix3<f64> {
        Matrix3::from_columns(&[self.e1, self.e2, self.e3])
    }
}

fn sun_vector(time: f64) -> Result<Vector3<f64>, CoordinateError> {
    let (theta, phi) = sun_position(time)?;
    Ok(spherical_to_cartesian(1.0, theta, phi))
}

/// Geocentric solar magnetospheric frame: `e1` towards the sun, `e2`
/// perpendicular to the dipole axis, `e3` completing the right-handed set.
pub fn basevectors_gsm(time: f64, dipole: &Dipole) -> Result<Frame, CoordinateError> {
    let axis = dipole_to_vec(dipole)?;
    let e1 = sun_vector(time)?;
    let e2 = axis.cross(&e1).normalize();
    let e3 = e1.cross(&e2);
    Ok(Frame::new(e1, e2, e3))
}

/// Solar magnetic frame: `e3` along the dipole axis, `e2` perpendicular to
/// the sun direction.
pub fn basevectors_sm(time: f64, dipole: &Dipole) -> Result<Frame, CoordinateError> {
    let e3 = dipole_to_vec(dipole)?;
    let sun = sun_vector(time)?;
    let e2 = e3.cross(&sun).normalize();
    let e1 = e2.cross(&e3);
    Ok(Frame::new(e1, e2, e3))
}

/// Centered dipole (MAG) frame.
pub fn basevectors_mag(dipole: &Dipole) -> Result<Frame, CoordinateError> {
    let e3 = dipole_to_vec(dipole)?;
    let e2 = Vector3::z().cross(&e3);
    let norm = e2.norm();
    if norm == 0.0 {
        return Err(CoordinateError::DegenerateDipole);
    }
    let e2 = e2 / norm;
    let e1 = e2.cross(&e3);
    Ok(Frame::new(e1, e2, e3))
}

/// Local Up-South-East base vectors at a point, in Cartesian GEO components.
pub fn basevectors_use(theta: f64, phi: f64) -> Result<Frame, CoordinateError> {
    if theta == 0.0 || theta == 180.0 {
        return Err(CoordinateError::AtPole(theta));
    }
    let (sin_theta, cos_theta) = theta.to_radians().sin_cos();
    let (sin_phi, cos_phi) = phi.to_radians().sin_cos();
    Ok(Frame::new(
        Vector3::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta),
        Vector3::new(cos_theta * cos_phi, cos_theta * sin_phi, -sin_theta),
        Vector3::new(-sin_phi, cos_phi, 0.0),
    ))
}

/// Base vectors of the given reference system at time `time` (ignored for
/// MAG).
pub fn basevectors(reference: Reference, time: f64, dipole: &Dipole) -> Result<Frame, CoordinateError> {
    match reference {
        Reference::Gsm => basevectors_gsm(time, dipole),
        Reference::Sm => basevectors_sm(time, dipole),
        Reference::Mag => basevectors_mag(dipole),
    }
}
