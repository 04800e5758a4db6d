use super::dipole::Dipole;
use super::frames::{Frame, basevectors, basevectors_use};
use super::spherical::{cartesian_to_spherical, spherical_to_cartesian};
use super::{CoordinateError, Reference};
use nalgebra::Matrix3;

/// Colatitude and longitude (degrees) of a GEO direction in the given frame,
/// or the reverse with `inverse`.
pub fn geo_to_base(theta: f64, phi: f64, frame: &Frame, inverse: bool) -> (f64, f64) {
    let unit = spherical_to_cartesian(1.0, theta, phi);
    let rotated = if inverse {
        frame.from_frame_matrix() * unit
    } else {
        frame.to_frame_matrix() * unit
    };
    let (_, theta_ref, phi_ref) = cartesian_to_spherical(&rotated);
    (theta_ref, phi_ref)
}

/// Transforms a point from GEO into the target reference system at the given
/// time, or back with `inverse`.
pub fn transform_points(
    theta: f64,
    phi: f64,
    time: f64,
    reference: Reference,
    inverse: bool,
    dipole: &Dipole,
) -> Result<(f64, f64), CoordinateError> {
    let frame = basevectors(reference, time, dipole)?;
    Ok(geo_to_base(theta, phi, &frame, inverse))
}

/// Rotation matrix taking local USE components at `(theta, phi)` in GEO to
/// local USE components at the transformed position. With `inverse` the
/// input position is in the frame and the matrix maps back to GEO.
///
/// Returns the transformed position and the matrix.
pub fn matrix_geo_to_base(
    theta: f64,
    phi: f64,
    frame: &Frame,
    inverse: bool,
) -> Result<(f64, f64, Matrix3<f64>), CoordinateError> {
    let ((theta_geo, phi_geo), (theta_ref, phi_ref)) = if inverse {
        (geo_to_base(theta, phi, frame, true), (theta, phi))
    } else {
        ((theta, phi), geo_to_base(theta, phi, frame, false))
    };

    let use_to_geo = basevectors_use(theta_geo, phi_geo)?.from_frame_matrix();
    let ref_to_use = basevectors_use(theta_ref, phi_ref)?.to_frame_matrix();
    let matrix = ref_to_use * frame.to_frame_matrix() * use_to_geo;

    if inverse {
        Ok((theta_geo, phi_geo, matrix.transpose()))
    } else {
        Ok((theta_ref, phi_ref, matrix))
    }
}

/// Transforms a position and the horizontal components of a vector attached
/// to it. Returns `(theta, phi, b_theta, b_phi)` in the target system.
#[allow(clippy::too_many_arguments)]
pub fn transform_vectors(
    theta: f64,
    phi: f64,
    b_theta: f64,
    b_phi: f64,
    time: f64,
    reference: Reference,
    inverse: bool,
    dipole: &Dipole,
) -> Result<(f64, f64, f64, f64), CoordinateError> {
    let frame = basevectors(reference, time, dipole)?;
    let (theta_ref, phi_ref, r) = matrix_geo_to_base(theta, phi, &frame, inverse)?;
    let b_theta_ref = r[(1, 1)] * b_theta + r[(1, 2)] * b_phi;
    let b_phi_ref = r[(2, 1)] * b_theta + r[(2, 2)] * b_phi;
    Ok((theta_ref, phi_ref, b_theta_ref, b_phi_ref))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coordinates::frames::basevectors_mag;
    use approx::assert_relative_eq;

    #[test]
    fn identity_frame_leaves_points_unchanged() {
        let (theta, phi) = geo_to_base(33.0, 120.0, &Frame::identity(), false);
        assert_relative_eq!(theta, 33.0, epsilon = 1e-12);
        assert_relative_eq!(phi, 120.0, epsilon = 1e-12);
    }

    #[test]
    fn transform_points_round_trip() {
        let dipole = Dipole::default();
        for reference in [Reference::Gsm, Reference::Sm, Reference::Mag] {
            let (theta, phi) = transform_points(72.0, -44.0, 2500.5, reference, false, &dipole).unwrap();
            let (back_theta, back_phi) = transform_points(theta, phi, 2500.5, reference, true, &dipole).unwrap();
            assert_relative_eq!(back_theta, 72.0, epsilon = 1e-10);
            assert_relative_eq!(back_phi, -44.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn geomagnetic_pole_maps_to_mag_north_pole() {
        let dipole = Dipole::Pole { theta: 9.69, phi: -72.63 };
        let (theta, _) = transform_points(9.69, -72.63, 0.0, Reference::Mag, false, &dipole).unwrap();
        assert_relative_eq!(theta, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn vector_rotation_preserves_horizontal_magnitude() {
        let dipole = Dipole::default();
        let (_, _, b_theta, b_phi) =
            transform_vectors(50.0, 10.0, 3.0, 4.0, 100.0, Reference::Gsm, false, &dipole).unwrap();
        assert_relative_eq!(b_theta.hypot(b_phi), 5.0, epsilon = 1e-10);
    }

    #[test]
    fn vector_rotation_round_trip() {
        let dipole = Dipole::default();
        let (theta, phi, b_theta, b_phi) =
            transform_vectors(120.0, 200.0, -7.0, 2.0, 800.0, Reference::Sm, false, &dipole).unwrap();
        let (back_theta, back_phi, back_b_theta, back_b_phi) =
            transform_vectors(theta, phi, b_theta, b_phi, 800.0, Reference::Sm, true, &dipole).unwrap();
        assert_relative_eq!(back_theta, 120.0, epsilon = 1e-10);
        assert_relative_eq!(back_phi, -160.0, epsilon = 1e-10);
        assert_relative_eq!(back_b_theta, -7.0, epsilon = 1e-10);
        assert_relative_eq!(back_b_phi, 2.0, epsilon = 1e-10);
    }

    #[test]
    fn radial_component_is_invariant() {
        let frame = basevectors_mag(&Dipole::default()).unwrap();
        let (_, _, matrix) = matrix_geo_to_base(40.0, 60.0, &frame, false).unwrap();
        assert_relative_eq!(matrix[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(matrix[(0, 1)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(matrix[(1, 0)], 0.0, epsilon = 1e-12);
    }
}
