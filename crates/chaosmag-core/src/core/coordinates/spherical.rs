use nalgebra::Vector3;

/// Cartesian coordinates of a spherical position (angles in degrees).
pub fn spherical_to_cartesian(radius: f64, theta: f64, phi: f64) -> Vector3<f64> {
    let (sin_theta, cos_theta) = theta.to_radians().sin_cos();
    let (sin_phi, cos_phi) = phi.to_radians().sin_cos();
    Vector3::new(
        radius * cos_phi * sin_theta,
        radius * sin_phi * sin_theta,
        radius * cos_theta,
    )
}

/// Returns `(radius, theta, phi)` with `theta` in [0, 180] and `phi` in
/// (-180, 180] degrees.
pub fn cartesian_to_spherical(vector: &Vector3<f64>) -> (f64, f64, f64) {
    let radius = vector.norm();
    let theta = vector.x.hypot(vector.y).atan2(vector.z);
    let phi = vector.y.atan2(vector.x);
    (radius, theta.to_degrees(), phi.to_degrees())
}

/// Maps an azimuth in degrees into (-180, 180].
pub fn center_azimuth(phi: f64) -> f64 {
    let phi = phi.rem_euclid(360.0);
    if phi > 180.0 { phi - 360.0 } else { phi }
}

/// Local time in hours [0, 24) at longitude `phi` (degrees) for a given
/// modified Julian date.
pub fn local_time(time: f64, phi: f64) -> f64 {
    (time + phi / 360.0).rem_euclid(1.0) * 24.0
}
