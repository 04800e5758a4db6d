use super::frames::Frame;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Reference ellipsoid given by its equatorial and polar radii (km).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    pub equatorial: f64,
    pub polar: f64,
}

impl Ellipsoid {
    pub const WGS84: Self = Self {
        equatorial: 6378.137,
        polar: 6356.752,
    };

    pub const fn new(equatorial: f64, polar: f64) -> Self {
        Self { equatorial, polar }
    }

    /// Squared first eccentricity.
    pub fn eccentricity_squared(&self) -> f64 {
        let (a2, b2) = (self.equatorial.powi(2), self.polar.powi(2));
        (a2 - b2) / a2
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}

/// Geocentric radius (km) and colatitude (degrees) of a point at geodetic
/// height (km) and geodetic colatitude `beta` (degrees).
pub fn gg_to_geo(ellipsoid: &Ellipsoid, height: f64, beta: f64) -> (f64, f64) {
    let (a, b) = (ellipsoid.equatorial, ellipsoid.polar);
    let alpha = (90.0 - beta).to_radians();
    let sin_alpha_2 = alpha.sin().powi(2);
    let cos_alpha_2 = alpha.cos().powi(2);

    let factor = height * (a * a * cos_alpha_2 + b * b * sin_alpha_2).sqrt();
    let gamma = ((factor + b * b) * alpha.tan()).atan2(factor + a * a);
    let theta = 90.0 - gamma.to_degrees();

    let radius = (height * height
        + 2.0 * factor
        + a * a * (1.0 - (1.0 - (b / a).powi(4)) * sin_alpha_2)
            / (1.0 - (1.0 - (b / a).powi(2)) * sin_alpha_2))
        .sqrt();
    (radius, theta)
}

/// Like [`gg_to_geo`] but also rotates the geodetic north (`x`) and downward
/// (`z`) vector components into geocentric `(B_radius, B_theta)`.
pub fn gg_to_geo_vector(
    ellipsoid: &Ellipsoid,
    height: f64,
    beta: f64,
    x: f64,
    z: f64,
) -> (f64, f64, f64, f64) {
    let (radius, theta) = gg_to_geo(ellipsoid, height, beta);
    let base = basevectors_gg(theta, beta);
    let b_radius = base.e1.x * x + base.e3.x * z;
    let b_theta = base.e1.y * x + base.e3.y * z;
    (radius, theta, b_radius, b_theta)
}

/// Geodetic height (km) and colatitude (degrees) of a geocentric position,
/// using Heikkinen's closed-form solution.
pub fn geo_to_gg(ellipsoid: &Ellipsoid, radius: f64, theta: f64) -> (f64, f64) {
    let (a, b) = (ellipsoid.equatorial, ellipsoid.polar);
    let (a2, b2) = (a * a, b * b);
    let e2 = (a2 - b2) / a2;
    let e4 = e2 * e2;
    let ep2 = (a2 - b2) / b2;

    let (sin_theta, cos_theta) = theta.to_radians().sin_cos();
    let r = radius * sin_theta;
    let z = radius * cos_theta;
    let (r2, z2) = (r * r, z * z);

    let f = 54.0 * b2 * z2;
    let g = r2 + (1.0 - e2) * z2 - e2 * (a2 - b2);
    let c = e4 * f * r2 / g.powi(3);
    let s = (1.0 + c + (c * c + 2.0 * c).sqrt()).cbrt();
    let p = f / (3.0 * (s + 1.0 / s + 1.0).powi(2) * g * g);
    let q = (1.0 + 2.0 * e4 * p).sqrt();
    let r0 = -p * e2 * r / (1.0 + q)
        + (0.5 * a2 * (1.0 + 1.0 / q) - p * (1.0 - e2) * z2 / (q * (1.0 + q)) - 0.5 * p * r2)
            .sqrt();
    let u = ((r - e2 * r0).powi(2) + z2).sqrt();
    let v = ((r - e2 * r0).powi(2) + (1.0 - e2) * z2).sqrt();
    let z0 = b2 * z / (a * v);

    let height = u * (1.0 - b2 / (a * v));
    let beta = 90.0 - (z + ep2 * z0).atan2(r).to_degrees();
    (height, beta)
}

/// Like [`geo_to_gg`] but also rotates `(B_radius, B_theta)` into geodetic
/// north (`x`) and downward (`z`) components.
pub fn geo_to_gg_vector(
    ellipsoid: &Ellipsoid,
    radius: f64,
    theta: f64,
    b_radius: f64,
    b_theta: f64,
) -> (f64, f64, f64, f64) {
    let (height, beta) = geo_to_gg(ellipsoid, radius, theta);
    let base = basevectors_gg(theta, beta);
    let x = base.e1.x * b_radius + base.e1.y * b_theta;
    let z = base.e3.x * b_radius + base.e3.y * b_theta;
    (height, beta, x, z)
}

/// Geodetic north, east and downward unit vectors expressed in the local
/// geocentric (radius, theta, phi) components.
pub fn basevectors_gg(theta: f64, beta: f64) -> Frame {
    let (sin_psi, cos_psi) = (theta - beta).to_radians().sin_cos();
    Frame::new(
        Vector3::new(-sin_psi, -cos_psi, 0.0),
        Vector3::new(0.0, 0.0, 1.0),
        Vector3::new(-cos_psi, sin_psi, 0.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn equator_and_pole_lie_on_ellipsoid() {
        let wgs84 = Ellipsoid::default();
        let (radius, theta) = gg_to_geo(&wgs84, 0.0, 90.0);
        assert_relative_eq!(radius, wgs84.equatorial, epsilon = 1e-9);
        assert_relative_eq!(theta, 90.0, epsilon = 1e-12);

        let (radius, theta) = gg_to_geo(&wgs84, 0.0, 0.0);
        assert_relative_eq!(radius, wgs84.polar, epsilon = 1e-9);
        assert_relative_eq!(theta, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn geocentric_latitude_is_closer_to_equator() {
        let (_, theta) = gg_to_geo(&Ellipsoid::default(), 0.0, 45.0);
        assert!(theta > 45.0 && theta < 45.25);
    }

    #[test]
    fn geodetic_round_trip() {
        let wgs84 = Ellipsoid::default();
        for &(height, beta) in &[(0.0, 30.0), (450.0, 62.5), (10.0, 135.0), (800.0, 95.0)] {
            let (radius, theta) = gg_to_geo(&wgs84, height, beta);
            let (h, b) = geo_to_gg(&wgs84, radius, theta);
            assert_relative_eq!(h, height, epsilon = 1e-6);
            assert_relative_eq!(b, beta, epsilon = 1e-9);
        }
    }

    #[test]
    fn vector_components_round_trip() {
        let wgs84 = Ellipsoid::default();
        let (radius, theta, b_radius, b_theta) = gg_to_geo_vector(&wgs84, 300.0, 40.0, 20000.0, 45000.0);
        let (_, _, x, z) = geo_to_gg_vector(&wgs84, radius, theta, b_radius, b_theta);
        assert_relative_eq!(x, 20000.0, epsilon = 1e-6);
        assert_relative_eq!(z, 45000.0, epsilon = 1e-6);
    }

    #[test]
    fn spherical_ellipsoid_leaves_components_unchanged() {
        let sphere = Ellipsoid::new(6371.2, 6371.2);
        let (radius, theta, b_radius, b_theta) = gg_to_geo_vector(&sphere, 0.0, 50.0, 100.0, 200.0);
        assert_relative_eq!(radius, 6371.2, epsilon = 1e-9);
        assert_relative_eq!(theta, 50.0, epsilon = 1e-12);
        assert_relative_eq!(b_radius, -200.0, epsilon = 1e-9);
        assert_relative_eq!(b_theta, -100.0, epsilon = 1e-9);
    }
}
