//! Low-precision solar ephemeris (accurate to a few hundredths of a degree
//! between 1901 and 2099).

use super::CoordinateError;
use super::spherical::center_azimuth;
use crate::core::time::DAYS_PER_YEAR;

/// Geocentric colatitude and longitude (degrees) of the sun at the given
/// modified Julian date.
pub fn sun_position(time: f64) -> Result<(f64, f64), CoordinateError> {
    let year = 2000.0 + (time / DAYS_PER_YEAR).floor();
    if !time.is_finite() || year >= 2099.0 || year <= 1901.0 {
        return Err(CoordinateError::TimeOutOfRange(time));
    }

    let frac_day = time.rem_euclid(1.0);
    // days since noon 1899-12-31
    let julian_date = (365 * 100 + 99 / 4) as f64 + time + 0.5;
    let t = julian_date / 36525.0;

    let v = (279.696678 + 0.9856473354 * julian_date).rem_euclid(360.0);
    let g = (358.475845 + 0.985600267 * julian_date).rem_euclid(360.0).to_radians();

    let slong = v + (1.91946 - 0.004789 * t) * g.sin() + 0.020094 * (2.0 * g).sin();
    let obliquity = (23.45229 - 0.0130125 * t).to_radians();
    let slp = (slong - 0.005686).to_radians();

    let sind = obliquity.sin() * slp.sin();
    let cosd = (1.0 - sind * sind).sqrt();
    let declination = (sind / cosd).atan();
    let right_ascension = std::f64::consts::PI
        - (sind / (cosd * obliquity.tan())).atan2(-slp.cos() / cosd);

    let gmst = (279.690983 + 0.9856473354 * julian_date + 360.0 * frac_day + 180.0)
        .rem_euclid(360.0)
        .to_radians();

    let theta = (std::f64::consts::FRAC_PI_2 - declination).to_degrees();
    let phi = center_azimuth((right_ascension - gmst).to_degrees());
    Ok((theta, phi))
}

/// Solar zenith angle (degrees) at colatitude `theta` and longitude `phi`.
pub fn zenith_angle(time: f64, theta: f64, phi: f64) -> Result<f64, CoordinateError> {
    let (theta_sun, phi_sun) = sun_position(time)?;
    let (colat, azim) = (theta_sun.to_radians(), phi_sun.to_radians());
    let (theta, phi) = (theta.to_radians(), phi.to_radians());
    let cos_zeta = theta.cos() * colat.cos() + theta.sin() * colat.sin() * (azim - phi).cos();
    Ok(cos_zeta.clamp(-1.0, 1.0).acos().to_degrees())
}
