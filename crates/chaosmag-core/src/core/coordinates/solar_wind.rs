/// IMF clock angle (degrees) from the GSM y and z components.
pub fn clock_angle(by: f64, bz: f64) -> f64 {
    by.atan2(bz).to_degrees()
}

/// Newell's coupling function `epsilon` and its northward-IMF counterpart
/// `tau`, both scaled by 1e-3.
///
/// `by`, `bz` are IMF components (nT) in GSM, `vx` the solar wind speed along
/// x (km/s).
pub fn coupling_newell(by: f64, bz: f64, vx: f64) -> (f64, f64) {
    let transverse = by.hypot(bz);
    let half_angle = clock_angle(by, bz).to_radians() / 2.0;
    let common = vx.abs().powf(4.0 / 3.0) * transverse.powf(2.0 / 3.0);
    let epsilon = common * half_angle.sin().abs().powf(8.0 / 3.0);
    let tau = common * half_angle.cos().powf(8.0 / 3.0);
    (epsilon / 1e3, tau / 1e3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn clock_angle_quadrants() {
        assert_relative_eq!(clock_angle(0.0, 5.0), 0.0);
        assert_relative_eq!(clock_angle(5.0, 0.0), 90.0);
        assert_relative_eq!(clock_angle(0.0, -5.0), 180.0);
        assert_relative_eq!(clock_angle(-5.0, 0.0), -90.0);
    }

    #[test]
    fn southward_imf_maximizes_coupling() {
        let (epsilon, tau) = coupling_newell(0.0, -8.0, -400.0);
        let expected = 400f64.powf(4.0 / 3.0) * 8f64.powf(2.0 / 3.0) / 1e3;
        assert_relative_eq!(epsilon, expected, epsilon = 1e-9);
        assert_relative_eq!(tau, 0.0, epsilon = 1e-12);

        let (epsilon, tau) = coupling_newell(0.0, 8.0, 400.0);
        assert_relative_eq!(epsilon, 0.0, epsilon = 1e-12);
        assert_relative_eq!(tau, expected, epsilon = 1e-9);
    }
}
