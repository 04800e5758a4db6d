//! Electromagnetic induction in a radially layered Earth.
//!
//! The Q-response relates the induced (internal) part of a degree-`n`
//! potential field to the inducing (external) part at the Earth's surface
//! for a harmonic time dependence.

use super::harmonics::REFERENCE_RADIUS;
use super::io::conductivity::ConductivityModel;
use rustfft::num_complex::Complex64;
use std::f64::consts::PI;
use thiserror::Error;
use tracing::debug;

const MU_0: f64 = 4.0 * PI * 1e-7;

const SERIES_TOLERANCE: f64 = 1e-10;
const SMALL_ARGUMENT_LIMIT: f64 = 3.0;

#[derive(Debug, Error, PartialEq)]
pub enum InductionError {
    #[error("Periods must be positive and finite, got {0}")]
    InvalidPeriod(f64),
    #[error("Conductivity model has {sigma} conductivities but {radius} radii (expected {expected})")]
    LayerMismatch {
        sigma: usize,
        radius: usize,
        expected: usize,
    },
    #[error("Conductivity model is empty")]
    EmptyModel,
    #[error("Spherical harmonic degree must be at least 1")]
    InvalidDegree,
}

/// How conductivity varies within each layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Kind {
    /// Conductivity proportional to `r^-2` within each layer; `radius` holds
    /// the top of each layer, the last entry being the top of the core.
    #[default]
    Quadratic,
    /// Constant conductivity per layer; `radius` holds the layer boundaries
    /// and has one entry more than `sigma`.
    Constant,
}

/// C-response (km), apparent resistivity (Ohm m), phase (degrees) and
/// Q-response per period.
#[derive(Debug, Clone, PartialEq)]
pub struct InductionResponse {
    pub c: Vec<Complex64>,
    pub rho_a: Vec<f64>,
    pub phi: Vec<f64>,
    pub q: Vec<Complex64>,
}

impl InductionResponse {
    fn from_c_response(c: Vec<Complex64>, periods: &[f64], surface: f64, n: usize) -> Self {
        let nf = n as f64;
        let rho_a = c
            .iter()
            .zip(periods)
            .map(|(c, period)| MU_0 * 2.0 * PI / period * (*c * 1e3).norm_sqr())
            .collect();
        let phi = c.iter().map(|c| 90.0 + c.arg().to_degrees()).collect();
        let q = c
            .iter()
            .map(|&c| nf / (nf + 1.0) * (1.0 - (nf + 1.0) * c / surface) / (1.0 + nf * c / surface))
            .collect();
        Self { c, rho_a, phi, q }
    }
}

/// Computes the induction response of a layered sphere for the given periods
/// (seconds), layer conductivities (S/m) and radii (km).
pub fn q_response_1d(
    periods: &[f64],
    sigma: &[f64],
    radius: &[f64],
    n: usize,
    kind: Kind,
) -> Result<InductionResponse, InductionError> {
    if n == 0 {
        return Err(InductionError::InvalidDegree);
    }
    if sigma.is_empty() {
        return Err(InductionError::EmptyModel);
    }
    if let Some(&bad) = periods.iter().find(|p| !(p.is_finite() && **p > 0.0)) {
        return Err(InductionError::InvalidPeriod(bad));
    }
    let expected = match kind {
        Kind::Quadratic => sigma.len(),
        Kind::Constant => sigma.len() + 1,
    };
    if radius.len() != expected {
        return Err(InductionError::LayerMismatch {
            sigma: sigma.len(),
            radius: radius.len(),
            expected,
        });
    }

    let c: Vec<Complex64> = periods
        .iter()
        .map(|&period| match kind {
            Kind::Quadratic => c_response_quadratic(period, sigma, radius, n),
            Kind::Constant => c_response_constant(period, sigma, radius, n),
        })
        .collect();
    Ok(InductionResponse::from_c_response(c, periods, radius[0], n))
}

/// Admittance recursion from the core to the surface for layers with
/// `sigma ~ r^-2`.
fn c_response_quadratic(period: f64, sigma: &[f64], radius_km: &[f64], n: usize) -> Complex64 {
    let radius: Vec<f64> = radius_km.iter().map(|r| r * 1e3).collect();
    let omega = Complex64::new(0.0, 2.0 * PI / period);
    let half = n as f64 + 0.5;
    let last = sigma.len() - 1;

    let degree_term = |qk: Complex64, layer: usize| (half * half - qk * sigma[layer] * radius[layer]).sqrt();

    let qk = -omega * MU_0 * radius[last];
    let bk = degree_term(qk, last);
    let mut admittance = -(bk + 0.5) / qk;

    for k in (0..last).rev() {
        let qk = -omega * MU_0 * radius[k];
        let bk = degree_term(qk, k);
        let (bkp, bkm) = (bk + 0.5, bk - 0.5);
        let eta = radius[k] / radius[k + 1];
        let zeta = (2.0 * bk * eta.ln()).exp();
        let mut tau = (1.0 - zeta) / (1.0 + zeta);
        if !tau.is_finite() {
            tau = Complex64::new(-1.0, 0.0);
        }
        let q_y = -omega * MU_0 * radius[k + 1] * admittance;
        admittance = (q_y * (bk - 0.5 * tau) + bkp * bkm * tau) / (bk + tau * (0.5 + q_y)) / qk;
    }

    1.0 / (omega * MU_0 * admittance) / 1e3
}

/// Spherical Bessel function ratios across one layer, following the
/// series expansions of Abramowitz & Stegun 10.2.
struct LayerRatios {
    v1: Complex64,
    v2: Complex64,
    v3: Complex64,
    v4: Complex64,
    v5: Complex64,
    v6: Complex64,
}

fn layer_ratios(z: [Complex64; 2], n: usize) -> LayerRatios {
    let nf = n as f64;
    let ni = n as i32;
    let mut p = [Complex64::default(); 2];
    let mut q = [Complex64::default(); 2];
    let mut pd = [Complex64::default(); 2];
    let mut qd = [Complex64::default(); 2];
    let sign_n1 = if (n + 1) % 2 == 0 { 1.0 } else { -1.0 };

    if z[0].norm() < SMALL_ARGUMENT_LIMIT {
        let fac1: f64 = (1..=n).map(|v| v as f64).product();
        let fac2 = -sign_n1 * fac1 / (2.0 * nf + 1.0);
        for m in 0..2 {
            let zz = z[m] * z[m] / 2.0;
            let (mut pm, mut qm) = (Complex64::new(1.0, 0.0), Complex64::new(1.0, 0.0));
            let (mut pdm, mut qdm) = (Complex64::new(nf, 0.0), Complex64::new(-(nf + 1.0), 0.0));
            let (mut dp, mut dq) = (Complex64::new(1.0, 0.0), Complex64::new(1.0, 0.0));
            let mut j = 1.0;
            while dp.norm() > SERIES_TOLERANCE || dq.norm() > SERIES_TOLERANCE {
                dp = dp * zz / j / (2.0 * j + 1.0 + 2.0 * nf);
                dq = dq * zz / j / (2.0 * j - 1.0 - 2.0 * nf);
                pm += dp;
                qm += dq;
                pdm += dp * (2.0 * j + nf);
                qdm += dq * (2.0 * j - nf - 1.0);
                j += 1.0;
            }
            p[m] = pm * z[m].powi(ni) / fac1;
            let q_series = qm * z[m].powi(-ni - 1) * fac2;
            q[m] = sign_n1 * PI / 2.0 * (p[m] - q_series);
            pd[m] = pdm * z[m].powi(ni - 1) / fac1;
            let qd_series = qdm * z[m].powi(-ni - 2) * fac2;
            qd[m] = sign_n1 * PI / 2.0 * (pd[m] - qd_series);
        }
        LayerRatios {
            v1: p[1] / p[0],
            v2: pd[0] / p[0],
            v3: pd[1] / p[0],
            v4: q[0] / q[1],
            v5: qd[0] / q[1],
            v6: qd[1] / q[1],
        }
    } else {
        // exponential behaviour split off
        for m in 0..2 {
            let zz = 2.0 * z[m];
            let one = Complex64::new(1.0, 0.0);
            let (mut rm, mut rp, mut rmd, mut rpd) = (one, one, one, one);
            let mut d = one;
            let mut sg = 1.0;
            for j in 1..=n {
                let jf = j as f64;
                d = d * ((nf + 1.0 - jf) * (nf + jf) / jf) / zz;
                sg = -sg;
                rp += d;
                rm += sg * d;
                rmd += sg * d * (jf + 1.0);
                rpd += d * (jf + 1.0);
            }
            let e = (-2.0 * z[m]).exp();
            p[m] = (rm - sg * rp * e) / zz;
            q[m] = (PI / zz) * rp;
            pd[m] = (rm + sg * rp * e) / zz - 2.0 * (rmd - sg * rpd * e) / (zz * zz);
            qd[m] = -q[m] - 2.0 * PI * rpd / (zz * zz);
        }
        let e = (-(z[0] - z[1])).exp();
        LayerRatios {
            v1: p[1] / p[0] * e,
            v2: pd[0] / p[0],
            v3: pd[1] / p[0] * e,
            v4: q[0] / q[1] * e,
            v5: qd[0] / q[1] * e,
            v6: qd[1] / q[1],
        }
    }
}

/// Weidelt's recursion for layers of constant conductivity.
fn c_response_constant(period: f64, sigma: &[f64], radius: &[f64], n: usize) -> Complex64 {
    let last = sigma.len() - 1;
    let mut b = Complex64::default();
    for il in (0..=last).rev() {
        let k = (Complex64::new(0.0, 8.0e-7 * PI * PI * sigma[il] / period)).sqrt();
        let z = [k * radius[il] * 1e3, k * radius[il + 1] * 1e3];
        let v = layer_ratios(z, n);
        b = if il == last {
            k * (v.v2 - v.v5 * v.v1) / (1.0 - v.v4 * v.v1)
        } else {
            k * ((v.v2 - v.v5 * v.v1) * b + k * (v.v5 * v.v3 - v.v2 * v.v6))
                / ((1.0 - v.v4 * v.v1) * b + k * (v.v4 * v.v3 - v.v6))
        };
    }
    radius[0] / (1.0 + 1e3 * radius[0] * b)
}

/// Q-response for each degree `1..=nmax` (outer index) and frequency (Hz,
/// inner index) of the given conductivity model. Non-positive frequencies
/// have no induced response.
pub fn q_response(
    frequency: &[f64],
    nmax: usize,
    conductivity: &ConductivityModel,
) -> Result<Vec<Vec<Complex64>>, InductionError> {
    let radius: Vec<f64> = conductivity
        .depth
        .iter()
        .map(|depth| REFERENCE_RADIUS - depth)
        .collect();
    let positive: Vec<usize> = (0..frequency.len()).filter(|&i| frequency[i] > 0.0).collect();
    let periods: Vec<f64> = positive.iter().map(|&i| 1.0 / frequency[i]).collect();

    (1..=nmax)
        .map(|n| {
            debug!(degree = n, "Computing Q-response");
            let response = q_response_1d(&periods, &conductivity.sigma, &radius, n, Kind::Quadratic)?;
            let mut q = vec![Complex64::default(); frequency.len()];
            for (&index, value) in positive.iter().zip(response.q) {
                q[index] = value;
            }
            Ok(q)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn perfect_conductor_limit(n: usize, core: f64, surface: f64) -> f64 {
        let nf = n as f64;
        nf / (nf + 1.0) * (core / surface).powi(2 * n as i32 + 1)
    }

    #[test]
    fn quadratic_model_tends_to_perfect_conductor() {
        let radius = [6371.2, 3485.0];
        let sigma = [0.0, 1e7];
        for n in 1..=3 {
            let response = q_response_1d(&[3600.0, 86400.0], &sigma, &radius, n, Kind::Quadratic).unwrap();
            let limit = perfect_conductor_limit(n, radius[1], radius[0]);
            for q in &response.q {
                assert_relative_eq!(q.re, limit, max_relative = 1e-3);
                assert!(q.im.abs() < 1e-3 * limit);
            }
        }
    }

    #[test]
    fn constant_model_tends_to_perfect_conductor() {
        let radius = [6371.2, 3485.0, 1000.0];
        let sigma = [1e-6, 1e7];
        let response = q_response_1d(&[86400.0], &sigma, &radius, 1, Kind::Constant).unwrap();
        let limit = perfect_conductor_limit(1, radius[1], radius[0]);
        assert_relative_eq!(response.q[0].re, limit, max_relative = 1e-2);
    }

    #[test]
    fn insulating_earth_has_no_response() {
        let response = q_response_1d(&[86400.0], &[0.0], &[6371.2], 1, Kind::Quadratic).unwrap();
        assert!(response.q[0].norm() < 1e-12);
        assert_relative_eq!(response.c[0].re, 6371.2 / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn response_weakens_with_period() {
        let radius = [6371.2, 5971.2, 5701.2, 3485.0];
        let sigma = [0.01, 0.1, 1.0, 1e5];
        let response = q_response_1d(&[3600.0, 86400.0 * 30.0], &sigma, &radius, 1, Kind::Quadratic).unwrap();
        assert!(response.q[0].norm() > response.q[1].norm());
        assert!(response.rho_a.iter().all(|r| r.is_finite() && *r > 0.0));
    }

    #[test]
    fn invalid_input_is_rejected() {
        assert_eq!(
            q_response_1d(&[0.0], &[1.0], &[6371.2], 1, Kind::Quadratic),
            Err(InductionError::InvalidPeriod(0.0))
        );
        assert_eq!(
            q_response_1d(&[1.0], &[1.0], &[6371.2], 1, Kind::Constant),
            Err(InductionError::LayerMismatch { sigma: 1, radius: 1, expected: 2 })
        );
        assert_eq!(
            q_response_1d(&[1.0], &[1.0], &[6371.2], 0, Kind::Quadratic),
            Err(InductionError::InvalidDegree)
        );
    }

    #[test]
    fn q_response_is_zero_for_static_component() {
        let model = ConductivityModel {
            depth: vec![0.0, 2886.2],
            sigma: vec![0.0, 1e7],
        };
        let q = q_response(&[0.0, 1.0 / 86400.0], 2, &model).unwrap();
        assert_eq!(q.len(), 2);
        assert_eq!(q[0][0], Complex64::default());
        assert_relative_eq!(q[0][1].re, perfect_conductor_limit(1, 3485.0, 6371.2), max_relative = 1e-3);
    }
}
