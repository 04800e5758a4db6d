//! Spherical-harmonic synthesis of potential fields.
//!
//! Coefficients follow the natural ordering `g_n^0, g_n^1, h_n^1, ...,
//! g_n^n, h_n^n` for each degree `n` from `nmin` to `nmax`, with orders
//! above `mmax` left out.

use super::coordinates::Position;
use super::math::legendre::{LegendreTable, legendre_poly};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul};
use std::str::FromStr;
use thiserror::Error;
use tracing::instrument;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Mean radius of the Earth's surface (km), the usual reference radius.
pub const REFERENCE_RADIUS: f64 = 6371.2;

const POLE_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Error, PartialEq)]
pub enum HarmonicsError {
    #[error("Invalid truncation: nmin = {nmin}, nmax = {nmax}")]
    InvalidTruncation { nmin: usize, nmax: usize },
    #[error("Expected at least {needed} coefficients, found {found}")]
    TooFewCoefficients { needed: usize, found: usize },
    #[error("Unknown source '{0}' (expected 'internal' or 'external')")]
    UnknownSource(String),
    #[error("Coefficient vectors differ in length: {0} and {1}")]
    LengthMismatch(usize, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Internal,
    External,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Internal => write!(f, "internal"),
            Source::External => write!(f, "external"),
        }
    }
}

impl FromStr for Source {
    type Err = HarmonicsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "internal" | "int" | "i" => Ok(Source::Internal),
            "external" | "ext" | "e" => Ok(Source::External),
            _ => Err(HarmonicsError::UnknownSource(s.to_string())),
        }
    }
}

/// Degree and order limits of an expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truncation {
    pub nmin: usize,
    pub nmax: usize,
    pub mmax: usize,
}

impl Truncation {
    /// Full expansion from degree 1 up to `nmax`.
    pub fn new(nmax: usize) -> Self {
        Self {
            nmin: 1,
            nmax,
            mmax: nmax,
        }
    }

    pub fn with_nmin(mut self, nmin: usize) -> Self {
        self.nmin = nmin;
        self
    }

    pub fn with_mmax(mut self, mmax: usize) -> Self {
        self.mmax = mmax;
        self
    }

    pub fn validate(&self) -> Result<(), HarmonicsError> {
        if self.nmin == 0 || self.nmin > self.nmax {
            return Err(HarmonicsError::InvalidTruncation {
                nmin: self.nmin,
                nmax: self.nmax,
            });
        }
        Ok(())
    }

    /// Number of coefficients described by this truncation.
    pub fn len(&self) -> usize {
        (self.nmin..=self.nmax)
            .map(|n| 1 + 2 * n.min(self.mmax))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Field vector in spherical components (nT).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldVector {
    pub radius: f64,
    pub theta: f64,
    pub phi: f64,
}

impl FieldVector {
    pub const fn new(radius: f64, theta: f64, phi: f64) -> Self {
        Self { radius, theta, phi }
    }

    pub fn nan() -> Self {
        Self::new(f64::NAN, f64::NAN, f64::NAN)
    }

    pub fn magnitude(&self) -> f64 {
        (self.radius.powi(2) + self.theta.powi(2) + self.phi.powi(2)).sqrt()
    }
}

impl Add for FieldVector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.radius + rhs.radius, self.theta + rhs.theta, self.phi + rhs.phi)
    }
}

impl AddAssign for FieldVector {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Mul<f64> for FieldVector {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.radius * rhs, self.theta * rhs, self.phi * rhs)
    }
}

/// Design matrices mapping coefficients to the three field components:
/// `B_radius = radius * coeffs` and so on. Rows are points.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrices {
    pub radius: DMatrix<f64>,
    pub theta: DMatrix<f64>,
    pub phi: DMatrix<f64>,
}

/// Number of coefficients of a full expansion from degree 1 to `nmax`.
pub const fn n_coeffs(nmax: usize) -> usize {
    nmax * (nmax + 2)
}

/// Inverse of [`n_coeffs`]; `None` if `len` is not a full expansion.
pub fn nmax_from_len(len: usize) -> Option<usize> {
    let nmax = (((len + 1) as f64).sqrt().round() as usize).saturating_sub(1);
    (nmax >= 1 && n_coeffs(nmax) == len).then_some(nmax)
}

/// Degree and signed order of each coefficient in natural order; negative
/// orders denote `h` coefficients.
pub fn degree_order_pairs(nmin: usize, nmax: usize) -> Vec<(usize, i64)> {
    let mut pairs = Vec::new();
    for n in nmin..=nmax {
        pairs.push((n, 0));
        for m in 1..=n as i64 {
            pairs.push((n, m));
            pairs.push((n, -m));
        }
    }
    pairs
}

/// The `m P_n^m / sin θ` term of the azimuthal component, using its limit
/// at the geographic poles.
#[inline]
fn azimuthal_factor(table: &LegendreTable, n: usize, m: usize, sin_theta: f64, cos_theta: f64) -> f64 {
    if sin_theta.abs() > POLE_TOLERANCE {
        m as f64 * table.p(n, m) / sin_theta
    } else if m == 1 {
        table.dp(n, 1) / cos_theta
    } else {
        0.0
    }
}

/// Visits every coefficient of the truncation at one point, passing its
/// column index and contribution to each field component per unit
/// coefficient.
fn for_each_term<F>(
    position: &Position,
    truncation: &Truncation,
    source: Source,
    reference_radius: f64,
    mut visit: F,
) where
    F: FnMut(usize, FieldVector),
{
    let table = legendre_poly(truncation.nmax, position.theta);
    let (sin_theta, cos_theta) = position.theta.to_radians().sin_cos();
    let phi = position.phi.to_radians();

    let mut column = 0;
    for n in truncation.nmin..=truncation.nmax {
        let nf = n as f64;
        let (radial, scale) = match source {
            Source::Internal => {
                let ratio = (reference_radius / position.radius).powi(n as i32 + 2);
                ((nf + 1.0) * ratio, ratio)
            }
            Source::External => {
                let ratio = (position.radius / reference_radius).powi(n as i32 - 1);
                (-nf * ratio, ratio)
            }
        };

        for m in 0..=n.min(truncation.mmax) {
            let (sin_mphi, cos_mphi) = (m as f64 * phi).sin_cos();
            let p = table.p(n, m);
            let dp = table.dp(n, m);
            let azimuthal = scale * azimuthal_factor(&table, n, m, sin_theta, cos_theta);

            visit(
                column,
                FieldVector::new(radial * p * cos_mphi, -scale * dp * cos_mphi, azimuthal * sin_mphi),
            );
            column += 1;
            if m > 0 {
                visit(
                    column,
                    FieldVector::new(radial * p * sin_mphi, -scale * dp * sin_mphi, -azimuthal * cos_mphi),
                );
                column += 1;
            }
        }
    }
}

/// Field of the expansion with the given coefficients at one point.
pub fn synth_point(
    coeffs: &[f64],
    position: &Position,
    truncation: &Truncation,
    source: Source,
    reference_radius: f64,
) -> FieldVector {
    let mut field = FieldVector::default();
    for_each_term(position, truncation, source, reference_radius, |column, term| {
        field += term * coeffs[column];
    });
    field
}

/// Design matrices of the truncated expansion at the given points.
#[instrument(level = "debug", skip_all, fields(points = points.len(), nmax = truncation.nmax))]
pub fn design_gauss(
    points: &[Position],
    truncation: &Truncation,
    source: Source,
) -> Result<DesignMatrices, HarmonicsError> {
    truncation.validate()?;
    let columns = truncation.len();
    let mut matrices = DesignMatrices {
        radius: DMatrix::zeros(points.len(), columns),
        theta: DMatrix::zeros(points.len(), columns),
        phi: DMatrix::zeros(points.len(), columns),
    };
    for (row, position) in points.iter().enumerate() {
        for_each_term(position, truncation, source, REFERENCE_RADIUS, |column, term| {
            matrices.radius[(row, column)] = term.radius;
            matrices.theta[(row, column)] = term.theta;
            matrices.phi[(row, column)] = term.phi;
        });
    }
    Ok(matrices)
}

fn check_coeffs(coeffs: &[f64], truncation: &Truncation) -> Result<(), HarmonicsError> {
    truncation.validate()?;
    let needed = truncation.len();
    if coeffs.len() < needed {
        return Err(HarmonicsError::TooFewCoefficients {
            needed,
            found: coeffs.len(),
        });
    }
    Ok(())
}

/// Evaluates the field at each point. Extra trailing coefficients are
/// ignored.
#[instrument(level = "debug", skip_all, fields(points = points.len(), nmax = truncation.nmax))]
pub fn synth_values(
    coeffs: &[f64],
    points: &[Position],
    truncation: &Truncation,
    source: Source,
) -> Result<Vec<FieldVector>, HarmonicsError> {
    check_coeffs(coeffs, truncation)?;

    #[cfg(not(feature = "parallel"))]
    let iterator = points.iter();

    #[cfg(feature = "parallel")]
    let iterator = points.par_iter();

    Ok(iterator
        .map(|position| synth_point(coeffs, position, truncation, source, REFERENCE_RADIUS))
        .collect())
}

/// Evaluates the field on the product grid of colatitudes and longitudes at
/// a common radius; the result is ordered with colatitude varying slowest.
pub fn synth_values_grid(
    coeffs: &[f64],
    radius: f64,
    thetas: &[f64],
    phis: &[f64],
    truncation: &Truncation,
    source: Source,
) -> Result<Vec<FieldVector>, HarmonicsError> {
    let points: Vec<Position> = thetas
        .iter()
        .flat_map(|&theta| phis.iter().map(move |&phi| Position::new(radius, theta, phi)))
        .collect();
    synth_values(coeffs, &points, truncation, source)
}

/// Lowes-Mauersberger spatial power spectrum per degree `1..=nmax` at the
/// given radius. `coeffs` is a full expansion starting at degree 1.
pub fn power_spectrum(
    coeffs: &[f64],
    radius: f64,
    nmax: usize,
    source: Source,
) -> Result<Vec<f64>, HarmonicsError> {
    check_coeffs(coeffs, &Truncation::new(nmax))?;
    Ok((1..=nmax)
        .map(|n| {
            let start = n * n - 1;
            let energy: f64 = coeffs[start..start + 2 * n + 1].iter().map(|c| c * c).sum();
            let nf = n as f64;
            match source {
                Source::Internal => {
                    (nf + 1.0) * (REFERENCE_RADIUS / radius).powi(2 * n as i32 + 4) * energy
                }
                Source::External => nf * (radius / REFERENCE_RADIUS).powi(2 * n as i32 - 2) * energy,
            }
        })
        .collect())
}

/// Correlation per degree between two full expansions of equal length.
pub fn degree_correlation(first: &[f64], second: &[f64]) -> Result<Vec<f64>, HarmonicsError> {
    if first.len() != second.len() {
        return Err(HarmonicsError::LengthMismatch(first.len(), second.len()));
    }
    let nmax = (((first.len() + 1) as f64).sqrt() - 1.0).floor() as usize;
    Ok((1..=nmax)
        .map(|n| {
            let range = n * n - 1..(n + 1) * (n + 1) - 1;
            let (a, b) = (&first[range.clone()], &second[range]);
            let cross: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
            let norm_a: f64 = a.iter().map(|x| x * x).sum();
            let norm_b: f64 = b.iter().map(|y| y * y).sum();
            cross / (norm_a * norm_b).sqrt()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn coefficient_counts_follow_natural_order() {
        assert_eq!(n_coeffs(1), 3);
        assert_eq!(n_coeffs(13), 195);
        assert_eq!(Truncation::new(3).len(), 15);
        assert_eq!(Truncation::new(3).with_mmax(1).len(), 9);
        assert_eq!(Truncation::new(3).with_nmin(2).len(), 12);
        assert_eq!(nmax_from_len(195), Some(13));
        assert_eq!(nmax_from_len(3), Some(1));
        assert_eq!(nmax_from_len(7), None);
        assert_eq!(
            degree_order_pairs(1, 2),
            vec![(1, 0), (1, 1), (1, -1), (2, 0), (2, 1), (2, -1), (2, 2), (2, -2)]
        );
    }

    #[test]
    fn source_parses_case_insensitively() {
        assert_eq!("Internal".parse::<Source>().unwrap(), Source::Internal);
        assert_eq!("ext".parse::<Source>().unwrap(), Source::External);
        assert!("both".parse::<Source>().is_err());
    }

    #[test]
    fn axial_dipole_field_matches_closed_form() {
        let g10 = -29442.0;
        let theta: f64 = 50.0;
        let points = [Position::new(REFERENCE_RADIUS, theta, 12.0)];
        let field = synth_values(&[g10, 0.0, 0.0], &points, &Truncation::new(1), Source::Internal)
            .unwrap()[0];
        let (s, c) = theta.to_radians().sin_cos();
        assert_relative_eq!(field.radius, 2.0 * g10 * c, epsilon = 1e-9);
        assert_relative_eq!(field.theta, g10 * s, epsilon = 1e-9);
        assert_relative_eq!(field.phi, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn internal_field_decays_with_radius() {
        let coeffs = [-29442.0, -1501.0, 4797.1];
        let near = synth_values(&coeffs, &[Position::new(6371.2, 30.0, 40.0)], &Truncation::new(1), Source::Internal).unwrap()[0];
        let far = synth_values(&coeffs, &[Position::new(2.0 * 6371.2, 30.0, 40.0)], &Truncation::new(1), Source::Internal).unwrap()[0];
        assert_relative_eq!(far.radius, near.radius / 8.0, epsilon = 1e-9);
        assert_relative_eq!(far.phi, near.phi / 8.0, epsilon = 1e-9);
    }

    #[test]
    fn uniform_external_field_points_along_axis() {
        // q10 describes a uniform field of strength -q10 along the z axis.
        let q10 = 20.0;
        let theta: f64 = 70.0;
        let field = synth_values(
            &[q10, 0.0, 0.0],
            &[Position::new(8000.0, theta, -30.0)],
            &Truncation::new(1),
            Source::External,
        )
        .unwrap()[0];
        let (s, c) = theta.to_radians().sin_cos();
        assert_relative_eq!(field.radius, -q10 * c, epsilon = 1e-9);
        assert_relative_eq!(field.theta, q10 * s, epsilon = 1e-9);
    }

    #[test]
    fn pole_limit_is_continuous() {
        let coeffs: Vec<f64> = (0..n_coeffs(4)).map(|i| (i as f64 * 0.37).sin() * 100.0).collect();
        let truncation = Truncation::new(4);
        let at_pole = synth_values(&coeffs, &[Position::new(6371.2, 0.0, 25.0)], &truncation, Source::Internal).unwrap()[0];
        let near_pole = synth_values(&coeffs, &[Position::new(6371.2, 1e-8, 25.0)], &truncation, Source::Internal).unwrap()[0];
        assert!(at_pole.phi.is_finite());
        assert_relative_eq!(at_pole.phi, near_pole.phi, epsilon = 1e-4);
        assert_relative_eq!(at_pole.theta, near_pole.theta, epsilon = 1e-4);
    }

    #[test]
    fn design_matrices_reproduce_synthesis() {
        let coeffs: Vec<f64> = (0..n_coeffs(3)).map(|i| i as f64 - 4.0).collect();
        let points = [Position::new(6500.0, 12.0, 200.0), Position::new(7000.0, 120.0, -45.0)];
        let truncation = Truncation::new(3);
        let matrices = design_gauss(&points, &truncation, Source::Internal).unwrap();
        let field = synth_values(&coeffs, &points, &truncation, Source::Internal).unwrap();
        let vector = nalgebra::DVector::from_column_slice(&coeffs);
        let radius = &matrices.radius * &vector;
        let theta = &matrices.theta * &vector;
        let phi = &matrices.phi * &vector;
        for i in 0..points.len() {
            assert_relative_eq!(radius[i], field[i].radius, epsilon = 1e-9);
            assert_relative_eq!(theta[i], field[i].theta, epsilon = 1e-9);
            assert_relative_eq!(phi[i], field[i].phi, epsilon = 1e-9);
        }
    }

    #[test]
    fn too_few_coefficients_is_an_error() {
        let err = synth_values(&[1.0, 2.0], &[Position::new(6371.2, 10.0, 0.0)], &Truncation::new(1), Source::Internal)
            .unwrap_err();
        assert_eq!(err, HarmonicsError::TooFewCoefficients { needed: 3, found: 2 });
    }

    #[test]
    fn grid_evaluation_orders_colatitude_slowest() {
        let field = synth_values_grid(&[1.0, 0.0, 0.0], 6371.2, &[0.0, 90.0], &[0.0, 90.0, 180.0], &Truncation::new(1), Source::Internal).unwrap();
        assert_eq!(field.len(), 6);
        assert_relative_eq!(field[0].radius, 2.0, epsilon = 1e-12);
        assert_relative_eq!(field[4].radius, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn power_spectrum_of_dipole() {
        let coeffs = [3.0, 4.0, 0.0];
        let spectrum = power_spectrum(&coeffs, REFERENCE_RADIUS, 1, Source::Internal).unwrap();
        assert_relative_eq!(spectrum[0], 2.0 * 25.0);
        let spectrum = power_spectrum(&coeffs, REFERENCE_RADIUS / 2.0, 1, Source::Internal).unwrap();
        assert_relative_eq!(spectrum[0], 2.0 * 25.0 * 64.0);
    }

    #[test]
    fn degree_correlation_of_identical_models_is_one() {
        let coeffs: Vec<f64> = (0..n_coeffs(3)).map(|i| (i as f64).cos()).collect();
        let negated: Vec<f64> = coeffs.iter().map(|c| -c).collect();
        for value in degree_correlation(&coeffs, &coeffs).unwrap() {
            assert_relative_eq!(value, 1.0, epsilon = 1e-12);
        }
        for value in degree_correlation(&coeffs, &negated).unwrap() {
            assert_relative_eq!(value, -1.0, epsilon = 1e-12);
        }
    }
}
