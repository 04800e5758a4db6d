//! Rotation of spherical-harmonic expansions between reference frames.
//!
//! A rotation maps the degree-`k` harmonics of one frame onto harmonics of the
//! same degree in another. The matrices here are computed numerically: each
//! frame harmonic is sampled on a Gauss-Legendre by equiangular GEO grid and
//! expanded again, with the longitude sums done by FFT.

use super::coordinates::frames::Frame;
use super::coordinates::transform::geo_to_base;
use super::harmonics::n_coeffs;
use super::math::legendre::{LegendreTable, legendre_poly};
use super::math::quadrature::gauss_legendre;
use nalgebra::DMatrix;
use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error, PartialEq)]
pub enum RotationError {
    #[error("Spectral data has {found} entries, expected {expected}")]
    ShapeMismatch { expected: usize, found: usize },
}

/// Quadrature grid with precomputed Legendre tables and FFT plan.
struct Grid {
    theta: Vec<f64>,
    weights: Vec<f64>,
    phi: Vec<f64>,
    tables: Vec<LegendreTable>,
    fft: Arc<dyn Fft<f64>>,
    nmax: usize,
}

impl Grid {
    fn new(n_theta: usize, n_phi: usize, nmax: usize) -> Self {
        let (nodes, weights) = gauss_legendre(n_theta);
        let theta: Vec<f64> = nodes.iter().map(|x| x.acos().to_degrees()).collect();
        let phi = (0..n_phi).map(|l| 360.0 * l as f64 / n_phi as f64).collect();
        let tables = theta.iter().map(|&t| legendre_poly(nmax, t)).collect();
        let fft = FftPlanner::<f64>::new().plan_fft_forward(n_phi);
        Self {
            theta,
            weights,
            phi,
            tables,
            fft,
            nmax,
        }
    }

    fn len(&self) -> usize {
        self.theta.len() * self.phi.len()
    }

    /// Grid points `(theta, phi)` in degrees, colatitude-major.
    fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.theta
            .iter()
            .flat_map(move |&theta| self.phi.iter().map(move |&phi| (theta, phi)))
    }

    /// Natural-order coefficients (degrees `1..=nmax`) of a function sampled
    /// at [`Grid::points`].
    fn analyse(&self, samples: &[f64]) -> Vec<f64> {
        let n_phi = self.phi.len();
        let mut coeffs = vec![0.0; n_coeffs(self.nmax)];
        let mut buffer = vec![Complex64::new(0.0, 0.0); n_phi];

        for (j, row) in samples.chunks(n_phi).enumerate() {
            for (slot, &value) in buffer.iter_mut().zip(row) {
                *slot = Complex64::new(value, 0.0);
            }
            self.fft.process(&mut buffer);

            let weight = self.weights[j] / n_phi as f64;
            let table = &self.tables[j];
            let mut index = 0;
            for n in 1..=self.nmax {
                let scale = (2 * n + 1) as f64 / 2.0 * weight;
                coeffs[index] += scale * buffer[0].re * table.p(n, 0);
                index += 1;
                for m in 1..=n {
                    let p = table.p(n, m);
                    coeffs[index] += scale * buffer[m].re * p;
                    coeffs[index + 1] -= scale * buffer[m].im * p;
                    index += 2;
                }
            }
        }
        coeffs
    }
}

/// Expands a scalar function of `(theta, phi)` (degrees) in Schmidt
/// semi-normalized harmonics up to degree `nmax`.
///
/// `kmax` is the highest degree present in the function and sizes the grid.
/// The degree-0 term is not returned.
pub fn sh_analysis<F>(func: F, nmax: usize, kmax: usize) -> Vec<f64>
where
    F: Fn(f64, f64) -> f64,
{
    let n_theta = nmax.max(kmax) + 1;
    let grid = Grid::new(n_theta, 2 * n_theta, nmax);
    let samples: Vec<f64> = grid.points().map(|(theta, phi)| func(theta, phi)).collect();
    grid.analyse(&samples)
}

/// Rotation matrices between a frame and GEO for fixed degrees.
///
/// Holds the quadrature grid, its Legendre tables and the FFT plan so that
/// many frames can be rotated without rebuilding them.
pub struct GaussRotation {
    grid: Grid,
    kmax: usize,
}

impl GaussRotation {
    pub fn new(nmax: usize, kmax: usize) -> Self {
        let n_theta = (nmax + kmax + 1) / 2 + 1;
        Self {
            grid: Grid::new(n_theta, 2 * n_theta, nmax),
            kmax,
        }
    }

    /// Matrix taking coefficients of degrees `1..=kmax` given in `frame` to
    /// coefficients of degrees `1..=nmax` in GEO.
    ///
    /// Columns follow the natural order of the frame harmonics, rows that of
    /// the GEO harmonics.
    pub fn matrix(&self, frame: &Frame) -> DMatrix<f64> {
        let (grid, kmax) = (&self.grid, self.kmax);
        let cols = n_coeffs(kmax);
        let mut samples = vec![vec![0.0; grid.len()]; cols];

        for (i, (theta, phi)) in grid.points().enumerate() {
            let (theta_ref, phi_ref) = geo_to_base(theta, phi, frame, false);
            let table = legendre_poly(kmax, theta_ref);
            let phi_ref = phi_ref.to_radians();

            let mut column = 0;
            for k in 1..=kmax {
                samples[column][i] = table.p(k, 0);
                column += 1;
                for l in 1..=k {
                    let (sin_lphi, cos_lphi) = (l as f64 * phi_ref).sin_cos();
                    let p = table.p(k, l);
                    samples[column][i] = p * cos_lphi;
                    samples[column + 1][i] = p * sin_lphi;
                    column += 2;
                }
            }
        }

        let mut matrix = DMatrix::zeros(n_coeffs(grid.nmax), cols);
        for (c, column) in samples.iter().enumerate() {
            matrix.column_mut(c).copy_from_slice(&grid.analyse(column));
        }
        matrix
    }

    /// [`GaussRotation::matrix`] for a batch of frames.
    #[instrument(skip_all, name = "rotate_gauss_many", fields(frames = frames.len()))]
    pub fn matrices(&self, frames: &[Frame]) -> Vec<DMatrix<f64>> {
        debug!("Rotating degree {} expansions to degree {}.", self.kmax, self.grid.nmax);

        #[cfg(not(feature = "parallel"))]
        let iterator = frames.iter();

        #[cfg(feature = "parallel")]
        let iterator = frames.par_iter();

        iterator.map(|frame| self.matrix(frame)).collect()
    }
}

/// Matrix taking coefficients of degrees `1..=kmax` given in `frame` to
/// coefficients of degrees `1..=nmax` in GEO.
pub fn rotate_gauss(nmax: usize, kmax: usize, frame: &Frame) -> DMatrix<f64> {
    GaussRotation::new(nmax, kmax).matrix(frame)
}

/// [`rotate_gauss`] for a batch of frames, sharing one grid.
pub fn rotate_gauss_many(nmax: usize, kmax: usize, frames: &[Frame]) -> Vec<DMatrix<f64>> {
    GaussRotation::new(nmax, kmax).matrices(frames)
}

/// Dominant Fourier components of every element of a time-varying matrix.
///
/// Entry `(k, row, col)` holds the `k`-th component of element `(row, col)`:
/// its frequency (1/day) and complex amplitude.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralMatrix {
    filter: usize,
    rows: usize,
    cols: usize,
    frequency: Vec<f64>,
    amplitude: Vec<Complex64>,
}

impl SpectralMatrix {
    pub fn new(
        filter: usize,
        rows: usize,
        cols: usize,
        frequency: Vec<f64>,
        amplitude: Vec<Complex64>,
    ) -> Result<Self, RotationError> {
        let expected = filter * rows * cols;
        for found in [frequency.len(), amplitude.len()] {
            if found != expected {
                return Err(RotationError::ShapeMismatch { expected, found });
            }
        }
        Ok(Self {
            filter,
            rows,
            cols,
            frequency,
            amplitude,
        })
    }

    pub fn zeros(filter: usize, rows: usize, cols: usize) -> Self {
        let size = filter * rows * cols;
        Self {
            filter,
            rows,
            cols,
            frequency: vec![0.0; size],
            amplitude: vec![Complex64::new(0.0, 0.0); size],
        }
    }

    #[inline]
    fn index(&self, k: usize, row: usize, col: usize) -> usize {
        (k * self.rows + row) * self.cols + col
    }

    pub fn filter(&self) -> usize {
        self.filter
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequency
    }

    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitude
    }

    pub fn get(&self, k: usize, row: usize, col: usize) -> (f64, Complex64) {
        let i = self.index(k, row, col);
        (self.frequency[i], self.amplitude[i])
    }

    pub fn set(&mut self, k: usize, row: usize, col: usize, frequency: f64, amplitude: Complex64) {
        let i = self.index(k, row, col);
        self.frequency[i] = frequency;
        self.amplitude[i] = amplitude;
    }

    /// The same components with every amplitude mapped through `f`.
    pub fn map_amplitudes<F>(&self, f: F) -> Self
    where
        F: Fn(usize, usize, usize, f64, Complex64) -> Complex64,
    {
        let mut mapped = self.clone();
        for k in 0..self.filter {
            for row in 0..self.rows {
                for col in 0..self.cols {
                    let (freq, amp) = self.get(k, row, col);
                    mapped.set(k, row, col, freq, f(k, row, col, freq, amp));
                }
            }
        }
        mapped
    }
}

/// Evaluates the matrix described by `spectrum` at `time` (days from the
/// start of the sampled window).
///
/// One-sided amplitudes are doubled for non-zero frequencies unless the
/// spectrum is already `scaled`.
pub fn synth_rotate_gauss(time: f64, spectrum: &SpectralMatrix, scaled: bool) -> DMatrix<f64> {
    let mut matrix = DMatrix::zeros(spectrum.rows, spectrum.cols);
    for k in 0..spectrum.filter {
        for row in 0..spectrum.rows {
            for col in 0..spectrum.cols {
                let (frequency, amplitude) = spectrum.get(k, row, col);
                let phase = Complex64::from_polar(1.0, 2.0 * PI * frequency * time);
                let factor = if !scaled && frequency > 0.0 { 2.0 } else { 1.0 };
                matrix[(row, col)] += factor * (amplitude * phase).re;
            }
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coordinates::dipole::{Dipole, dipole_to_vec};
    use crate::core::coordinates::frames::{basevectors_mag, basevectors_sm};
    use approx::assert_relative_eq;

    #[test]
    fn identity_frame_gives_identity_matrix() {
        let matrix = rotate_gauss(3, 3, &Frame::identity());
        assert_relative_eq!(matrix, DMatrix::identity(15, 15), epsilon = 1e-10);
    }

    #[test]
    fn mag_frame_aligns_dipole_with_axis() {
        let dipole = [-29442.0, -1501.0, 4797.1];
        let frame = basevectors_mag(&Dipole::Coefficients(dipole)).unwrap();
        let matrix = rotate_gauss(1, 1, &frame);
        let norm = (dipole[0] * dipole[0] + dipole[1] * dipole[1] + dipole[2] * dipole[2]).sqrt();

        // axial dipole in MAG maps back onto the GEO coefficients
        let geo = &matrix * nalgebra::DVector::from_vec(vec![-norm, 0.0, 0.0]);
        for (value, expected) in geo.iter().zip(dipole) {
            assert_relative_eq!(*value, expected, epsilon = 1e-6);
        }

        let axis = dipole_to_vec(&Dipole::Coefficients(dipole)).unwrap();
        assert_relative_eq!(matrix[(0, 0)], axis.z, epsilon = 1e-12);
        assert_relative_eq!(matrix[(1, 0)], axis.x, epsilon = 1e-12);
        assert_relative_eq!(matrix[(2, 0)], axis.y, epsilon = 1e-12);
    }

    #[test]
    fn rotation_preserves_degree_power() {
        let frame = basevectors_sm(4321.0, &Dipole::default()).unwrap();
        let matrix = rotate_gauss(2, 2, &frame);
        // Schmidt semi-normalized degree blocks are orthogonal
        let degree_two = matrix.view((3, 3), (5, 5)).into_owned();
        assert_relative_eq!(
            &degree_two * degree_two.transpose(),
            DMatrix::identity(5, 5),
            epsilon = 1e-10
        );
        assert_relative_eq!(matrix[(0, 3)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(matrix[(4, 1)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn sh_analysis_recovers_coefficients() {
        let coeffs: Vec<f64> = (0..n_coeffs(4)).map(|i| ((i * 7 % 11) as f64) - 5.0).collect();
        let func = |theta: f64, phi: f64| {
            let table = legendre_poly(4, theta);
            let phi = phi.to_radians();
            let mut value = 0.0;
            let mut index = 0;
            for n in 1..=4 {
                value += coeffs[index] * table.p(n, 0);
                index += 1;
                for m in 1..=n {
                    let (s, c) = (m as f64 * phi).sin_cos();
                    value += table.p(n, m) * (coeffs[index] * c + coeffs[index + 1] * s);
                    index += 2;
                }
            }
            value + 3.0
        };
        let recovered = sh_analysis(func, 4, 4);
        for (a, b) in recovered.iter().zip(&coeffs) {
            assert_relative_eq!(*a, *b, epsilon = 1e-10);
        }
    }

    #[test]
    fn batch_rotation_matches_single() {
        let dipole = Dipole::default();
        let frames: Vec<Frame> = [10.0, 20.0]
            .iter()
            .map(|&t| basevectors_sm(t, &dipole).unwrap())
            .collect();
        let many = rotate_gauss_many(2, 2, &frames);
        assert_eq!(many.len(), 2);
        assert_relative_eq!(many[1], rotate_gauss(2, 2, &frames[1]), epsilon = 1e-14);
    }

    #[test]
    fn reused_rotation_is_independent_of_call_order() {
        let dipole = Dipole::default();
        let rotation = GaussRotation::new(2, 1);
        let first = basevectors_sm(5.0, &dipole).unwrap();
        let second = basevectors_mag(&dipole).unwrap();

        let before = rotation.matrix(&first);
        assert_relative_eq!(rotation.matrix(&second), rotate_gauss(2, 1, &second), epsilon = 1e-14);
        assert_relative_eq!(rotation.matrix(&first), before, epsilon = 1e-14);
        assert_eq!(before.shape(), (8, 3));
        let identity = rotation.matrix(&Frame::identity());
        assert_relative_eq!(identity.view((0, 0), (3, 3)).into_owned(), DMatrix::identity(3, 3), epsilon = 1e-10);
    }

    #[test]
    fn synth_rotate_gauss_sums_components() {
        let mut spectrum = SpectralMatrix::zeros(2, 1, 1);
        spectrum.set(0, 0, 0, 0.0, Complex64::new(0.5, 0.0));
        spectrum.set(1, 0, 0, 0.25, Complex64::new(0.5, 0.0));

        assert_relative_eq!(synth_rotate_gauss(0.0, &spectrum, false)[(0, 0)], 1.5, epsilon = 1e-12);
        assert_relative_eq!(synth_rotate_gauss(1.0, &spectrum, false)[(0, 0)], 0.5, epsilon = 1e-12);
        assert_relative_eq!(synth_rotate_gauss(2.0, &spectrum, false)[(0, 0)], -0.5, epsilon = 1e-12);
        assert_relative_eq!(synth_rotate_gauss(2.0, &spectrum, true)[(0, 0)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn spectral_matrix_checks_shape() {
        assert_eq!(
            SpectralMatrix::new(2, 3, 3, vec![0.0; 18], vec![Complex64::new(0.0, 0.0); 17]),
            Err(RotationError::ShapeMismatch {
                expected: 18,
                found: 17
            })
        );
    }
}
