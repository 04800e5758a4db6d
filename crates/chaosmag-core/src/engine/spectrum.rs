use super::error::ModelError;
use super::progress::{Progress, ProgressReporter};
use crate::core::coordinates::frames::basevectors;
use crate::core::coordinates::{Dipole, Reference};
use crate::core::harmonics::n_coeffs;
use crate::core::induction::q_response;
use crate::core::io::conductivity::ConductivityModel;
use crate::core::rotation::{GaussRotation, RotationError, SpectralMatrix, synth_rotate_gauss};
use nalgebra::DMatrix;
use rustfft::FftPlanner;
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;
use thiserror::Error;
use tracing::{info, instrument};

/// Sampling interval (hours).
pub const DEFAULT_STEP: f64 = 1.0;
/// Hourly samples over eight years.
pub const DEFAULT_SAMPLES: usize = 70_128;

const SECONDS_PER_DAY: f64 = 86_400.0;
const FRAMES_PER_TASK: usize = 1024;

#[derive(Debug, Error)]
pub enum SpectrumError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON error for '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("Malformed spectrum: {0}")]
    Shape(#[from] RotationError),
    #[error("Invalid spectrum options: {0}")]
    InvalidOptions(String),
}

/// Q-response per degree (outer) and frequency in Hz (inner) for degrees
/// `1..=nmax`.
pub type QFunction<'a> = dyn Fn(&[f64], usize) -> Result<Vec<Vec<Complex64>>, ModelError> + 'a;

/// Q-response function of a layered conductivity model.
pub fn conductivity_qfunc(
    model: &ConductivityModel,
) -> impl Fn(&[f64], usize) -> Result<Vec<Vec<Complex64>>, ModelError> + '_ {
    move |frequency, nmax| Ok(q_response(frequency, nmax, model)?)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumOptions {
    pub reference: Reference,
    /// Sampling interval (hours).
    pub step: f64,
    /// Number of samples.
    pub samples: usize,
    /// Number of components kept per matrix element; all `samples / 2 + 1`
    /// when `None`.
    pub filter: Option<usize>,
    /// First sample (MJD2000).
    pub start_date: f64,
    /// Store amplitudes of non-zero frequencies doubled.
    pub scaled: bool,
    pub dipole: Dipole,
}

impl Default for SpectrumOptions {
    fn default() -> Self {
        Self {
            reference: Reference::Gsm,
            step: DEFAULT_STEP,
            samples: DEFAULT_SAMPLES,
            filter: None,
            start_date: 0.0,
            scaled: false,
            dipole: Dipole::default(),
        }
    }
}

impl SpectrumOptions {
    fn validate(&self) -> Result<(), SpectrumError> {
        if self.samples < 2 {
            return Err(SpectrumError::InvalidOptions(format!(
                "at least 2 samples are required, got {}",
                self.samples
            )));
        }
        if !(self.step > 0.0 && self.step.is_finite()) {
            return Err(SpectrumError::InvalidOptions(format!(
                "step must be positive, got {}",
                self.step
            )));
        }
        if self.filter == Some(0) {
            return Err(SpectrumError::InvalidOptions("filter must be at least 1".to_string()));
        }
        Ok(())
    }

    fn one_sided(&self) -> usize {
        self.samples / 2 + 1
    }

    fn filter(&self) -> usize {
        self.filter.map_or(self.one_sided(), |f| f.min(self.one_sided()))
    }
}

/// Fourier representation of the matrix rotating SH coefficients from a
/// time-dependent frame (GSM or SM) to GEO, without (`plain`) and with
/// (`induced`) weighting by the Q-response.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationSpectrum {
    pub reference: Reference,
    pub nmax: usize,
    pub kmax: usize,
    pub step: f64,
    pub samples: usize,
    pub scaled: bool,
    pub dipole: Dipole,
    pub start_date: f64,
    pub plain: SpectralMatrix,
    pub induced: SpectralMatrix,
}

impl RotationSpectrum {
    /// Rotation matrix at `time` (MJD2000), the induced variant if `induced`.
    pub fn matrix(&self, time: f64, induced: bool) -> DMatrix<f64> {
        let spectrum = if induced { &self.induced } else { &self.plain };
        synth_rotate_gauss(time - self.start_date, spectrum, self.scaled)
    }

    pub fn save(&self, path: &Path) -> Result<(), SpectrumError> {
        let content = serde_json::to_string(&SpectrumFile::from(self)).map_err(|e| SpectrumError::Json {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        std::fs::write(path, content).map_err(|e| SpectrumError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        info!("Saved {} rotation spectrum to {}.", self.reference, path.to_string_lossy());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SpectrumError> {
        let content = std::fs::read_to_string(path).map_err(|e| SpectrumError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let file: SpectrumFile = serde_json::from_str(&content).map_err(|e| SpectrumError::Json {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let spectrum = RotationSpectrum::try_from(file)?;
        info!(
            "Loaded {} rotation spectrum with {} components per element.",
            spectrum.reference,
            spectrum.plain.filter()
        );
        Ok(spectrum)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SpectralRecord {
    filter: usize,
    rows: usize,
    cols: usize,
    frequency: Vec<f64>,
    real: Vec<f64>,
    imag: Vec<f64>,
}

impl From<&SpectralMatrix> for SpectralRecord {
    fn from(matrix: &SpectralMatrix) -> Self {
        Self {
            filter: matrix.filter(),
            rows: matrix.rows(),
            cols: matrix.cols(),
            frequency: matrix.frequencies().to_vec(),
            real: matrix.amplitudes().iter().map(|c| c.re).collect(),
            imag: matrix.amplitudes().iter().map(|c| c.im).collect(),
        }
    }
}

impl TryFrom<SpectralRecord> for SpectralMatrix {
    type Error = RotationError;

    fn try_from(record: SpectralRecord) -> Result<Self, Self::Error> {
        if record.real.len() != record.imag.len() {
            return Err(RotationError::ShapeMismatch {
                expected: record.real.len(),
                found: record.imag.len(),
            });
        }
        let amplitude = record
            .real
            .iter()
            .zip(&record.imag)
            .map(|(&re, &im)| Complex64::new(re, im))
            .collect();
        SpectralMatrix::new(record.filter, record.rows, record.cols, record.frequency, amplitude)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SpectrumFile {
    reference: Reference,
    nmax: usize,
    kmax: usize,
    step: f64,
    samples: usize,
    scaled: bool,
    dipole: Dipole,
    start_date: f64,
    spectrum: SpectralRecord,
    spectrum_ind: SpectralRecord,
}

impl From<&RotationSpectrum> for SpectrumFile {
    fn from(spectrum: &RotationSpectrum) -> Self {
        Self {
            reference: spectrum.reference,
            nmax: spectrum.nmax,
            kmax: spectrum.kmax,
            step: spectrum.step,
            samples: spectrum.samples,
            scaled: spectrum.scaled,
            dipole: spectrum.dipole,
            start_date: spectrum.start_date,
            spectrum: SpectralRecord::from(&spectrum.plain),
            spectrum_ind: SpectralRecord::from(&spectrum.induced),
        }
    }
}

impl TryFrom<SpectrumFile> for RotationSpectrum {
    type Error = SpectrumError;

    fn try_from(file: SpectrumFile) -> Result<Self, Self::Error> {
        let plain = SpectralMatrix::try_from(file.spectrum)?;
        let induced = SpectralMatrix::try_from(file.spectrum_ind)?;
        let (rows, cols) = (n_coeffs(file.nmax), n_coeffs(file.kmax));
        for matrix in [&plain, &induced] {
            if matrix.rows() != rows || matrix.cols() != cols {
                return Err(SpectrumError::Shape(RotationError::ShapeMismatch {
                    expected: rows * cols,
                    found: matrix.rows() * matrix.cols(),
                }));
            }
        }
        Ok(Self {
            reference: file.reference,
            nmax: file.nmax,
            kmax: file.kmax,
            step: file.step,
            samples: file.samples,
            scaled: file.scaled,
            dipole: file.dipole,
            start_date: file.start_date,
            plain,
            induced,
        })
    }
}

/// Stores the `filter` largest components of one element, by magnitude.
fn keep_dominant(
    target: &mut SpectralMatrix,
    row: usize,
    col: usize,
    amplitudes: &[Complex64],
    frequency_hz: &[f64],
    scaled: bool,
) {
    let mut order: Vec<usize> = (0..amplitudes.len()).collect();
    order.sort_by(|&a, &b| {
        amplitudes[b]
            .norm()
            .partial_cmp(&amplitudes[a].norm())
            .unwrap_or(Ordering::Equal)
    });
    for (k, &i) in order.iter().take(target.filter()).enumerate() {
        let frequency = frequency_hz[i] * SECONDS_PER_DAY;
        let amplitude = if scaled && frequency > 0.0 {
            amplitudes[i] * 2.0
        } else {
            amplitudes[i]
        };
        target.set(k, row, col, frequency, amplitude);
    }
}

/// Computes the rotation spectrum of a time-dependent frame.
///
/// The rotation matrix is sampled every `step` hours, each element is Fourier
/// transformed over time (one-sided, normalized by the number of samples)
/// and weighted by `qfunc` for the induced spectrum. Only the dominant
/// components are kept.
#[instrument(skip_all, name = "rotate_gauss_fft", fields(reference = %options.reference, samples = options.samples))]
pub fn rotate_gauss_fft(
    nmax: usize,
    kmax: usize,
    options: &SpectrumOptions,
    qfunc: &QFunction,
    reporter: &ProgressReporter,
) -> Result<RotationSpectrum, ModelError> {
    options.validate()?;
    let n = options.samples;
    let filter = options.filter();
    let (rows, cols) = (n_coeffs(nmax), n_coeffs(kmax));

    // === Phase 1: Sample rotation matrices ===
    reporter.report(Progress::PhaseStart {
        name: "Sampling rotation matrices",
    });
    let frames = (0..n)
        .map(|i| {
            let time = options.start_date + i as f64 * options.step / 24.0;
            basevectors(options.reference, time, &options.dipole)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let rotation = GaussRotation::new(nmax, kmax);
    let mut series = vec![vec![Complex64::default(); n]; rows * cols];
    reporter.report(Progress::TaskStart {
        total_steps: frames.len().div_ceil(FRAMES_PER_TASK) as u64,
    });
    for (chunk_index, chunk) in frames.chunks(FRAMES_PER_TASK).enumerate() {
        for (offset, matrix) in rotation.matrices(chunk).iter().enumerate() {
            let i = chunk_index * FRAMES_PER_TASK + offset;
            for row in 0..rows {
                for col in 0..cols {
                    series[row * cols + col][i] = Complex64::new(matrix[(row, col)], 0.0);
                }
            }
        }
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Fourier analysis of each element ===
    reporter.report(Progress::PhaseStart {
        name: "Fourier analysis",
    });
    let half = options.one_sided();
    let frequency_hz: Vec<f64> = (0..half)
        .map(|k| k as f64 / (n as f64 * options.step * 3600.0))
        .collect();
    let q = qfunc(&frequency_hz, nmax)?;
    if q.len() < nmax || q.iter().any(|degree| degree.len() != half) {
        return Err(ModelError::InvalidParameter(format!(
            "Q-response must have {} degrees of {} frequencies",
            nmax, half
        )));
    }

    let fft = FftPlanner::<f64>::new().plan_fft_forward(n);
    let mut plain = SpectralMatrix::zeros(filter, rows, cols);
    let mut induced = SpectralMatrix::zeros(filter, rows, cols);

    reporter.report(Progress::TaskStart {
        total_steps: series.len() as u64,
    });
    for (element, values) in series.iter_mut().enumerate() {
        fft.process(values);
        let (row, col) = (element / cols, element % cols);
        let degree_index = ((row + 1) as f64).sqrt() as usize - 1;

        let one_sided: Vec<Complex64> = values[..half].iter().map(|v| *v / n as f64).collect();
        let weighted: Vec<Complex64> = one_sided
            .iter()
            .zip(&q[degree_index])
            .map(|(a, b)| *a * *b)
            .collect();

        keep_dominant(&mut plain, row, col, &one_sided, &frequency_hz, options.scaled);
        keep_dominant(&mut induced, row, col, &weighted, &frequency_hz, options.scaled);
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    info!(
        "Computed {} spectrum keeping {} of {} components per element.",
        options.reference, filter, half
    );

    Ok(RotationSpectrum {
        reference: options.reference,
        nmax,
        kmax,
        step: options.step,
        samples: n,
        scaled: options.scaled,
        dipole: options.dipole,
        start_date: options.start_date,
        plain,
        induced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coordinates::frames::{basevectors_mag, basevectors_sm};
    use crate::core::rotation::rotate_gauss;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    fn constant_q(value: f64) -> impl Fn(&[f64], usize) -> Result<Vec<Vec<Complex64>>, ModelError> {
        move |frequency, nmax| Ok(vec![vec![Complex64::new(value, 0.0); frequency.len()]; nmax])
    }

    #[test]
    fn static_frame_has_only_a_constant_component() {
        let options = SpectrumOptions {
            reference: Reference::Mag,
            samples: 9,
            ..SpectrumOptions::default()
        };
        let spectrum = rotate_gauss_fft(1, 1, &options, &constant_q(1.0), &ProgressReporter::new()).unwrap();
        let expected = rotate_gauss(1, 1, &basevectors_mag(&options.dipole).unwrap());

        assert_eq!(spectrum.plain.filter(), 5);
        let (frequency, _) = spectrum.plain.get(0, 0, 0);
        assert_eq!(frequency, 0.0);
        assert_relative_eq!(spectrum.matrix(123.4, false), expected, epsilon = 1e-12);
        assert_relative_eq!(spectrum.matrix(123.4, true), expected, epsilon = 1e-12);
    }

    #[test]
    fn full_spectrum_reconstructs_samples() {
        let options = SpectrumOptions {
            reference: Reference::Sm,
            samples: 25,
            start_date: 100.0,
            ..SpectrumOptions::default()
        };
        let spectrum = rotate_gauss_fft(1, 1, &options, &constant_q(0.0), &ProgressReporter::new()).unwrap();
        let time = 100.0 + 5.0 / 24.0;
        let expected = rotate_gauss(1, 1, &basevectors_sm(time, &options.dipole).unwrap());

        assert_relative_eq!(spectrum.matrix(time, false), expected, epsilon = 1e-10);
        assert_relative_eq!(spectrum.matrix(time, true), DMatrix::zeros(3, 3), epsilon = 1e-12);
    }

    #[test]
    fn scaled_spectrum_gives_same_matrix() {
        let base = SpectrumOptions {
            reference: Reference::Gsm,
            samples: 15,
            filter: Some(4),
            ..SpectrumOptions::default()
        };
        let scaled = SpectrumOptions {
            scaled: true,
            ..base.clone()
        };
        let reporter = ProgressReporter::new();
        let a = rotate_gauss_fft(1, 1, &base, &constant_q(1.0), &reporter).unwrap();
        let b = rotate_gauss_fft(1, 1, &scaled, &constant_q(1.0), &reporter).unwrap();
        assert_eq!(a.plain.filter(), 4);
        assert_relative_eq!(a.matrix(0.3, false), b.matrix(0.3, false), epsilon = 1e-12);
    }

    #[test]
    fn components_are_sorted_by_magnitude() {
        let options = SpectrumOptions {
            reference: Reference::Gsm,
            samples: 13,
            ..SpectrumOptions::default()
        };
        let spectrum = rotate_gauss_fft(1, 1, &options, &constant_q(1.0), &ProgressReporter::new()).unwrap();
        for row in 0..3 {
            for col in 0..3 {
                let magnitudes: Vec<f64> = (0..spectrum.plain.filter())
                    .map(|k| spectrum.plain.get(k, row, col).1.norm())
                    .collect();
                assert!(magnitudes.windows(2).all(|w| w[0] >= w[1]));
            }
        }
    }

    #[test]
    fn save_then_load_preserves_spectrum() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spectrum.json");
        let options = SpectrumOptions {
            reference: Reference::Sm,
            samples: 7,
            ..SpectrumOptions::default()
        };
        let spectrum = rotate_gauss_fft(1, 1, &options, &constant_q(0.5), &ProgressReporter::new()).unwrap();
        spectrum.save(&path).unwrap();
        let loaded = RotationSpectrum::load(&path).unwrap();

        assert_eq!(loaded.reference, Reference::Sm);
        assert_eq!(loaded.samples, 7);
        assert_eq!(loaded.plain.filter(), spectrum.plain.filter());
        assert_relative_eq!(loaded.matrix(1.0, true), spectrum.matrix(1.0, true), epsilon = 1e-12);
    }

    #[test]
    fn rejects_degenerate_options() {
        let options = SpectrumOptions {
            samples: 1,
            ..SpectrumOptions::default()
        };
        let result = rotate_gauss_fft(1, 1, &options, &constant_q(1.0), &ProgressReporter::new());
        assert!(matches!(result, Err(ModelError::Spectrum { .. })));
    }
}
