use super::error::ModelError;
use crate::core::coordinates::Position;
use crate::core::harmonics::{self, FieldVector, Source, Truncation, n_coeffs, nmax_from_len};
use crate::core::io::shc::{ShcData, ShcFile, ShcOptions};
use crate::core::io::traits::CoefficientFile;
use crate::core::math::bspline::{augment_breaks, colloc_matrix, pp_from_bspline};
use crate::core::math::pp::PiecewisePolynomial;
use crate::core::time::DAYS_PER_YEAR;
use nalgebra::DMatrix;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Half-width (days) of the validity interval given to single-snapshot
/// models.
const SNAPSHOT_HALF_WIDTH: f64 = 1.0;

/// How coefficients are continued outside the time span of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Extrapolate {
    /// Taylor polynomial of degree 1 at the nearest end point.
    #[default]
    Linear,
    Quadratic,
    Cubic,
    /// Continue the polynomial of the first or last piece.
    Spline,
    /// Hold the value at the nearest end point.
    Constant,
    /// NaN outside the time span.
    Off,
}

impl Extrapolate {
    fn taylor_degree(&self) -> Option<usize> {
        match self {
            Extrapolate::Constant => Some(0),
            Extrapolate::Linear => Some(1),
            Extrapolate::Quadratic => Some(2),
            Extrapolate::Cubic => Some(3),
            Extrapolate::Spline | Extrapolate::Off => None,
        }
    }
}

impl fmt::Display for Extrapolate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Extrapolate::Linear => "linear",
            Extrapolate::Quadratic => "quadratic",
            Extrapolate::Cubic => "cubic",
            Extrapolate::Spline => "spline",
            Extrapolate::Constant => "constant",
            Extrapolate::Off => "off",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Extrapolate {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(Extrapolate::Linear),
            "quadratic" => Ok(Extrapolate::Quadratic),
            "cubic" => Ok(Extrapolate::Cubic),
            "spline" => Ok(Extrapolate::Spline),
            "constant" => Ok(Extrapolate::Constant),
            "off" | "none" => Ok(Extrapolate::Off),
            other => Err(ModelError::InvalidParameter(format!(
                "unknown extrapolation method '{}'",
                other
            ))),
        }
    }
}

/// Time-dependent Gauss coefficients of one field source, stored as a
/// piecewise polynomial in time (MJD2000).
///
/// Coefficients always form a full expansion from degree 1; degrees below
/// `nmin` are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseModel {
    name: String,
    pp: PiecewisePolynomial,
    nmin: usize,
    nmax: usize,
    source: Source,
}

impl BaseModel {
    pub fn from_pp(name: impl Into<String>, pp: PiecewisePolynomial, source: Source) -> Result<Self, ModelError> {
        let nmax = nmax_from_len(pp.dim()).ok_or_else(|| {
            ModelError::InvalidParameter(format!(
                "{} coefficients do not form a full expansion",
                pp.dim()
            ))
        })?;
        Ok(Self {
            name: name.into(),
            pp,
            nmin: 1,
            nmax,
            source,
        })
    }

    /// Model from B-spline coefficients with one row per basis function and
    /// one column per Gauss coefficient.
    pub fn from_bspline(
        name: impl Into<String>,
        knots: &[f64],
        coeffs: &DMatrix<f64>,
        order: usize,
        source: Source,
    ) -> Result<Self, ModelError> {
        let pp = pp_from_bspline(coeffs, knots, order)?;
        Self::from_pp(name, pp, source)
    }

    /// Loads an internal model from an SHC file.
    ///
    /// A single snapshot gives a constant model. Otherwise a B-spline of the
    /// order in the file is fitted by least squares to the snapshots, with
    /// every `step`-th snapshot time as a break.
    #[instrument(skip_all, name = "base_model_from_shc")]
    pub fn from_shc(path: &Path, leap_year: bool, name: Option<&str>) -> Result<Self, ModelError> {
        let options = ShcOptions {
            leap_year,
            ..ShcOptions::default()
        };
        let data = ShcFile::read_from_path(path, &options)?;
        let name = name
            .map(str::to_string)
            .or_else(|| path.file_stem().map(|s| s.to_string_lossy().to_string()))
            .unwrap_or_default();
        info!(
            "Loaded '{}': degrees {}-{}, {} snapshots.",
            name, data.params.nmin, data.params.nmax, data.params.n
        );
        Self::from_shc_data(name, &data)
    }

    pub fn from_shc_data(name: String, data: &ShcData) -> Result<Self, ModelError> {
        let params = &data.params;
        if params.nmin == 0 || params.nmin > params.nmax {
            return Err(ModelError::InvalidParameter(format!(
                "invalid degree range {}-{}",
                params.nmin, params.nmax
            )));
        }
        let dim = n_coeffs(params.nmax);
        let offset = params.nmin * params.nmin - 1;
        let padded = data
            .coeffs
            .iter()
            .map(|row| {
                if row.len() != dim - offset {
                    return Err(ModelError::InvalidParameter(format!(
                        "snapshot has {} coefficients, expected {}",
                        row.len(),
                        dim - offset
                    )));
                }
                let mut full = vec![0.0; dim];
                full[offset..].copy_from_slice(row);
                Ok(full)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut model = match (data.time.as_slice(), padded.as_slice()) {
            ([time], [values]) => {
                let pp = PiecewisePolynomial::constant(
                    time - SNAPSHOT_HALF_WIDTH,
                    time + SNAPSHOT_HALF_WIDTH,
                    values,
                )?;
                Self::from_pp(name, pp, Source::Internal)?
            }
            _ => {
                let step = params.step.max(1);
                let mut breaks: Vec<f64> = data.time.iter().step_by(step).copied().collect();
                if let Some(&last) = data.time.last() {
                    if breaks.last() != Some(&last) {
                        breaks.push(last);
                    }
                }
                let knots = augment_breaks(&breaks, params.order);
                let collocation = colloc_matrix(&data.time, &knots, params.order, 0)?;
                let values = DMatrix::from_fn(padded.len(), dim, |i, j| padded[i][j]);
                debug!(
                    "Fitting {} B-splines of order {} to {} snapshots.",
                    collocation.ncols(),
                    params.order,
                    padded.len()
                );
                let coeffs = collocation
                    .svd(true, true)
                    .solve(&values, f64::EPSILON)
                    .map_err(|e| ModelError::LeastSquares(e.to_string()))?;
                Self::from_bspline(name, &knots, &coeffs, params.order, Source::Internal)?
            }
        };
        model.nmin = params.nmin.min(model.nmax);
        Ok(model)
    }

    /// Snapshots in the SHC layout, sampled `order - 1` times per piece so
    /// that [`BaseModel::from_shc`] recovers the spline.
    pub fn to_shc_data(&self, nmin: Option<usize>, nmax: Option<usize>) -> Result<ShcData, ModelError> {
        let nmin = nmin.unwrap_or(self.nmin);
        let nmax = self.check_nmax(nmax)?;
        let breaks = self.pp.breaks();
        let order = self.pp.order();

        let time: Vec<f64> = if order < 2 {
            breaks.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
        } else {
            let step = order - 1;
            let mut time: Vec<f64> = breaks
                .windows(2)
                .flat_map(|w| (0..step).map(move |i| w[0] + (w[1] - w[0]) * i as f64 / step as f64))
                .collect();
            time.push(self.pp.end());
            time
        };

        let coeffs = self.synth_coeffs(&time, Some(nmax), 0, Extrapolate::Spline)?;
        Ok(ShcData::new(time, &coeffs, nmin, nmax, order)?)
    }

    #[instrument(skip_all, name = "base_model_to_shc")]
    pub fn to_shc(
        &self,
        path: &Path,
        nmin: Option<usize>,
        nmax: Option<usize>,
        leap_year: bool,
        header: Option<&str>,
    ) -> Result<(), ModelError> {
        let data = self.to_shc_data(nmin, nmax)?;
        let options = ShcOptions {
            leap_year,
            header: header.map(str::to_string),
            ..ShcOptions::default()
        };
        ShcFile::write_to_path(&data, &options, path)?;
        info!("Saved '{}' to {}.", self.name, path.to_string_lossy());
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nmin(&self) -> usize {
        self.nmin
    }

    pub fn nmax(&self) -> usize {
        self.nmax
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn pp(&self) -> &PiecewisePolynomial {
        &self.pp
    }

    pub fn breaks(&self) -> &[f64] {
        self.pp.breaks()
    }

    pub fn order(&self) -> usize {
        self.pp.order()
    }

    fn check_nmax(&self, nmax: Option<usize>) -> Result<usize, ModelError> {
        match nmax {
            None => Ok(self.nmax),
            Some(0) => Err(ModelError::InvalidParameter("nmax must be at least 1".to_string())),
            Some(n) if n > self.nmax => Err(ModelError::DegreeTooHigh {
                requested: n,
                available: self.nmax,
            }),
            Some(n) => Ok(n),
        }
    }

    fn coeffs_at(&self, t: f64, dim: usize, deriv: usize, extrapolate: Extrapolate) -> Vec<f64> {
        let (start, end) = (self.pp.start(), self.pp.end());
        let mut coeffs = if t >= start && t <= end {
            self.pp.evaluate(t, deriv)
        } else {
            let edge = if t < start { start } else { end };
            match (extrapolate, extrapolate.taylor_degree()) {
                (Extrapolate::Off, _) => vec![f64::NAN; self.pp.dim()],
                (_, Some(degree)) => self.pp.taylor_at(edge, degree, t, deriv),
                (_, None) => self.pp.evaluate(t, deriv),
            }
        };
        coeffs.truncate(dim);
        let scale = DAYS_PER_YEAR.powi(deriv as i32);
        coeffs.iter_mut().for_each(|c| *c *= scale);
        coeffs
    }

    /// Gauss coefficients (or their `deriv`-th time derivative in nT/yr^deriv)
    /// up to degree `nmax` at each time.
    pub fn synth_coeffs(
        &self,
        time: &[f64],
        nmax: Option<usize>,
        deriv: usize,
        extrapolate: Extrapolate,
    ) -> Result<Vec<Vec<f64>>, ModelError> {
        let dim = n_coeffs(self.check_nmax(nmax)?);

        #[cfg(not(feature = "parallel"))]
        let iterator = time.iter();

        #[cfg(feature = "parallel")]
        let iterator = time.par_iter();

        Ok(iterator
            .map(|&t| self.coeffs_at(t, dim, deriv, extrapolate))
            .collect())
    }

    /// Field components at `points`; `time` holds either one time for all
    /// points or one time per point.
    pub fn synth_values(
        &self,
        time: &[f64],
        points: &[Position],
        nmax: Option<usize>,
        deriv: usize,
        extrapolate: Extrapolate,
    ) -> Result<Vec<FieldVector>, ModelError> {
        let nmax = self.check_nmax(nmax)?;
        let coeffs = self.synth_coeffs(time, Some(nmax), deriv, extrapolate)?;
        synth_broadcast(&coeffs, points, &Truncation::new(nmax), self.source)
    }

    /// Spatial power spectrum per degree at `time` and `radius` (km).
    pub fn power_spectrum(
        &self,
        time: f64,
        radius: f64,
        nmax: Option<usize>,
        deriv: usize,
    ) -> Result<Vec<f64>, ModelError> {
        let nmax = self.check_nmax(nmax)?;
        let coeffs = self.coeffs_at(time, n_coeffs(nmax), deriv, Extrapolate::default());
        Ok(harmonics::power_spectrum(&coeffs, radius, nmax, self.source)?)
    }
}

/// Synthesizes one coefficient vector per time at the matching point, or a
/// single coefficient vector at every point.
pub(crate) fn synth_broadcast(
    coeffs: &[Vec<f64>],
    points: &[Position],
    truncation: &Truncation,
    source: Source,
) -> Result<Vec<FieldVector>, ModelError> {
    match coeffs {
        [single] => Ok(harmonics::synth_values(single, points, truncation, source)?),
        _ if coeffs.len() == points.len() => {
            truncation.validate()?;
            if let Some(short) = coeffs.iter().find(|c| c.len() < truncation.len()) {
                return Err(harmonics::HarmonicsError::TooFewCoefficients {
                    needed: truncation.len(),
                    found: short.len(),
                }
                .into());
            }

            #[cfg(not(feature = "parallel"))]
            let iterator = coeffs.iter().zip(points.iter());

            #[cfg(feature = "parallel")]
            let iterator = coeffs.par_iter().zip(points.par_iter());

            Ok(iterator
                .map(|(c, position)| {
                    harmonics::synth_point(c, position, truncation, source, harmonics::REFERENCE_RADIUS)
                })
                .collect())
        }
        _ => Err(ModelError::InvalidParameter(format!(
            "{} times cannot be paired with {} points",
            coeffs.len(),
            points.len()
        ))),
    }
}
