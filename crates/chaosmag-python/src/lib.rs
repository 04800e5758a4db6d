use chaosmag::core::coordinates::Position;
use chaosmag::core::coordinates::sun;
use chaosmag::core::harmonics::{self, Source, Truncation, nmax_from_len};
use chaosmag::core::io::{self, shc::ShcError};
use chaosmag::core::time;
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use std::path::PathBuf;

fn value_error(e: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Modified Julian date (days since 2000-01-01 00:00 UTC).
#[pyfunction]
#[pyo3(signature = (year, month, day, hour=0, minute=0, second=0, microsecond=0))]
fn mjd2000(
    year: i32,
    month: u32,
    day: u32,
    hour: i64,
    minute: i64,
    second: i64,
    microsecond: i64,
) -> PyResult<f64> {
    time::mjd2000(year, month, day, hour, minute, second, microsecond).map_err(value_error)
}

#[pyfunction]
#[pyo3(signature = (time, leap_year=true))]
fn dyear_to_mjd(time: f64, leap_year: bool) -> f64 {
    time::dyear_to_mjd(time, leap_year)
}

#[pyfunction]
#[pyo3(signature = (time, leap_year=true))]
fn mjd_to_dyear(time: f64, leap_year: bool) -> f64 {
    time::mjd_to_dyear(time, leap_year)
}

/// Field components `(B_radius, B_theta, B_phi)` of the expansion at the
/// given points (km, degrees).
#[pyfunction]
#[pyo3(signature = (coeffs, radius, theta, phi, nmax=None, source="internal"))]
fn synth_values(
    coeffs: Vec<f64>,
    radius: Vec<f64>,
    theta: Vec<f64>,
    phi: Vec<f64>,
    nmax: Option<usize>,
    source: &str,
) -> PyResult<(Vec<f64>, Vec<f64>, Vec<f64>)> {
    if radius.len() != theta.len() || theta.len() != phi.len() {
        return Err(value_error("radius, theta and phi must have the same length"));
    }
    let source: Source = source.parse().map_err(value_error)?;
    let nmax = match nmax {
        Some(n) => n,
        None => nmax_from_len(coeffs.len())
            .ok_or_else(|| value_error(format!("{} coefficients do not form a full expansion", coeffs.len())))?,
    };
    let points: Vec<Position> = radius
        .iter()
        .zip(&theta)
        .zip(&phi)
        .map(|((&r, &t), &p)| Position::new(r, t, p))
        .collect();

    let values = harmonics::synth_values(&coeffs, &points, &Truncation::new(nmax), source).map_err(value_error)?;
    Ok((
        values.iter().map(|b| b.radius).collect(),
        values.iter().map(|b| b.theta).collect(),
        values.iter().map(|b| b.phi).collect(),
    ))
}

/// Reads an SHC file and returns `(time, coeffs, (nmin, nmax, N, order, step))`.
#[pyfunction]
#[pyo3(signature = (filepath, leap_year=true, comment="#"))]
#[allow(clippy::type_complexity)]
fn load_shcfile(
    filepath: PathBuf,
    leap_year: bool,
    comment: &str,
) -> PyResult<(Vec<f64>, Vec<Vec<f64>>, (usize, usize, usize, usize, usize))> {
    let data = io::load_shcfile(&filepath, leap_year, comment).map_err(|e| match e {
        ShcError::Io(source) => PyIOError::new_err(format!("{}: {}", filepath.display(), source)),
        other => value_error(other),
    })?;
    let p = data.params;
    Ok((data.time, data.coeffs, (p.nmin, p.nmax, p.n, p.order, p.step)))
}

/// Colatitude and longitude (degrees) of the sun at `time` (MJD2000).
#[pyfunction]
fn sun_position(time: f64) -> PyResult<(f64, f64)> {
    sun::sun_position(time).map_err(value_error)
}

#[pymodule]
fn chaosmagpy(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_function(wrap_pyfunction!(mjd2000, m)?)?;
    m.add_function(wrap_pyfunction!(dyear_to_mjd, m)?)?;
    m.add_function(wrap_pyfunction!(mjd_to_dyear, m)?)?;
    m.add_function(wrap_pyfunction!(synth_values, m)?)?;
    m.add_function(wrap_pyfunction!(load_shcfile, m)?)?;
    m.add_function(wrap_pyfunction!(sun_position, m)?)?;
    Ok(())
}
