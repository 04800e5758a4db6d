//! SHC files: time series of Gauss coefficients in plain text.
//!
//! ```text
//! # comment lines
//! nmin nmax N order step
//!            t_1 ... t_N          (decimal years)
//! n m        c_1 ... c_N          (one row per coefficient, m < 0 for h)
//! ```

use super::traits::CoefficientFile;
use crate::core::harmonics::degree_order_pairs;
use crate::core::time::{dyear_to_mjd, mjd_to_dyear};
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShcError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: invalid number '{value}'")]
    InvalidNumber { line: usize, value: String },
    #[error("Missing parameter line")]
    MissingParameters,
    #[error("Parameter line must contain at least nmin, nmax and N, found {0} values")]
    IncompleteParameters(usize),
    #[error("nmin ({nmin}) must be smaller than or equal to nmax ({nmax})")]
    InvalidDegreeRange { nmin: usize, nmax: usize },
    #[error("Expected {expected} values after the parameter line, found {found}")]
    SizeMismatch { expected: usize, found: usize },
    #[error("Parameter '{name}' must be a non-negative integer no larger than 1000000, found {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("Table of degrees {nmin}..={nmax} with {n} snapshots is too large")]
    TableTooLarge { nmin: usize, nmax: usize, n: usize },
    #[error("Coefficient rows must have at least {needed} entries, found {found}")]
    TooFewCoefficients { needed: usize, found: usize },
}

/// Values from the parameter line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShcParameters {
    pub nmin: usize,
    pub nmax: usize,
    pub n: usize,
    pub order: usize,
    pub step: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShcData {
    /// Snapshot times (MJD2000).
    pub time: Vec<f64>,
    /// One row per snapshot, coefficients in natural order from `nmin`.
    pub coeffs: Vec<Vec<f64>>,
    pub params: ShcParameters,
}

impl ShcData {
    /// Builds data for writing. Coefficient rows hold a full expansion from
    /// degree 1 and are truncated to `nmin..=nmax` here.
    pub fn new(
        time: Vec<f64>,
        coeffs: &[Vec<f64>],
        nmin: usize,
        nmax: usize,
        order: usize,
    ) -> Result<Self, ShcError> {
        if nmin == 0 || nmin > nmax {
            return Err(ShcError::InvalidDegreeRange { nmin, nmax });
        }
        let (start, end) = (nmin * nmin - 1, (nmax + 1) * (nmax + 1) - 1);
        let coeffs = coeffs
            .iter()
            .map(|row| {
                row.get(start..end)
                    .map(<[f64]>::to_vec)
                    .ok_or(ShcError::TooFewCoefficients {
                        needed: end,
                        found: row.len(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let params = ShcParameters {
            nmin,
            nmax,
            n: time.len(),
            order,
            step: order.saturating_sub(1),
        };
        Ok(Self {
            time,
            coeffs,
            params,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShcOptions {
    /// Whether decimal years account for leap years.
    pub leap_year: bool,
    /// Prefix of comment lines.
    pub comment: String,
    /// Header written before the parameter line; `None` writes a default
    /// header with the creation time.
    pub header: Option<String>,
}

impl Default for ShcOptions {
    fn default() -> Self {
        Self {
            leap_year: true,
            comment: "#".to_string(),
            header: None,
        }
    }
}

pub struct ShcFile;

/// Upper bound on the integers of the parameter line.
const MAX_PARAMETER: u32 = 1_000_000;

const PARAMETER_NAMES: [&str; 5] = ["nmin", "nmax", "N", "order", "step"];

fn parameter(numbers: &[f64], index: usize) -> Result<usize, ShcError> {
    let Some(&value) = numbers.get(index) else {
        return Ok(0);
    };
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > MAX_PARAMETER as f64 {
        return Err(ShcError::InvalidParameter {
            name: PARAMETER_NAMES[index],
            value,
        });
    }
    Ok(value as usize)
}

/// Number of values following the parameter line: the time row plus one
/// row of `n + 2` entries per coefficient.
fn expected_values(params: &ShcParameters) -> Option<usize> {
    let (nmin, nmax, n) = (params.nmin, params.nmax, params.n);
    let rows = (nmax + 1).checked_mul(nmax + 1)?.checked_sub(nmin.checked_mul(nmin)?)?;
    rows.checked_mul(n.checked_add(2)?)?.checked_add(n)
}

fn parse_numbers(line: &str, line_num: usize) -> Result<Vec<f64>, ShcError> {
    line.split_whitespace()
        .map(|token| {
            token.parse::<f64>().map_err(|_| ShcError::InvalidNumber {
                line: line_num + 1,
                value: token.to_string(),
            })
        })
        .collect()
}

impl CoefficientFile for ShcFile {
    type Data = ShcData;
    type Options = ShcOptions;
    type Error = ShcError;

    fn read_from(reader: &mut impl BufRead, options: &Self::Options) -> Result<Self::Data, Self::Error> {
        let mut params: Option<ShcParameters> = None;
        let mut values: Vec<f64> = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with(options.comment.as_str()) {
                continue;
            }
            let numbers = parse_numbers(trimmed, line_num)?;
            if params.is_none() {
                if numbers.len() < 3 {
                    return Err(ShcError::IncompleteParameters(numbers.len()));
                }
                let (nmin, nmax) = (parameter(&numbers, 0)?, parameter(&numbers, 1)?);
                if nmin > nmax {
                    return Err(ShcError::InvalidDegreeRange { nmin, nmax });
                }
                params = Some(ShcParameters {
                    nmin,
                    nmax,
                    n: parameter(&numbers, 2)?,
                    order: parameter(&numbers, 3)?,
                    step: parameter(&numbers, 4)?,
                });
            } else {
                values.extend(numbers);
            }
        }

        let params = params.ok_or(ShcError::MissingParameters)?;
        let n = params.n;
        let expected = expected_values(&params).ok_or(ShcError::TableTooLarge {
            nmin: params.nmin,
            nmax: params.nmax,
            n,
        })?;
        if values.len() != expected {
            return Err(ShcError::SizeMismatch {
                expected,
                found: values.len(),
            });
        }
        let rows = (values.len() - n) / (n + 2);

        let time = values[..n]
            .iter()
            .map(|&t| dyear_to_mjd(t, options.leap_year))
            .collect();

        let mut coeffs = vec![Vec::with_capacity(rows); n];
        for row in values[n..].chunks(n + 2) {
            for (snapshot, value) in coeffs.iter_mut().zip(&row[2..]) {
                snapshot.push(*value);
            }
        }

        Ok(ShcData {
            time,
            coeffs,
            params,
        })
    }

    fn write_to(data: &Self::Data, options: &Self::Options, writer: &mut impl Write) -> Result<(), Self::Error> {
        let params = &data.params;
        match &options.header {
            Some(header) if header.trim().is_empty() => {}
            Some(header) => writeln!(writer, "{}", header.trim_end())?,
            None => {
                writeln!(writer, "# Created on {} UTC.", chrono::Utc::now().naive_utc())?;
                writeln!(
                    writer,
                    "# Leap years are accounted for in decimal years format ({}).",
                    options.leap_year
                )?;
            }
        }
        writeln!(
            writer,
            "{} {} {} {} {}",
            params.nmin,
            params.nmax,
            data.time.len(),
            params.order,
            params.order.saturating_sub(1)
        )?;

        write!(writer, "{:4} {:4}", "", "")?;
        for &t in &data.time {
            write!(writer, " {:16.8}", mjd_to_dyear(t, options.leap_year))?;
        }
        writeln!(writer)?;

        for (row, (n, m)) in degree_order_pairs(params.nmin, params.nmax).into_iter().enumerate() {
            write!(writer, "{:4} {:4}", n, m)?;
            for snapshot in &data.coeffs {
                let value = snapshot.get(row).copied().ok_or(ShcError::TooFewCoefficients {
                    needed: row + 1,
                    found: snapshot.len(),
                })?;
                write!(writer, " {:16.8}", value)?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}
