//! Conversions between modified Julian dates (epoch 2000), calendar dates and
//! decimal years.
//!
//! All model times in this crate are "MJD2000": days since 0h00 January 1,
//! 2000 UTC, with leap seconds ignored.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use thiserror::Error;

pub const DAYS_PER_YEAR: f64 = 365.25;

const NANOS_PER_DAY: f64 = 86_400e9;

#[derive(Debug, Error, PartialEq)]
pub enum TimeError {
    #[error("Invalid calendar date: {year:04}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },
    #[error("Time {0} is not representable as a timestamp")]
    OutOfRange(f64),
    #[error("Year {0} is outside the supported calendar range")]
    YearOutOfRange(i32),
}

fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("2000-01-01 is a valid date")
}

/// Modified Julian date (epoch 2000) of a calendar date and time of day.
///
/// Hours, minutes and seconds are not range checked, so `hour = 36` simply
/// rolls over into the next day.
#[allow(clippy::too_many_arguments)]
pub fn mjd2000(
    year: i32,
    month: u32,
    day: u32,
    hour: i64,
    minute: i64,
    second: i64,
    microsecond: i64,
) -> Result<f64, TimeError> {
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or(TimeError::InvalidDate { year, month, day })?;
    let days = (date - epoch().date()).num_days() as f64;
    let seconds = (hour * 3600 + minute * 60 + second) as f64 + microsecond as f64 * 1e-6;
    Ok(days + seconds / 86_400.0)
}

/// Modified Julian date of January 1 of `year`.
pub fn mjd2000_year_start(year: i32) -> Result<f64, TimeError> {
    let date = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(TimeError::YearOutOfRange(year))?;
    Ok((date - epoch().date()).num_days() as f64)
}

pub fn mjd2000_from_datetime(datetime: &NaiveDateTime) -> f64 {
    let delta = *datetime - epoch();
    match delta.num_nanoseconds() {
        Some(ns) => ns as f64 / NANOS_PER_DAY,
        None => delta.num_milliseconds() as f64 / 86_400e3,
    }
}

/// Converts a modified Julian date to a calendar datetime with nanosecond
/// resolution.
pub fn timestamp(time: f64) -> Result<NaiveDateTime, TimeError> {
    if !time.is_finite() {
        return Err(TimeError::OutOfRange(time));
    }
    let nanos = (time * NANOS_PER_DAY).round();
    if nanos.abs() >= i64::MAX as f64 {
        return Err(TimeError::OutOfRange(time));
    }
    epoch()
        .checked_add_signed(Duration::nanoseconds(nanos as i64))
        .ok_or(TimeError::OutOfRange(time))
}

pub fn is_leap_year(year: i32) -> bool {
    year.rem_euclid(4) == 0 && (year.rem_euclid(100) != 0 || year.rem_euclid(400) == 0)
}

fn days_in_year(year: i32) -> f64 {
    if is_leap_year(year) { 366.0 } else { 365.0 }
}

/// Converts decimal years to modified Julian date.
///
/// With `leap_year` the fraction of a year is measured in the 365 or 366 days
/// of that particular year, otherwise a constant 365.25 days per year is used.
/// Note that -0.1 belongs to year -1.
///
/// Years outside the calendar range of `chrono` (about ±262000) use the
/// constant year length regardless of `leap_year`.
pub fn dyear_to_mjd(time: f64, leap_year: bool) -> f64 {
    let year = time.floor();
    let start = (leap_year && year.abs() <= i32::MAX as f64)
        .then(|| mjd2000_year_start(year as i32).ok())
        .flatten();
    match start {
        Some(start) => start + (time - year) * days_in_year(year as i32),
        None => (time - 2000.0) * DAYS_PER_YEAR,
    }
}

/// Converts modified Julian date to decimal years, see [`dyear_to_mjd`].
pub fn mjd_to_dyear(time: f64, leap_year: bool) -> f64 {
    let year = (leap_year && time.is_finite())
        .then(|| Duration::try_days(time.floor() as i64))
        .flatten()
        .and_then(|days| epoch().date().checked_add_signed(days))
        .map(|date| date.year());
    match year.map(|y| (y, mjd2000_year_start(y))) {
        Some((year, Ok(start))) => year as f64 + (time - start) / days_in_year(year),
        _ => time / DAYS_PER_YEAR + 2000.0,
    }
}

/// Hours since midnight of the given datetime as a fraction.
pub fn fractional_hour(datetime: &NaiveDateTime) -> f64 {
    datetime.hour() as f64
        + datetime.minute() as f64 / 60.0
        + (datetime.second() as f64 + datetime.nanosecond() as f64 * 1e-9) / 3600.0
}

/// TeX-style unit string of the Gauss coefficients given the time derivative.
pub fn gauss_units(deriv: u32) -> String {
    match deriv {
        0 => "nT".to_string(),
        1 => "$\\mathrm{nT}/\\mathrm{yr}$".to_string(),
        d => format!("$\\mathrm{{nT}}/\\mathrm{{yr}}^{{{}}}$", d),
    }
}
