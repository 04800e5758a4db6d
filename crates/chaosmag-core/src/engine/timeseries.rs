use crate::core::io::rc_index::{RcIndexError, RcIndexFile, RcRecord};
use crate::core::io::traits::CoefficientFile;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Column of the RC index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// Total RC.
    Rc,
    /// Magnetospheric (external) part.
    External,
    /// Induced (internal) part.
    Internal,
}

impl FromStr for Component {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rc" => Ok(Component::Rc),
            "rc_e" | "external" => Ok(Component::External),
            "rc_i" | "internal" => Ok(Component::Internal),
            other => Err(format!("unknown RC index component '{}'", other)),
        }
    }
}

/// Hourly RC index with linear interpolation in time.
#[derive(Debug, Clone, PartialEq)]
pub struct RcIndex {
    time: Vec<f64>,
    rc: Vec<f64>,
    rc_e: Vec<f64>,
    rc_i: Vec<f64>,
    flag: Vec<String>,
}

impl RcIndex {
    pub fn from_records(records: Vec<RcRecord>) -> Result<Self, RcIndexError> {
        if records.is_empty() {
            return Err(RcIndexError::Empty);
        }
        if let Some(i) = records.windows(2).position(|w| w[0].time >= w[1].time) {
            return Err(RcIndexError::Unsorted(i + 2));
        }
        let mut index = Self {
            time: Vec::with_capacity(records.len()),
            rc: Vec::with_capacity(records.len()),
            rc_e: Vec::with_capacity(records.len()),
            rc_i: Vec::with_capacity(records.len()),
            flag: Vec::with_capacity(records.len()),
        };
        for record in records {
            index.time.push(record.time);
            index.rc.push(record.rc);
            index.rc_e.push(record.rc_e);
            index.rc_i.push(record.rc_i);
            index.flag.push(record.flag);
        }
        Ok(index)
    }

    pub fn load(path: &Path) -> Result<Self, RcIndexError> {
        let records = RcIndexFile::read_from_path(path, &())?;
        let index = Self::from_records(records)?;
        info!(
            "Loaded RC index with {} samples from {:.2} to {:.2} (MJD2000).",
            index.len(),
            index.start(),
            index.end()
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn start(&self) -> f64 {
        self.time[0]
    }

    pub fn end(&self) -> f64 {
        self.time[self.time.len() - 1]
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn flags(&self) -> &[String] {
        &self.flag
    }

    pub fn values(&self, component: Component) -> &[f64] {
        match component {
            Component::Rc => &self.rc,
            Component::External => &self.rc_e,
            Component::Internal => &self.rc_i,
        }
    }

    /// Linear interpolation at `t`; the first and last samples are held
    /// outside the covered span.
    pub fn interpolate(&self, t: f64, component: Component) -> f64 {
        let values = self.values(component);
        if t.is_nan() {
            return f64::NAN;
        }
        if t <= self.start() {
            return values[0];
        }
        if t >= self.end() {
            return values[values.len() - 1];
        }
        let upper = self.time.partition_point(|&x| x <= t);
        let lower = upper - 1;
        let (t0, t1) = (self.time[lower], self.time[upper]);
        let weight = (t - t0) / (t1 - t0);
        values[lower] + weight * (values[upper] - values[lower])
    }

    pub fn interpolate_many(&self, times: &[f64], component: Component) -> Vec<f64> {
        times.iter().map(|&t| self.interpolate(t, component)).collect()
    }
}
