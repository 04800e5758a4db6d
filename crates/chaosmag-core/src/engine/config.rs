use super::chaos::ModelSource;
use super::model::Extrapolate;
use super::spectrum::{DEFAULT_SAMPLES, DEFAULT_STEP};
use crate::core::coordinates::{Position, Reference};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Query points and field sources of a model evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRequest {
    /// One time (MJD2000) for all points or one per point.
    pub time: Vec<f64>,
    pub points: Vec<Position>,
    /// Sources to evaluate; every available source when empty.
    pub sources: Vec<ModelSource>,
    /// Truncation of the time-dependent internal field.
    pub nmax: Option<usize>,
    pub extrapolate: Extrapolate,
}

#[derive(Default)]
pub struct EvaluationRequestBuilder {
    time: Option<Vec<f64>>,
    points: Option<Vec<Position>>,
    sources: Vec<ModelSource>,
    nmax: Option<usize>,
    extrapolate: Option<Extrapolate>,
}

impl EvaluationRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time(mut self, time: Vec<f64>) -> Self {
        self.time = Some(time);
        self
    }
    pub fn points(mut self, points: Vec<Position>) -> Self {
        self.points = Some(points);
        self
    }
    pub fn sources(mut self, sources: Vec<ModelSource>) -> Self {
        self.sources = sources;
        self
    }
    pub fn nmax(mut self, nmax: usize) -> Self {
        self.nmax = Some(nmax);
        self
    }
    pub fn extrapolate(mut self, extrapolate: Extrapolate) -> Self {
        self.extrapolate = Some(extrapolate);
        self
    }

    pub fn build(self) -> Result<EvaluationRequest, ConfigError> {
        let time = self.time.ok_or(ConfigError::MissingParameter("time"))?;
        let points = self.points.ok_or(ConfigError::MissingParameter("points"))?;
        if time.len() != 1 && time.len() != points.len() {
            return Err(ConfigError::InvalidParameter {
                name: "time",
                reason: format!("{} times for {} points", time.len(), points.len()),
            });
        }
        Ok(EvaluationRequest {
            time,
            points,
            sources: self.sources,
            nmax: self.nmax,
            extrapolate: self.extrapolate.unwrap_or_default(),
        })
    }
}

/// Frame, resolution and output of a rotation spectrum computation.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumRequest {
    pub reference: Reference,
    pub nmax: usize,
    pub kmax: usize,
    /// Sampling interval (hours).
    pub step: f64,
    pub samples: usize,
    pub filter: Option<usize>,
    pub start_date: f64,
    pub scaled: bool,
    /// JSON file the spectrum is written to.
    pub output: Option<PathBuf>,
}

#[derive(Default)]
pub struct SpectrumRequestBuilder {
    reference: Option<Reference>,
    nmax: Option<usize>,
    kmax: Option<usize>,
    step: Option<f64>,
    samples: Option<usize>,
    filter: Option<usize>,
    start_date: Option<f64>,
    scaled: bool,
    output: Option<PathBuf>,
}

impl SpectrumRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }
    pub fn nmax(mut self, nmax: usize) -> Self {
        self.nmax = Some(nmax);
        self
    }
    pub fn kmax(mut self, kmax: usize) -> Self {
        self.kmax = Some(kmax);
        self
    }
    pub fn step(mut self, hours: f64) -> Self {
        self.step = Some(hours);
        self
    }
    pub fn samples(mut self, samples: usize) -> Self {
        self.samples = Some(samples);
        self
    }
    pub fn filter(mut self, filter: usize) -> Self {
        self.filter = Some(filter);
        self
    }
    pub fn start_date(mut self, mjd: f64) -> Self {
        self.start_date = Some(mjd);
        self
    }
    pub fn scaled(mut self, scaled: bool) -> Self {
        self.scaled = scaled;
        self
    }
    pub fn output(mut self, path: PathBuf) -> Self {
        self.output = Some(path);
        self
    }

    pub fn build(self) -> Result<SpectrumRequest, ConfigError> {
        let reference = self.reference.ok_or(ConfigError::MissingParameter("reference"))?;
        if !reference.is_time_dependent() {
            return Err(ConfigError::InvalidParameter {
                name: "reference",
                reason: format!("{} does not rotate with time", reference),
            });
        }
        let nmax = self.nmax.ok_or(ConfigError::MissingParameter("nmax"))?;
        let kmax = self.kmax.unwrap_or(nmax);
        if nmax == 0 || kmax == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "nmax",
                reason: "degrees must be at least 1".to_string(),
            });
        }
        Ok(SpectrumRequest {
            reference,
            nmax,
            kmax,
            step: self.step.unwrap_or(DEFAULT_STEP),
            samples: self.samples.unwrap_or(DEFAULT_SAMPLES),
            filter: self.filter,
            start_date: self.start_date.unwrap_or(0.0),
            scaled: self.scaled,
            output: self.output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_request_requires_time_and_points() {
        let result = EvaluationRequestBuilder::new().points(vec![Position::new(6371.2, 90.0, 0.0)]).build();
        assert_eq!(result, Err(ConfigError::MissingParameter("time")));
    }

    #[test]
    fn evaluation_request_checks_time_count() {
        let points = vec![Position::new(6371.2, 90.0, 0.0); 3];
        let result = EvaluationRequestBuilder::new()
            .time(vec![0.0, 1.0])
            .points(points.clone())
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidParameter { name: "time", .. })));

        let request = EvaluationRequestBuilder::new().time(vec![0.0]).points(points).build().unwrap();
        assert_eq!(request.extrapolate, Extrapolate::Linear);
        assert!(request.sources.is_empty());
    }

    #[test]
    fn spectrum_request_fills_defaults() {
        let request = SpectrumRequestBuilder::new()
            .reference(Reference::Sm)
            .nmax(2)
            .build()
            .unwrap();
        assert_eq!(request.kmax, 2);
        assert_eq!(request.samples, DEFAULT_SAMPLES);
        assert_eq!(request.step, DEFAULT_STEP);
        assert!(!request.scaled);
    }

    #[test]
    fn spectrum_request_rejects_static_frame() {
        let result = SpectrumRequestBuilder::new().reference(Reference::Mag).nmax(1).build();
        assert!(matches!(result, Err(ConfigError::InvalidParameter { name: "reference", .. })));
        let result = SpectrumRequestBuilder::new().nmax(1).build();
        assert_eq!(result, Err(ConfigError::MissingParameter("reference")));
    }
}
