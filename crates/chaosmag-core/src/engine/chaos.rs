use super::error::ModelError;
use super::model::{BaseModel, Extrapolate, synth_broadcast};
use super::spectrum::RotationSpectrum;
use super::timeseries::{Component, RcIndex};
use crate::core::config::Config;
use crate::core::coordinates::frames::basevectors;
use crate::core::coordinates::{Dipole, Position, Reference};
use crate::core::harmonics::{FieldVector, Source, Truncation, nmax_from_len};
use crate::core::io::manifest::{DeltaSection, ModelManifest};
use crate::core::math::pp::PiecewisePolynomial;
use crate::core::rotation::rotate_gauss;
use nalgebra::{DMatrix, DVector};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Field sources of a CHAOS model that can be evaluated separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelSource {
    /// Time-dependent internal field.
    Tdep,
    /// Static internal (crustal) field.
    Static,
    GsmExternal,
    /// Field induced by the GSM magnetospheric field.
    GsmInternal,
    SmExternal,
    /// Field induced by the SM magnetospheric field.
    SmInternal,
}

impl ModelSource {
    pub const ALL: [ModelSource; 6] = [
        ModelSource::Tdep,
        ModelSource::Static,
        ModelSource::GsmExternal,
        ModelSource::GsmInternal,
        ModelSource::SmExternal,
        ModelSource::SmInternal,
    ];
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelSource::Tdep => "tdep",
            ModelSource::Static => "static",
            ModelSource::GsmExternal => "gsm_e",
            ModelSource::GsmInternal => "gsm_i",
            ModelSource::SmExternal => "sm_e",
            ModelSource::SmInternal => "sm_i",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ModelSource {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tdep" => Ok(ModelSource::Tdep),
            "static" => Ok(ModelSource::Static),
            "gsm_e" | "gsm_external" => Ok(ModelSource::GsmExternal),
            "gsm_i" | "gsm_internal" => Ok(ModelSource::GsmInternal),
            "sm_e" | "sm_external" => Ok(ModelSource::SmExternal),
            "sm_i" | "sm_internal" => Ok(ModelSource::SmInternal),
            other => Err(ModelError::InvalidParameter(format!("unknown model source '{}'", other))),
        }
    }
}

/// CHAOS geomagnetic field model: internal core and crustal fields plus the
/// magnetospheric field expanded in the GSM and SM frames.
#[derive(Debug, Clone)]
pub struct ChaosModel {
    name: String,
    tdep: BaseModel,
    static_model: Option<BaseModel>,
    n_gsm: usize,
    n_sm: usize,
    coeffs_gsm: Vec<f64>,
    coeffs_sm: Vec<f64>,
    /// Baseline corrections of `q10, q11, s11` (SM frame).
    delta: Option<PiecewisePolynomial>,
    rc_index: Option<RcIndex>,
    gsm_spectrum: Option<RotationSpectrum>,
    sm_spectrum: Option<RotationSpectrum>,
    dipole: Dipole,
}

impl ChaosModel {
    pub fn builder() -> ChaosModelBuilder {
        ChaosModelBuilder::new()
    }

    /// Loads a model manifest and everything it refers to.
    pub fn load(path: &Path, config: &Config) -> Result<Self, ModelError> {
        let manifest = ModelManifest::load(path)?;
        Self::from_manifest(&manifest, config)
    }

    /// Builds the model described by `manifest`. RC index and spectra files
    /// missing from the manifest are taken from `config`.
    #[instrument(skip_all, name = "chaos_from_manifest", fields(name = %manifest.name))]
    pub fn from_manifest(manifest: &ModelManifest, config: &Config) -> Result<Self, ModelError> {
        let tdep = BaseModel::from_shc(&manifest.internal.tdep, manifest.leap_year, Some("Internal (time-dependent)"))?;
        let static_model = manifest
            .internal
            .static_field
            .as_deref()
            .map(|path| BaseModel::from_shc(path, manifest.leap_year, Some("Internal (static)")))
            .transpose()?;
        let delta = manifest.external.delta.as_ref().map(delta_from_section).transpose()?;

        let rc_path = manifest.resources.rc_index.as_ref().or(config.files.rc_index.as_ref());
        let rc_index = rc_path.map(|p| RcIndex::load(p)).transpose()?;
        let gsm_path = manifest.resources.gsm_spectrum.as_ref().or(config.files.gsm_spectrum.as_ref());
        let gsm_spectrum = gsm_path.map(|p| RotationSpectrum::load(p)).transpose()?;
        let sm_path = manifest.resources.sm_spectrum.as_ref().or(config.files.sm_spectrum.as_ref());
        let sm_spectrum = sm_path.map(|p| RotationSpectrum::load(p)).transpose()?;

        let mut builder = ChaosModelBuilder::new()
            .name(manifest.name.clone())
            .tdep(tdep)
            .coeffs_gsm(manifest.external.coeffs_gsm.clone())
            .coeffs_sm(manifest.external.coeffs_sm.clone())
            .dipole(Dipole::Coefficients(config.dipole()));
        if let Some(model) = static_model {
            builder = builder.static_model(model);
        }
        if let Some(pp) = delta {
            builder = builder.delta(pp);
        }
        if let Some(index) = rc_index {
            builder = builder.rc_index(index);
        }
        if let Some(spectrum) = gsm_spectrum {
            builder = builder.gsm_spectrum(spectrum);
        }
        if let Some(spectrum) = sm_spectrum {
            builder = builder.sm_spectrum(spectrum);
        }
        let model = builder.build()?;
        info!("Built model '{}'.", model.name);
        Ok(model)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tdep(&self) -> &BaseModel {
        &self.tdep
    }

    pub fn static_model(&self) -> Option<&BaseModel> {
        self.static_model.as_ref()
    }

    pub fn n_gsm(&self) -> usize {
        self.n_gsm
    }

    pub fn n_sm(&self) -> usize {
        self.n_sm
    }

    pub fn rc_index(&self) -> Option<&RcIndex> {
        self.rc_index.as_ref()
    }

    pub fn dipole(&self) -> Dipole {
        self.dipole
    }

    /// Sources that can be evaluated with the loaded resources.
    pub fn available_sources(&self) -> Vec<ModelSource> {
        ModelSource::ALL
            .into_iter()
            .filter(|source| match source {
                ModelSource::Tdep | ModelSource::GsmExternal => true,
                ModelSource::Static => self.static_model.is_some(),
                ModelSource::GsmInternal => self.gsm_spectrum.is_some(),
                ModelSource::SmExternal => self.rc_index.is_some(),
                ModelSource::SmInternal => self.rc_index.is_some() && self.sm_spectrum.is_some(),
            })
            .collect()
    }

    pub fn synth_coeffs_tdep(
        &self,
        time: &[f64],
        nmax: Option<usize>,
        deriv: usize,
        extrapolate: Extrapolate,
    ) -> Result<Vec<Vec<f64>>, ModelError> {
        self.tdep.synth_coeffs(time, nmax, deriv, extrapolate)
    }

    pub fn synth_values_tdep(
        &self,
        time: &[f64],
        points: &[Position],
        nmax: Option<usize>,
        deriv: usize,
        extrapolate: Extrapolate,
    ) -> Result<Vec<FieldVector>, ModelError> {
        self.tdep.synth_values(time, points, nmax, deriv, extrapolate)
    }

    fn static_or_err(&self) -> Result<&BaseModel, ModelError> {
        self.static_model
            .as_ref()
            .ok_or(ModelError::MissingParameter("static"))
    }

    /// Coefficients of the static field, zero below its minimum degree.
    pub fn synth_coeffs_static(&self, nmax: Option<usize>) -> Result<Vec<f64>, ModelError> {
        let model = self.static_or_err()?;
        let mut coeffs = model.synth_coeffs(&[model.pp().start()], nmax, 0, Extrapolate::Constant)?;
        Ok(coeffs.pop().unwrap_or_default())
    }

    pub fn synth_values_static(
        &self,
        points: &[Position],
        nmax: Option<usize>,
    ) -> Result<Vec<FieldVector>, ModelError> {
        let model = self.static_or_err()?;
        model.synth_values(&[model.pp().start()], points, nmax, 0, Extrapolate::Constant)
    }

    fn spectrum(&self, reference: Reference) -> Option<&RotationSpectrum> {
        match reference {
            Reference::Gsm => self.gsm_spectrum.as_ref(),
            Reference::Sm => self.sm_spectrum.as_ref(),
            Reference::Mag => None,
        }
    }

    /// Matrix rotating coefficients of degree `n` in `reference` to GEO.
    fn rotation_matrix(&self, reference: Reference, n: usize, time: f64, induced: bool) -> Result<DMatrix<f64>, ModelError> {
        match (self.spectrum(reference), induced) {
            (Some(spectrum), _) => Ok(spectrum.matrix(time, induced)),
            (None, false) => Ok(rotate_gauss(n, n, &basevectors(reference, time, &self.dipole)?)),
            (None, true) => Err(ModelError::MissingSpectrum(reference)),
        }
    }

    /// GEO coefficients of the GSM magnetospheric field (`External`) or its
    /// induced counterpart (`Internal`) at each time.
    pub fn synth_coeffs_gsm(&self, time: &[f64], source: Source) -> Result<Vec<Vec<f64>>, ModelError> {
        let induced = source == Source::Internal;
        let coeffs = DVector::from_column_slice(&self.coeffs_gsm);

        #[cfg(not(feature = "parallel"))]
        let iterator = time.iter();

        #[cfg(feature = "parallel")]
        let iterator = time.par_iter();

        iterator
            .map(|&t| -> Result<Vec<f64>, ModelError> {
                let matrix = self.rotation_matrix(Reference::Gsm, self.n_gsm, t, induced)?;
                Ok((matrix * &coeffs).as_slice().to_vec())
            })
            .collect()
    }

    pub fn synth_values_gsm(
        &self,
        time: &[f64],
        points: &[Position],
        source: Source,
    ) -> Result<Vec<FieldVector>, ModelError> {
        let coeffs = self.synth_coeffs_gsm(time, source)?;
        synth_broadcast(&coeffs, points, &Truncation::new(self.n_gsm), source)
    }

    /// GEO coefficients of the SM magnetospheric field (`External`) or its
    /// induced counterpart (`Internal`) at each time.
    ///
    /// The degree-1 SM coefficients scale with the external (internal) part
    /// of the RC index and carry the baseline corrections. The induced
    /// degree-1 response is already part of the internal RC index, so those
    /// columns are rotated with the plain matrix.
    pub fn synth_coeffs_sm(&self, time: &[f64], source: Source) -> Result<Vec<Vec<f64>>, ModelError> {
        let rc_index = self.rc_index.as_ref().ok_or(ModelError::MissingRcIndex)?;
        let component = match source {
            Source::External => Component::External,
            Source::Internal => Component::Internal,
        };
        let induced = source == Source::Internal;
        if induced && self.sm_spectrum.is_none() {
            return Err(ModelError::MissingSpectrum(Reference::Sm));
        }

        #[cfg(not(feature = "parallel"))]
        let iterator = time.iter();

        #[cfg(feature = "parallel")]
        let iterator = time.par_iter();

        iterator
            .map(|&t| -> Result<Vec<f64>, ModelError> {
                let rc = rc_index.interpolate(t, component);
                let mut coeffs = DVector::from_column_slice(&self.coeffs_sm);
                for i in 0..3 {
                    coeffs[i] *= rc;
                }
                if let (Some(delta), Source::External) = (&self.delta, source) {
                    let correction = delta.evaluate(t, 0);
                    for i in 0..3 {
                        coeffs[i] += correction[i];
                    }
                }

                let plain = self.rotation_matrix(Reference::Sm, self.n_sm, t, false)?;
                let mut rotated = plain.columns(0, 3) * coeffs.rows(0, 3);
                let rest = coeffs.len() - 3;
                if rest > 0 {
                    let matrix = if induced {
                        self.rotation_matrix(Reference::Sm, self.n_sm, t, true)?
                    } else {
                        plain
                    };
                    rotated += matrix.columns(3, rest) * coeffs.rows(3, rest);
                }
                Ok(rotated.as_slice().to_vec())
            })
            .collect()
    }

    pub fn synth_values_sm(
        &self,
        time: &[f64],
        points: &[Position],
        source: Source,
    ) -> Result<Vec<FieldVector>, ModelError> {
        let coeffs = self.synth_coeffs_sm(time, source)?;
        synth_broadcast(&coeffs, points, &Truncation::new(self.n_sm), source)
    }

    /// Field of one source at the points.
    pub fn synth_values_source(
        &self,
        source: ModelSource,
        time: &[f64],
        points: &[Position],
    ) -> Result<Vec<FieldVector>, ModelError> {
        match source {
            ModelSource::Tdep => self.synth_values_tdep(time, points, None, 0, Extrapolate::default()),
            ModelSource::Static => self.synth_values_static(points, None),
            ModelSource::GsmExternal => self.synth_values_gsm(time, points, Source::External),
            ModelSource::GsmInternal => self.synth_values_gsm(time, points, Source::Internal),
            ModelSource::SmExternal => self.synth_values_sm(time, points, Source::External),
            ModelSource::SmInternal => self.synth_values_sm(time, points, Source::Internal),
        }
    }

    /// Sum of the field of the selected sources at the points.
    #[instrument(skip_all, name = "chaos_synth_values", fields(points = points.len(), sources = sources.len()))]
    pub fn synth_values(
        &self,
        time: &[f64],
        points: &[Position],
        sources: &[ModelSource],
    ) -> Result<Vec<FieldVector>, ModelError> {
        let mut total = vec![FieldVector::default(); points.len()];
        for &source in sources {
            let values = self.synth_values_source(source, time, points)?;
            for (sum, value) in total.iter_mut().zip(values) {
                *sum += value;
            }
        }
        Ok(total)
    }
}

fn delta_from_section(section: &DeltaSection) -> Result<PiecewisePolynomial, ModelError> {
    let pieces = section.q10.len();
    if section.q11.len() != pieces || section.s11.len() != pieces {
        return Err(ModelError::InvalidParameter(
            "baseline corrections q10, q11 and s11 differ in length".to_string(),
        ));
    }
    let coefs = (0..pieces)
        .flat_map(|i| [section.q10[i], section.q11[i], section.s11[i]])
        .collect();
    Ok(PiecewisePolynomial::new(section.breaks.clone(), 1, 3, coefs)?)
}

#[derive(Default)]
pub struct ChaosModelBuilder {
    name: Option<String>,
    tdep: Option<BaseModel>,
    static_model: Option<BaseModel>,
    coeffs_gsm: Option<Vec<f64>>,
    coeffs_sm: Option<Vec<f64>>,
    delta: Option<PiecewisePolynomial>,
    rc_index: Option<RcIndex>,
    gsm_spectrum: Option<RotationSpectrum>,
    sm_spectrum: Option<RotationSpectrum>,
    dipole: Option<Dipole>,
}

impl ChaosModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
    pub fn tdep(mut self, model: BaseModel) -> Self {
        self.tdep = Some(model);
        self
    }
    pub fn static_model(mut self, model: BaseModel) -> Self {
        self.static_model = Some(model);
        self
    }
    pub fn coeffs_gsm(mut self, coeffs: Vec<f64>) -> Self {
        self.coeffs_gsm = Some(coeffs);
        self
    }
    pub fn coeffs_sm(mut self, coeffs: Vec<f64>) -> Self {
        self.coeffs_sm = Some(coeffs);
        self
    }
    pub fn delta(mut self, pp: PiecewisePolynomial) -> Self {
        self.delta = Some(pp);
        self
    }
    pub fn rc_index(mut self, index: RcIndex) -> Self {
        self.rc_index = Some(index);
        self
    }
    pub fn gsm_spectrum(mut self, spectrum: RotationSpectrum) -> Self {
        self.gsm_spectrum = Some(spectrum);
        self
    }
    pub fn sm_spectrum(mut self, spectrum: RotationSpectrum) -> Self {
        self.sm_spectrum = Some(spectrum);
        self
    }
    pub fn dipole(mut self, dipole: Dipole) -> Self {
        self.dipole = Some(dipole);
        self
    }

    pub fn build(self) -> Result<ChaosModel, ModelError> {
        let tdep = self.tdep.ok_or(ModelError::MissingParameter("tdep"))?;
        let coeffs_gsm = self.coeffs_gsm.ok_or(ModelError::MissingParameter("coeffs_gsm"))?;
        let coeffs_sm = self.coeffs_sm.ok_or(ModelError::MissingParameter("coeffs_sm"))?;
        let n_gsm = external_degree("coeffs_gsm", &coeffs_gsm)?;
        let n_sm = external_degree("coeffs_sm", &coeffs_sm)?;

        if let Some(delta) = &self.delta {
            if delta.dim() != 3 {
                return Err(ModelError::InvalidParameter(format!(
                    "baseline corrections need 3 components, got {}",
                    delta.dim()
                )));
            }
        }
        for (reference, spectrum, n) in [
            (Reference::Gsm, &self.gsm_spectrum, n_gsm),
            (Reference::Sm, &self.sm_spectrum, n_sm),
        ] {
            let Some(spectrum) = spectrum else { continue };
            if spectrum.reference != reference || spectrum.nmax != n || spectrum.kmax != n {
                return Err(ModelError::InvalidParameter(format!(
                    "{} spectrum of degree {}/{} does not match the {} coefficients of degree {}",
                    spectrum.reference, spectrum.nmax, spectrum.kmax, reference, n
                )));
            }
        }

        let dipole = self.dipole.unwrap_or_default();
        for spectrum in [&self.gsm_spectrum, &self.sm_spectrum].into_iter().flatten() {
            if spectrum.dipole != dipole {
                warn!(
                    "{} spectrum was computed for a different dipole than the model uses.",
                    spectrum.reference
                );
            }
        }

        Ok(ChaosModel {
            name: self.name.unwrap_or_else(|| "CHAOS".to_string()),
            tdep,
            static_model: self.static_model,
            n_gsm,
            n_sm,
            coeffs_gsm,
            coeffs_sm,
            delta: self.delta,
            rc_index: self.rc_index,
            gsm_spectrum: self.gsm_spectrum,
            sm_spectrum: self.sm_spectrum,
            dipole,
        })
    }
}

fn external_degree(name: &str, coeffs: &[f64]) -> Result<usize, ModelError> {
    match nmax_from_len(coeffs.len()) {
        Some(n) if n >= 1 => Ok(n),
        _ => Err(ModelError::InvalidParameter(format!(
            "{} has {} entries, which is not a full expansion",
            name,
            coeffs.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coordinates::dipole::dipole_to_vec;
    use crate::core::io::rc_index::RcRecord;
    use approx::assert_relative_eq;

    const TIME: f64 = 100.0;

    fn tdep() -> BaseModel {
        let pp = PiecewisePolynomial::constant(0.0, 1000.0, &[-30000.0, -1500.0, 4800.0]).unwrap();
        BaseModel::from_pp("tdep", pp, Source::Internal).unwrap()
    }

    fn rc_index(rc_e: f64, rc_i: f64) -> RcIndex {
        let record = |time| RcRecord {
            time,
            rc: rc_e + rc_i,
            rc_e,
            rc_i,
            flag: "D".to_string(),
        };
        RcIndex::from_records(vec![record(0.0), record(1000.0)]).unwrap()
    }

    fn model(coeffs_sm: Vec<f64>) -> ChaosModel {
        ChaosModel::builder()
            .tdep(tdep())
            .coeffs_gsm(vec![5.0, 0.0, 0.0])
            .coeffs_sm(coeffs_sm)
            .rc_index(rc_index(2.0, 0.5))
            .build()
            .unwrap()
    }

    #[test]
    fn builder_reports_missing_parameters() {
        let result = ChaosModelBuilder::new().coeffs_gsm(vec![0.0; 3]).build();
        assert!(matches!(result, Err(ModelError::MissingParameter("tdep"))));

        let result = ChaosModelBuilder::new().tdep(tdep()).coeffs_gsm(vec![0.0; 3]).build();
        assert!(matches!(result, Err(ModelError::MissingParameter("coeffs_sm"))));
    }

    #[test]
    fn builder_rejects_partial_expansions() {
        let result = ChaosModelBuilder::new()
            .tdep(tdep())
            .coeffs_gsm(vec![0.0; 4])
            .coeffs_sm(vec![0.0; 3])
            .build();
        assert!(matches!(result, Err(ModelError::InvalidParameter(_))));
    }

    #[test]
    fn sm_axial_term_points_along_dipole_axis() {
        let model = model(vec![10.0, 0.0, 0.0]);
        let axis = dipole_to_vec(&model.dipole()).unwrap();
        let coeffs = model.synth_coeffs_sm(&[TIME], Source::External).unwrap();

        // q10 scaled by RC_e = 2.
        assert_relative_eq!(coeffs[0][0], 20.0 * axis.z, epsilon = 1e-9);
        assert_relative_eq!(coeffs[0][1], 20.0 * axis.x, epsilon = 1e-9);
        assert_relative_eq!(coeffs[0][2], 20.0 * axis.y, epsilon = 1e-9);
    }

    #[test]
    fn baseline_corrections_apply_to_external_part() {
        let delta = PiecewisePolynomial::new(vec![0.0, 50.0, 1000.0], 1, 3, vec![0.0, 0.0, 0.0, 4.0, 0.0, 0.0]).unwrap();
        let model = ChaosModel::builder()
            .tdep(tdep())
            .coeffs_gsm(vec![0.0; 3])
            .coeffs_sm(vec![10.0, 0.0, 0.0])
            .rc_index(rc_index(2.0, 0.5))
            .delta(delta)
            .build()
            .unwrap();
        let axis = dipole_to_vec(&model.dipole()).unwrap();

        let early = model.synth_coeffs_sm(&[10.0], Source::External).unwrap();
        let late = model.synth_coeffs_sm(&[TIME], Source::External).unwrap();
        assert_relative_eq!(early[0][0], 20.0 * axis.z, epsilon = 1e-9);
        assert_relative_eq!(late[0][0], 24.0 * axis.z, epsilon = 1e-9);
    }

    #[test]
    fn gsm_external_without_spectrum_uses_exact_rotation() {
        let model = model(vec![0.0; 3]);
        let coeffs = model.synth_coeffs_gsm(&[TIME], Source::External).unwrap();
        let frame = basevectors(Reference::Gsm, TIME, &model.dipole()).unwrap();
        let expected = rotate_gauss(1, 1, &frame) * DVector::from_column_slice(&[5.0, 0.0, 0.0]);
        assert_relative_eq!(DVector::from_vec(coeffs[0].clone()), expected, epsilon = 1e-12);
    }

    #[test]
    fn induced_parts_need_a_spectrum() {
        let model = model(vec![10.0, 0.0, 0.0]);
        assert!(matches!(
            model.synth_coeffs_gsm(&[TIME], Source::Internal),
            Err(ModelError::MissingSpectrum(Reference::Gsm))
        ));
        assert!(matches!(
            model.synth_coeffs_sm(&[TIME], Source::Internal),
            Err(ModelError::MissingSpectrum(Reference::Sm))
        ));
    }

    #[test]
    fn sm_part_needs_rc_index() {
        let model = ChaosModel::builder()
            .tdep(tdep())
            .coeffs_gsm(vec![0.0; 3])
            .coeffs_sm(vec![1.0, 0.0, 0.0])
            .build()
            .unwrap();
        assert!(matches!(
            model.synth_coeffs_sm(&[TIME], Source::External),
            Err(ModelError::MissingRcIndex)
        ));
    }

    #[test]
    fn total_field_is_sum_of_sources() {
        let model = model(vec![10.0, 0.0, 0.0]);
        let points = [Position::new(6371.2, 45.0, 30.0), Position::new(7000.0, 120.0, -60.0)];
        let sources = [ModelSource::Tdep, ModelSource::GsmExternal, ModelSource::SmExternal];

        let total = model.synth_values(&[TIME], &points, &sources).unwrap();
        let mut expected = vec![FieldVector::default(); points.len()];
        for source in sources {
            for (sum, value) in expected.iter_mut().zip(model.synth_values_source(source, &[TIME], &points).unwrap()) {
                *sum += value;
            }
        }
        for (a, b) in total.iter().zip(&expected) {
            assert_relative_eq!(a.radius, b.radius, epsilon = 1e-9);
            assert_relative_eq!(a.theta, b.theta, epsilon = 1e-9);
            assert_relative_eq!(a.phi, b.phi, epsilon = 1e-9);
        }
    }

    #[test]
    fn available_sources_follow_loaded_resources() {
        let model = model(vec![0.0; 3]);
        assert_eq!(
            model.available_sources(),
            vec![ModelSource::Tdep, ModelSource::GsmExternal, ModelSource::SmExternal]
        );
    }

    #[test]
    fn static_field_requires_static_model() {
        let model = model(vec![0.0; 3]);
        assert!(matches!(
            model.synth_coeffs_static(None),
            Err(ModelError::MissingParameter("static"))
        ));
    }

    #[test]
    fn model_source_round_trips_through_names() {
        for source in ModelSource::ALL {
            assert_eq!(source.to_string().parse::<ModelSource>().unwrap(), source);
        }
        assert!("core".parse::<ModelSource>().is_err());
    }
}
