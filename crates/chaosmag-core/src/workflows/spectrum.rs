use crate::core::config::Config;
use crate::core::coordinates::Dipole;
use crate::core::io::conductivity::ConductivityModel;
use crate::core::io::load_conductivity;
use crate::engine::config::SpectrumRequest;
use crate::engine::error::ModelError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::spectrum::{RotationSpectrum, SpectrumOptions, conductivity_qfunc, rotate_gauss_fft};
use tracing::{info, instrument};

/// Computes the rotation spectrum of a GSM or SM frame, with the induced
/// part weighted by the conductivity model named in `config`, and writes it
/// to the requested output file.
#[instrument(skip_all, name = "spectrum_workflow", fields(reference = %request.reference))]
pub fn run(
    config: &Config,
    request: &SpectrumRequest,
    reporter: &ProgressReporter,
) -> Result<RotationSpectrum, ModelError> {
    // === Phase 1: Load the conductivity model ===
    reporter.report(Progress::PhaseStart {
        name: "Loading conductivity model",
    });
    let path = config
        .files
        .earth_conductivity
        .as_deref()
        .ok_or(ModelError::MissingParameter("file.earth_conductivity"))?;
    let conductivity = load_conductivity(path)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Sample and transform the rotation ===
    let spectrum = compute(config, request, &conductivity, reporter)?;

    // === Phase 3: Save ===
    if let Some(output) = &request.output {
        reporter.report(Progress::PhaseStart { name: "Saving" });
        spectrum.save(output)?;
        reporter.report(Progress::PhaseFinish);
    }

    info!("Spectrum workflow complete.");
    Ok(spectrum)
}

/// Computes the spectrum with an explicit conductivity model.
pub fn compute(
    config: &Config,
    request: &SpectrumRequest,
    conductivity: &ConductivityModel,
    reporter: &ProgressReporter,
) -> Result<RotationSpectrum, ModelError> {
    let options = SpectrumOptions {
        reference: request.reference,
        step: request.step,
        samples: request.samples,
        filter: request.filter,
        start_date: request.start_date,
        scaled: request.scaled,
        dipole: Dipole::Coefficients(config.dipole()),
    };
    let qfunc = conductivity_qfunc(conductivity);
    rotate_gauss_fft(request.nmax, request.kmax, &options, &qfunc, reporter)
}
