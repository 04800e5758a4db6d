use crate::core::config::Config;
use crate::core::harmonics::FieldVector;
use crate::core::io::manifest::ModelManifest;
use crate::engine::chaos::{ChaosModel, ModelSource};
use crate::engine::config::EvaluationRequest;
use crate::engine::error::ModelError;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct EvaluationResult {
    pub model_name: String,
    /// Field of each evaluated source, in evaluation order.
    pub sources: Vec<(ModelSource, Vec<FieldVector>)>,
    /// Sum over all evaluated sources.
    pub total: Vec<FieldVector>,
}

impl EvaluationResult {
    pub fn source(&self, source: ModelSource) -> Option<&[FieldVector]> {
        self.sources
            .iter()
            .find(|(s, _)| *s == source)
            .map(|(_, values)| values.as_slice())
    }
}

#[instrument(skip_all, name = "evaluation_workflow")]
pub fn run(
    manifest: &ModelManifest,
    config: &Config,
    request: &EvaluationRequest,
    reporter: &ProgressReporter,
) -> Result<EvaluationResult, ModelError> {
    // === Phase 1: Load resources and build the model ===
    reporter.report(Progress::PhaseStart { name: "Loading model" });
    let model = ChaosModel::from_manifest(manifest, config)?;
    reporter.report(Progress::PhaseFinish);

    evaluate_model(&model, request, reporter)
}

/// Evaluates an already built model.
pub fn evaluate_model(
    model: &ChaosModel,
    request: &EvaluationRequest,
    reporter: &ProgressReporter,
) -> Result<EvaluationResult, ModelError> {
    let sources = if request.sources.is_empty() {
        model.available_sources()
    } else {
        request.sources.clone()
    };
    info!(
        "Evaluating {} source(s) of '{}' at {} point(s).",
        sources.len(),
        model.name(),
        request.points.len()
    );

    // === Phase 2: Evaluate each source ===
    reporter.report(Progress::PhaseStart {
        name: "Evaluating sources",
    });
    reporter.report(Progress::TaskStart {
        total_steps: sources.len() as u64,
    });
    let mut per_source = Vec::with_capacity(sources.len());
    for source in sources {
        let values = match source {
            ModelSource::Tdep => model.synth_values_tdep(
                &request.time,
                &request.points,
                request.nmax,
                0,
                request.extrapolate,
            )?,
            other => model.synth_values_source(other, &request.time, &request.points)?,
        };
        reporter.message(format!("Evaluated {}", source));
        per_source.push((source, values));
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Sum the sources ===
    let mut total = vec![FieldVector::default(); request.points.len()];
    for (_, values) in &per_source {
        for (sum, value) in total.iter_mut().zip(values) {
            *sum += *value;
        }
    }

    info!("Evaluation complete.");
    Ok(EvaluationResult {
        model_name: model.name().to_string(),
        sources: per_source,
        total,
    })
}
