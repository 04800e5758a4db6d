use crate::cli::EvalArgs;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use crate::utils::settings::load_config;
use crate::utils::table::{self, read_points};
use chaosmag::core::io::manifest::ModelManifest;
use chaosmag::engine::chaos::ModelSource;
use chaosmag::engine::config::EvaluationRequestBuilder;
use chaosmag::engine::error::ModelError;
use chaosmag::engine::model::Extrapolate;
use chaosmag::engine::progress::ProgressReporter;
use chaosmag::workflows;
use tracing::info;

pub fn run(args: EvalArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let manifest = ModelManifest::load(&args.model).map_err(ModelError::from)?;

    info!("Reading query points from {}", args.input.display());
    let records = read_points(&args.input)?;
    let sources = args
        .sources
        .iter()
        .map(|name| name.parse::<ModelSource>())
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let extrapolate: Extrapolate = args.extrapolate.parse()?;

    let mut builder = EvaluationRequestBuilder::new()
        .time(records.iter().map(|r| r.time).collect())
        .points(records.iter().map(|r| r.position()).collect())
        .sources(sources)
        .extrapolate(extrapolate);
    if let Some(nmax) = args.nmax {
        builder = builder.nmax(nmax);
    }
    let request = builder.build().map_err(ModelError::from)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let result = workflows::evaluate::run(&manifest, &config, &request, &reporter)?;

    let output = args.output.as_deref();
    let mut writer = table::writer(output)?;
    let mut header = vec!["time".to_string(), "radius".into(), "theta".into(), "phi".into()];
    header.extend(["B_radius", "B_theta", "B_phi"].map(String::from));
    if args.per_source {
        for (source, _) in &result.sources {
            header.extend(["B_radius", "B_theta", "B_phi"].map(|c| format!("{}_{}", c, source)));
        }
    }
    writer.write_record(&header).map_err(|source| CliError::Csv {
        path: output.map(|p| p.to_path_buf()).unwrap_or_else(|| "<stdout>".into()),
        source,
    })?;

    for (i, record) in records.iter().enumerate() {
        let total = result.total[i];
        let mut row = vec![record.time, record.radius, record.theta, record.phi, total.radius, total.theta, total.phi];
        if args.per_source {
            for (_, values) in &result.sources {
                row.extend([values[i].radius, values[i].theta, values[i].phi]);
            }
        }
        table::write_numbers(&mut writer, row, output)?;
    }
    writer.flush()?;

    info!(
        "Wrote the field of {} source(s) of '{}' at {} point(s).",
        result.sources.len(),
        result.model_name,
        records.len()
    );
    Ok(())
}
