use crate::cli::{Frame, SpectrumArgs};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use crate::utils::settings::load_config;
use chaosmag::core::coordinates::Reference;
use chaosmag::engine::config::SpectrumRequestBuilder;
use chaosmag::engine::error::ModelError;
use chaosmag::engine::progress::ProgressReporter;
use chaosmag::workflows;
use tracing::info;

pub fn run(args: SpectrumArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let reference = match args.reference {
        Frame::Gsm => Reference::Gsm,
        Frame::Sm => Reference::Sm,
    };

    let mut builder = SpectrumRequestBuilder::new()
        .reference(reference)
        .nmax(args.nmax)
        .scaled(args.scaled)
        .output(args.output.clone());
    if let Some(kmax) = args.kmax {
        builder = builder.kmax(kmax);
    }
    if let Some(step) = args.step {
        builder = builder.step(step);
    }
    if let Some(samples) = args.samples {
        builder = builder.samples(samples);
    }
    if let Some(filter) = args.filter {
        builder = builder.filter(filter);
    }
    if let Some(start) = args.start_date {
        builder = builder.start_date(start);
    }
    let request = builder.build().map_err(ModelError::from)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let spectrum = workflows::spectrum::run(&config, &request, &reporter)?;

    info!(
        "{} spectrum with {} component(s) per element written to {}",
        spectrum.reference,
        spectrum.plain.filter(),
        args.output.display()
    );
    Ok(())
}
