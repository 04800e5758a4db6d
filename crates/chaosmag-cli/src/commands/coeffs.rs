use crate::cli::{CoeffsArgs, CoeffsSource};
use crate::error::{CliError, Result};
use crate::utils::settings::load_config;
use crate::utils::table;
use chaosmag::core::harmonics::{Source, degree_order_pairs};
use chaosmag::engine::chaos::ChaosModel;
use chaosmag::engine::model::Extrapolate;
use tracing::info;

pub fn run(args: CoeffsArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let model = ChaosModel::load(&args.model, &config)?;
    let extrapolate: Extrapolate = args.extrapolate.parse()?;
    if args.deriv > 0 && args.source != CoeffsSource::Tdep {
        return Err(CliError::Argument(
            "time derivatives are only available for the time-dependent field".to_string(),
        ));
    }

    let (coeffs, nmax) = match args.source {
        CoeffsSource::Tdep => {
            let nmax = args.nmax.unwrap_or(model.tdep().nmax());
            (model.synth_coeffs_tdep(&args.time, Some(nmax), args.deriv, extrapolate)?, nmax)
        }
        CoeffsSource::Static => {
            let nmax = args
                .nmax
                .or_else(|| model.static_model().map(|m| m.nmax()))
                .unwrap_or(1);
            let coeffs = model.synth_coeffs_static(Some(nmax))?;
            (vec![coeffs; args.time.len()], nmax)
        }
        CoeffsSource::GsmE => (model.synth_coeffs_gsm(&args.time, Source::External)?, model.n_gsm()),
        CoeffsSource::GsmI => (model.synth_coeffs_gsm(&args.time, Source::Internal)?, model.n_gsm()),
        CoeffsSource::SmE => (model.synth_coeffs_sm(&args.time, Source::External)?, model.n_sm()),
        CoeffsSource::SmI => (model.synth_coeffs_sm(&args.time, Source::Internal)?, model.n_sm()),
    };

    let output = args.output.as_deref();
    let mut writer = table::writer(output)?;
    let mut header = vec!["time".to_string()];
    header.extend(degree_order_pairs(1, nmax).into_iter().map(|(n, m)| coefficient_name(n, m)));
    writer.write_record(&header).map_err(|source| CliError::Csv {
        path: output.map(|p| p.to_path_buf()).unwrap_or_else(|| "<stdout>".into()),
        source,
    })?;
    for (time, values) in args.time.iter().zip(&coeffs) {
        table::write_numbers(
            &mut writer,
            std::iter::once(*time).chain(values.iter().take(header.len() - 1).copied()),
            output,
        )?;
    }
    writer.flush()?;

    info!("Wrote coefficients up to degree {} at {} time(s).", nmax, args.time.len());
    Ok(())
}

/// `g10`, `g11`, `h11`, ... for orders `0, 1, -1, ...`.
fn coefficient_name(n: usize, m: i64) -> String {
    if m >= 0 {
        format!("g{}{}", n, m)
    } else {
        format!("h{}{}", n, -m)
    }
}
