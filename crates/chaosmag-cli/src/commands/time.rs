use crate::cli::TimeArgs;
use crate::error::{CliError, Result};
use chaosmag::core::time::{dyear_to_mjd, mjd_to_dyear, mjd2000_from_datetime, timestamp};
use chrono::{NaiveDate, NaiveDateTime};

pub fn run(args: TimeArgs) -> Result<()> {
    let leap_year = !args.no_leap_year;
    let mjd = resolve_mjd(&args, leap_year)?;
    let datetime = timestamp(mjd)?;

    println!("date:  {}", datetime.format("%Y-%m-%dT%H:%M:%S%.6f"));
    println!("mjd:   {:.8}", mjd);
    println!("dyear: {:.8}", mjd_to_dyear(mjd, leap_year));
    Ok(())
}

fn resolve_mjd(args: &TimeArgs, leap_year: bool) -> Result<f64> {
    match (args.mjd, args.dyear, &args.date) {
        (Some(mjd), _, _) => Ok(mjd),
        (_, Some(dyear), _) => Ok(dyear_to_mjd(dyear, leap_year)),
        (_, _, Some(text)) => Ok(mjd2000_from_datetime(&parse_datetime(text)?)),
        _ => Err(CliError::Argument("one of --mjd, --dyear or --date is required".to_string())),
    }
}

fn parse_datetime(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(datetime);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| CliError::Argument(format!("cannot parse '{}' as a date", text)))
}
