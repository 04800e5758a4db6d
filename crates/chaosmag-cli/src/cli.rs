use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "chaosmag - evaluate the CHAOS geomagnetic field model and compute the rotation spectra it relies on.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate the model field at the points of a CSV file.
    Eval(EvalArgs),
    /// Print Gauss coefficients of one model source at given times.
    Coeffs(CoeffsArgs),
    /// Compute the rotation spectrum of the GSM or SM frame.
    Spectrum(SpectrumArgs),
    /// Convert between dates, decimal years and modified Julian dates.
    Time(TimeArgs),
    /// Inspect or edit a configuration file.
    Config(ConfigArgs),
}

/// Options shared by commands that read the configuration.
#[derive(Args, Debug, Clone)]
pub struct ConfigOptions {
    /// Configuration file in TOML format; built-in defaults when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override a configuration value. Can be used multiple times.
    /// Example: -S params.r_surf=6371.2
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE")]
    pub set_values: Vec<String>,
}

/// Arguments for the `eval` subcommand.
#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Model manifest (TOML).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub model: PathBuf,

    /// CSV file with columns `time,radius,theta,phi` (MJD2000, km, degrees).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Output CSV file; standard output when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Sources to evaluate (tdep, static, gsm_e, gsm_i, sm_e, sm_i).
    /// Every available source when omitted.
    #[arg(short, long = "source", value_name = "NAME", value_delimiter = ',')]
    pub sources: Vec<String>,

    /// Truncation degree of the time-dependent internal field.
    #[arg(long, value_name = "INT")]
    pub nmax: Option<usize>,

    /// Extrapolation outside the model time span (linear, quadratic, cubic,
    /// spline, constant, off).
    #[arg(long, value_name = "MODE", default_value = "linear")]
    pub extrapolate: String,

    /// Also write the field of each source, not only the total.
    #[arg(long)]
    pub per_source: bool,

    #[command(flatten)]
    pub config: ConfigOptions,
}

/// Model part whose coefficients are printed by `coeffs`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoeffsSource {
    Tdep,
    Static,
    GsmE,
    GsmI,
    SmE,
    SmI,
}

/// Arguments for the `coeffs` subcommand.
#[derive(Args, Debug)]
pub struct CoeffsArgs {
    /// Model manifest (TOML).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub model: PathBuf,

    /// Times (MJD2000), comma separated.
    #[arg(short, long, required = true, value_name = "MJD", value_delimiter = ',', allow_negative_numbers = true)]
    pub time: Vec<f64>,

    #[arg(short, long, value_enum, default_value = "tdep")]
    pub source: CoeffsSource,

    #[arg(long, value_name = "INT")]
    pub nmax: Option<usize>,

    /// Order of the time derivative (time-dependent field only).
    #[arg(long, default_value_t = 0)]
    pub deriv: usize,

    #[arg(long, value_name = "MODE", default_value = "linear")]
    pub extrapolate: String,

    /// Output CSV file; standard output when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigOptions,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    Gsm,
    Sm,
}

/// Arguments for the `spectrum` subcommand.
#[derive(Args, Debug)]
pub struct SpectrumArgs {
    #[arg(short, long, value_enum)]
    pub reference: Frame,

    /// Output JSON file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Degree of the GEO expansion.
    #[arg(long, default_value_t = 2)]
    pub nmax: usize,

    /// Degree of the expansion in the rotating frame; `nmax` when omitted.
    #[arg(long)]
    pub kmax: Option<usize>,

    /// Sampling interval in hours.
    #[arg(long, value_name = "HOURS")]
    pub step: Option<f64>,

    /// Number of samples.
    #[arg(long, value_name = "INT")]
    pub samples: Option<usize>,

    /// Number of dominant components kept per matrix element.
    #[arg(long, value_name = "INT")]
    pub filter: Option<usize>,

    /// First sample (MJD2000).
    #[arg(long, value_name = "MJD", allow_negative_numbers = true)]
    pub start_date: Option<f64>,

    /// Store doubled amplitudes for non-zero frequencies.
    #[arg(long)]
    pub scaled: bool,

    #[command(flatten)]
    pub config: ConfigOptions,
}

/// Arguments for the `time` subcommand. Exactly one input is required.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("input").required(true).multiple(false).args(["mjd", "dyear", "date"])))]
pub struct TimeArgs {
    /// Modified Julian date (epoch 2000).
    #[arg(long, value_name = "MJD", allow_negative_numbers = true)]
    pub mjd: Option<f64>,

    /// Decimal year.
    #[arg(long, value_name = "YEAR", allow_negative_numbers = true)]
    pub dyear: Option<f64>,

    /// Date and time, e.g. `2016-01-01T12:00:00` or `2016-01-01`.
    #[arg(long, value_name = "DATETIME")]
    pub date: Option<String>,

    /// Use 365.25 days per year for decimal years.
    #[arg(long)]
    pub no_leap_year: bool,
}

/// Arguments for the `config` subcommand.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print every parameter.
    Show {
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
    /// Print one parameter.
    Get {
        key: String,
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
    /// Set parameters and save the result.
    Set {
        /// Assignments of the form KEY=VALUE.
        #[arg(required = true, value_name = "KEY=VALUE")]
        values: Vec<String>,
        /// File to update; created from defaults if missing.
        #[arg(short, long, required = true, value_name = "PATH")]
        config: PathBuf,
    },
    /// Write the default configuration.
    Init {
        #[arg(value_name = "PATH")]
        output: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_eval_sources_list() {
        let cli = Cli::try_parse_from([
            "chaosmag", "eval", "-m", "model.toml", "-i", "points.csv", "-s", "tdep,gsm_e", "-S",
            "params.r_surf=6371.2",
        ])
        .unwrap();
        let Commands::Eval(args) = cli.command else {
            panic!("expected eval command");
        };
        assert_eq!(args.sources, vec!["tdep", "gsm_e"]);
        assert_eq!(args.config.set_values, vec!["params.r_surf=6371.2"]);
    }

    #[test]
    fn time_requires_exactly_one_input() {
        assert!(Cli::try_parse_from(["chaosmag", "time"]).is_err());
        assert!(Cli::try_parse_from(["chaosmag", "time", "--mjd", "1", "--dyear", "2000"]).is_err());
        assert!(Cli::try_parse_from(["chaosmag", "time", "--mjd", "-365.25"]).is_ok());
    }
}
