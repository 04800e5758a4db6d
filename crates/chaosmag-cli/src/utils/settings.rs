use crate::cli::ConfigOptions;
use crate::error::{CliError, Result};
use chaosmag::core::config::Config;
use tracing::{debug, info};

/// Splits a `KEY=VALUE` assignment.
pub fn parse_assignment(text: &str) -> Result<(&str, &str)> {
    text.split_once('=')
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| CliError::Argument(format!("expected KEY=VALUE, got '{}'", text)))
}

/// Configuration from the optional file with command-line overrides applied.
pub fn load_config(options: &ConfigOptions) -> Result<Config> {
    let mut config = match &options.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            Config::from_path(path)?
        }
        None => Config::default(),
    };
    for assignment in &options.set_values {
        let (key, value) = parse_assignment(assignment)?;
        debug!("Overriding {} = {}", key, value);
        config.set(key, value)?;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assignments() {
        assert_eq!(parse_assignment("params.r_surf = 6371.0").unwrap(), ("params.r_surf", "6371.0"));
        assert!(matches!(parse_assignment("params.r_surf"), Err(CliError::Argument(_))));
        assert!(matches!(parse_assignment("=1"), Err(CliError::Argument(_))));
    }

    #[test]
    fn applies_overrides_to_defaults() {
        let options = ConfigOptions {
            config: None,
            set_values: vec!["params.r_cmb=3480.0".to_string()],
        };
        let config = load_config(&options).unwrap();
        assert_eq!(config.params.r_cmb, 3480.0);
    }

    #[test]
    fn rejects_unknown_keys() {
        let options = ConfigOptions {
            config: None,
            set_values: vec!["params.unknown=1".to_string()],
        };
        assert!(matches!(load_config(&options), Err(CliError::Config(_))));
    }
}
