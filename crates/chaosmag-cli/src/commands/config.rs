use crate::cli::{ConfigArgs, ConfigCommands};
use crate::error::Result;
use crate::utils::settings::parse_assignment;
use chaosmag::core::config::Config;
use std::path::Path;
use tracing::info;

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show { config } => {
            println!("{}", open(config.as_deref())?);
        }
        ConfigCommands::Get { key, config } => {
            println!("{}", open(config.as_deref())?.get(&key)?);
        }
        ConfigCommands::Set { values, config } => {
            let mut current = if config.exists() {
                Config::from_path(&config)?
            } else {
                Config::default()
            };
            for assignment in &values {
                let (key, value) = parse_assignment(assignment)?;
                current.set(key, value)?;
            }
            current.save(&config)?;
            info!("Saved {} value(s) to {}", values.len(), config.display());
        }
        ConfigCommands::Init { output } => {
            Config::default().save(&output)?;
            println!("Default configuration written to {}", output.display());
        }
    }
    Ok(())
}

fn open(path: Option<&Path>) -> Result<Config> {
    Ok(match path {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_creates_and_updates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chaosmag.toml");
        run(ConfigArgs {
            command: ConfigCommands::Set {
                values: vec!["params.r_surf=6370.0".to_string()],
                config: path.clone(),
            },
        })
        .unwrap();
        assert_eq!(Config::from_path(&path).unwrap().params.r_surf, 6370.0);
    }
}
