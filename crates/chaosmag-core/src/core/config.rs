use crate::core::coordinates::geodetic::Ellipsoid;
use phf::{Map, phf_map};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_R_SURF: f64 = 6371.2;
pub const DEFAULT_R_CMB: f64 = 3485.0;
pub const DEFAULT_DIPOLE: [f64; 3] = [-29442.0, -1501.0, 4797.1];
pub const DEFAULT_ELLIPSOID: [f64; 2] = [6378.137, 6356.752];
pub const DEFAULT_CHAOS_VERSION: &str = "8.3";
pub const DEFAULT_CDF_TO_MJD: i64 = 730485;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("\"{0}\" is not a valid parameter")]
    UnknownKey(String),
    #[error("Key \"{key}\": {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Float,
    Int,
    Vector(usize),
    Version,
    Path,
}

static CONFIG_KEYS: Map<&'static str, ValueKind> = phf_map! {
    "params.r_surf" => ValueKind::Float,
    "params.r_cmb" => ValueKind::Float,
    "params.dipole" => ValueKind::Vector(3),
    "params.ellipsoid" => ValueKind::Vector(2),
    "params.chaos_version" => ValueKind::Version,
    "params.cdf_to_mjd" => ValueKind::Int,
    "file.rc_index" => ValueKind::Path,
    "file.gsm_spectrum" => ValueKind::Path,
    "file.sm_spectrum" => ValueKind::Path,
    "file.earth_conductivity" => ValueKind::Path,
};

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Float(f64),
    Int(i64),
    Vector(Vec<f64>),
    Text(String),
    Path(Option<PathBuf>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    pub r_surf: f64,
    pub r_cmb: f64,
    pub dipole: [f64; 3],
    pub ellipsoid: [f64; 2],
    pub chaos_version: String,
    pub cdf_to_mjd: i64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            r_surf: DEFAULT_R_SURF,
            r_cmb: DEFAULT_R_CMB,
            dipole: DEFAULT_DIPOLE,
            ellipsoid: DEFAULT_ELLIPSOID,
            chaos_version: DEFAULT_CHAOS_VERSION.to_string(),
            cdf_to_mjd: DEFAULT_CDF_TO_MJD,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Files {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rc_index: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gsm_spectrum: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sm_spectrum: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earth_conductivity: Option<PathBuf>,
}

/// Parameters and file locations shared by the model evaluation routines.
///
/// Values are addressed by dotted keys (`"params.r_surf"`, `"file.rc_index"`)
/// and every assignment is validated against the kind registered for the key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub params: Params,
    #[serde(rename = "file")]
    pub files: Files,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    params: BTreeMap<String, toml::Value>,
    #[serde(default)]
    file: BTreeMap<String, toml::Value>,
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn check_float(key: &str, s: &str) -> Result<f64, ConfigError> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| invalid(key, format!("Could not convert {} to float.", s)))
}

fn check_int(key: &str, s: &str) -> Result<i64, ConfigError> {
    s.trim()
        .parse::<i64>()
        .map_err(|_| invalid(key, format!("Could not convert {} to integer.", s)))
}

fn check_vector(key: &str, s: &str, len: usize) -> Result<Vec<f64>, ConfigError> {
    let inner = s.trim().trim_start_matches('[').trim_end_matches(']');
    let values = inner
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| invalid(key, format!("Not a valid vector. {}", e)))?;
    if values.len() != len {
        return Err(invalid(
            key,
            format!("Not a valid vector. Wrong length: {} != {}.", values.len(), len),
        ));
    }
    Ok(values)
}

fn check_version_string(key: &str, s: &str) -> Result<String, ConfigError> {
    let s = s.trim();
    // Some `<digits>.<digits>` anywhere in the string.
    let has_version = s
        .as_bytes()
        .windows(3)
        .any(|w| w[0].is_ascii_digit() && w[1] == b'.' && w[2].is_ascii_digit());
    if has_version {
        Ok(s.to_string())
    } else {
        Err(invalid(
            key,
            format!(
                "Not supported version format \"{}\". Must be of the form \"x.x\" with x an integer.",
                s
            ),
        ))
    }
}

fn check_path_exists(key: &str, s: &str) -> Result<Option<PathBuf>, ConfigError> {
    let s = s.trim();
    if s.is_empty() || s == "None" {
        return Ok(None);
    }
    let path = PathBuf::from(s);
    if path.exists() {
        Ok(Some(path))
    } else {
        Err(invalid(key, format!("{} does not exist.", s)))
    }
}

fn toml_to_text(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(toml_to_text).collect();
            format!("[{}]", parts.join(", "))
        }
        other => other.to_string(),
    }
}

fn format_vector(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys() -> impl Iterator<Item = &'static str> {
        let mut keys: Vec<&'static str> = CONFIG_KEYS.keys().copied().collect();
        keys.sort_unstable();
        keys.into_iter()
    }

    /// Parses and validates `value` for `key`, then stores it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let kind = CONFIG_KEYS
            .get(key)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        let parsed = match kind {
            ValueKind::Float => Value::Float(check_float(key, value)?),
            ValueKind::Int => Value::Int(check_int(key, value)?),
            ValueKind::Vector(len) => Value::Vector(check_vector(key, value, *len)?),
            ValueKind::Version => Value::Text(check_version_string(key, value)?),
            ValueKind::Path => Value::Path(check_path_exists(key, value)?),
        };
        self.store(key, parsed);
        Ok(())
    }

    fn store(&mut self, key: &str, value: Value) {
        match (key, value) {
            ("params.r_surf", Value::Float(v)) => self.params.r_surf = v,
            ("params.r_cmb", Value::Float(v)) => self.params.r_cmb = v,
            ("params.dipole", Value::Vector(v)) => {
                self.params.dipole.copy_from_slice(&v);
            }
            ("params.ellipsoid", Value::Vector(v)) => {
                self.params.ellipsoid.copy_from_slice(&v);
            }
            ("params.chaos_version", Value::Text(v)) => self.params.chaos_version = v,
            ("params.cdf_to_mjd", Value::Int(v)) => self.params.cdf_to_mjd = v,
            ("file.rc_index", Value::Path(v)) => self.files.rc_index = v,
            ("file.gsm_spectrum", Value::Path(v)) => self.files.gsm_spectrum = v,
            ("file.sm_spectrum", Value::Path(v)) => self.files.sm_spectrum = v,
            ("file.earth_conductivity", Value::Path(v)) => self.files.earth_conductivity = v,
            (key, value) => unreachable!("value {:?} does not match key {}", value, key),
        }
    }

    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        let path_text = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "None".to_string())
        };
        let text = match key {
            "params.r_surf" => self.params.r_surf.to_string(),
            "params.r_cmb" => self.params.r_cmb.to_string(),
            "params.dipole" => format_vector(&self.params.dipole),
            "params.ellipsoid" => format_vector(&self.params.ellipsoid),
            "params.chaos_version" => self.params.chaos_version.clone(),
            "params.cdf_to_mjd" => self.params.cdf_to_mjd.to_string(),
            "file.rc_index" => path_text(&self.files.rc_index),
            "file.gsm_spectrum" => path_text(&self.files.gsm_spectrum),
            "file.sm_spectrum" => path_text(&self.files.sm_spectrum),
            "file.earth_conductivity" => path_text(&self.files.earth_conductivity),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        };
        Ok(text)
    }

    pub fn reset(&mut self, key: &str) -> Result<(), ConfigError> {
        let defaults = Config::default();
        let value = defaults.get(key)?;
        self.set(key, &value)
    }

    pub fn full_reset(&mut self) {
        *self = Config::default();
    }

    pub fn load(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let raw: RawConfig = toml::from_str(&content).map_err(|e| ConfigError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        if raw.params.is_empty() && raw.file.is_empty() {
            warn!(
                "Configuration loaded from '{}' is empty.",
                path.to_string_lossy()
            );
        }

        for (section, table) in [("params", &raw.params), ("file", &raw.file)] {
            for (name, value) in table {
                let key = format!("{}.{}", section, name);
                self.set(&key, &toml_to_text(value))?;
            }
        }
        Ok(())
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.load(path)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        info!("Saved configuration file to {}.", path.to_string_lossy());
        Ok(())
    }

    /// Runs `f` against a copy of the configuration in which `key` is set to
    /// `value`. The receiver is left unchanged.
    pub fn with_override<T, F>(&self, key: &str, value: &str, f: F) -> Result<T, ConfigError>
    where
        F: FnOnce(&Config) -> T,
    {
        let mut scoped = self.clone();
        scoped.set(key, value)?;
        Ok(f(&scoped))
    }

    pub fn ellipsoid(&self) -> Ellipsoid {
        Ellipsoid::new(self.params.ellipsoid[0], self.params.ellipsoid[1])
    }

    pub fn dipole(&self) -> [f64; 3] {
        self.params.dipole
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = Config::keys()
            .map(|key| {
                let value = self.get(key).unwrap_or_default();
                format!("{}: {}", key, value)
            })
            .collect();
        write!(f, "{}", lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn default_config_matches_documented_values() {
        let config = Config::default();
        assert_eq!(config.params.r_surf, 6371.2);
        assert_eq!(config.params.r_cmb, 3485.0);
        assert_eq!(config.params.dipole, [-29442.0, -1501.0, 4797.1]);
        assert_eq!(config.params.ellipsoid, [6378.137, 6356.752]);
        assert_eq!(config.params.chaos_version, "8.3");
        assert_eq!(config.params.cdf_to_mjd, 730485);
        assert!(config.files.rc_index.is_none());
    }

    #[test]
    fn set_parses_and_stores_valid_values() {
        let mut config = Config::new();
        config.set("params.r_surf", "6000").unwrap();
        config.set("params.dipole", "[1.0, 2.0, 3.0]").unwrap();
        config.set("params.chaos_version", "7.13").unwrap();
        assert_eq!(config.params.r_surf, 6000.0);
        assert_eq!(config.params.dipole, [1.0, 2.0, 3.0]);
        assert_eq!(config.params.chaos_version, "7.13");
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut config = Config::new();
        let err = config.set("params.unknown", "1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
    }

    #[test]
    fn set_rejects_vector_of_wrong_length() {
        let mut config = Config::new();
        let err = config.set("params.ellipsoid", "1 2 3").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert_eq!(config.params.ellipsoid, DEFAULT_ELLIPSOID);
    }

    #[test]
    fn set_rejects_malformed_version_string() {
        let mut config = Config::new();
        assert!(config.set("params.chaos_version", "eight").is_err());
        assert!(config.set("params.chaos_version", "8").is_err());
        assert!(config.set("params.chaos_version", "8.").is_err());
        assert!(config.set("params.chaos_version", ".8").is_err());
    }

    #[test]
    fn set_accepts_version_anywhere_in_string() {
        let mut config = Config::new();
        for version in [".8.3", "CHAOS-7.13", "v8.3beta"] {
            config.set("params.chaos_version", version).unwrap();
            assert_eq!(config.params.chaos_version, version);
        }
    }

    #[test]
    fn set_rejects_missing_path_and_accepts_none() {
        let mut config = Config::new();
        assert!(config.set("file.rc_index", "/no/such/file.dat").is_err());
        config.set("file.rc_index", "None").unwrap();
        assert!(config.files.rc_index.is_none());
    }

    #[test]
    fn reset_restores_default_for_single_key() {
        let mut config = Config::new();
        config.set("params.r_surf", "10").unwrap();
        config.set("params.r_cmb", "20").unwrap();
        config.reset("params.r_surf").unwrap();
        assert_eq!(config.params.r_surf, DEFAULT_R_SURF);
        assert_eq!(config.params.r_cmb, 20.0);
        config.full_reset();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn with_override_leaves_original_untouched() {
        let config = Config::new();
        let radius = config
            .with_override("params.r_surf", "10", |c| c.params.r_surf)
            .unwrap();
        assert_eq!(radius, 10.0);
        assert_eq!(config.params.r_surf, DEFAULT_R_SURF);
    }

    #[test]
    fn save_and_load_preserve_values() {
        let dir = tempdir().unwrap();
        let rc_path = dir.path().join("rc.dat");
        File::create(&rc_path).unwrap();

        let mut config = Config::new();
        config.set("params.r_surf", "6000.5").unwrap();
        config
            .set("file.rc_index", rc_path.to_str().unwrap())
            .unwrap();

        let path = dir.path().join("config.toml");
        config.save(&path).unwrap();
        let loaded = Config::from_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_validates_values_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        let mut file = File::create(&path).unwrap();
        writeln!(
            file,
            r#"
            [params]
            ellipsoid = [1.0]
            "#
        )
        .unwrap();
        let err = Config::from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn load_rejects_unknown_section() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("typo.toml");
        let mut file = File::create(&path).unwrap();
        writeln!(
            file,
            r#"
            [parmas]
            r_surf = 6000.0
            "#
        )
        .unwrap();
        let err = Config::from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn load_rejects_unknown_key_in_known_section() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("typo.toml");
        let mut file = File::create(&path).unwrap();
        writeln!(
            file,
            r#"
            [params]
            r_surface = 6000.0
            "#
        )
        .unwrap();
        let err = Config::from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(key) if key == "params.r_surface"));
    }

    #[test]
    fn display_lists_sorted_keys() {
        let text = Config::default().to_string();
        let first = text.lines().next().unwrap();
        assert!(first.starts_with("file.earth_conductivity: None"));
        assert!(text.contains("params.r_surf: 6371.2"));
    }
}
