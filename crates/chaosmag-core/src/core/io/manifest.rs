use crate::core::harmonics::n_coeffs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
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
    #[error("Invalid manifest: {0}")]
    Invalid(String),
}

fn default_leap_year() -> bool {
    true
}

fn default_external_degree() -> usize {
    2
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct InternalSection {
    /// SHC file of the time-dependent core field.
    pub tdep: PathBuf,
    /// SHC file of the static (crustal) field.
    #[serde(rename = "static", default)]
    pub static_field: Option<PathBuf>,
}

/// Piecewise-constant baseline corrections of the SM degree-1 coefficients.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DeltaSection {
    pub breaks: Vec<f64>,
    pub q10: Vec<f64>,
    pub q11: Vec<f64>,
    pub s11: Vec<f64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ExternalSection {
    #[serde(default = "default_external_degree")]
    pub n_gsm: usize,
    #[serde(default = "default_external_degree")]
    pub n_sm: usize,
    pub coeffs_gsm: Vec<f64>,
    pub coeffs_sm: Vec<f64>,
    #[serde(default)]
    pub delta: Option<DeltaSection>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct ResourceSection {
    pub rc_index: Option<PathBuf>,
    pub gsm_spectrum: Option<PathBuf>,
    pub sm_spectrum: Option<PathBuf>,
}

/// Description of a CHAOS model on disk.
///
/// ```toml
/// name = "CHAOS-7.13"
///
/// [internal]
/// tdep = "CHAOS-7.13_tdep.shc"
/// static = "CHAOS-7.13_static.shc"
///
/// [external]
/// coeffs_gsm = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
/// coeffs_sm = [-12.0, 0.5, -0.8, 0.0, 0.0, 0.0, 0.0, 0.0]
///
/// [external.delta]
/// breaks = [0.0, 1000.0, 2000.0]
/// q10 = [1.0, -0.5]
/// q11 = [0.0, 0.1]
/// s11 = [0.0, 0.2]
///
/// [resources]
/// rc_index = "RC.dat"
/// ```
///
/// Relative paths are resolved against the directory of the manifest.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ModelManifest {
    pub name: String,
    #[serde(default = "default_leap_year")]
    pub leap_year: bool,
    pub internal: InternalSection,
    pub external: ExternalSection,
    #[serde(default)]
    pub resources: ResourceSection,
}

impl ModelManifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let mut manifest: ModelManifest = toml::from_str(&content).map_err(|e| ManifestError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        manifest.validate()?;
        if let Some(base) = path.parent() {
            manifest.resolve_paths(base);
        }
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        let external = &self.external;
        for (label, degree, coeffs) in [
            ("coeffs_gsm", external.n_gsm, &external.coeffs_gsm),
            ("coeffs_sm", external.n_sm, &external.coeffs_sm),
        ] {
            if coeffs.len() != n_coeffs(degree) {
                return Err(ManifestError::Invalid(format!(
                    "{} must have {} entries for degree {}, found {}",
                    label,
                    n_coeffs(degree),
                    degree,
                    coeffs.len()
                )));
            }
        }
        if external.n_sm == 0 {
            return Err(ManifestError::Invalid("n_sm must be at least 1".to_string()));
        }
        if let Some(delta) = &external.delta {
            let pieces = delta.breaks.len().saturating_sub(1);
            if pieces == 0 || delta.breaks.windows(2).any(|w| w[0] >= w[1]) {
                return Err(ManifestError::Invalid(
                    "delta breaks must contain at least two strictly increasing values".to_string(),
                ));
            }
            for (label, values) in [("q10", &delta.q10), ("q11", &delta.q11), ("s11", &delta.s11)] {
                if values.len() != pieces {
                    return Err(ManifestError::Invalid(format!(
                        "delta {} must have {} entries, found {}",
                        label,
                        pieces,
                        values.len()
                    )));
                }
            }
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.internal.tdep);
        for path in [
            self.internal.static_field.as_mut(),
            self.resources.rc_index.as_mut(),
            self.resources.gsm_spectrum.as_mut(),
            self.resources.sm_spectrum.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            resolve(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const MANIFEST: &str = r#"
name = "CHAOS-test"

[internal]
tdep = "tdep.shc"
static = "/abs/static.shc"

[external]
coeffs_gsm = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
coeffs_sm = [-12.0, 0.5, -0.8, 0.0, 0.0, 0.0, 0.0, 0.0]

[external.delta]
breaks = [0.0, 1000.0, 2000.0]
q10 = [1.0, -0.5]
q11 = [0.0, 0.1]
s11 = [0.0, 0.2]

[resources]
rc_index = "RC.dat"
"#;

    fn write_manifest(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("model.toml");
        let mut file = File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        path
    }

    #[test]
    fn load_parses_sections_and_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let path = write_manifest(dir.path(), MANIFEST);
        let manifest = ModelManifest::load(&path).unwrap();

        assert_eq!(manifest.name, "CHAOS-test");
        assert!(manifest.leap_year);
        assert_eq!(manifest.external.n_gsm, 2);
        assert_eq!(manifest.internal.tdep, dir.path().join("tdep.shc"));
        assert_eq!(manifest.internal.static_field, Some(PathBuf::from("/abs/static.shc")));
        assert_eq!(manifest.resources.rc_index, Some(dir.path().join("RC.dat")));
        assert!(manifest.resources.gsm_spectrum.is_none());
        assert_eq!(manifest.external.delta.as_ref().unwrap().q11, vec![0.0, 0.1]);
    }

    #[test]
    fn load_rejects_wrong_coefficient_count() {
        let dir = tempdir().unwrap();
        let content = MANIFEST.replace("coeffs_gsm = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]", "coeffs_gsm = [1.0]");
        let path = write_manifest(dir.path(), &content);
        assert!(matches!(ModelManifest::load(&path), Err(ManifestError::Invalid(_))));
    }

    #[test]
    fn load_rejects_delta_length_mismatch() {
        let dir = tempdir().unwrap();
        let content = MANIFEST.replace("q10 = [1.0, -0.5]", "q10 = [1.0]");
        let path = write_manifest(dir.path(), &content);
        assert!(matches!(ModelManifest::load(&path), Err(ManifestError::Invalid(_))));
    }

    #[test]
    fn load_reports_missing_file_and_bad_toml() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            ModelManifest::load(&dir.path().join("missing.toml")),
            Err(ManifestError::Io { .. })
        ));
        let path = write_manifest(dir.path(), "name = \n");
        assert!(matches!(ModelManifest::load(&path), Err(ManifestError::Toml { .. })));
    }
}
