//! # Session Configuration
//!
//! Settings for a [`crate::ValidationSession`], layered from lowest to
//! highest precedence:
//!
//! 1. built-in defaults
//! 2. a YAML file (`--config`)
//! 3. environment variables
//! 4. command-line flags (applied by the caller)
//!
//! ```yaml
//! schema_dir: /opt/fhir/schemas
//! version: r4
//! verbose: true
//! workers: 8
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use fhirgate_core::FhirVersion;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Overrides the schema directory.
pub const ENV_SCHEMA_DIR: &str = "FHIRGATE_SCHEMA_DIR";
/// Overrides the FHIR version.
pub const ENV_VERSION: &str = "FHIRGATE_VERSION";
/// Overrides the directory worker count.
pub const ENV_WORKERS: &str = "FHIRGATE_WORKERS";

/// Configuration for a validation session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Directory holding `fhir.<version>.schema.json` files.
    pub schema_dir: PathBuf,
    /// Schema version name. Validated when the session is built.
    pub version: String,
    /// Report per-field diagnostics instead of `false` for invalid
    /// documents.
    pub verbose: bool,
    /// Directory worker threads. `0` uses the available parallelism.
    pub workers: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            schema_dir: PathBuf::from("schemas"),
            version: FhirVersion::default().to_string(),
            verbose: false,
            workers: 0,
        }
    }
}

impl SessionConfig {
    /// Parse a YAML configuration file. Missing keys keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path).map_err(|e| SchemaError::Config {
            path: path.to_path_buf(),
            reason: format!("cannot read file: {e}"),
        })?;
        Self::from_yaml_str(&content).map_err(|e| match e {
            SchemaError::ConfigSyntax { reason } => SchemaError::Config {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse YAML text.
    ///
    /// # Errors
    ///
    /// [`SchemaError::ConfigSyntax`] for malformed YAML or unknown keys.
    pub fn from_yaml_str(content: &str) -> Result<Self, SchemaError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| SchemaError::ConfigSyntax {
            reason: format!("invalid YAML: {e}"),
        })
    }

    /// Apply `FHIRGATE_*` environment overrides.
    pub fn apply_env(self) -> Result<Self, SchemaError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self, SchemaError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get(ENV_SCHEMA_DIR) {
            self.schema_dir = PathBuf::from(dir);
        }
        if let Some(version) = get(ENV_VERSION) {
            self.version = version;
        }
        if let Some(raw) = get(ENV_WORKERS) {
            self.workers = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                SchemaError::InvalidEnv {
                    key: ENV_WORKERS,
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        Ok(self)
    }

    /// The configured version, parsed.
    pub fn fhir_version(&self) -> Result<FhirVersion, SchemaError> {
        Ok(FhirVersion::from_str(&self.version)?)
    }

    /// Effective worker count: the configured value, or the machine's
    /// available parallelism when unset.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(usize::from)
            .unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.schema_dir, PathBuf::from("schemas"));
        assert_eq!(config.fhir_version().unwrap(), FhirVersion::R4);
        assert!(!config.verbose);
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn test_yaml_partial_keeps_defaults() {
        let config = SessionConfig::from_yaml_str("version: stu3\nverbose: true\n").unwrap();
        assert_eq!(config.fhir_version().unwrap(), FhirVersion::Stu3);
        assert!(config.verbose);
        assert_eq!(config.schema_dir, PathBuf::from("schemas"));
        assert_eq!(SessionConfig::from_yaml_str("  \n").unwrap(), SessionConfig::default());
    }

    #[test]
    fn test_yaml_unknown_key_rejected() {
        let err = SessionConfig::from_yaml_str("verbos: true\n").unwrap_err();
        match err {
            SchemaError::ConfigSyntax { reason } => assert!(reason.contains("verbos"), "{reason}"),
            other => panic!("expected ConfigSyntax, got {other}"),
        }
    }

    #[test]
    fn test_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fhirgate.yaml");
        std::fs::write(&path, "schema_dir: /srv/schemas\nworkers: 3\n").unwrap();

        let config = SessionConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.schema_dir, PathBuf::from("/srv/schemas"));
        assert_eq!(config.worker_count(), 3);

        let err = SessionConfig::from_yaml_file(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, SchemaError::Config { .. }));
    }

    #[test]
    fn test_yaml_file_syntax_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "workers: [\n").unwrap();

        match SessionConfig::from_yaml_file(&path).unwrap_err() {
            SchemaError::Config { path: reported, reason } => {
                assert_eq!(reported, path);
                assert!(reason.starts_with("invalid YAML"), "{reason}");
            }
            other => panic!("expected Config, got {other}"),
        }
    }

    #[test]
    fn test_env_overrides_yaml() {
        let config = SessionConfig::from_yaml_str("version: stu3\nworkers: 2\n")
            .unwrap()
            .apply_env_from(env(&[
                (ENV_VERSION, "r5"),
                (ENV_SCHEMA_DIR, "/env/schemas"),
                (ENV_WORKERS, ""),
            ]))
            .unwrap();
        assert_eq!(config.version, "r5");
        assert_eq!(config.schema_dir, PathBuf::from("/env/schemas"));
        assert_eq!(config.workers, 2);
    }

    #[test]
    fn test_env_invalid_workers() {
        let err = SessionConfig::default()
            .apply_env_from(env(&[(ENV_WORKERS, "many")]))
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidEnv { key: ENV_WORKERS, .. }));
    }

    #[test]
    fn test_unsupported_version_surfaces_at_parse() {
        let config = SessionConfig {
            version: "fake".into(),
            ..SessionConfig::default()
        };
        assert!(matches!(
            config.fhir_version().unwrap_err(),
            SchemaError::Core(fhirgate_core::FhirgateError::UnsupportedVersion(_))
        ));
    }
}
