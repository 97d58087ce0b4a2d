//! # Versions Subcommand
//!
//! Lists the supported FHIR schema versions and whether each one's schema
//! file is present in the configured schema directory.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use fhirgate_core::FhirVersion;
use fhirgate_schema::SessionConfig;

use crate::EXIT_VALID;

/// Arguments for the `fhirgate versions` subcommand.
#[derive(Args, Debug)]
pub struct VersionsArgs {
    /// Directory to check for `fhir.<version>.schema.json` files.
    #[arg(long, value_name = "DIR")]
    pub schema_dir: Option<PathBuf>,
}

/// Execute the versions subcommand.
pub fn run_versions(args: &VersionsArgs, config: SessionConfig) -> Result<u8> {
    let schema_dir = args.schema_dir.clone().unwrap_or(config.schema_dir);
    let mut stdout = std::io::stdout().lock();
    for line in version_lines(&schema_dir) {
        writeln!(stdout, "{line}").context("failed to write to stdout")?;
    }
    Ok(EXIT_VALID)
}

/// One line per supported version: name, schema file, availability.
pub fn version_lines(schema_dir: &Path) -> Vec<String> {
    FhirVersion::ALL
        .iter()
        .map(|version| {
            let file = version.schema_file_name();
            let status = if schema_dir.join(&file).is_file() {
                "available"
            } else {
                "missing"
            };
            format!("{:<5} {file:<22} {status}", version.as_str())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_version() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fhir.r4.schema.json"), "{}").unwrap();

        let lines = version_lines(dir.path());
        assert_eq!(lines.len(), FhirVersion::ALL.len());
        assert!(lines[0].starts_with("stu3") && lines[0].ends_with("missing"));
        assert!(lines[1].starts_with("r4 ") && lines[1].ends_with("available"));
        assert!(lines.iter().all(|l| l.contains(".schema.json")));
    }
}
