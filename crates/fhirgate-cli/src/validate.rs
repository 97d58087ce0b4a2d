//! # Validate Subcommand
//!
//! Validates a FHIR resource file, or every `*.json` file under a
//! directory, and writes the result map as JSON.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use fhirgate_core::ValidationBatchResult;
use fhirgate_schema::{SessionConfig, ValidationSession};

use crate::{EXIT_INVALID, EXIT_VALID};

/// Arguments for the `fhirgate validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Resource file or directory to validate.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// FHIR schema version (stu3, r4, r4b, r5).
    #[arg(long, value_name = "VERSION")]
    pub fhir_version: Option<String>,

    /// Report per-field errors instead of `false` for invalid resources.
    #[arg(long)]
    pub verbose_errors: bool,

    /// Directory containing `fhir.<version>.schema.json` files.
    #[arg(long, value_name = "DIR")]
    pub schema_dir: Option<PathBuf>,

    /// Worker threads for directory validation (0 = available parallelism).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Write results to this file instead of stdout.
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pub pretty: bool,
}

impl ValidateArgs {
    /// Layer these flags over a loaded configuration.
    pub fn apply(&self, mut config: SessionConfig) -> SessionConfig {
        if let Some(version) = &self.fhir_version {
            config.version = version.clone();
        }
        if let Some(dir) = &self.schema_dir {
            config.schema_dir = dir.clone();
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if self.verbose_errors {
            config.verbose = true;
        }
        config
    }
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 when every resource is valid, 1 otherwise.
/// Operational failures are returned as errors.
pub fn run_validate(args: &ValidateArgs, config: SessionConfig) -> Result<u8> {
    let config = args.apply(config);
    let session = ValidationSession::from_config(&config).with_context(|| {
        format!(
            "failed to build {} validator from {}",
            config.version,
            config.schema_dir.display()
        )
    })?;

    tracing::info!(
        version = %session.fhir_version(),
        path = %args.path.display(),
        verbose = config.verbose,
        "validating"
    );

    let results = session.validate_path(&args.path, config.verbose);
    let rendered = render(&results, args.pretty)?;

    match &args.output {
        Some(output) => std::fs::write(output, rendered.as_bytes())
            .with_context(|| format!("failed to write {}", output.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{rendered}").context("failed to write to stdout")?;
        }
    }

    let invalid = results.invalid_count();
    tracing::info!(documents = results.len(), invalid, "validation complete");

    if invalid == 0 {
        Ok(EXIT_VALID)
    } else {
        Ok(EXIT_INVALID)
    }
}

/// Serialize results as JSON.
pub fn render(results: &ValidationBatchResult, pretty: bool) -> Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(results)
    } else {
        serde_json::to_string(results)
    };
    rendered.context("failed to serialize results")
}
