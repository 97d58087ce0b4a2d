//! # fhirgate-cli: Command-Line Interface
//!
//! Provides the `fhirgate` binary.
//!
//! ## Subcommands
//!
//! - `fhirgate validate <PATH>`: validate a resource file or directory and
//!   print the result map as JSON.
//! - `fhirgate versions`: list the supported FHIR schema versions.
//!
//! ```bash
//! fhirgate validate resources/ --fhir-version r4 --verbose-errors --pretty
//! fhirgate --config fhirgate.yaml validate patient.json --output report.json
//! ```
//!
//! ## Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | every document is valid |
//! | 1 | at least one document is invalid |
//! | 2 | operational error (bad version, unreadable schema, unwritable output) |
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; validation logic lives in
//!   `fhirgate-schema`.
//! - Results go to stdout (or `--output`); logs go to stderr.

pub mod validate;
pub mod versions;

use std::path::Path;

use anyhow::{Context, Result};
use fhirgate_schema::SessionConfig;

/// Exit code when every document is valid.
pub const EXIT_VALID: u8 = 0;
/// Exit code when any document is invalid.
pub const EXIT_INVALID: u8 = 1;
/// Exit code for operational errors.
pub const EXIT_ERROR: u8 = 2;

/// Build the session configuration from defaults, an optional YAML file,
/// and `FHIRGATE_*` environment variables, in that order of precedence.
/// Subcommand flags are applied on top by the caller.
pub fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    let base = match path {
        Some(path) => SessionConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    base.apply_env().context("invalid environment override")
}
