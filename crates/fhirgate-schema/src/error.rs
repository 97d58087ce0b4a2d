//! # Schema Errors
//!
//! Failures that prevent a validation session from being constructed.
//! Once a session exists, nothing a single document contains can produce
//! one of these: per-document problems are reported as
//! [`fhirgate_core::ResolvedDiagnostics`].

use std::path::PathBuf;

use fhirgate_core::{FhirVersion, FhirgateError};
use thiserror::Error;

/// Error while loading, compiling, or configuring FHIR schemas.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Error from the core vocabulary (e.g. an unsupported version name).
    #[error(transparent)]
    Core(#[from] FhirgateError),

    /// A schema file could not be read or is not valid JSON.
    #[error("schema load error for '{}': {reason}", path.display())]
    SchemaLoad {
        /// File that failed to load.
        path: PathBuf,
        /// Reason the file could not be loaded.
        reason: String,
    },

    /// The schema document is JSON but lacks the union shape this engine
    /// relies on (a root `oneOf` of `$ref` entries sharing one prefix).
    #[error("malformed {version} schema: {reason}")]
    MalformedSchema {
        version: FhirVersion,
        reason: String,
    },

    /// The `jsonschema` crate rejected the schema.
    #[error("cannot compile {version} schema: {reason}")]
    SchemaCompile {
        version: FhirVersion,
        reason: String,
    },

    /// A session asked for a version the registry was not loaded with.
    #[error("schema version {0} is not loaded")]
    VersionNotLoaded(FhirVersion),

    /// A configuration file could not be read or parsed.
    #[error("config error for '{}': {reason}", path.display())]
    Config {
        path: PathBuf,
        reason: String,
    },

    /// Configuration text is not valid YAML for [`crate::SessionConfig`].
    #[error("invalid config: {reason}")]
    ConfigSyntax { reason: String },

    /// An environment override carried an unusable value.
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidEnv {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
