//! # Error Types
//!
//! Errors shared across fhirgate crates. Per-document problems (bad JSON,
//! unknown resource type, constraint violations) are never errors at this
//! level: they become [`crate::ResolvedDiagnostics`] values. Only failures
//! that stop a validator from being built live here.

use thiserror::Error;

/// Top-level error type for fhirgate.
#[derive(Error, Debug)]
pub enum FhirgateError {
    /// The requested schema version is not part of the supported vocabulary.
    #[error("unsupported schema version: {0:?} (expected one of stu3, r4, r4b, r5)")]
    UnsupportedVersion(String),
}
