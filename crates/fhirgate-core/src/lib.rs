//! # fhirgate-core: Foundational Types for fhirgate
//!
//! This crate defines the vocabulary shared by every other fhirgate crate:
//! which FHIR schema versions exist, what a validation result looks like,
//! and how a file path becomes a result key. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Closed version vocabulary.** [`FhirVersion`] is an exhaustive enum.
//!    Parsing an unknown version name fails with
//!    [`FhirgateError::UnsupportedVersion`] before any schema is touched.
//!
//! 2. **Results are a sum type, not a dictionary of mixed values.**
//!    [`ResolvedDiagnostics`] has one variant per outcome and serializes to
//!    `true`, `false`, a message string, or a `{constraint: message}` object.
//!
//! 3. **One merge rule.** Field errors are recorded through
//!    [`ResolvedDiagnostics::merge_field_error`] and batch entries through
//!    [`ValidationBatchResult::insert`]. Both are last-write-wins.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `fhirgate-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod diagnostics;
pub mod error;
pub mod version;

pub use diagnostics::{normalize_filename, ResolvedDiagnostics, ValidationBatchResult};
pub use error::FhirgateError;
pub use version::FhirVersion;
