//! # fhirgate-schema: FHIR Schema Dispatch & Error Resolution
//!
//! Validates FHIR resources against the published FHIR JSON Schemas and
//! reports only the errors that matter.
//!
//! A FHIR schema is one large `oneOf` over every resource type. A generic
//! validator run against it reports failures from *every* alternative the
//! document does not match, which buries the one real problem under
//! hundreds of irrelevant ones. This crate reads the document's
//! `resourceType`, dispatches it to the single matching alternative, and
//! keeps only that alternative's errors.
//!
//! ## Components
//!
//! - [`SchemaRegistry`] / [`FhirSchema`]: loads and compiles schemas per
//!   [`FhirVersion`](fhirgate_core::FhirVersion) and indexes their
//!   branches.
//! - [`BranchLocator`]: discriminator value to branch index.
//! - [`StructuralValidator`]: full validation with per-branch provenance.
//! - [`resolver`]: reduces the raw error tree to field diagnostics.
//! - [`FastPathChecker`]: yes/no validity.
//! - [`ValidationSession`]: the façade over values, text, files, and
//!   directories.
//!
//! ## Example
//!
//! ```no_run
//! use fhirgate_core::FhirVersion;
//! use fhirgate_schema::{SchemaRegistry, ValidationSession};
//!
//! let registry = SchemaRegistry::load("schemas", &[FhirVersion::R4])?;
//! let session = ValidationSession::from_registry(&registry, FhirVersion::R4)?;
//! let results = session.validate_path("resources/", true);
//! println!("{}", serde_json::to_string_pretty(&results)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Crate Policy
//!
//! - Depends only on `fhirgate-core` internally.
//! - Schemas are never fetched over the network; external `$ref`s resolve
//!   from files registered alongside the FHIR schema.
//! - Construction errors are [`SchemaError`]s. Per-document problems are
//!   results, never errors.

pub mod config;
pub mod error;
pub mod error_tree;
pub mod fast_path;
pub mod locator;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod structural;

pub use config::SessionConfig;
pub use error::SchemaError;
pub use error_tree::{ErrorTree, PathSegment, RawError};
pub use fast_path::FastPathChecker;
pub use locator::{BranchLocator, DispatchError, Located};
pub use registry::{Branch, BranchIndex, FhirSchema, SchemaRegistry};
pub use session::ValidationSession;
pub use structural::StructuralValidator;
