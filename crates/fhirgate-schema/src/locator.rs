//! # Branch Locator
//!
//! Maps a document to the single union branch it claims to be, using the
//! schema's discriminator field (`resourceType` for FHIR). Lookup is a
//! hash of `<prefix><value>` against the references precomputed by the
//! registry.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::registry::{BranchIndex, FhirSchema};

/// Why no branch could be selected for a document.
///
/// The `Display` text is the diagnostic reported for the document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The document has no discriminator field (or is not an object).
    #[error("Missing {field}")]
    Missing { field: String },

    /// The discriminator is present but names no branch. Non-string values
    /// are rendered as JSON text.
    #[error("Unexpected {field}: {value}")]
    Unrecognized { field: String, value: String },
}

/// A successfully located branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub index: BranchIndex,
    pub discriminator: String,
    /// More than one branch declares this discriminator; `index` is the
    /// first of them.
    pub ambiguous: bool,
}

/// Discriminator-based branch lookup for one schema.
#[derive(Debug, Clone)]
pub struct BranchLocator {
    schema: Arc<FhirSchema>,
}

impl BranchLocator {
    pub fn new(schema: Arc<FhirSchema>) -> Self {
        Self { schema }
    }

    /// Select the branch `document` should be validated against.
    pub fn locate(&self, document: &Value) -> Result<Located, DispatchError> {
        let field = self.schema.discriminator_field();
        let value = document
            .as_object()
            .and_then(|object| object.get(field))
            .ok_or_else(|| DispatchError::Missing {
                field: field.to_string(),
            })?;

        let unrecognized = || DispatchError::Unrecognized {
            field: field.to_string(),
            value: match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        };

        let name = value.as_str().ok_or_else(unrecognized)?;
        let index = self
            .schema
            .branch_for_discriminator(name)
            .ok_or_else(unrecognized)?;

        let ambiguous = self.schema.is_ambiguous(name);
        if ambiguous {
            tracing::warn!(
                version = %self.schema.version(),
                discriminator = %name,
                branch = %index,
                "ambiguous discriminator; using first declared branch"
            );
        }

        Ok(Located {
            index,
            discriminator: name.to_string(),
            ambiguous,
        })
    }
}
