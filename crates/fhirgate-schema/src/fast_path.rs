//! Boolean-only validity check over the compiled union validator.

use std::sync::Arc;

use serde_json::Value;

use crate::registry::FhirSchema;

/// Yes/no validation. Uses the same compiled validator as
/// [`crate::StructuralValidator`], so the two never disagree.
#[derive(Debug, Clone)]
pub struct FastPathChecker {
    schema: Arc<FhirSchema>,
}

impl FastPathChecker {
    pub fn new(schema: Arc<FhirSchema>) -> Self {
        Self { schema }
    }

    pub fn is_valid(&self, document: &Value) -> bool {
        self.schema.union_validator().is_valid(document)
    }
}
