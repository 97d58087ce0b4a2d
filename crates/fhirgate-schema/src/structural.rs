//! # Structural Validation
//!
//! Full validation of a document against the union schema, producing an
//! [`ErrorTree`] that keeps track of which branch every sub-error came from.
//!
//! The union validator reports a failed `oneOf` as a single top-level
//! error. Its per-branch detail comes from the registry's branch validator:
//! the document is wrapped as `{"i": document}` for each branch `i` in
//! scope, so instance path `/i/...` belongs to branch `i`. Those errors are
//! re-rooted to schema paths of the form `/i/<path inside the branch>` and
//! attached as the top-level error's context.
//!
//! ## Scope
//!
//! When the discriminator names a branch, only that branch is evaluated.
//! The document is then copied once regardless of the union's size. A
//! document whose discriminator names no branch is evaluated against every
//! branch.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error_tree::{parse_pointer, ErrorTree, PathSegment, RawError};
use crate::registry::{BranchIndex, FhirSchema};

/// Runs the union schema and branch validator for one compiled schema.
#[derive(Debug, Clone)]
pub struct StructuralValidator {
    schema: Arc<FhirSchema>,
}

impl StructuralValidator {
    pub fn new(schema: Arc<FhirSchema>) -> Self {
        Self { schema }
    }

    /// Validate `document`. `Ok(())` means the document satisfies the
    /// union schema.
    pub fn validate(&self, document: &Value) -> Result<(), ErrorTree> {
        let mut errors: Vec<RawError> = self
            .schema
            .union_validator()
            .iter_errors(document)
            .map(|e| {
                RawError::new(
                    parse_pointer(&e.instance_path.to_string()),
                    parse_pointer(&e.schema_path.to_string()),
                    e.to_string(),
                )
            })
            .collect();

        if errors.is_empty() {
            return Ok(());
        }

        if errors.iter().any(RawError::is_union_violation) {
            let context = match self.declared_branch(document) {
                Some(index) => self.branch_errors(document, &[index]),
                None => self.branch_errors(document, &self.all_branches()),
            };
            for error in errors.iter_mut().filter(|e| e.is_union_violation()) {
                error.context = context.clone();
            }
        }

        Err(ErrorTree::new(errors))
    }

    /// Errors from the given union alternatives, each with the
    /// alternative's index as schema path element 0.
    ///
    /// The document is copied once per requested branch.
    pub fn branch_errors(&self, document: &Value, branches: &[BranchIndex]) -> Vec<RawError> {
        let wrapped: Map<String, Value> = branches
            .iter()
            .filter(|index| index.get() < self.schema.branch_count())
            .map(|index| (index.to_string(), document.clone()))
            .collect();
        let wrapped = Value::Object(wrapped);

        self.schema
            .branch_validator()
            .iter_errors(&wrapped)
            .filter_map(|e| {
                let mut instance_path = parse_pointer(&e.instance_path.to_string());
                let branch = instance_path.first().and_then(PathSegment::as_index)?;
                instance_path.remove(0);
                let schema_path = rebase_schema_path(parse_pointer(&e.schema_path.to_string()), branch);
                Some(RawError::new(instance_path, schema_path, e.to_string()))
            })
            .collect()
    }

    /// The branch named by the document's discriminator, if any.
    fn declared_branch(&self, document: &Value) -> Option<BranchIndex> {
        document
            .get(self.schema.discriminator_field())
            .and_then(Value::as_str)
            .and_then(|name| self.schema.branch_for_discriminator(name))
    }

    fn all_branches(&self) -> Vec<BranchIndex> {
        self.schema.branches().iter().map(|b| b.index).collect()
    }
}

/// Replace the branch validator's `/properties/<i>` prefix with the bare
/// branch index.
fn rebase_schema_path(schema_path: Vec<PathSegment>, branch: usize) -> Vec<PathSegment> {
    let start = schema_path
        .iter()
        .position(|segment| *segment == PathSegment::Index(branch))
        .map_or(0, |p| p + 1);

    let mut rebased = Vec::with_capacity(schema_path.len() + 1 - start);
    rebased.push(PathSegment::Index(branch));
    rebased.extend(schema_path.into_iter().skip(start));
    rebased
}
