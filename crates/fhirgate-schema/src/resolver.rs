//! # Error Resolution
//!
//! Reduces a raw, multi-branch [`ErrorTree`] to the diagnostics for the one
//! branch a document was dispatched to.
//!
//! ## States
//!
//! | Input | Outcome |
//! |-------|---------|
//! | no branch located | `TopLevel` with the dispatch message; validation never runs |
//! | validation passed | `Valid` |
//! | sub-errors from the located branch | `FieldErrors`, keyed by failing keyword |
//! | nothing attributable to the branch | `TopLevel` with the first raw message |
//!
//! Keys are the last schema path element of each kept sub-error, so two
//! failures of the same keyword at different fields share a key and the
//! later one (in schema path order) wins.

use fhirgate_core::ResolvedDiagnostics;

use crate::error_tree::ErrorTree;
use crate::locator::{DispatchError, Located};
use crate::registry::BranchIndex;

/// Message used if a failed validation somehow produced no errors at all.
const UNATTRIBUTED_FAILURE: &str = "document does not match the schema";

/// Diagnostics for a document whose branch could not be located.
pub fn resolve_dispatch_failure(error: &DispatchError) -> ResolvedDiagnostics {
    ResolvedDiagnostics::TopLevel(error.to_string())
}

/// Diagnostics for a document dispatched to `branch`, given the outcome of
/// structural validation.
pub fn resolve(branch: BranchIndex, outcome: Result<(), ErrorTree>) -> ResolvedDiagnostics {
    let tree = match outcome {
        Ok(()) => return ResolvedDiagnostics::Valid,
        Err(tree) => tree,
    };

    let mut diagnostics: Option<ResolvedDiagnostics> = None;
    let kept = tree
        .errors()
        .iter()
        .flat_map(|error| error.context.iter())
        .filter(|sub| sub.branch() == Some(branch.get()));

    for sub in kept {
        if let Some(key) = sub.constraint() {
            diagnostics
                .get_or_insert(ResolvedDiagnostics::Invalid)
                .merge_field_error(key, sub.message.clone());
        }
    }

    diagnostics.unwrap_or_else(|| {
        ResolvedDiagnostics::TopLevel(
            tree.first_message()
                .unwrap_or(UNATTRIBUTED_FAILURE)
                .to_string(),
        )
    })
}

/// Resolve a whole document: dispatch first, validate only if a branch
/// was found.
pub fn resolve_document<F>(dispatch: Result<Located, DispatchError>, validate: F) -> ResolvedDiagnostics
where
    F: FnOnce() -> Result<(), ErrorTree>,
{
    match dispatch {
        Ok(located) => resolve(located.index, validate()),
        Err(error) => resolve_dispatch_failure(&error),
    }
}
