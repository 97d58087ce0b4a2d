//! # Validation Results
//!
//! [`ResolvedDiagnostics`] is the outcome for one document and
//! [`ValidationBatchResult`] collects outcomes for many documents keyed by
//! normalized filename.
//!
//! ## Wire Format
//!
//! Results serialize to the compact shape consumers already expect:
//!
//! ```json
//! {
//!   "observation.json": true,
//!   "broken.json": "Unexpected resourceType: NotARealType",
//!   "patient.json": { "type": "123 is not of type \"string\"" }
//! }
//! ```
//!
//! `false` appears only for documents checked without diagnostics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Outcome of validating a single document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DiagnosticsRepr", into = "DiagnosticsRepr")]
pub enum ResolvedDiagnostics {
    /// The document satisfies the schema.
    Valid,
    /// The document does not satisfy the schema and no diagnostics were
    /// requested.
    Invalid,
    /// A single document-level message: unparseable input, a missing or
    /// unrecognized discriminator, or a violation that could not be
    /// attributed to a field.
    TopLevel(String),
    /// Violations keyed by the failing constraint keyword.
    FieldErrors(BTreeMap<String, String>),
}

impl ResolvedDiagnostics {
    /// Whether this outcome represents a valid document.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Record a field error. Any other state becomes `FieldErrors`; an
    /// existing entry under the same key is overwritten.
    pub fn merge_field_error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        match self {
            Self::FieldErrors(map) => {
                map.insert(key.into(), message.into());
            }
            _ => {
                let mut map = BTreeMap::new();
                map.insert(key.into(), message.into());
                *self = Self::FieldErrors(map);
            }
        }
    }

    /// The field error map, if this outcome carries one.
    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::FieldErrors(map) => Some(map),
            _ => None,
        }
    }

    /// The document-level message, if this outcome carries one.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::TopLevel(message) => Some(message),
            _ => None,
        }
    }
}

impl From<bool> for ResolvedDiagnostics {
    fn from(valid: bool) -> Self {
        if valid {
            Self::Valid
        } else {
            Self::Invalid
        }
    }
}

/// Serde shape of [`ResolvedDiagnostics`].
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum DiagnosticsRepr {
    Flag(bool),
    Message(String),
    Fields(BTreeMap<String, String>),
}

impl From<DiagnosticsRepr> for ResolvedDiagnostics {
    fn from(repr: DiagnosticsRepr) -> Self {
        match repr {
            DiagnosticsRepr::Flag(flag) => flag.into(),
            DiagnosticsRepr::Message(message) => Self::TopLevel(message),
            DiagnosticsRepr::Fields(map) => Self::FieldErrors(map),
        }
    }
}

impl From<ResolvedDiagnostics> for DiagnosticsRepr {
    fn from(diagnostics: ResolvedDiagnostics) -> Self {
        match diagnostics {
            ResolvedDiagnostics::Valid => Self::Flag(true),
            ResolvedDiagnostics::Invalid => Self::Flag(false),
            ResolvedDiagnostics::TopLevel(message) => Self::Message(message),
            ResolvedDiagnostics::FieldErrors(map) => Self::Fields(map),
        }
    }
}

// ---------------------------------------------------------------------------
// Batch results
// ---------------------------------------------------------------------------

/// Results for a set of documents, keyed by normalized filename.
///
/// Keys are unique. Inserting an existing key replaces its value, so two
/// files with the same basename in different directories collapse to one
/// entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationBatchResult(BTreeMap<String, ResolvedDiagnostics>);

impl ValidationBatchResult {
    /// An empty result set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A result set holding exactly one entry.
    pub fn single(identifier: impl Into<String>, diagnostics: ResolvedDiagnostics) -> Self {
        let mut result = Self::new();
        result.insert(identifier, diagnostics);
        result
    }

    /// Insert or replace the result for `identifier`.
    pub fn insert(&mut self, identifier: impl Into<String>, diagnostics: ResolvedDiagnostics) {
        self.0.insert(identifier.into(), diagnostics);
    }

    /// Merge every entry of `other` into `self`; entries from `other` win.
    pub fn merge(&mut self, other: ValidationBatchResult) {
        self.0.extend(other.0);
    }

    pub fn get(&self, identifier: &str) -> Option<&ResolvedDiagnostics> {
        self.0.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResolvedDiagnostics)> {
        self.0.iter()
    }

    /// `true` when every entry is [`ResolvedDiagnostics::Valid`]. An empty
    /// result set is vacuously valid.
    pub fn all_valid(&self) -> bool {
        self.0.values().all(ResolvedDiagnostics::is_valid)
    }

    /// Number of entries that are not valid.
    pub fn invalid_count(&self) -> usize {
        self.0.values().filter(|d| !d.is_valid()).count()
    }

    pub fn into_inner(self) -> BTreeMap<String, ResolvedDiagnostics> {
        self.0
    }
}

impl From<BTreeMap<String, ResolvedDiagnostics>> for ValidationBatchResult {
    fn from(map: BTreeMap<String, ResolvedDiagnostics>) -> Self {
        Self(map)
    }
}

impl IntoIterator for ValidationBatchResult {
    type Item = (String, ResolvedDiagnostics);
    type IntoIter = std::collections::btree_map::IntoIter<String, ResolvedDiagnostics>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Reduce a path to the key used in result maps: the final non-empty
/// segment after splitting on both `/` and `\`.
///
/// Paths from either platform produce the same key. A path with no
/// non-empty segment is returned unchanged.
pub fn normalize_filename(path: &str) -> &str {
    path.rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(path)
}
