//! # Raw Error Tree
//!
//! Structural validation output before any branch filtering. A top-level
//! [`RawError`] describes a violation of the union schema; a `oneOf`
//! violation additionally carries one sub-error per failing constraint in
//! each alternative, with the alternative's index as the first schema path
//! segment.
//!
//! ## Ordering
//!
//! Paths compare segment by segment. Numeric segments compare as integers
//! and sort before named segments, so `/name/2` precedes `/name/10`.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

/// One step in a JSON Pointer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl PathSegment {
    /// The index, if this segment is numeric.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => Some(*i),
            Self::Key(_) => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Key(k) => f.write_str(k),
        }
    }
}

/// Parse a JSON Pointer (`/a/0/b~1c`) into segments.
///
/// Segments made only of ASCII digits become [`PathSegment::Index`]. An
/// empty pointer is the document root and yields no segments.
pub fn parse_pointer(pointer: &str) -> Vec<PathSegment> {
    if pointer.is_empty() {
        return Vec::new();
    }
    pointer
        .strip_prefix('/')
        .unwrap_or(pointer)
        .split('/')
        .map(|raw| {
            let key = raw.replace("~1", "/").replace("~0", "~");
            if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(i) = key.parse() {
                    return PathSegment::Index(i);
                }
            }
            PathSegment::Key(key)
        })
        .collect()
}

/// Render segments back to a JSON Pointer.
pub fn format_pointer(segments: &[PathSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        match segment {
            PathSegment::Index(i) => out.push_str(&i.to_string()),
            PathSegment::Key(k) => out.push_str(&k.replace('~', "~0").replace('/', "~1")),
        }
    }
    out
}

/// A single validation error with path provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawError {
    /// Location of the offending value in the document.
    pub instance_path: Vec<PathSegment>,
    /// Location of the failing keyword in the schema.
    pub schema_path: Vec<PathSegment>,
    /// Human-readable description from the validator.
    pub message: String,
    /// Per-branch sub-errors of a root union violation. Empty otherwise.
    ///
    /// Only the root `oneOf` is expanded. A `oneOf` nested inside a branch
    /// (a `ResourceList` under `Bundle.entry.resource`, say) is reported as
    /// one sub-error whose constraint is `oneOf` and whose context stays
    /// empty.
    pub context: Vec<RawError>,
}

impl RawError {
    pub fn new(
        instance_path: Vec<PathSegment>,
        schema_path: Vec<PathSegment>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            instance_path,
            schema_path,
            message: message.into(),
            context: Vec::new(),
        }
    }

    /// The union branch this sub-error was raised in: schema path element 0
    /// when it is numeric.
    pub fn branch(&self) -> Option<usize> {
        self.schema_path.first().and_then(PathSegment::as_index)
    }

    /// The failing constraint keyword: the last schema path element.
    pub fn constraint(&self) -> Option<String> {
        self.schema_path.last().map(ToString::to_string)
    }

    /// Whether this error is the union's own `oneOf` keyword failing.
    pub fn is_union_violation(&self) -> bool {
        matches!(self.schema_path.as_slice(), [PathSegment::Key(k)] if k == "oneOf")
    }
}

impl fmt::Display for RawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", format_pointer(&self.instance_path), self.message)
        }
    }
}

fn by_instance_path(a: &RawError, b: &RawError) -> Ordering {
    a.instance_path
        .cmp(&b.instance_path)
        .then_with(|| a.schema_path.cmp(&b.schema_path))
}

fn by_schema_path(a: &RawError, b: &RawError) -> Ordering {
    a.schema_path
        .cmp(&b.schema_path)
        .then_with(|| a.instance_path.cmp(&b.instance_path))
}

/// All errors from one failed structural validation, in canonical order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} schema violation(s)", .errors.len())]
pub struct ErrorTree {
    errors: Vec<RawError>,
}

impl ErrorTree {
    /// Build a tree, sorting top-level errors by document path and each
    /// error's context by schema path.
    pub fn new(mut errors: Vec<RawError>) -> Self {
        for error in &mut errors {
            error.context.sort_by(by_schema_path);
        }
        errors.sort_by(by_instance_path);
        Self { errors }
    }

    pub fn errors(&self) -> &[RawError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Message of the first top-level error in canonical order.
    pub fn first_message(&self) -> Option<&str> {
        self.errors.first().map(|e| e.message.as_str())
    }
}
