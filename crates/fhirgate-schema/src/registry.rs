//! # Schema Registry
//!
//! Loads and compiles FHIR JSON Schemas, one per [`FhirVersion`].
//!
//! ## Union Shape
//!
//! A FHIR schema is a single document whose root is a `oneOf` over every
//! resource type:
//!
//! ```json
//! {
//!   "$schema": "http://json-schema.org/draft-06/schema#",
//!   "discriminator": { "propertyName": "resourceType" },
//!   "oneOf": [ { "$ref": "#/definitions/Account" }, ... ],
//!   "definitions": { "Account": { ... }, ... }
//! }
//! ```
//!
//! Each `oneOf` entry becomes a [`Branch`]. The text after the final `/`
//! of its `$ref` is the branch's discriminator value, and the text up to
//! and including that `/` is the reference prefix shared by every branch.
//!
//! ## Compiled Artifacts
//!
//! Every [`FhirSchema`] owns two compiled validators built from the same
//! source document:
//!
//! - the **union validator**, the root schema as published. It answers
//!   the fast-path yes/no question and produces top-level errors.
//! - the **branch validator**, an object schema whose property `"i"` is
//!   the `i`-th `oneOf` alternative. Wrapping a document as `{"i": doc}`
//!   evaluates alternative `i` alone, and every error's first instance
//!   path segment names its branch. Only the keys present in the wrapper
//!   are evaluated, so validating one branch costs one copy of the
//!   document no matter how many branches the union declares.
//!
//! Both resolve `$ref`s locally. Schemas never trigger network access.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fhirgate_core::FhirVersion;
use jsonschema::{Draft, Retrieve, Uri, Validator};
use serde_json::{Map, Value};

use crate::error::SchemaError;

/// Discriminator field used when the schema does not declare one.
pub const DEFAULT_DISCRIMINATOR_FIELD: &str = "resourceType";

/// Root keywords copied into the branch validator so `$ref`s resolve
/// against the same base and definitions as in the union schema.
const BRANCH_ROOT_KEYWORDS: [&str; 5] = ["$schema", "$id", "id", "definitions", "$defs"];

// ---------------------------------------------------------------------------
// Local $ref resolution
// ---------------------------------------------------------------------------

/// Resolves external `$ref` URIs from documents registered in memory.
struct LocalSchemaRetriever {
    schemas_by_uri: Arc<HashMap<String, Value>>,
}

impl Retrieve for LocalSchemaRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();

        if let Some(value) = self.schemas_by_uri.get(uri_str) {
            return Ok(value.clone());
        }

        let trimmed = uri_str.trim_end_matches('#');
        if let Some(value) = self.schemas_by_uri.get(trimmed) {
            return Ok(value.clone());
        }

        let filename = trimmed.rsplit('/').next().unwrap_or(trimmed);
        if let Some(value) = self.schemas_by_uri.get(filename) {
            return Ok(value.clone());
        }

        // Unknown references accept anything rather than reaching out.
        tracing::warn!(uri = %uri_str, "unresolved external schema reference");
        Ok(serde_json::json!({}))
    }
}

// ---------------------------------------------------------------------------
// Branches
// ---------------------------------------------------------------------------

/// Position of an alternative in the root `oneOf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchIndex(pub usize);

impl BranchIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for BranchIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One alternative of the union schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub index: BranchIndex,
    /// The full `$ref`, e.g. `#/definitions/Patient`.
    pub reference: String,
    /// The resource type name, e.g. `Patient`.
    pub discriminator: String,
}

/// Detect the JSON Schema draft from the root `$schema` URI.
///
/// Unrecognized or absent URIs fall back to draft-06, the draft the
/// published FHIR schemas declare.
pub fn detect_draft(root: &Value) -> Draft {
    let uri = root.get("$schema").and_then(Value::as_str).unwrap_or_default();
    if uri.contains("draft-04") {
        Draft::Draft4
    } else if uri.contains("draft-07") {
        Draft::Draft7
    } else if uri.contains("2019-09") {
        Draft::Draft201909
    } else if uri.contains("2020-12") {
        Draft::Draft202012
    } else {
        Draft::Draft6
    }
}

/// Split the root `oneOf` into branches and the shared reference prefix.
fn extract_branches(
    version: FhirVersion,
    alternatives: &[Value],
) -> Result<(String, Vec<Branch>), SchemaError> {
    let malformed = |reason: String| SchemaError::MalformedSchema { version, reason };

    if alternatives.is_empty() {
        return Err(malformed("root oneOf is empty".to_string()));
    }

    let mut prefix: Option<&str> = None;
    let mut branches = Vec::with_capacity(alternatives.len());

    for (i, alternative) in alternatives.iter().enumerate() {
        let reference = alternative
            .get("$ref")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(format!("oneOf entry {i} is not a $ref")))?;

        let split = reference
            .rfind('/')
            .ok_or_else(|| malformed(format!("oneOf entry {i} has no path in $ref {reference:?}")))?;
        let (entry_prefix, name) = reference.split_at(split + 1);
        if name.is_empty() {
            return Err(malformed(format!("oneOf entry {i} has an empty type name")));
        }

        match prefix {
            None => prefix = Some(entry_prefix),
            Some(p) if p != entry_prefix => {
                return Err(malformed(format!(
                    "oneOf entry {i} uses prefix {entry_prefix:?}, expected {p:?}"
                )));
            }
            Some(_) => {}
        }

        branches.push(Branch {
            index: BranchIndex(i),
            reference: reference.to_string(),
            discriminator: name.to_string(),
        });
    }

    Ok((prefix.unwrap_or_default().to_string(), branches))
}

/// Lay out the union alternatives as properties keyed by branch index.
fn branch_schema(root: &Map<String, Value>, alternatives: &[Value]) -> Value {
    let mut schema = Map::new();
    for keyword in BRANCH_ROOT_KEYWORDS {
        if let Some(value) = root.get(keyword) {
            schema.insert(keyword.to_string(), value.clone());
        }
    }
    let properties: Map<String, Value> = alternatives
        .iter()
        .enumerate()
        .map(|(i, alternative)| (i.to_string(), alternative.clone()))
        .collect();
    schema.insert("properties".to_string(), Value::Object(properties));
    Value::Object(schema)
}

fn compile_validator(
    version: FhirVersion,
    draft: Draft,
    schema: &Value,
    externals: &Arc<HashMap<String, Value>>,
) -> Result<Validator, SchemaError> {
    jsonschema::options()
        .with_draft(draft)
        .with_retriever(LocalSchemaRetriever {
            schemas_by_uri: Arc::clone(externals),
        })
        .build(schema)
        .map_err(|e| SchemaError::SchemaCompile {
            version,
            reason: e.to_string(),
        })
}

// ---------------------------------------------------------------------------
// FhirSchema
// ---------------------------------------------------------------------------

/// A compiled, immutable FHIR union schema for one version.
///
/// `FhirSchema` is `Send + Sync` and is shared between sessions and worker
/// threads through `Arc`.
pub struct FhirSchema {
    version: FhirVersion,
    draft: Draft,
    discriminator_field: String,
    reference_prefix: String,
    branches: Vec<Branch>,
    reference_index: HashMap<String, BranchIndex>,
    ambiguous: BTreeSet<String>,
    union_validator: Validator,
    branch_validator: Validator,
}

impl FhirSchema {
    /// Compile a schema that has no external `$ref` documents.
    pub fn from_value(version: FhirVersion, root: &Value) -> Result<Self, SchemaError> {
        Self::compile(version, root, Arc::new(HashMap::new()))
    }

    /// Compile a schema, resolving external `$ref`s from `externals`
    /// (keyed by `$id` URI or file name).
    ///
    /// # Errors
    ///
    /// - [`SchemaError::MalformedSchema`] when the root is not an object
    ///   with a non-empty `oneOf` of `$ref` entries sharing one prefix.
    /// - [`SchemaError::SchemaCompile`] when the `jsonschema` crate rejects
    ///   the schema.
    pub fn compile(
        version: FhirVersion,
        root: &Value,
        externals: Arc<HashMap<String, Value>>,
    ) -> Result<Self, SchemaError> {
        let root_map = root.as_object().ok_or_else(|| SchemaError::MalformedSchema {
            version,
            reason: "schema root is not an object".to_string(),
        })?;
        let alternatives = root_map
            .get("oneOf")
            .and_then(Value::as_array)
            .ok_or_else(|| SchemaError::MalformedSchema {
                version,
                reason: "schema root has no oneOf array".to_string(),
            })?;

        let draft = detect_draft(root);
        let discriminator_field = root
            .pointer("/discriminator/propertyName")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_DISCRIMINATOR_FIELD)
            .to_string();

        let (reference_prefix, branches) = extract_branches(version, alternatives)?;

        let mut reference_index = HashMap::with_capacity(branches.len());
        let mut ambiguous = BTreeSet::new();
        for branch in &branches {
            if let Some(first) = reference_index.get(&branch.reference) {
                tracing::warn!(
                    version = %version,
                    discriminator = %branch.discriminator,
                    kept = %first,
                    ignored = %branch.index,
                    "duplicate discriminator in oneOf; first branch wins"
                );
                ambiguous.insert(branch.discriminator.clone());
            } else {
                reference_index.insert(branch.reference.clone(), branch.index);
            }
        }

        let union_validator = compile_validator(version, draft, root, &externals)?;
        let branch_validator = compile_validator(
            version,
            draft,
            &branch_schema(root_map, alternatives),
            &externals,
        )?;

        tracing::debug!(
            version = %version,
            branches = branches.len(),
            discriminator = %discriminator_field,
            "compiled FHIR schema"
        );

        Ok(Self {
            version,
            draft,
            discriminator_field,
            reference_prefix,
            branches,
            reference_index,
            ambiguous,
            union_validator,
            branch_validator,
        })
    }

    pub fn version(&self) -> FhirVersion {
        self.version
    }

    pub fn draft(&self) -> Draft {
        self.draft
    }

    /// Name of the document field that selects a branch.
    pub fn discriminator_field(&self) -> &str {
        &self.discriminator_field
    }

    /// Prefix shared by every branch reference, e.g. `#/definitions/`.
    pub fn reference_prefix(&self) -> &str {
        &self.reference_prefix
    }

    /// Branches in declared `oneOf` order.
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn branch(&self, index: BranchIndex) -> Option<&Branch> {
        self.branches.get(index.0)
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// Look up the branch for a full reference such as
    /// `#/definitions/Patient`.
    pub fn branch_for_reference(&self, reference: &str) -> Option<BranchIndex> {
        self.reference_index.get(reference).copied()
    }

    /// Look up the branch whose reference ends in `discriminator`, e.g.
    /// `Patient`.
    pub fn branch_for_discriminator(&self, discriminator: &str) -> Option<BranchIndex> {
        self.branch_for_reference(&format!("{}{}", self.reference_prefix, discriminator))
    }

    /// Discriminator values declared by more than one branch.
    pub fn ambiguous_discriminators(&self) -> &BTreeSet<String> {
        &self.ambiguous
    }

    pub fn is_ambiguous(&self, discriminator: &str) -> bool {
        self.ambiguous.contains(discriminator)
    }

    pub(crate) fn union_validator(&self) -> &Validator {
        &self.union_validator
    }

    pub(crate) fn branch_validator(&self) -> &Validator {
        &self.branch_validator
    }
}

impl fmt::Debug for FhirSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FhirSchema")
            .field("version", &self.version)
            .field("draft", &self.draft)
            .field("discriminator_field", &self.discriminator_field)
            .field("reference_prefix", &self.reference_prefix)
            .field("branches", &self.branches.len())
            .field("ambiguous", &self.ambiguous)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// SchemaRegistry
// ---------------------------------------------------------------------------

/// Compiled schemas for a set of versions.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schema_dir: Option<PathBuf>,
    schemas: BTreeMap<FhirVersion, Arc<FhirSchema>>,
}

impl SchemaRegistry {
    /// Load `fhir.<version>.schema.json` for each requested version from
    /// `schema_dir` and compile it.
    ///
    /// Any other `*.schema.json` file in the directory that declares a
    /// `$id` (or draft-04 `id`) is registered for external `$ref`
    /// resolution.
    ///
    /// # Errors
    ///
    /// [`SchemaError::SchemaLoad`] if the directory or a requested schema
    /// file cannot be read or parsed; compile errors as in
    /// [`FhirSchema::compile`].
    pub fn load(schema_dir: impl AsRef<Path>, versions: &[FhirVersion]) -> Result<Self, SchemaError> {
        let schema_dir = schema_dir.as_ref().to_path_buf();
        let externals = Arc::new(load_externals(&schema_dir)?);

        let mut schemas = BTreeMap::new();
        for &version in versions {
            let path = schema_dir.join(version.schema_file_name());
            let root = read_schema_file(&path)?;
            let schema = FhirSchema::compile(version, &root, Arc::clone(&externals))?;
            schemas.insert(version, Arc::new(schema));
        }

        tracing::info!(
            dir = %schema_dir.display(),
            versions = schemas.len(),
            externals = externals.len(),
            "loaded FHIR schema registry"
        );

        Ok(Self {
            schema_dir: Some(schema_dir),
            schemas,
        })
    }

    /// Compile already-parsed schema documents. Performs no I/O.
    pub fn from_documents(
        documents: impl IntoIterator<Item = (FhirVersion, Value)>,
    ) -> Result<Self, SchemaError> {
        let mut schemas = BTreeMap::new();
        for (version, root) in documents {
            schemas.insert(version, Arc::new(FhirSchema::from_value(version, &root)?));
        }
        Ok(Self {
            schema_dir: None,
            schemas,
        })
    }

    /// Directory the registry was loaded from, if any.
    pub fn schema_dir(&self) -> Option<&Path> {
        self.schema_dir.as_deref()
    }

    /// The compiled schema for `version`.
    pub fn get(&self, version: FhirVersion) -> Result<Arc<FhirSchema>, SchemaError> {
        self.schemas
            .get(&version)
            .cloned()
            .ok_or(SchemaError::VersionNotLoaded(version))
    }

    /// Loaded versions, oldest first.
    pub fn versions(&self) -> Vec<FhirVersion> {
        self.schemas.keys().copied().collect()
    }
}

fn read_schema_file(path: &Path) -> Result<Value, SchemaError> {
    let content = std::fs::read_to_string(path).map_err(|e| SchemaError::SchemaLoad {
        path: path.to_path_buf(),
        reason: format!("cannot read schema file: {e}"),
    })?;
    serde_json::from_str(&content).map_err(|e| SchemaError::SchemaLoad {
        path: path.to_path_buf(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Collect non-FHIR `*.schema.json` files keyed by `$id` and file name.
fn load_externals(schema_dir: &Path) -> Result<HashMap<String, Value>, SchemaError> {
    let entries = std::fs::read_dir(schema_dir).map_err(|e| SchemaError::SchemaLoad {
        path: schema_dir.to_path_buf(),
        reason: format!("cannot read schema directory: {e}"),
    })?;

    let fhir_files: BTreeSet<String> = FhirVersion::ALL
        .iter()
        .map(FhirVersion::schema_file_name)
        .collect();

    let mut externals = HashMap::new();
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(".schema.json") || fhir_files.contains(name) {
            continue;
        }

        let value = read_schema_file(&path)?;
        let id = value
            .get("$id")
            .or_else(|| value.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(id) = id {
            externals.insert(id.trim_end_matches('#').to_string(), value.clone());
        }
        externals.insert(name.to_string(), value);
    }
    Ok(externals)
}
