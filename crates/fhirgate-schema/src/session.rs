//! # Validation Session
//!
//! The entry point for validating FHIR documents. A session is bound to one
//! compiled schema version and validates in-memory values, JSON text,
//! single files, or whole directory trees.
//!
//! ## Per-document flow
//!
//! 1. The fast path decides validity. Valid documents stop here.
//! 2. The locator selects a branch from the discriminator. A missing or
//!    unknown discriminator is reported as a string.
//! 3. Without verbose diagnostics the result is `false`. Otherwise the
//!    structural validator runs and the resolver reduces its errors to the
//!    located branch.
//!
//! Nothing about a single document (unreadable file, bad JSON, schema
//! violations) aborts a batch; it becomes that document's result.
//!
//! ## Directories
//!
//! Every `*.json` file under the directory, at any depth, is validated.
//! Results are keyed by file name alone, so files sharing a name in
//! different subdirectories collapse to one entry and the last one written
//! wins. With more than one worker the order of writes, and therefore which
//! colliding file wins, is not defined.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fhirgate_core::{normalize_filename, FhirVersion, ResolvedDiagnostics, ValidationBatchResult};
use parking_lot::Mutex;
use serde_json::Value;

use crate::config::SessionConfig;
use crate::error::SchemaError;
use crate::fast_path::FastPathChecker;
use crate::locator::BranchLocator;
use crate::registry::{FhirSchema, SchemaRegistry};
use crate::resolver::{resolve_dispatch_failure, resolve_document};
use crate::structural::StructuralValidator;

/// Validates documents against one FHIR schema version.
#[derive(Debug, Clone)]
pub struct ValidationSession {
    schema: Arc<FhirSchema>,
    locator: BranchLocator,
    structural: StructuralValidator,
    fast_path: FastPathChecker,
    workers: usize,
}

impl ValidationSession {
    /// Create a session over a compiled schema. Directory validation runs
    /// on a single thread until [`with_workers`](Self::with_workers) is set.
    pub fn new(schema: Arc<FhirSchema>) -> Self {
        Self {
            locator: BranchLocator::new(Arc::clone(&schema)),
            structural: StructuralValidator::new(Arc::clone(&schema)),
            fast_path: FastPathChecker::new(Arc::clone(&schema)),
            schema,
            workers: 1,
        }
    }

    /// Create a session for `version` from an already loaded registry.
    pub fn from_registry(registry: &SchemaRegistry, version: FhirVersion) -> Result<Self, SchemaError> {
        Ok(Self::new(registry.get(version)?))
    }

    /// Load the configured version from the configured schema directory.
    ///
    /// # Errors
    ///
    /// [`SchemaError::Core`] for an unsupported version name, or any
    /// registry load error.
    pub fn from_config(config: &SessionConfig) -> Result<Self, SchemaError> {
        let version = config.fhir_version()?;
        let registry = SchemaRegistry::load(&config.schema_dir, &[version])?;
        Ok(Self::from_registry(&registry, version)?.with_workers(config.worker_count()))
    }

    /// Set the number of threads used for directory validation. Values
    /// below one are treated as one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// The schema version this session validates against.
    pub fn fhir_version(&self) -> FhirVersion {
        self.schema.version()
    }

    pub fn schema(&self) -> &Arc<FhirSchema> {
        &self.schema
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Validate one parsed document.
    ///
    /// Validity is decided before dispatch in both modes. A document the
    /// union schema accepts is `Valid` even when it lacks the
    /// discriminator, so a schema whose branches do not require
    /// `resourceType` never reports it missing for a conforming document.
    pub fn diagnose(&self, document: &Value, verbose: bool) -> ResolvedDiagnostics {
        if self.fast_path.is_valid(document) {
            return ResolvedDiagnostics::Valid;
        }

        let dispatch = self.locator.locate(document);
        if !verbose {
            return match dispatch {
                Ok(_) => ResolvedDiagnostics::Invalid,
                Err(error) => resolve_dispatch_failure(&error),
            };
        }

        resolve_document(dispatch, || self.structural.validate(document))
    }

    /// Validate an in-memory document under `identifier`.
    pub fn validate_value(&self, identifier: &str, document: &Value, verbose: bool) -> ValidationBatchResult {
        ValidationBatchResult::single(identifier, self.diagnose(document, verbose))
    }

    /// Parse and validate JSON text. A parse failure is reported as the
    /// document's result without running the validator.
    pub fn validate_str(&self, identifier: &str, text: &str, verbose: bool) -> ValidationBatchResult {
        ValidationBatchResult::single(identifier, self.diagnose_text(text, verbose))
    }

    /// Read, parse, and validate one file. The result key is the file name.
    pub fn validate_file(&self, path: impl AsRef<Path>, verbose: bool) -> ValidationBatchResult {
        let path = path.as_ref();
        let (identifier, diagnostics) = self.diagnose_file(path, verbose);
        ValidationBatchResult::single(identifier, diagnostics)
    }

    /// Validate every `*.json` file under `dir`, recursively.
    ///
    /// A directory that cannot be read yields an empty result and a
    /// warning.
    pub fn validate_directory(&self, dir: impl AsRef<Path>, verbose: bool) -> ValidationBatchResult {
        let dir = dir.as_ref();
        let files = find_json_files(dir);
        tracing::debug!(
            dir = %dir.display(),
            files = files.len(),
            workers = self.workers,
            "validating directory"
        );

        if self.workers <= 1 || files.len() <= 1 {
            let mut results = ValidationBatchResult::new();
            for file in &files {
                let (identifier, diagnostics) = self.diagnose_file(file, verbose);
                results.insert(identifier, diagnostics);
            }
            return results;
        }

        let results = Mutex::new(ValidationBatchResult::new());
        let chunk_size = files.len().div_ceil(self.workers);
        std::thread::scope(|scope| {
            for chunk in files.chunks(chunk_size) {
                let results = &results;
                scope.spawn(move || {
                    for file in chunk {
                        let (identifier, diagnostics) = self.diagnose_file(file, verbose);
                        results.lock().insert(identifier, diagnostics);
                    }
                });
            }
        });
        results.into_inner()
    }

    /// Validate a file or, if `path` is a directory, every JSON file
    /// beneath it.
    pub fn validate_path(&self, path: impl AsRef<Path>, verbose: bool) -> ValidationBatchResult {
        let path = path.as_ref();
        if path.is_dir() {
            self.validate_directory(path, verbose)
        } else {
            self.validate_file(path, verbose)
        }
    }

    fn diagnose_text(&self, text: &str, verbose: bool) -> ResolvedDiagnostics {
        match serde_json::from_str::<Value>(text) {
            Ok(document) => self.diagnose(&document, verbose),
            Err(e) => ResolvedDiagnostics::TopLevel(e.to_string()),
        }
    }

    fn diagnose_file(&self, path: &Path, verbose: bool) -> (String, ResolvedDiagnostics) {
        let lossy = path.to_string_lossy();
        let identifier = normalize_filename(&lossy).to_string();

        let diagnostics = match std::fs::read_to_string(path) {
            Ok(text) => self.diagnose_text(&text, verbose),
            Err(e) => ResolvedDiagnostics::TopLevel(format!("cannot read file: {e}")),
        };

        if !diagnostics.is_valid() {
            tracing::debug!(file = %path.display(), "document failed validation");
        }
        (identifier, diagnostics)
    }
}

/// Recursively find all `*.json` files under a directory, sorted.
fn find_json_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    match std::fs::read_dir(dir) {
        Ok(entries) => {
            for entry in entries {
                let path = match entry {
                    Ok(entry) => entry.path(),
                    Err(e) => {
                        tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                        continue;
                    }
                };
                if path.is_dir() {
                    files.extend(find_json_files(&path));
                } else if path.extension().is_some_and(|ext| ext == "json") {
                    files.push(path);
                }
            }
        }
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot read directory");
        }
    }
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> ValidationSession {
        let root = json!({
            "$schema": "http://json-schema.org/draft-06/schema#",
            "oneOf": [
                { "$ref": "#/definitions/Observation" },
                { "$ref": "#/definitions/Patient" }
            ],
            "definitions": {
                "Observation": {
                    "properties": {
                        "resourceType": { "const": "Observation" },
                        "status": { "enum": ["final", "preliminary"] }
                    },
                    "required": ["resourceType", "status"]
                },
                "Patient": {
                    "properties": {
                        "resourceType": { "const": "Patient" },
                        "id": { "type": "string" }
                    },
                    "required": ["resourceType"]
                }
            }
        });
        let registry = SchemaRegistry::from_documents([(FhirVersion::R4, root)]).unwrap();
        ValidationSession::from_registry(&registry, FhirVersion::R4).unwrap()
    }

    #[test]
    fn test_fhir_version() {
        assert_eq!(session().fhir_version(), FhirVersion::R4);
    }

    #[test]
    fn test_diagnose_modes() {
        let session = session();
        let bad = json!({ "resourceType": "Patient", "id": 123 });
        assert_eq!(session.diagnose(&bad, false), ResolvedDiagnostics::Invalid);
        assert_eq!(
            session.diagnose(&bad, true).field_errors().unwrap().keys().collect::<Vec<_>>(),
            vec!["type"]
        );

        let good = json!({ "resourceType": "Observation", "status": "final" });
        assert!(session.diagnose(&good, false).is_valid());
        assert!(session.diagnose(&good, true).is_valid());
    }

    #[test]
    fn test_dispatch_message_in_both_modes() {
        let session = session();
        let unknown = json!({ "resourceType": "NotARealType" });
        for verbose in [false, true] {
            assert_eq!(
                session.diagnose(&unknown, verbose).message(),
                Some("Unexpected resourceType: NotARealType")
            );
            assert_eq!(
                session.diagnose(&json!({ "id": "x" }), verbose).message(),
                Some("Missing resourceType")
            );
        }
    }

    #[test]
    fn test_validate_str_parse_error() {
        let result = session().validate_str("doc", "{not json", true);
        let message = result.get("doc").unwrap().message().unwrap();
        assert!(message.contains("line 1"), "{message}");
    }

    #[test]
    fn test_validate_file_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let result = session().validate_file(dir.path().join("missing.json"), true);
        let message = result.get("missing.json").unwrap().message().unwrap();
        assert!(message.starts_with("cannot read file"), "{message}");
    }

    #[test]
    fn test_validate_directory_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(session().validate_directory(dir.path().join("absent"), false).is_empty());
    }

    #[test]
    fn test_find_json_files_recursive_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("b/c")).unwrap();
        std::fs::write(dir.path().join("b/c/z.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("b/notes.txt"), "").unwrap();

        let files = find_json_files(dir.path());
        assert_eq!(files, vec![dir.path().join("a.json"), dir.path().join("b/c/z.json")]);
    }

    #[test]
    fn test_validate_file_with_debug_logging() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"resourceType": "Patient", "id": 123}"#).unwrap();

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        let result = tracing::subscriber::with_default(subscriber, || session().validate_file(&path, true));

        assert_eq!(result.invalid_count(), 1);
        assert!(result.get("bad.json").unwrap().field_errors().unwrap().contains_key("type"));
    }

    #[test]
    fn test_fast_path_runs_before_dispatch() {
        let root = json!({
            "oneOf": [{ "$ref": "#/definitions/Basic" }],
            "definitions": {
                "Basic": { "properties": { "id": { "type": "string" } } }
            }
        });
        let registry = SchemaRegistry::from_documents([(FhirVersion::R4, root)]).unwrap();
        let session = ValidationSession::from_registry(&registry, FhirVersion::R4).unwrap();

        let document = json!({ "id": "x" });
        assert!(session.diagnose(&document, false).is_valid());
        assert!(session.diagnose(&document, true).is_valid());
        assert_eq!(
            session.diagnose(&json!({ "id": 1 }), true).message(),
            Some("Missing resourceType")
        );
    }

    #[test]
    fn test_with_workers_floor() {
        assert_eq!(session().with_workers(0).workers(), 1);
        assert_eq!(session().with_workers(6).workers(), 6);
    }
}
