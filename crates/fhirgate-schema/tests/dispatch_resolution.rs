//! Integration tests: resource-type dispatch and branch-scoped error
//! resolution against the FHIR-shaped schema fixtures.

use std::path::PathBuf;

use fhirgate_core::{FhirVersion, ResolvedDiagnostics};
use fhirgate_schema::{SchemaError, SchemaRegistry, SessionConfig, ValidationSession};
use serde_json::{json, Value};

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn session(version: FhirVersion) -> ValidationSession {
    let registry = SchemaRegistry::load(fixtures().join("schemas"), &[version]).unwrap();
    ValidationSession::from_registry(&registry, version).unwrap()
}

fn r4() -> ValidationSession {
    session(FhirVersion::R4)
}

fn documents() -> Vec<Value> {
    vec![
        json!({ "resourceType": "Patient", "id": "example", "gender": "male" }),
        json!({ "resourceType": "Patient", "id": 123 }),
        json!({ "resourceType": "Patient", "gender": "robot", "birthDate": "yesterday" }),
        json!({ "resourceType": "Patient", "extra": true }),
        json!({ "resourceType": "Observation", "status": "final" }),
        json!({ "resourceType": "Observation", "code": { "text": "weight" } }),
        json!({ "resourceType": "Organization", "active": "yes" }),
        json!({ "resourceType": "NotARealType" }),
        json!({ "resourceType": 7 }),
        json!({ "id": "x" }),
        json!([]),
        json!(null),
    ]
}

// ── Registry ────────────────────────────────────────────────────────

#[test]
fn every_supported_version_loads() {
    let registry = SchemaRegistry::load(fixtures().join("schemas"), &FhirVersion::ALL).unwrap();
    assert_eq!(registry.versions(), FhirVersion::ALL.to_vec());
    for version in FhirVersion::ALL {
        let schema = registry.get(version).unwrap();
        let names: Vec<_> = schema.branches().iter().map(|b| b.discriminator.as_str()).collect();
        assert_eq!(names, vec!["Observation", "Organization", "Patient"]);
        assert_eq!(schema.discriminator_field(), "resourceType");
    }
}

#[test]
fn unsupported_version_fails_at_construction() {
    let config = SessionConfig {
        schema_dir: fixtures().join("schemas"),
        version: "fake".to_string(),
        ..SessionConfig::default()
    };
    let err = ValidationSession::from_config(&config).unwrap_err();
    assert!(matches!(err, SchemaError::Core(_)), "got {err}");
}

#[test]
fn session_from_config() {
    let config = SessionConfig {
        schema_dir: fixtures().join("schemas"),
        version: "stu3".to_string(),
        workers: 2,
        ..SessionConfig::default()
    };
    let session = ValidationSession::from_config(&config).unwrap();
    assert_eq!(session.fhir_version(), FhirVersion::Stu3);
    assert_eq!(session.workers(), 2);
}

#[test]
fn missing_schema_file_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SchemaRegistry::load(dir.path(), &[FhirVersion::R5]).unwrap_err();
    match err {
        SchemaError::SchemaLoad { path, .. } => assert!(path.ends_with("fhir.r5.schema.json")),
        other => panic!("expected SchemaLoad, got {other}"),
    }
}

// ── Resolution ──────────────────────────────────────────────────────

#[test]
fn wrong_id_type_reports_only_the_patient_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("patient.json");
    std::fs::write(&path, r#"{"resourceType": "Patient", "id": 123}"#).unwrap();

    let result = r4().validate_file(&path, true);
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({ "patient.json": { "type": "123 is not of type \"string\"" } })
    );
}

#[test]
fn sibling_branch_errors_never_leak() {
    let session = r4();
    let resolved = session.diagnose(&json!({ "resourceType": "Patient", "id": 123 }), true);
    let fields = resolved.field_errors().unwrap();
    assert!(!fields.contains_key("const"));
    assert!(!fields.contains_key("required"));

    // Observation requires `code`; Patient does not. The Observation
    // branch's `required` failure must not surface for a Patient.
    let resolved = session.diagnose(&json!({ "resourceType": "Patient", "gender": "robot" }), true);
    let fields = resolved.field_errors().unwrap();
    assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["enum"]);
    assert!(fields["enum"].contains("robot"));
}

#[test]
fn located_branch_required_field() {
    let resolved = r4().diagnose(&json!({ "resourceType": "Observation", "status": "final" }), true);
    let fields = resolved.field_errors().unwrap();
    assert_eq!(fields.len(), 1);
    assert!(fields["required"].contains("code"), "{fields:?}");
}

#[test]
fn additional_properties_keyed_by_keyword() {
    let resolved = r4().diagnose(&json!({ "resourceType": "Patient", "extra": true }), true);
    let fields = resolved.field_errors().unwrap();
    assert!(fields["additionalProperties"].contains("extra"), "{fields:?}");
}

#[test]
fn nested_field_errors_resolve() {
    let resolved = r4().diagnose(
        &json!({ "resourceType": "Patient", "name": [{ "use": "nickname", "given": [1] }] }),
        true,
    );
    let fields = resolved.field_errors().unwrap();
    assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["type"]);
}

#[test]
fn unknown_resource_type() {
    let result = r4().validate_value("x.json", &json!({ "resourceType": "NotARealType" }), true);
    assert_eq!(
        result.get("x.json"),
        Some(&ResolvedDiagnostics::TopLevel("Unexpected resourceType: NotARealType".into()))
    );
}

#[test]
fn missing_resource_type() {
    for verbose in [false, true] {
        let resolved = r4().diagnose(&json!({ "id": "x" }), verbose);
        let message = resolved.message().unwrap();
        assert!(!message.is_empty());
        assert!(message.contains("resourceType"), "{message}");
    }
}

#[test]
fn unparseable_text_never_reaches_the_validator() {
    let result = r4().validate_str("broken.json", "{not json", true);
    let message = result.get("broken.json").unwrap().message().unwrap();
    assert!(message.contains("key must be a string"), "{message}");
}

#[test]
fn ambiguous_schema_falls_back_to_top_level_message() {
    let registry = SchemaRegistry::load(fixtures().join("duplicate"), &[FhirVersion::R4]).unwrap();
    let schema = registry.get(FhirVersion::R4).unwrap();
    assert!(schema.is_ambiguous("Patient"));

    let session = ValidationSession::new(schema);
    let resolved = session.diagnose(&json!({ "resourceType": "Patient", "id": "p" }), true);
    let message = resolved.message().unwrap();
    assert!(message.contains("more than one"), "{message}");

    let resolved = session.diagnose(&json!({ "resourceType": "Patient", "id": 5 }), true);
    assert!(resolved.field_errors().unwrap().contains_key("type"));
}

// ── Properties ──────────────────────────────────────────────────────

#[test]
fn fast_path_agrees_with_verbose_path() {
    for version in FhirVersion::ALL {
        let session = session(version);
        for document in documents() {
            let fast = session.diagnose(&document, false);
            let verbose = session.diagnose(&document, true);
            assert_eq!(fast.is_valid(), verbose.is_valid(), "{version}: {document}");
            if !verbose.is_valid() {
                assert_ne!(verbose, ResolvedDiagnostics::Invalid, "{document}");
                if let Some(fields) = verbose.field_errors() {
                    assert!(!fields.is_empty());
                }
            }
        }
    }
}

#[test]
fn validation_is_idempotent() {
    let session = r4();
    for document in documents() {
        assert_eq!(session.diagnose(&document, true), session.diagnose(&document, true));
    }
}
