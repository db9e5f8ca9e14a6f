mod common;

use common::*;
use octofhir_sdc_mapper::*;
use pretty_assertions::assert_eq;
use serde_json::json;

fn kinds_at(outcome: &ValidationOutcome) -> Vec<(IssueKind, &str)> {
    outcome
        .issues
        .iter()
        .map(|issue| (issue.kind, issue.path.as_str()))
        .collect()
}

fn qualification(display: &str) -> serde_json::Value {
    json!({
        "code": { "coding": [{ "system": DEGREE_SYSTEM, "code": "MD" }] },
        "issuer": { "reference": "Organization/1", "display": display }
    })
}

#[test]
fn test_missing_required_element() {
    let mapper = mapper();
    let schema = schema(&mapper, SDC_PRACTITIONER);

    let outcome = mapper
        .validate(&schema, &resource(json!({ "resourceType": "Practitioner" })))
        .unwrap();
    assert_eq!(kinds_at(&outcome), vec![(IssueKind::MissingRequired, "Practitioner.active")]);
    assert_eq!(outcome.issues[0].severity, IssueSeverity::Error);

    let outcome = mapper
        .validate(&schema, &resource(json!({ "resourceType": "Practitioner", "active": false })))
        .unwrap();
    assert!(outcome.is_valid());
}

#[test]
fn test_fixed_reference_mismatch() {
    let mapper = mapper();
    let schema = schema(&mapper, SDC_PRACTITIONER);

    let renamed = resource(json!({
        "resourceType": "Practitioner",
        "active": true,
        "qualification": [qualification("Disney")]
    }));
    let outcome = mapper.validate(&schema, &renamed).unwrap();
    assert_eq!(
        kinds_at(&outcome),
        vec![(IssueKind::FixedValueMismatch, "Practitioner.qualification.issuer")]
    );

    let exact = resource(json!({
        "resourceType": "Practitioner",
        "active": true,
        "qualification": [qualification("Walt Disney Corporation")]
    }));
    assert!(mapper.validate(&schema, &exact).unwrap().is_valid());
}

#[test]
fn test_children_checked_once_per_candidate() {
    let mapper = mapper();
    let schema = schema(&mapper, SDC_PRACTITIONER);
    let practitioner = resource(json!({
        "resourceType": "Practitioner",
        "active": true,
        "qualification": [
            qualification("Walt Disney Corporation"),
            { "issuer": { "reference": "Organization/1", "display": "Walt Disney Corporation" } }
        ]
    }));

    let outcome = mapper.validate(&schema, &practitioner).unwrap();
    assert_eq!(
        kinds_at(&outcome),
        vec![(IssueKind::MissingRequired, "Practitioner.qualification.code")]
    );
}

#[test]
fn test_slice_cardinality_counts_only_members() {
    let mapper = mapper();
    let schema = schema(&mapper, SDC_PRACTITIONER);

    let two_npis = resource(json!({
        "resourceType": "Practitioner",
        "active": true,
        "identifier": [
            { "system": NPI_SYSTEM, "value": "1234567893" },
            { "system": NPI_SYSTEM, "value": "1245319599" },
            { "system": "urn:oid:2.16.840.1.113883.4.6", "value": "other" }
        ]
    }));
    let outcome = mapper.validate(&schema, &two_npis).unwrap();
    assert_eq!(kinds_at(&outcome), vec![(IssueKind::TooMany, "Practitioner.identifier:npi")]);
    assert_eq!(
        outcome.issues[0].detail,
        "Element 'Practitioner.identifier:npi' has cardinality 0..1, but found 2 occurrence(s)"
    );

    let other_only = resource(json!({
        "resourceType": "Practitioner",
        "active": true,
        "identifier": [{ "system": "urn:other", "value": "x" }]
    }));
    assert!(mapper.validate(&schema, &other_only).unwrap().is_valid());
}

#[test]
fn test_slice_member_missing_required_child() {
    let mapper = mapper();
    let schema = schema(&mapper, SDC_PRACTITIONER);
    let practitioner = resource(json!({
        "resourceType": "Practitioner",
        "active": true,
        "identifier": [{ "system": NPI_SYSTEM }]
    }));

    let outcome = mapper.validate(&schema, &practitioner).unwrap();
    assert_eq!(
        kinds_at(&outcome),
        vec![(IssueKind::MissingRequired, "Practitioner.identifier:npi.value")]
    );
}

#[test]
fn test_extension_slice_matched_by_url() {
    let mapper = mapper();
    let schema = schema(&mapper, SDC_PRACTITIONER);
    let practitioner = resource(json!({
        "resourceType": "Practitioner",
        "active": true,
        "extension": [
            { "url": BIRTH_PLACE },
            { "url": "http://example.org/StructureDefinition/other", "valueString": "ignored" }
        ]
    }));

    let outcome = mapper.validate(&schema, &practitioner).unwrap();
    assert_eq!(
        kinds_at(&outcome),
        vec![(IssueKind::MissingRequired, "Practitioner.extension:birthPlace.value[x]")]
    );
}

#[test]
fn test_observation_fixed_status_and_required_code() {
    let mapper = mapper();
    let schema = schema(&mapper, FINAL_OBSERVATION);
    let observation = resource(json!({
        "resourceType": "Observation",
        "status": "preliminary"
    }));

    let outcome = mapper.validate(&schema, &observation).unwrap();
    assert_eq!(
        kinds_at(&outcome),
        vec![
            (IssueKind::FixedValueMismatch, "Observation.status"),
            (IssueKind::MissingRequired, "Observation.code"),
        ]
    );
}

#[test]
fn test_invariant_violation_carries_key() {
    let mapper = mapper();
    let schema = schema(&mapper, FINAL_OBSERVATION);
    let observation = resource(json!({
        "resourceType": "Observation",
        "status": "final",
        "code": { "text": "Heart rate" },
        "valueQuantity": { "value": 72, "unit": "beats/minute" },
        "dataAbsentReason": { "text": "unknown" }
    }));

    let outcome = mapper.validate(&schema, &observation).unwrap();
    assert_eq!(kinds_at(&outcome), vec![(IssueKind::InvariantViolation, "Observation")]);
    let issue = &outcome.issues[0];
    assert_eq!(issue.invariant_key.as_deref(), Some("obs-6"));
    assert_eq!(issue.severity, IssueSeverity::Error);
    assert!(issue.detail.starts_with("dataAbsentReason SHALL only be present"));
}

#[test]
fn test_warning_invariant_and_policy() {
    let mapper = mapper();
    let schema = schema(&mapper, FINAL_OBSERVATION);
    let observation = resource(json!({
        "resourceType": "Observation",
        "status": "final",
        "code": { "text": "Blood pressure" },
        "component": [
            { "code": { "text": "Systolic" }, "valueQuantity": { "value": 120, "unit": "mmHg" } },
            { "code": { "text": "Diastolic" } }
        ]
    }));

    let outcome = mapper.validate(&schema, &observation).unwrap();
    assert_eq!(
        kinds_at(&outcome),
        vec![(IssueKind::InvariantViolation, "Observation.component")]
    );
    assert_eq!(outcome.issues[0].severity, IssueSeverity::Warning);
    assert!(mapper.is_valid(&schema, &observation).unwrap());

    let strict = MapperConfig {
        validation: ValidationPolicy { fail_on_warnings: true },
        ..MapperConfig::default()
    };
    let strict_mapper = SchemaMapper::r4(strict, profiles()).unwrap();
    let strict_schema = strict_mapper.build_schema(FINAL_OBSERVATION).unwrap().unwrap();
    assert!(!strict_mapper.is_valid(&strict_schema, &observation).unwrap());
}

#[test]
fn test_filtered_invariant_reports_violation() {
    let mapper = mapper();
    let schema = schema(&mapper, OFFICIAL_PRACTITIONER);

    let usual_only = resource(json!({
        "resourceType": "Practitioner",
        "name": [{ "use": "usual", "family": "Postlethwaite" }]
    }));
    let outcome = mapper.validate(&schema, &usual_only).unwrap();
    assert_eq!(kinds_at(&outcome), vec![(IssueKind::InvariantViolation, "Practitioner")]);
    assert_eq!(outcome.issues[0].invariant_key.as_deref(), Some("prac-1"));
    assert_eq!(outcome.issues[0].detail, "A practitioner needs an official name");

    let unnamed = resource(json!({ "resourceType": "Practitioner" }));
    assert_eq!(mapper.validate(&schema, &unnamed).unwrap().issues.len(), 1);

    let official = resource(json!({
        "resourceType": "Practitioner",
        "name": [{ "use": "usual" }, { "use": "official", "family": "Postlethwaite" }]
    }));
    assert!(mapper.validate(&schema, &official).unwrap().is_valid());
}

#[test]
fn test_operation_outcome_from_validation() {
    let mapper = mapper();
    let schema = schema(&mapper, FINAL_OBSERVATION);
    let observation = resource(json!({ "resourceType": "Observation", "status": "final" }));

    let rendered = mapper.validate(&schema, &observation).unwrap().to_operation_outcome();
    assert_eq!(rendered["resourceType"], "OperationOutcome");
    assert_eq!(rendered["issue"].as_array().unwrap().len(), 1);
    assert_eq!(rendered["issue"][0]["code"], "required");
    assert_eq!(rendered["issue"][0]["expression"][0], "Observation.code");
}

#[test]
fn test_valid_observation() {
    let mapper = mapper();
    let schema = schema(&mapper, FINAL_OBSERVATION);
    let observation = resource(json!({
        "resourceType": "Observation",
        "status": "final",
        "code": { "coding": [{ "system": "http://loinc.org", "code": "8867-4" }] },
        "valueQuantity": { "value": 72, "unit": "beats/minute" }
    }));

    assert!(mapper.validate(&schema, &observation).unwrap().is_valid());
}
