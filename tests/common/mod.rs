use octofhir_sdc_mapper::literal::value_from_json;
use octofhir_sdc_mapper::*;
use serde_json::{Value, json};
use std::sync::{Arc, Once};

pub const SDC_PRACTITIONER: &str = "http://example.org/StructureDefinition/sdc-practitioner";
pub const BIRTH_PLACE: &str = "http://example.org/StructureDefinition/birth-place";
pub const FINAL_OBSERVATION: &str = "http://example.org/StructureDefinition/final-observation";
pub const OFFICIAL_PRACTITIONER: &str = "http://example.org/StructureDefinition/official-practitioner";
pub const LICENSED_PRACTITIONER: &str = "http://example.org/StructureDefinition/licensed-practitioner";
pub const NPI_SYSTEM: &str = "http://hl7.org/fhir/sid/us-npi";
pub const GENDER_SYSTEM: &str = "http://hl7.org/fhir/administrative-gender";
pub const DEGREE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v2-0360";

static TRACING: Once = Once::new();

/// Routes `tracing` output through the test harness. Honours `RUST_LOG`.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn structure_definition(url: &str, type_name: &str, elements: Value) -> Value {
    json!({
        "resourceType": "StructureDefinition",
        "url": url,
        "type": type_name,
        "snapshot": { "element": elements }
    })
}

#[allow(dead_code)]
pub fn practitioner_profile() -> Value {
    structure_definition(
        SDC_PRACTITIONER,
        "Practitioner",
        json!([
            { "id": "Practitioner", "path": "Practitioner", "min": 0, "max": "*" },
            { "path": "Practitioner.id", "min": 0, "max": "1", "type": [{ "code": "id" }] },
            { "path": "Practitioner.text", "min": 0, "max": "1", "type": [{ "code": "Narrative" }] },
            {
                "path": "Practitioner.extension",
                "min": 0,
                "max": "*",
                "type": [{ "code": "Extension" }],
                "slicing": { "discriminator": [{ "type": "value", "path": "url" }], "rules": "open" }
            },
            {
                "id": "Practitioner.extension:birthPlace",
                "path": "Practitioner.extension",
                "sliceName": "birthPlace",
                "min": 0,
                "max": "1",
                "type": [{ "code": "Extension", "profile": [BIRTH_PLACE] }]
            },
            { "path": "Practitioner.modifierExtension", "min": 0, "max": "*", "type": [{ "code": "Extension" }] },
            {
                "path": "Practitioner.identifier",
                "min": 0,
                "max": "*",
                "type": [{ "code": "Identifier" }],
                "slicing": { "discriminator": [{ "type": "value", "path": "system" }], "rules": "open" }
            },
            {
                "id": "Practitioner.identifier:npi",
                "path": "Practitioner.identifier",
                "sliceName": "npi",
                "min": 0,
                "max": "1",
                "type": [{ "code": "Identifier" }]
            },
            {
                "id": "Practitioner.identifier:npi.system",
                "path": "Practitioner.identifier.system",
                "min": 1,
                "max": "1",
                "type": [{ "code": "uri" }],
                "fixedUri": NPI_SYSTEM
            },
            {
                "id": "Practitioner.identifier:npi.value",
                "path": "Practitioner.identifier.value",
                "min": 1,
                "max": "1",
                "type": [{ "code": "string" }]
            },
            { "path": "Practitioner.active", "min": 1, "max": "1", "type": [{ "code": "boolean" }] },
            { "path": "Practitioner.name", "min": 0, "max": "*", "type": [{ "code": "HumanName" }] },
            { "path": "Practitioner.telecom", "min": 0, "max": "0", "type": [{ "code": "ContactPoint" }] },
            { "path": "Practitioner.gender", "min": 0, "max": "1", "type": [{ "code": "code" }] },
            { "path": "Practitioner.birthDate", "min": 0, "max": "1", "type": [{ "code": "date" }] },
            {
                "path": "Practitioner.qualification",
                "min": 0,
                "max": "*",
                "type": [{ "code": "BackboneElement" }]
            },
            {
                "path": "Practitioner.qualification.code",
                "min": 1,
                "max": "1",
                "type": [{ "code": "CodeableConcept" }]
            },
            {
                "path": "Practitioner.qualification.issuer",
                "min": 0,
                "max": "1",
                "type": [{
                    "code": "Reference",
                    "targetProfile": ["http://hl7.org/fhir/StructureDefinition/Organization"]
                }],
                "fixedReference": { "reference": "Organization/1", "display": "Walt Disney Corporation" }
            }
        ]),
    )
}

#[allow(dead_code)]
pub fn birth_place_extension() -> Value {
    structure_definition(
        BIRTH_PLACE,
        "Extension",
        json!([
            { "path": "Extension", "min": 0, "max": "1" },
            { "path": "Extension.extension", "min": 0, "max": "0", "type": [{ "code": "Extension" }] },
            { "path": "Extension.url", "min": 1, "max": "1", "type": [{ "code": "uri" }], "fixedUri": BIRTH_PLACE },
            { "path": "Extension.value[x]", "min": 1, "max": "1", "type": [{ "code": "Address" }] }
        ]),
    )
}

#[allow(dead_code)]
pub fn observation_profile() -> Value {
    structure_definition(
        FINAL_OBSERVATION,
        "Observation",
        json!([
            {
                "path": "Observation",
                "min": 0,
                "max": "*",
                "constraint": [{
                    "key": "obs-6",
                    "severity": "error",
                    "human": "dataAbsentReason SHALL only be present if Observation.value[x] is not present",
                    "expression": "dataAbsentReason.empty() or (valueQuantity | valueCodeableConcept | valueString).empty()"
                }]
            },
            { "path": "Observation.status", "min": 1, "max": "1", "type": [{ "code": "code" }], "fixedCode": "final" },
            { "path": "Observation.code", "min": 1, "max": "1", "type": [{ "code": "CodeableConcept" }] },
            { "path": "Observation.value[x]", "min": 0, "max": "1", "type": [{ "code": "Quantity" }] },
            {
                "path": "Observation.dataAbsentReason",
                "min": 0,
                "max": "1",
                "type": [{ "code": "CodeableConcept" }]
            },
            {
                "path": "Observation.component",
                "min": 0,
                "max": "*",
                "type": [{ "code": "BackboneElement" }],
                "constraint": [{
                    "key": "obs-7",
                    "severity": "warning",
                    "human": "A component needs a value or a data absent reason",
                    "expression": "(valueQuantity | valueCodeableConcept | valueString).exists() or dataAbsentReason.exists()"
                }]
            },
            {
                "path": "Observation.component.code",
                "min": 1,
                "max": "1",
                "type": [{ "code": "CodeableConcept" }]
            },
            {
                "path": "Observation.component.value[x]",
                "min": 0,
                "max": "1",
                "type": [{ "code": "Quantity" }]
            },
            {
                "path": "Observation.component.dataAbsentReason",
                "min": 0,
                "max": "1",
                "type": [{ "code": "CodeableConcept" }]
            }
        ]),
    )
}

#[allow(dead_code)]
pub fn official_practitioner_profile() -> Value {
    structure_definition(
        OFFICIAL_PRACTITIONER,
        "Practitioner",
        json!([
            {
                "path": "Practitioner",
                "min": 0,
                "max": "*",
                "constraint": [{
                    "key": "prac-1",
                    "severity": "error",
                    "human": "A practitioner needs an official name",
                    "expression": "name.where(use = 'official').exists()"
                }]
            },
            { "path": "Practitioner.name", "min": 0, "max": "*", "type": [{ "code": "HumanName" }] },
            { "path": "Practitioner.name.use", "min": 0, "max": "1", "type": [{ "code": "code" }] },
            { "path": "Practitioner.name.family", "min": 0, "max": "1", "type": [{ "code": "string" }] }
        ]),
    )
}

/// A Practitioner that must carry a qualification issued by a fixed
/// organization.
#[allow(dead_code)]
pub fn licensed_practitioner_profile() -> Value {
    structure_definition(
        LICENSED_PRACTITIONER,
        "Practitioner",
        json!([
            { "path": "Practitioner", "min": 0, "max": "*" },
            { "path": "Practitioner.active", "min": 0, "max": "1", "type": [{ "code": "boolean" }] },
            {
                "path": "Practitioner.qualification",
                "min": 1,
                "max": "*",
                "type": [{ "code": "BackboneElement" }]
            },
            {
                "path": "Practitioner.qualification.code",
                "min": 0,
                "max": "1",
                "type": [{ "code": "CodeableConcept" }]
            },
            {
                "path": "Practitioner.qualification.issuer",
                "min": 0,
                "max": "1",
                "type": [{ "code": "Reference" }],
                "fixedReference": { "reference": "Organization/1", "display": "Walt Disney Corporation" }
            }
        ]),
    )
}

/// All fixture profiles, loaded into one store.
#[allow(dead_code)]
pub fn profiles() -> Arc<InMemorySnapshotProvider> {
    let store = InMemorySnapshotProvider::new();
    for definition in [
        practitioner_profile(),
        birth_place_extension(),
        observation_profile(),
        official_practitioner_profile(),
        licensed_practitioner_profile(),
    ] {
        store.load_json(definition).unwrap();
    }
    Arc::new(store)
}

#[allow(dead_code)]
pub fn mapper() -> SchemaMapper {
    init_tracing();
    SchemaMapper::r4(MapperConfig::default(), profiles()).unwrap()
}

#[allow(dead_code)]
pub fn schema(mapper: &SchemaMapper, profile: &str) -> Arc<SchemaNode> {
    mapper.build_schema(profile).unwrap().unwrap()
}

/// An instance from resource JSON.
#[allow(dead_code)]
pub fn resource(json: Value) -> FhirValue {
    let type_name = json["resourceType"].as_str().unwrap().to_string();
    value_from_json(&type_name, &json, TypeRegistry::r4().as_ref()).unwrap()
}

#[allow(dead_code)]
pub fn practitioner_answers() -> AnswerRoot {
    let qualification = |code: &str, display: &str| {
        AnswerItem::group(
            "Practitioner.qualification",
            vec![AnswerItem::question(
                "Practitioner.qualification.code",
                vec![AnswerValue::Coding(Coding::new(DEGREE_SYSTEM, code).with_display(display))],
            )],
        )
    };

    AnswerRoot::new(vec![
        AnswerItem::question("Practitioner.active", vec![AnswerValue::Boolean(true)]),
        AnswerItem::question(
            "Practitioner.gender",
            vec![AnswerValue::Coding(Coding::new(GENDER_SYSTEM, "male"))],
        ),
        AnswerItem::question("Practitioner.birthDate", vec![AnswerValue::Date("1970".to_string())]),
        AnswerItem::group(
            "Practitioner.name",
            vec![AnswerItem::question(
                "Practitioner.name.text",
                vec![AnswerValue::String("Brian Postlethwaite".to_string())],
            )],
        ),
        qualification("BS", "Bachelor of Science"),
        qualification("MD", "Doctor of Medicine"),
    ])
}
