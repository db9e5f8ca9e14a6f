mod common;

use common::*;
use octofhir_sdc_mapper::*;
use pretty_assertions::assert_eq;

#[test]
fn test_practitioner_round_trip() {
    let mapper = mapper();
    let schema = schema(&mapper, SDC_PRACTITIONER);
    let answers = practitioner_answers();

    let practitioner = mapper.populate(&schema, &answers).unwrap();
    let template = AnswerTemplate::from_response(&answers);
    let extracted = mapper
        .extract_answers(schema.clone(), &practitioner, &template)
        .unwrap();

    assert_eq!(extracted, answers);
}

#[test]
fn test_populated_practitioner_shape() {
    let mapper = mapper();
    let schema = schema(&mapper, SDC_PRACTITIONER);
    let practitioner: Composite = mapper.populate_as(&schema, &practitioner_answers()).unwrap();

    assert_eq!(practitioner.type_name, "Practitioner");
    assert_eq!(practitioner.first("active"), Some(&FhirValue::boolean(true)));
    assert_eq!(
        practitioner.first("gender"),
        Some(&FhirValue::code_with_system("male", GENDER_SYSTEM))
    );
    assert_eq!(practitioner.first("birthDate"), Some(&FhirValue::date("1970")));
    assert_eq!(practitioner.get("qualification").len(), 2);
    assert!(practitioner.get("identifier").is_empty());
    assert!(practitioner.get("extension").is_empty());

    let name = practitioner.first("name").and_then(FhirValue::as_composite).unwrap();
    assert_eq!(name.first("text"), Some(&FhirValue::string("Brian Postlethwaite")));
}

#[test]
fn test_fixed_issuer_written_on_every_qualification() {
    let mapper = mapper();
    let schema = schema(&mapper, SDC_PRACTITIONER);
    let practitioner: Composite = mapper.populate_as(&schema, &practitioner_answers()).unwrap();

    for qualification in practitioner.get("qualification") {
        let qualification = qualification.as_composite().unwrap();
        assert_eq!(qualification.first("issuer"), Some(&disney_issuer()));
    }
}

fn disney_issuer() -> FhirValue {
    FhirValue::Reference(ReferenceValue {
        reference: Some("Organization/1".to_string()),
        reference_type: None,
        display: Some("Walt Disney Corporation".to_string()),
    })
}

#[test]
fn test_optional_container_without_answers_is_not_written() {
    let mapper = mapper();
    let schema = schema(&mapper, SDC_PRACTITIONER);
    let answers = AnswerRoot::new(vec![AnswerItem::question(
        "Practitioner.active",
        vec![AnswerValue::Boolean(true)],
    )]);

    let practitioner: Composite = mapper.populate_as(&schema, &answers).unwrap();
    assert_eq!(practitioner.element_names().collect::<Vec<_>>(), vec!["active"]);
    assert!(practitioner.get("qualification").is_empty());
}

#[test]
fn test_required_container_carries_fixed_value_without_answers() {
    let mapper = mapper();
    let schema = schema(&mapper, LICENSED_PRACTITIONER);

    let practitioner: Composite = mapper.populate_as(&schema, &AnswerRoot::new(Vec::new())).unwrap();
    let qualifications = practitioner.get("qualification");
    assert_eq!(qualifications.len(), 1);
    let qualification = qualifications[0].as_composite().unwrap();
    assert_eq!(qualification.first("issuer"), Some(&disney_issuer()));
    assert!(qualification.get("code").is_empty());

    let outcome = mapper
        .validate(&schema, &FhirValue::Composite(practitioner))
        .unwrap();
    assert!(outcome.is_valid(), "{:?}", outcome.issues);
}

#[test]
fn test_populated_practitioner_validates() {
    let mapper = mapper();
    let schema = schema(&mapper, SDC_PRACTITIONER);
    let practitioner = mapper.populate(&schema, &practitioner_answers()).unwrap();

    let outcome = mapper.validate(&schema, &practitioner).unwrap();
    assert!(outcome.is_valid(), "{:?}", outcome.issues);
}

#[test]
fn test_unconvertible_answer_is_dropped() {
    let mapper = mapper();
    let schema = schema(&mapper, SDC_PRACTITIONER);
    let answers = AnswerRoot::new(vec![
        AnswerItem::question("Practitioner.active", vec![AnswerValue::String("yes".to_string())]),
        AnswerItem::question("Practitioner.birthDate", vec![AnswerValue::Integer(1970)]),
        AnswerItem::question("Practitioner.gender", vec![AnswerValue::String("male".to_string())]),
    ]);

    let practitioner: Composite = mapper.populate_as(&schema, &answers).unwrap();
    assert!(practitioner.first("active").is_none());
    assert!(practitioner.first("birthDate").is_none());
    assert_eq!(practitioner.first("gender"), Some(&FhirValue::code("male")));
}

#[test]
fn test_extension_populated_from_descendant_answers() {
    let mapper = mapper();
    let schema = schema(&mapper, SDC_PRACTITIONER);
    let answers = AnswerRoot::new(vec![AnswerItem::question(
        "Practitioner.extension:birthPlace.value[x].city",
        vec![AnswerValue::String("Springfield".to_string())],
    )]);

    let practitioner: Composite = mapper.populate_as(&schema, &answers).unwrap();
    let extensions = practitioner.get("extension");
    assert_eq!(extensions.len(), 1);

    let FhirValue::Extension(birth_place) = &extensions[0] else {
        panic!("expected an extension, got {:?}", extensions[0]);
    };
    assert_eq!(birth_place.url, BIRTH_PLACE);
    let address = birth_place.value.as_deref().and_then(FhirValue::as_composite).unwrap();
    assert_eq!(address.type_name, "Address");
    assert_eq!(address.first("city"), Some(&FhirValue::string("Springfield")));
}

#[test]
fn test_npi_slice_populated_with_fixed_system() {
    let mapper = mapper();
    let schema = schema(&mapper, SDC_PRACTITIONER);
    let answers = AnswerRoot::new(vec![AnswerItem::question(
        "Practitioner.identifier:npi.value",
        vec![AnswerValue::String("1234567893".to_string())],
    )]);

    let practitioner: Composite = mapper.populate_as(&schema, &answers).unwrap();
    let identifiers = practitioner.get("identifier");
    assert_eq!(identifiers.len(), 1);
    let npi = identifiers[0].as_composite().unwrap();
    assert_eq!(npi.first("system"), Some(&FhirValue::uri(NPI_SYSTEM)));
    assert_eq!(npi.first("value"), Some(&FhirValue::string("1234567893")));
}

#[test]
fn test_choice_question_reads_code_with_system() {
    let mapper = mapper();
    let schema = schema(&mapper, SDC_PRACTITIONER);
    let practitioner = FhirValue::Composite(
        Composite::new("Practitioner")
            .with("gender", FhirValue::code_with_system("female", GENDER_SYSTEM)),
    );
    let template = AnswerTemplate {
        questionnaire: None,
        items: vec![TemplateItem::new("Practitioner.gender", ItemKind::Choice)],
    };

    let extracted = mapper.extract_answers(schema, &practitioner, &template).unwrap();
    assert_eq!(
        extracted.items[0].answers[0].value,
        AnswerValue::Coding(Coding::new(GENDER_SYSTEM, "female"))
    );
}
