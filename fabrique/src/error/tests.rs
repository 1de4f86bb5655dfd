//! Unit tests for error construction and conversion.

use std::error::Error as _;
use std::io;

use rstest::rstest;
use serde_json::{Value, json};

use super::FactoryError;

#[rstest]
#[case::null(Value::Null, "null")]
#[case::boolean(json!(true), "a boolean")]
#[case::number(json!(1.5), "a number")]
#[case::string(json!("x"), "a string")]
#[case::array(json!([]), "an array")]
#[case::record(json!({}), "a record")]
fn not_a_record_names_the_kind(#[case] value: Value, #[case] expected: &str) {
    let err = FactoryError::not_a_record("override", &value);
    assert_eq!(err.to_string(), format!("override must be a record, found {expected}"));
}

#[rstest]
fn generator_error_keeps_source() {
    let err = FactoryError::generator("id", io::Error::other("exhausted"));
    assert_eq!(err.field(), Some("id"));
    assert_eq!(err.to_string(), "generator for field 'id' failed: exhausted");
    assert_eq!(err.source().map(ToString::to_string), Some("exhausted".to_owned()));
}

#[rstest]
#[case::unknown(FactoryError::unknown_field("colour"), Some("colour"))]
#[case::missing(FactoryError::missing_required("foreignId"), Some("foreignId"))]
#[case::derivation(FactoryError::derivation("fullName", "bad input"), Some("fullName"))]
#[case::transform(FactoryError::transform("boom"), None)]
#[case::deferred(FactoryError::deferred("late"), None)]
fn field_is_reported_when_known(
    #[case] err: std::sync::Arc<FactoryError>,
    #[case] expected: Option<&str>,
) {
    assert_eq!(err.field(), expected);
}

#[rstest]
fn overlapping_fields_lists_every_key() {
    let err = FactoryError::OverlappingFields {
        fields: vec!["name".into(), "id".into()],
    };
    assert_eq!(
        err.to_string(),
        "cannot combine builders with overlapping fields: name, id"
    );
}

#[rstest]
fn json_errors_convert_to_deserialize() {
    let failure = serde_json::from_value::<u64>(json!("nope"))
        .err()
        .map(FactoryError::from);
    assert!(matches!(failure, Some(FactoryError::Deserialize(_))));
}

#[rstest]
fn figment_errors_round_trip() {
    let err = FactoryError::from(figment::Error::from("bad layer".to_owned()));
    assert!(matches!(err, FactoryError::Config(_)));
    let back = figment::Error::from(err);
    assert!(back.to_string().contains("bad layer"));
}
