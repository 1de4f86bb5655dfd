//! Unit tests for recursive partial overrides.

use rstest::rstest;
use serde_json::{Value, json};

use super::{Record, merge_partial, merge_value, shallow_extend, union_keys};

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a record, got {other}"),
    }
}

#[rstest]
#[case::null_keeps_base(json!({"a": 1}), Value::Null, json!({"a": 1}))]
#[case::scalar_replaces(json!({"a": 1}), json!(5), json!(5))]
#[case::array_replaces(json!({"a": 1}), json!([1, 2]), json!([1, 2]))]
#[case::record_over_scalar(json!("base"), json!({"a": 1}), json!({"a": 1}))]
#[case::nested_keeps_siblings(
    json!({"a": {"x": 1, "y": 2}, "b": 3}),
    json!({"a": {"y": 20}}),
    json!({"a": {"x": 1, "y": 20}, "b": 3})
)]
#[case::explicit_null_preserved(json!({"name": "Kid", "grade": 1}), json!({"name": null}), json!({"name": null, "grade": 1}))]
#[case::new_keys_applied(json!({"name": "hello"}), json!({"foreignId": "fk1"}), json!({"name": "hello", "foreignId": "fk1"}))]
#[case::arrays_are_opaque(json!({"tags": ["a", "b", "c"]}), json!({"tags": ["z"]}), json!({"tags": ["z"]}))]
#[case::empty_partial_record(json!({"a": {"x": 1}}), json!({"a": {}}), json!({"a": {"x": 1}}))]
fn merge_partial_cases(#[case] base: Value, #[case] partial: Value, #[case] expected: Value) {
    assert_eq!(merge_partial(base, partial), expected);
}

#[rstest]
fn merged_keys_follow_base_then_override_order() {
    let merged = merge_partial(
        json!({"first": 1, "second": 2}),
        json!({"third": 3, "first": 10, "fourth": 4}),
    );
    let keys: Vec<&str> = merged
        .as_object()
        .map(|map| map.keys().map(String::as_str).collect())
        .unwrap_or_default();
    assert_eq!(keys, vec!["first", "second", "third", "fourth"]);
}

#[rstest]
fn union_keys_deduplicates() {
    let base = record(json!({"a": 1, "b": 2}));
    let overlay = record(json!({"b": 3, "c": 4}));
    assert_eq!(union_keys(&base, &overlay), vec!["a", "b", "c"]);
}

#[rstest]
fn merge_value_updates_in_place() {
    let mut target = json!({"greeting": "hi", "nested": {"x": 1}});
    merge_value(&mut target, json!({"nested": {"y": 2}}));
    assert_eq!(target, json!({"greeting": "hi", "nested": {"x": 1, "y": 2}}));
}

#[rstest]
fn shallow_extend_reports_overwrites() {
    let mut target = record(json!({"hello": "kitty"}));
    let overwritten = shallow_extend(&mut target, record(json!({"hello": "world", "bye": "birdie"})));
    assert_eq!(overwritten, vec!["hello"]);
    assert_eq!(Value::Object(target), json!({"hello": "world", "bye": "birdie"}));
}
