//! Unit tests for builders and builder resolution.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::{Builder, BuilderProvider, resolve};
use crate::FactoryError;
use crate::source::{derived, each};

#[fixture]
fn person() -> Builder {
    Builder::new()
        .field("firstName", "Jules")
        .field("lastName", "Bond")
        .field("fullName", derived(|_, _| "pending"))
        .field("id", each(|n| n + 100))
}

#[rstest]
fn resolve_splits_derived_fields(person: Builder) {
    let base = match resolve(2, &person) {
        Ok(base) => base,
        Err(err) => panic!("resolution failed: {err}"),
    };
    assert_eq!(
        Value::Object(base.value),
        json!({"firstName": "Jules", "lastName": "Bond", "id": 102})
    );
    let pending: Vec<&str> = base.derived.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(pending, vec!["fullName"]);
}

#[rstest]
fn literal_records_are_not_shared() {
    let builder = Builder::new().field("bar", json!({"baz": "immutable"}));
    let first_base = resolve(0, &builder).map(|b| b.value).ok();
    let second_base = resolve(1, &builder).map(|b| b.value).ok();
    let (Some(mut first), Some(second)) = (first_base, second_base) else {
        panic!("resolution failed");
    };
    if let Some(bar) = first.get_mut("bar") {
        *bar = json!({"baz": "mutated"});
    }
    assert_eq!(second.get("bar"), Some(&json!({"baz": "immutable"})));
}

#[rstest]
fn overlay_replaces_in_place(person: Builder) {
    let mut builder = person;
    builder.overlay(Builder::new().field("firstName", "James").field("extra", 1));
    let keys: Vec<&str> = builder.keys().collect();
    assert_eq!(keys, vec!["firstName", "lastName", "fullName", "id", "extra"]);
}

#[rstest]
fn union_rejects_overlap(person: Builder) {
    let other = Builder::new().field("id", 1).field("email", "a@b.c");
    let outcome = person.union(&other);
    assert!(matches!(
        outcome.as_ref().map_err(|e| e.as_ref()),
        Err(FactoryError::OverlappingFields { fields }) if fields == &vec![String::from("id")]
    ));
}

#[rstest]
fn union_of_disjoint_builders(person: Builder) {
    let other = Builder::new().field("email", "a@b.c");
    let combined = person.union(&other).map(|b| b.len()).ok();
    assert_eq!(combined, Some(5));
}

#[rstest]
fn lazy_provider_runs_per_build() {
    let calls = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&calls);
    let provider = BuilderProvider::lazy(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Builder::new().field("name", "Kid")
    });
    assert!(provider.materialize().is_ok());
    assert!(provider.materialize().is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[rstest]
fn lazy_combination_checks_overlap_when_materialised() {
    let left = BuilderProvider::lazy(|| Builder::new().field("a", 1));
    let right = BuilderProvider::fixed(Builder::new().field("a", 2));
    let combined = left.combined(&right).ok();
    let Some(provider) = combined else {
        panic!("lazy combination should defer the overlap check");
    };
    assert!(provider.materialize().is_err());
}

#[rstest]
fn from_record_uses_literals() {
    let Value::Object(record) = json!({"a": 1, "b": [true]}) else {
        panic!("expected record");
    };
    let builder: Builder = Builder::from_record(record);
    let base = resolve(0, &builder).map(|b| Value::Object(b.value)).ok();
    assert_eq!(base, Some(json!({"a": 1, "b": [true]})));
}
