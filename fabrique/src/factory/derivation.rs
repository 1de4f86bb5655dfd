//! Derived-field helpers for [`Factory`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::Factory;
use super::engine::would_be_value;
use crate::builder::Builder;
use crate::result_ext::SerializeFieldExt;
use crate::source::{DerivedValue, FieldSource, derived};
use crate::{FactoryError, FactoryResult, Record, SequenceNumber};

/// Read sibling `name` of `owner` as an `A`, attributing failures to `field`.
pub(crate) fn input<A: DeserializeOwned>(
    owner: &Record,
    name: &str,
    field: &str,
) -> FactoryResult<A> {
    A::deserialize(owner.get(name).unwrap_or(&Value::Null))
        .map_err(|e| FactoryError::derivation(field, e))
}

impl<T> Factory<T> {
    fn with_source(&self, key: &str, source: FieldSource) -> Self {
        self.extend(Builder::new().field(key, source))
    }

    /// Install a derivation computing `key` from the whole object.
    ///
    /// The derivation runs after overrides are applied, so it observes the
    /// final values of its siblings. An override that names `key` directly
    /// wins over the derivation.
    ///
    /// ```rust
    /// use fabrique::{Builder, make_factory};
    /// use serde_json::{Value, json};
    ///
    /// let people = make_factory::<Value>(
    ///     Builder::new()
    ///         .field("firstName", "Jules")
    ///         .field("lastName", "Bond"),
    /// )
    /// .with_derivation("fullName", |person, _| {
    ///     let part = |key: &str| person[key].as_str().unwrap_or_default().to_owned();
    ///     format!("{} {}", part("firstName"), part("lastName"))
    /// });
    /// let bond = people.build_with(json!({"firstName": "James"}))?;
    /// assert_eq!(bond["fullName"], "James Bond");
    /// # Ok::<_, std::sync::Arc<fabrique::FactoryError>>(())
    /// ```
    #[must_use]
    pub fn with_derivation<V, F>(&self, key: &str, func: F) -> Self
    where
        V: Serialize,
        F: Fn(&Record, SequenceNumber) -> V + Send + Sync + 'static,
    {
        self.with_source(key, derived(func))
    }

    /// Install a derivation computing `key` from one sibling field.
    #[must_use]
    pub fn with_derivation1<A, V, F>(&self, source: &str, key: &str, func: F) -> Self
    where
        A: DeserializeOwned,
        V: Serialize,
        F: Fn(A, SequenceNumber) -> V + Send + Sync + 'static,
    {
        let first = source.to_owned();
        self.with_source(
            key,
            FieldSource::Derived(DerivedValue::new(move |field, owner, seq| {
                let a = input(owner, &first, field)?;
                serde_json::to_value(func(a, seq)).for_field(field)
            })),
        )
    }

    /// Install a derivation computing `key` from two sibling fields.
    #[must_use]
    pub fn with_derivation2<A, B, V, F>(&self, sources: (&str, &str), key: &str, func: F) -> Self
    where
        A: DeserializeOwned,
        B: DeserializeOwned,
        V: Serialize,
        F: Fn(A, B, SequenceNumber) -> V + Send + Sync + 'static,
    {
        let (first, second) = (sources.0.to_owned(), sources.1.to_owned());
        self.with_source(
            key,
            FieldSource::Derived(DerivedValue::new(move |field, owner, seq| {
                let a = input(owner, &first, field)?;
                let b = input(owner, &second, field)?;
                serde_json::to_value(func(a, b, seq)).for_field(field)
            })),
        )
    }

    /// Install a derivation computing `key` from three sibling fields.
    #[must_use]
    pub fn with_derivation3<A, B, C, V, F>(
        &self,
        sources: (&str, &str, &str),
        key: &str,
        func: F,
    ) -> Self
    where
        A: DeserializeOwned,
        B: DeserializeOwned,
        C: DeserializeOwned,
        V: Serialize,
        F: Fn(A, B, C, SequenceNumber) -> V + Send + Sync + 'static,
    {
        let (first, second, third) = (
            sources.0.to_owned(),
            sources.1.to_owned(),
            sources.2.to_owned(),
        );
        self.with_source(
            key,
            FieldSource::Derived(DerivedValue::new(move |field, owner, seq| {
                let a = input(owner, &first, field)?;
                let b = input(owner, &second, field)?;
                let c = input(owner, &third, field)?;
                serde_json::to_value(func(a, b, c, seq)).for_field(field)
            })),
        )
    }

    /// Install a derivation computing `key` from `N` sibling values.
    ///
    /// Missing siblings are passed as `null`.
    #[must_use]
    pub fn with_derivation_n<const N: usize, V, F>(
        &self,
        sources: [&str; N],
        key: &str,
        func: F,
    ) -> Self
    where
        V: Serialize,
        F: Fn([Value; N], SequenceNumber) -> V + Send + Sync + 'static,
    {
        let inputs = sources.map(str::to_owned);
        self.with_source(
            key,
            FieldSource::Derived(DerivedValue::new(move |field, owner, seq| {
                let values = inputs
                    .each_ref()
                    .map(|name| owner.get(name).cloned().unwrap_or(Value::Null));
                serde_json::to_value(func(values, seq)).for_field(field)
            })),
        )
    }

    /// Install a derivation of `key` from the value `key` would otherwise
    /// take.
    ///
    /// `func` receives the object with `key` set to its would-be value: the
    /// value this factory (before the self-derivation) produces for the same
    /// sequence number and siblings. An override naming `key` is kept as is.
    ///
    /// ```rust
    /// use fabrique::{Builder, make_factory, source::each};
    /// use serde_json::{Value, json};
    ///
    /// let base = make_factory::<Value>(Builder::new().field("foo", each(|n| n)));
    /// let scaled = base.with_self_derivation("foo", |owner, _| {
    ///     owner["foo"].as_u64().unwrap_or_default() * 10
    /// });
    /// assert_eq!(scaled.build()?["foo"], 0);
    /// assert_eq!(scaled.build()?["foo"], 10);
    /// assert_eq!(scaled.build_with(json!({"foo": 25}))?["foo"], 25);
    /// # Ok::<_, std::sync::Arc<fabrique::FactoryError>>(())
    /// ```
    #[must_use]
    pub fn with_self_derivation<V, F>(&self, key: &str, func: F) -> Self
    where
        V: Serialize,
        F: Fn(&Record, SequenceNumber) -> V + Send + Sync + 'static,
    {
        let receiver = self.provider.clone();
        self.with_source(
            key,
            FieldSource::Derived(DerivedValue::new(move |field, owner, seq| {
                let original = would_be_value(&receiver, field, owner, seq)?;
                let mut view = owner.clone();
                view.insert(field.to_owned(), original);
                serde_json::to_value(func(&view, seq)).for_field(field)
            })),
        )
    }

    /// Typed form of [`Factory::with_self_derivation`] receiving only the
    /// would-be value of `key`.
    #[must_use]
    pub fn with_self_derivation1<A, V, F>(&self, key: &str, func: F) -> Self
    where
        A: DeserializeOwned,
        V: Serialize,
        F: Fn(A, SequenceNumber) -> V + Send + Sync + 'static,
    {
        let receiver = self.provider.clone();
        self.with_source(
            key,
            FieldSource::Derived(DerivedValue::new(move |field, owner, seq| {
                let original = would_be_value(&receiver, field, owner, seq)?;
                let current = A::deserialize(&original)
                    .map_err(|e| FactoryError::derivation(field, e))?;
                serde_json::to_value(func(current, seq)).for_field(field)
            })),
        )
    }
}
