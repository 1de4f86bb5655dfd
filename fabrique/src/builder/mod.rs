//! Builders: ordered field templates and their per-build resolution.
//!
//! A [`Builder`] maps field names to value sources in declaration order. The
//! order matters twice: it is the key order of every built record, and it is
//! the order in which derived fields are evaluated.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::source::{DerivedValue, FieldSource};
use crate::{FactoryError, FactoryResult, Record, SequenceNumber};

/// Ordered mapping from field name to value source.
///
/// The synchronous engine uses `Builder<FieldSource>` (the default); the
/// asynchronous engine uses [`crate::asynchronous::AsyncBuilder`].
#[derive(Clone, Debug)]
pub struct Builder<S = FieldSource> {
    fields: IndexMap<String, S>,
}

impl<S> Default for Builder<S> {
    fn default() -> Self {
        Self {
            fields: IndexMap::new(),
        }
    }
}

impl<S> Builder<S> {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a field, returning the builder for chaining.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, source: impl Into<S>) -> Self {
        self.insert(key, source);
        self
    }

    /// Add (or replace) a field in place.
    ///
    /// Replacing keeps the field's original position.
    pub fn insert(&mut self, key: impl Into<String>, source: impl Into<S>) -> Option<S> {
        self.fields.insert(key.into(), source.into())
    }

    /// Look up the source of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&S> {
        self.fields.get(key)
    }

    /// Returns `true` when the builder declares `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Field names in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Declaration index of `key`.
    pub(crate) fn position(&self, key: &str) -> Option<usize> {
        self.fields.get_index_of(key)
    }

    /// Fields and sources in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &S)> {
        self.fields.iter().map(|(key, source)| (key.as_str(), source))
    }

    /// Number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when no fields are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Replace fields with those of `partial`, field by field.
    ///
    /// A replaced field takes the new source wholesale; sources are never
    /// merged with each other.
    pub fn overlay(&mut self, partial: Self) {
        self.fields.extend(partial.fields);
    }

    /// Convert every source with `convert`, keeping the field order.
    #[must_use]
    pub fn map_sources<T>(self, mut convert: impl FnMut(S) -> T) -> Builder<T> {
        Builder {
            fields: self
                .fields
                .into_iter()
                .map(|(key, source)| (key, convert(source)))
                .collect(),
        }
    }
}

impl<S: Clone> Builder<S> {
    /// A copy of this builder with `partial` overlaid.
    #[must_use]
    pub fn extended(&self, partial: &Self) -> Self {
        let mut next = self.clone();
        next.overlay(partial.clone());
        next
    }

    /// The union of two builders with disjoint fields.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::OverlappingFields`] when both builders declare
    /// a field.
    pub fn union(&self, other: &Self) -> FactoryResult<Self> {
        let overlapping: Vec<String> = other
            .keys()
            .filter(|key| self.contains_key(key))
            .map(str::to_owned)
            .collect();
        if !overlapping.is_empty() {
            return Err(Arc::new(FactoryError::OverlappingFields {
                fields: overlapping,
            }));
        }
        Ok(self.extended(other))
    }
}

impl<S: From<Value>> Builder<S> {
    /// A builder whose every field is the literal found in `record`.
    #[must_use]
    pub fn from_record(record: Record) -> Self {
        record
            .into_iter()
            .map(|(key, value)| (key, S::from(value)))
            .collect()
    }
}

impl<S, K: Into<String>> FromIterator<(K, S)> for Builder<S> {
    fn from_iter<I: IntoIterator<Item = (K, S)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(key, source)| (key.into(), source))
                .collect(),
        }
    }
}

impl<S> IntoIterator for Builder<S> {
    type Item = (String, S);
    type IntoIter = indexmap::map::IntoIter<String, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

type LazyBuilderFn = dyn Fn() -> FactoryResult<Builder> + Send + Sync;

/// Supplies a fresh builder snapshot at the start of every build.
#[derive(Clone)]
pub enum BuilderProvider {
    /// A builder shared by every build.
    Fixed(Arc<Builder>),
    /// A function invoked once per build.
    Lazy(Arc<LazyBuilderFn>),
}

impl BuilderProvider {
    /// Provide the same builder to every build.
    #[must_use]
    pub fn fixed(builder: Builder) -> Self {
        Self::Fixed(Arc::new(builder))
    }

    /// Construct a new builder for every build.
    #[must_use]
    pub fn lazy<F>(make: F) -> Self
    where
        F: Fn() -> Builder + Send + Sync + 'static,
    {
        Self::Lazy(Arc::new(move || Ok(make())))
    }

    /// Materialise the builder for one build.
    ///
    /// # Errors
    ///
    /// Returns an error when a composed lazy builder cannot be assembled, for
    /// example when combined builders overlap.
    pub fn materialize(&self) -> FactoryResult<Arc<Builder>> {
        match self {
            Self::Fixed(builder) => Ok(Arc::clone(builder)),
            Self::Lazy(make) => make().map(Arc::new),
        }
    }

    pub(crate) fn extended(&self, partial: Builder) -> Self {
        match self {
            Self::Fixed(builder) => Self::Fixed(Arc::new(builder.extended(&partial))),
            Self::Lazy(_) => {
                let base = self.clone();
                Self::Lazy(Arc::new(move || {
                    let mut next = Arc::unwrap_or_clone(base.materialize()?);
                    next.overlay(partial.clone());
                    Ok(next)
                }))
            }
        }
    }

    pub(crate) fn combined(&self, other: &Self) -> FactoryResult<Self> {
        match (self, other) {
            (Self::Fixed(left), Self::Fixed(right)) => Ok(Self::Fixed(Arc::new(left.union(right)?))),
            _ => {
                let left = self.clone();
                let right = other.clone();
                Ok(Self::Lazy(Arc::new(move || {
                    left.materialize()?.union(&*right.materialize()?)
                })))
            }
        }
    }
}

impl fmt::Debug for BuilderProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(builder) => f.debug_tuple("Fixed").field(builder).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// A derived field awaiting evaluation.
#[derive(Clone, Debug)]
pub struct PendingDerivation<D = DerivedValue> {
    /// Field receiving the derived value.
    pub key: String,
    /// The derivation to evaluate.
    pub derived: D,
}

/// Outcome of resolving a builder for one sequence number.
#[derive(Clone, Debug)]
pub struct ResolvedBase<D = DerivedValue> {
    /// Every resolved field except those awaiting derivation.
    pub value: Record,
    /// Derived fields in declaration order.
    pub derived: Vec<PendingDerivation<D>>,
}

/// Resolve every non-derived field of `builder` for sequence number `seq`.
///
/// Literals are cloned so two builds never share nested values; derived
/// fields are returned separately, in declaration order, for evaluation after
/// overrides are applied.
///
/// # Errors
///
/// Propagates the first generator failure; no partial result is returned.
pub fn resolve(seq: SequenceNumber, builder: &Builder) -> FactoryResult<ResolvedBase> {
    let mut value = Record::new();
    let mut derived = Vec::new();
    for (key, source) in builder.iter() {
        match source {
            FieldSource::Literal(literal) => {
                value.insert(key.to_owned(), literal.clone());
            }
            FieldSource::Sequence(generator) => {
                let generated = generator.generate(key, seq)?;
                tracing::trace!(field = key, seq, "generated field");
                value.insert(key.to_owned(), generated);
            }
            FieldSource::Derived(derivation) => derived.push(PendingDerivation {
                key: key.to_owned(),
                derived: derivation.clone(),
            }),
        }
    }
    Ok(ResolvedBase { value, derived })
}

#[cfg(test)]
mod tests;
