//! Value sources for synchronous builders.
//!
//! Every builder field holds a [`FieldSource`]: a literal copied into each
//! build, a [`SequenceGenerator`] evaluated against the build's sequence
//! number, or a [`DerivedValue`] evaluated once the rest of the object is
//! known. Resolution matches on the variant, so there is no runtime type
//! inspection.
//!
//! Closures are stored behind [`Arc`], so builders clone cheaply and can be
//! handed to the asynchronous engine.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::result_ext::SerializeFieldExt;
use crate::{BoxedSourceError, FactoryError, FactoryResult, Record, SequenceNumber};

type SequenceFn = dyn Fn(&str, SequenceNumber) -> FactoryResult<Value> + Send + Sync;
type DerivedFn = dyn Fn(&str, &Record, SequenceNumber) -> FactoryResult<Value> + Send + Sync;

/// Produces a field value from the build's sequence number.
#[derive(Clone)]
pub struct SequenceGenerator {
    func: Arc<SequenceFn>,
}

impl SequenceGenerator {
    /// Wrap a raw generator receiving the field name and sequence number.
    #[must_use]
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&str, SequenceNumber) -> FactoryResult<Value> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    /// Produce the value of `field` for sequence number `seq`.
    ///
    /// # Errors
    ///
    /// Propagates failures reported by the wrapped generator.
    pub fn generate(&self, field: &str, seq: SequenceNumber) -> FactoryResult<Value> {
        (self.func)(field, seq)
    }
}

impl fmt::Debug for SequenceGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SequenceGenerator(..)")
    }
}

/// Produces a field value from the object built so far.
#[derive(Clone)]
pub struct DerivedValue {
    func: Arc<DerivedFn>,
}

impl DerivedValue {
    /// Wrap a raw derivation receiving the field name, owner, and sequence
    /// number.
    #[must_use]
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&str, &Record, SequenceNumber) -> FactoryResult<Value> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    /// Compute the value of `field` given its `owner`.
    ///
    /// # Errors
    ///
    /// Propagates failures reported by the wrapped derivation.
    pub fn derive(&self, field: &str, owner: &Record, seq: SequenceNumber) -> FactoryResult<Value> {
        (self.func)(field, owner, seq)
    }
}

impl fmt::Debug for DerivedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedValue(..)")
    }
}

/// How a builder field obtains its value.
#[derive(Clone, Debug)]
pub enum FieldSource {
    /// Copied verbatim (deeply) into every build.
    Literal(Value),
    /// Evaluated with the sequence number of each build.
    Sequence(SequenceGenerator),
    /// Evaluated after overrides are applied.
    Derived(DerivedValue),
}

impl FieldSource {
    /// Serialise `value` into a literal source.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::Serialize`] when `value` cannot be represented
    /// as JSON.
    pub fn literal<V: Serialize>(value: &V) -> FactoryResult<Self> {
        serde_json::to_value(value)
            .for_field("<literal>")
            .map(Self::Literal)
    }

    /// Returns `true` when the source is resolved after overrides.
    #[must_use]
    pub const fn is_derived(&self) -> bool {
        matches!(self, Self::Derived(_))
    }
}

/// A generator computing each value from the sequence number.
///
/// ```rust
/// use fabrique::{FactoryResult, make_factory, source::each, Builder};
/// use serde_json::Value;
///
/// let factory = make_factory::<Value>(Builder::new().field("id", each(|n| n * 2)));
/// let ids: Vec<Value> = factory
///     .build_list(3)?
///     .into_iter()
///     .map(|item| item["id"].clone())
///     .collect();
/// assert_eq!(ids, vec![0, 2, 4]);
/// # Ok::<_, std::sync::Arc<fabrique::FactoryError>>(())
/// ```
#[must_use]
pub fn each<V, F>(func: F) -> FieldSource
where
    V: Serialize,
    F: Fn(SequenceNumber) -> V + Send + Sync + 'static,
{
    FieldSource::Sequence(SequenceGenerator::new(move |field, seq| {
        serde_json::to_value(func(seq)).for_field(field)
    }))
}

/// A fallible generator; errors fail the whole build.
#[must_use]
pub fn try_each<V, E, F>(func: F) -> FieldSource
where
    V: Serialize,
    E: Into<BoxedSourceError>,
    F: Fn(SequenceNumber) -> Result<V, E> + Send + Sync + 'static,
{
    FieldSource::Sequence(SequenceGenerator::new(move |field, seq| {
        let produced = func(seq).map_err(|e| FactoryError::generator(field, e))?;
        serde_json::to_value(produced).for_field(field)
    }))
}

/// A generator yielding the same value for every build.
#[must_use]
pub fn val<V>(value: V) -> FieldSource
where
    V: Serialize + Send + Sync + 'static,
{
    FieldSource::Sequence(SequenceGenerator::new(move |field, _| {
        serde_json::to_value(&value).for_field(field)
    }))
}

/// A value derived from the rest of the object.
#[must_use]
pub fn derived<V, F>(func: F) -> FieldSource
where
    V: Serialize,
    F: Fn(&Record, SequenceNumber) -> V + Send + Sync + 'static,
{
    FieldSource::Derived(DerivedValue::new(move |field, owner, seq| {
        serde_json::to_value(func(owner, seq)).for_field(field)
    }))
}

/// A fallible derived value; errors fail the whole build.
#[must_use]
pub fn try_derived<V, E, F>(func: F) -> FieldSource
where
    V: Serialize,
    E: Into<BoxedSourceError>,
    F: Fn(&Record, SequenceNumber) -> Result<V, E> + Send + Sync + 'static,
{
    FieldSource::Derived(DerivedValue::new(move |field, owner, seq| {
        let produced = func(owner, seq).map_err(|e| FactoryError::derivation(field, e))?;
        serde_json::to_value(produced).for_field(field)
    }))
}

impl From<Value> for FieldSource {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl From<SequenceGenerator> for FieldSource {
    fn from(generator: SequenceGenerator) -> Self {
        Self::Sequence(generator)
    }
}

impl From<DerivedValue> for FieldSource {
    fn from(derived: DerivedValue) -> Self {
        Self::Derived(derived)
    }
}

macro_rules! literal_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for FieldSource {
                fn from(value: $ty) -> Self {
                    Self::Literal(Value::from(value))
                }
            }
        )*
    };
}

literal_from!(&str, String, bool, i32, i64, u32, u64, f64);
