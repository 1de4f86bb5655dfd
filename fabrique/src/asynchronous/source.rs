//! Value sources for asynchronous builders.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture, Shared};
use serde::Serialize;
use serde_json::Value;

use crate::result_ext::SerializeFieldExt;
use crate::source::{DerivedValue, FieldSource, SequenceGenerator};
use crate::{BoxedSourceError, FactoryError, FactoryResult, Record, SequenceNumber};

type AsyncSequenceFn =
    dyn Fn(String, SequenceNumber) -> BoxFuture<'static, FactoryResult<Value>> + Send + Sync;
type AsyncDerivedFn =
    dyn Fn(String, Record, SequenceNumber) -> BoxFuture<'static, FactoryResult<Value>>
        + Send
        + Sync;

/// Produces a field value, possibly asynchronously, from the sequence number.
#[derive(Clone)]
pub struct AsyncSequenceGenerator {
    func: Arc<AsyncSequenceFn>,
}

impl AsyncSequenceGenerator {
    /// Wrap a raw generator receiving the field name and sequence number.
    #[must_use]
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(String, SequenceNumber) -> BoxFuture<'static, FactoryResult<Value>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    /// Produce the value of `field` for sequence number `seq`.
    pub fn generate(
        &self,
        field: &str,
        seq: SequenceNumber,
    ) -> BoxFuture<'static, FactoryResult<Value>> {
        (self.func)(field.to_owned(), seq)
    }
}

impl fmt::Debug for AsyncSequenceGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AsyncSequenceGenerator(..)")
    }
}

impl From<SequenceGenerator> for AsyncSequenceGenerator {
    fn from(generator: SequenceGenerator) -> Self {
        Self::new(move |field, seq| future::ready(generator.generate(&field, seq)).boxed())
    }
}

/// Produces a field value, possibly asynchronously, from the object built so
/// far.
#[derive(Clone)]
pub struct AsyncDerivedValue {
    func: Arc<AsyncDerivedFn>,
}

impl AsyncDerivedValue {
    /// Wrap a raw derivation receiving the field name, a snapshot of the
    /// owner, and the sequence number.
    #[must_use]
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(String, Record, SequenceNumber) -> BoxFuture<'static, FactoryResult<Value>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    /// Wrap a synchronous raw derivation.
    pub(crate) fn blocking<F>(func: F) -> Self
    where
        F: Fn(&str, &Record, SequenceNumber) -> FactoryResult<Value> + Send + Sync + 'static,
    {
        Self::new(move |field, owner, seq| future::ready(func(&field, &owner, seq)).boxed())
    }

    /// Compute the value of `field` given a snapshot of its `owner`.
    pub fn derive(
        &self,
        field: &str,
        owner: Record,
        seq: SequenceNumber,
    ) -> BoxFuture<'static, FactoryResult<Value>> {
        (self.func)(field.to_owned(), owner, seq)
    }
}

impl fmt::Debug for AsyncDerivedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AsyncDerivedValue(..)")
    }
}

impl From<DerivedValue> for AsyncDerivedValue {
    fn from(derived: DerivedValue) -> Self {
        Self::blocking(move |field, owner, seq| derived.derive(field, owner, seq))
    }
}

/// A value computed once and shared by every build that uses it.
#[derive(Clone)]
pub struct DeferredValue {
    inner: Shared<BoxFuture<'static, FactoryResult<Value>>>,
}

impl DeferredValue {
    /// Share the outcome of `future` between builds.
    #[must_use]
    pub fn new<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = FactoryResult<Value>> + Send + 'static,
    {
        Self {
            inner: future.boxed().shared(),
        }
    }

    /// Await the shared outcome.
    pub async fn resolve(&self) -> FactoryResult<Value> {
        self.inner.clone().await
    }
}

impl fmt::Debug for DeferredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.peek() {
            Some(outcome) => f.debug_tuple("DeferredValue").field(outcome).finish(),
            None => f.write_str("DeferredValue(<pending>)"),
        }
    }
}

/// How an asynchronous builder field obtains its value.
#[derive(Clone, Debug)]
pub enum AsyncFieldSource {
    /// Copied (deeply) into every build.
    Literal(Value),
    /// Evaluated with the sequence number of each build.
    Sequence(AsyncSequenceGenerator),
    /// Evaluated after overrides are applied.
    Derived(AsyncDerivedValue),
    /// Awaited at resolution; computed at most once.
    Deferred(DeferredValue),
}

impl AsyncFieldSource {
    /// Returns `true` when the source is resolved after overrides.
    #[must_use]
    pub const fn is_derived(&self) -> bool {
        matches!(self, Self::Derived(_))
    }
}

/// An asynchronous generator computing each value from the sequence number.
///
/// ```rust
/// use fabrique::asynchronous::{AsyncBuilder, async_each, make_async_factory};
/// use serde_json::{Value, json};
///
/// # fn main() -> fabrique::FactoryResult<()> {
/// # futures::executor::block_on(async {
/// let factory = make_async_factory::<Value>(
///     AsyncBuilder::new().field("id", async_each(|n| async move { n + 1 })),
/// );
/// assert_eq!(factory.build().await?, json!({"id": 1}));
/// # Ok(())
/// # })
/// # }
/// ```
#[must_use]
pub fn async_each<V, Fut, F>(func: F) -> AsyncFieldSource
where
    V: Serialize,
    Fut: Future<Output = V> + Send + 'static,
    F: Fn(SequenceNumber) -> Fut + Send + Sync + 'static,
{
    AsyncFieldSource::Sequence(AsyncSequenceGenerator::new(move |field, seq| {
        let pending = func(seq);
        async move { serde_json::to_value(pending.await).for_field(&field) }.boxed()
    }))
}

/// A fallible asynchronous generator; errors fail the whole build.
#[must_use]
pub fn try_async_each<V, E, Fut, F>(func: F) -> AsyncFieldSource
where
    V: Serialize,
    E: Into<BoxedSourceError>,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
    F: Fn(SequenceNumber) -> Fut + Send + Sync + 'static,
{
    AsyncFieldSource::Sequence(AsyncSequenceGenerator::new(move |field, seq| {
        let pending = func(seq);
        async move {
            let produced = pending
                .await
                .map_err(|e| FactoryError::generator(field.as_str(), e))?;
            serde_json::to_value(produced).for_field(&field)
        }
        .boxed()
    }))
}

/// An asynchronously derived value receiving a snapshot of the object.
#[must_use]
pub fn async_derive<V, Fut, F>(func: F) -> AsyncFieldSource
where
    V: Serialize,
    Fut: Future<Output = V> + Send + 'static,
    F: Fn(Record, SequenceNumber) -> Fut + Send + Sync + 'static,
{
    AsyncFieldSource::Derived(AsyncDerivedValue::new(move |field, owner, seq| {
        let pending = func(owner, seq);
        async move { serde_json::to_value(pending.await).for_field(&field) }.boxed()
    }))
}

/// A fallible asynchronously derived value.
#[must_use]
pub fn try_async_derive<V, E, Fut, F>(func: F) -> AsyncFieldSource
where
    V: Serialize,
    E: Into<BoxedSourceError>,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
    F: Fn(Record, SequenceNumber) -> Fut + Send + Sync + 'static,
{
    AsyncFieldSource::Derived(AsyncDerivedValue::new(move |field, owner, seq| {
        let pending = func(owner, seq);
        async move {
            let produced = pending
                .await
                .map_err(|e| FactoryError::derivation(field.as_str(), e))?;
            serde_json::to_value(produced).for_field(&field)
        }
        .boxed()
    }))
}

/// A literal whose value arrives later.
///
/// The future is driven by the first build that needs it; later builds reuse
/// the outcome.
#[must_use]
pub fn deferred<V, Fut>(future: Fut) -> AsyncFieldSource
where
    V: Serialize,
    Fut: Future<Output = V> + Send + 'static,
{
    AsyncFieldSource::Deferred(DeferredValue::new(async move {
        serde_json::to_value(future.await).for_field("<deferred>")
    }))
}

/// A deferred literal that may fail; the failure is shared by every build.
#[must_use]
pub fn try_deferred<V, E, Fut>(future: Fut) -> AsyncFieldSource
where
    V: Serialize,
    E: Into<BoxedSourceError>,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
{
    AsyncFieldSource::Deferred(DeferredValue::new(async move {
        let produced = future.await.map_err(FactoryError::deferred)?;
        serde_json::to_value(produced).for_field("<deferred>")
    }))
}

impl From<FieldSource> for AsyncFieldSource {
    fn from(source: FieldSource) -> Self {
        match source {
            FieldSource::Literal(value) => Self::Literal(value),
            FieldSource::Sequence(generator) => Self::Sequence(generator.into()),
            FieldSource::Derived(derived) => Self::Derived(derived.into()),
        }
    }
}

impl From<Value> for AsyncFieldSource {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl From<AsyncSequenceGenerator> for AsyncFieldSource {
    fn from(generator: AsyncSequenceGenerator) -> Self {
        Self::Sequence(generator)
    }
}

impl From<AsyncDerivedValue> for AsyncFieldSource {
    fn from(derived: AsyncDerivedValue) -> Self {
        Self::Derived(derived)
    }
}

impl From<DeferredValue> for AsyncFieldSource {
    fn from(deferred: DeferredValue) -> Self {
        Self::Deferred(deferred)
    }
}

macro_rules! literal_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for AsyncFieldSource {
                fn from(value: $ty) -> Self {
                    Self::Literal(Value::from(value))
                }
            }
        )*
    };
}

literal_from!(&str, String, bool, i32, i64, u32, u64, f64);
