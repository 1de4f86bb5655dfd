//! The asynchronous factory engine.

use std::fmt;
use std::future::Future;
use std::iter;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::builder::{AsyncBuilder, AsyncBuilderProvider};
use super::engine::{run_protocol_async, would_be_value_async};
use super::source::{AsyncDerivedValue, AsyncFieldSource};
use crate::builder::Builder;
use crate::factory::derivation::input;
use crate::factory::engine::{Targets, decode, partial_record, validate_partial};
use crate::result_ext::SerializeFieldExt;
use crate::{
    BoxedSourceError, Factory, FactoryConfig, FactoryError, FactoryResult, Record, SequenceCounter,
    SequenceNumber,
};

/// Builds objects of type `T` from an asynchronous builder.
///
/// Sequence numbers are captured atomically at the start of each build, so
/// concurrent builds on clones of one factory never observe the same number.
pub struct AsyncFactory<T> {
    provider: AsyncBuilderProvider,
    config: FactoryConfig,
    required: Arc<[String]>,
    counter: SequenceCounter,
    _output: PhantomData<fn() -> T>,
}

impl<T> Clone for AsyncFactory<T> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            config: self.config,
            required: Arc::clone(&self.required),
            counter: self.counter.clone(),
            _output: PhantomData,
        }
    }
}

impl<T> fmt::Debug for AsyncFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncFactory")
            .field("provider", &self.provider)
            .field("config", &self.config)
            .field("required", &self.required)
            .field("next_sequence_number", &self.counter.peek())
            .finish()
    }
}

/// Create an asynchronous factory with the default configuration.
#[must_use]
pub fn make_async_factory<T>(builder: AsyncBuilder) -> AsyncFactory<T> {
    make_async_factory_with(builder, FactoryConfig::default())
}

/// Create an asynchronous factory with an explicit configuration.
#[must_use]
pub fn make_async_factory_with<T>(builder: AsyncBuilder, config: FactoryConfig) -> AsyncFactory<T> {
    AsyncFactory::from_provider(AsyncBuilderProvider::fixed(builder), config)
}

/// Create an asynchronous factory with fields every build must supply.
#[must_use]
pub fn make_async_factory_with_required<T, I, K>(
    builder: AsyncBuilder,
    required: I,
    config: FactoryConfig,
) -> AsyncFactory<T>
where
    I: IntoIterator<Item = K>,
    K: Into<String>,
{
    let mut factory = make_async_factory_with(builder, config);
    factory.required = required.into_iter().map(Into::into).collect();
    factory
}

/// Create an asynchronous factory from a synchronous builder.
#[must_use]
pub fn make_factory_from_sync<T>(builder: Builder, config: FactoryConfig) -> AsyncFactory<T> {
    make_async_factory_with(AsyncBuilder::from_sync(builder), config)
}

impl<T> AsyncFactory<T> {
    /// Create a factory from a builder provider.
    #[must_use]
    pub fn from_provider(provider: AsyncBuilderProvider, config: FactoryConfig) -> Self {
        Self {
            provider,
            counter: SequenceCounter::starting_at(config.start()),
            config,
            required: Arc::from(Vec::new()),
            _output: PhantomData,
        }
    }

    /// Bridge a synchronous factory, keeping its configuration and required
    /// fields. The new factory counts from the configured start.
    #[must_use]
    pub fn from_factory(factory: &Factory<T>) -> Self {
        let mut bridged = Self::from_provider(
            AsyncBuilderProvider::from_sync(factory.provider()),
            factory.config(),
        );
        bridged.required = Arc::from(factory.required_fields());
        bridged
    }

    fn derive_factory<U>(
        &self,
        provider: AsyncBuilderProvider,
        required: Arc<[String]>,
    ) -> AsyncFactory<U> {
        let mut factory = AsyncFactory::from_provider(provider, self.config);
        factory.required = required;
        factory
    }

    /// The factory's configuration.
    #[must_use]
    pub const fn config(&self) -> FactoryConfig {
        self.config
    }

    /// The builder provider backing this factory.
    #[must_use]
    pub const fn provider(&self) -> &AsyncBuilderProvider {
        &self.provider
    }

    /// Fields every build must supply.
    #[must_use]
    pub fn required_fields(&self) -> &[String] {
        &self.required
    }

    /// The sequence number the next build will capture.
    #[must_use]
    pub fn sequence_number(&self) -> SequenceNumber {
        self.counter.peek()
    }

    /// Rewind the counter to `value`, or to the configured starting number
    /// when `value` is `None`.
    pub fn reset_sequence_number(&self, value: Option<SequenceNumber>) {
        let target = value.unwrap_or_else(|| self.config.start());
        tracing::debug!(seq = target, "resetting sequence number");
        self.counter.reset(target);
    }

    /// Build an untyped record, optionally overlaying `partial`.
    ///
    /// # Errors
    ///
    /// Returns an error when the override has the wrong shape or any field
    /// fails to resolve.
    pub async fn build_record(&self, partial: Option<Value>) -> FactoryResult<Record> {
        let layer = match partial {
            Some(value) => partial_record(value)?,
            None => None,
        };
        let seq = self.counter.capture();
        let builder = self.provider.materialize().await?;
        validate_partial(&builder, &self.required, layer.as_ref())?;
        tracing::debug!(seq, fields = builder.len(), "building object asynchronously");
        run_protocol_async(&builder, seq, layer, Targets::All).await
    }

    /// A new factory whose builder is this one with `partial` overlaid.
    #[must_use]
    pub fn extend(&self, partial: AsyncBuilder) -> Self {
        self.derive_factory(self.provider.extended(partial), Arc::clone(&self.required))
    }

    /// A new factory building the union of both builders' fields.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::OverlappingFields`] when both builders declare
    /// a field.
    pub fn combine<U, O>(&self, other: &AsyncFactory<U>) -> FactoryResult<AsyncFactory<O>> {
        let provider = self.provider.combined(&other.provider)?;
        let mut required: Vec<String> = self.required.to_vec();
        required.extend(
            other
                .required
                .iter()
                .filter(|key| !self.required.contains(key))
                .cloned(),
        );
        Ok(self.derive_factory(provider, Arc::from(required)))
    }

    fn with_source(&self, key: &str, source: AsyncFieldSource) -> Self {
        self.extend(AsyncBuilder::new().field(key, source))
    }

    /// Install a synchronous derivation computing `key` from the object.
    #[must_use]
    pub fn with_derivation<V, F>(&self, key: &str, func: F) -> Self
    where
        V: Serialize,
        F: Fn(&Record, SequenceNumber) -> V + Send + Sync + 'static,
    {
        self.with_source(
            key,
            AsyncFieldSource::Derived(AsyncDerivedValue::blocking(move |field, owner, seq| {
                serde_json::to_value(func(owner, seq)).for_field(field)
            })),
        )
    }

    /// Install an asynchronous derivation computing `key` from a snapshot of
    /// the object.
    #[must_use]
    pub fn with_async_derivation<V, Fut, F>(&self, key: &str, func: F) -> Self
    where
        V: Serialize,
        Fut: Future<Output = V> + Send + 'static,
        F: Fn(Record, SequenceNumber) -> Fut + Send + Sync + 'static,
    {
        self.with_source(key, super::source::async_derive(func))
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
            AsyncFieldSource::Derived(AsyncDerivedValue::blocking(move |field, owner, seq| {
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
            AsyncFieldSource::Derived(AsyncDerivedValue::blocking(move |field, owner, seq| {
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
            AsyncFieldSource::Derived(AsyncDerivedValue::blocking(move |field, owner, seq| {
                let a = input(owner, &first, field)?;
                let b = input(owner, &second, field)?;
                let c = input(owner, &third, field)?;
                serde_json::to_value(func(a, b, c, seq)).for_field(field)
            })),
        )
    }

    /// Install a derivation computing `key` from `N` sibling values.
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
            AsyncFieldSource::Derived(AsyncDerivedValue::blocking(move |field, owner, seq| {
                let values = inputs
                    .each_ref()
                    .map(|name| owner.get(name).cloned().unwrap_or(Value::Null));
                serde_json::to_value(func(values, seq)).for_field(field)
            })),
        )
    }

    /// Install an asynchronous derivation of `key` from the value `key` would
    /// otherwise take.
    ///
    /// `func` receives a snapshot of the object with `key` set to its
    /// would-be value, computed on this factory's builder with the same
    /// sequence number.
    #[must_use]
    pub fn with_self_derivation<V, Fut, F>(&self, key: &str, func: F) -> Self
    where
        V: Serialize,
        Fut: Future<Output = V> + Send + 'static,
        F: Fn(Record, SequenceNumber) -> Fut + Send + Sync + 'static,
    {
        let receiver = self.provider.clone();
        let shared = Arc::new(func);
        self.with_source(
            key,
            AsyncFieldSource::Derived(AsyncDerivedValue::new(move |field, owner, seq| {
                let (provider, compute) = (receiver.clone(), Arc::clone(&shared));
                async move {
                    let original =
                        would_be_value_async(&provider, &field, owner.clone(), seq).await?;
                    let mut view = owner;
                    view.insert(field.clone(), original);
                    serde_json::to_value(compute(view, seq).await).for_field(&field)
                }
                .boxed()
            })),
        )
    }

    /// Typed form of [`AsyncFactory::with_self_derivation`] receiving only the
    /// would-be value of `key`.
    #[must_use]
    pub fn with_self_derivation1<A, V, F>(&self, key: &str, func: F) -> Self
    where
        A: DeserializeOwned,
        V: Serialize,
        F: Fn(A, SequenceNumber) -> V + Send + Sync + 'static,
    {
        let receiver = self.provider.clone();
        let shared = Arc::new(func);
        self.with_source(
            key,
            AsyncFieldSource::Derived(AsyncDerivedValue::new(move |field, owner, seq| {
                let (provider, compute) = (receiver.clone(), Arc::clone(&shared));
                async move {
                    let original = would_be_value_async(&provider, &field, owner, seq).await?;
                    let current = A::deserialize(&original)
                        .map_err(|e| FactoryError::derivation(field.as_str(), e))?;
                    serde_json::to_value(compute(current, seq)).for_field(&field)
                }
                .boxed()
            })),
        )
    }

    /// Wrap this factory so every built object passes through `func`.
    #[must_use]
    pub fn transform<U, F>(&self, func: F) -> super::AsyncTransformFactory<T, U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        super::AsyncTransformFactory::new(self.clone(), move |built| {
            futures::future::ready(Ok(func(built))).boxed()
        })
    }

    /// Like [`AsyncFactory::transform`], for a transform that can fail.
    #[must_use]
    pub fn try_transform<U, E, F>(&self, func: F) -> super::AsyncTransformFactory<T, U>
    where
        U: Send + 'static,
        E: Into<BoxedSourceError>,
        F: Fn(T) -> Result<U, E> + Send + Sync + 'static,
    {
        super::AsyncTransformFactory::new(self.clone(), move |built| {
            futures::future::ready(func(built).map_err(FactoryError::transform)).boxed()
        })
    }

    /// Wrap this factory with an asynchronous transform.
    #[must_use]
    pub fn transform_async<U, Fut, F>(&self, func: F) -> super::AsyncTransformFactory<T, U>
    where
        U: Send + 'static,
        Fut: Future<Output = U> + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
    {
        super::AsyncTransformFactory::new(self.clone(), move |built| {
            func(built).map(Ok::<U, Arc<FactoryError>>).boxed()
        })
    }

    /// Wrap this factory with a fallible asynchronous transform.
    #[must_use]
    pub fn try_transform_async<U, E, Fut, F>(&self, func: F) -> super::AsyncTransformFactory<T, U>
    where
        U: Send + 'static,
        E: Into<BoxedSourceError>,
        Fut: Future<Output = Result<U, E>> + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
    {
        super::AsyncTransformFactory::new(self.clone(), move |built| {
            func(built)
                .map(|outcome| outcome.map_err(FactoryError::transform))
                .boxed()
        })
    }
}

impl<T: DeserializeOwned> AsyncFactory<T> {
    /// Build one object from the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when a required field is missing, any source fails,
    /// or the record does not fit `T`.
    pub async fn build(&self) -> FactoryResult<T> {
        decode(self.build_record(None).await?)
    }

    /// Build one object, overlaying the sparse record `partial`.
    ///
    /// # Errors
    ///
    /// As [`AsyncFactory::build`], plus shape errors for the override.
    pub async fn build_with(&self, partial: Value) -> FactoryResult<T> {
        decode(self.build_record(Some(partial)).await?)
    }

    /// Build `count` objects, awaiting each before starting the next.
    ///
    /// Numbers inside the list increase, but builds made concurrently on the
    /// same factory (or its clones) can leave gaps between them.
    ///
    /// # Errors
    ///
    /// Fails on the first object that fails to build.
    pub async fn build_list(&self, count: usize) -> FactoryResult<Vec<T>> {
        let mut built = Vec::with_capacity(count);
        for _ in 0..count {
            built.push(self.build().await?);
        }
        Ok(built)
    }

    /// Build `count` objects one after another, applying `partial` to each.
    ///
    /// # Errors
    ///
    /// Fails on the first object that fails to build.
    pub async fn build_list_with(&self, count: usize, partial: Value) -> FactoryResult<Vec<T>> {
        let mut built = Vec::with_capacity(count);
        for layer in iter::repeat_n(partial, count) {
            built.push(self.build_with(layer).await?);
        }
        Ok(built)
    }
}
