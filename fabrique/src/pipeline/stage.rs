//! Stage inputs: per-stage overrides and the factories a stage can run.

use std::fmt;
use std::future::Future;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::asynchronous::{AsyncFactory, AsyncTransformFactory};
use crate::result_ext::SerializeFieldExt;
use crate::{FactoryResult, Record};

type OverrideFn = dyn FnOnce(&Record) -> FactoryResult<Value> + Send;
type DeferredOverrideFn = dyn FnOnce(Record) -> BoxFuture<'static, FactoryResult<Value>> + Send;

/// The override a pipeline stage passes to its factory.
#[derive(Default)]
pub enum StageOverride {
    /// Build from the factory's defaults.
    #[default]
    None,
    /// Apply a fixed partial record.
    Fixed(Value),
    /// Compute the partial record from the accumulator.
    With(Box<OverrideFn>),
    /// Compute the partial record asynchronously from a snapshot of the
    /// accumulator.
    Deferred(Box<DeferredOverrideFn>),
}

impl StageOverride {
    /// An override computed from the accumulator.
    #[must_use]
    pub fn with<V, F>(func: F) -> Self
    where
        V: Serialize,
        F: FnOnce(&Record) -> V + Send + 'static,
    {
        Self::With(Box::new(move |acc| {
            serde_json::to_value(func(acc)).for_field("<override>")
        }))
    }

    /// An override computed asynchronously from a snapshot of the
    /// accumulator.
    #[must_use]
    pub fn deferred<V, Fut, F>(func: F) -> Self
    where
        V: Serialize,
        Fut: Future<Output = V> + Send + 'static,
        F: FnOnce(Record) -> Fut + Send + 'static,
    {
        Self::Deferred(Box::new(move |acc| {
            let pending = func(acc);
            async move { serde_json::to_value(pending.await).for_field("<override>") }.boxed()
        }))
    }

    pub(crate) async fn resolve(self, acc: &Record) -> FactoryResult<Option<Value>> {
        match self {
            Self::None => Ok(None),
            Self::Fixed(value) => Ok(Some(value)),
            Self::With(func) => func(acc).map(Some),
            Self::Deferred(func) => func(acc.clone()).await.map(Some),
        }
    }
}

impl fmt::Debug for StageOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Self::With(_) => f.write_str("With(..)"),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<Value> for StageOverride {
    fn from(value: Value) -> Self {
        Self::Fixed(value)
    }
}

impl From<Option<Value>> for StageOverride {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Self::None, Self::Fixed)
    }
}

/// A factory a pipeline stage can run.
///
/// The built object is stored in the accumulator as JSON, so the output type
/// must be serialisable.
pub trait BuildValue: Send + Sync {
    /// Build one object with the optional override and serialise it.
    fn build_value(&self, partial: Option<Value>) -> BoxFuture<'static, FactoryResult<Value>>;
}

impl<T> BuildValue for AsyncFactory<T>
where
    T: DeserializeOwned + Serialize + Send + 'static,
{
    fn build_value(&self, partial: Option<Value>) -> BoxFuture<'static, FactoryResult<Value>> {
        let factory = self.clone();
        async move {
            let built = match partial {
                Some(layer) => factory.build_with(layer).await?,
                None => factory.build().await?,
            };
            serde_json::to_value(built).for_field("<stage>")
        }
        .boxed()
    }
}

impl<T, U> BuildValue for AsyncTransformFactory<T, U>
where
    T: DeserializeOwned + Send + 'static,
    U: Serialize + Send + 'static,
{
    fn build_value(&self, partial: Option<Value>) -> BoxFuture<'static, FactoryResult<Value>> {
        let factory = self.clone();
        async move {
            let built = match partial {
                Some(layer) => factory.build_with(layer).await?,
                None => factory.build().await?,
            };
            serde_json::to_value(built).for_field("<stage>")
        }
        .boxed()
    }
}
