//! Asynchronous builders and their per-build resolution.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use super::source::{AsyncDerivedValue, AsyncFieldSource};
use crate::builder::{Builder, BuilderProvider, PendingDerivation, ResolvedBase};
use crate::{FactoryResult, Record, SequenceNumber};

/// Ordered mapping from field name to asynchronous value source.
pub type AsyncBuilder = Builder<AsyncFieldSource>;

impl Builder<AsyncFieldSource> {
    /// Convert a synchronous builder, keeping field order.
    #[must_use]
    pub fn from_sync(builder: Builder) -> Self {
        builder.map_sources(AsyncFieldSource::from)
    }
}

type LazyAsyncBuilderFn = dyn Fn() -> FactoryResult<AsyncBuilder> + Send + Sync;
type DeferredBuilderFn = dyn Fn() -> BoxFuture<'static, FactoryResult<AsyncBuilder>> + Send + Sync;

/// Supplies a builder snapshot at the start of every asynchronous build.
#[derive(Clone)]
pub enum AsyncBuilderProvider {
    /// A builder shared by every build.
    Fixed(Arc<AsyncBuilder>),
    /// A function invoked once per build.
    Lazy(Arc<LazyAsyncBuilderFn>),
    /// A future-producing function invoked once per build.
    Deferred(Arc<DeferredBuilderFn>),
}

impl AsyncBuilderProvider {
    /// Provide the same builder to every build.
    #[must_use]
    pub fn fixed(builder: AsyncBuilder) -> Self {
        Self::Fixed(Arc::new(builder))
    }

    /// Construct a new builder for every build.
    #[must_use]
    pub fn lazy<F>(make: F) -> Self
    where
        F: Fn() -> AsyncBuilder + Send + Sync + 'static,
    {
        Self::Lazy(Arc::new(move || Ok(make())))
    }

    /// Await a freshly produced builder for every build.
    #[must_use]
    pub fn deferred<F, Fut>(make: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FactoryResult<AsyncBuilder>> + Send + 'static,
    {
        Self::Deferred(Arc::new(move || make().boxed()))
    }

    /// Bridge a synchronous provider.
    #[must_use]
    pub fn from_sync(provider: &BuilderProvider) -> Self {
        match provider {
            BuilderProvider::Fixed(builder) => {
                Self::fixed(AsyncBuilder::from_sync((**builder).clone()))
            }
            BuilderProvider::Lazy(_) => {
                let source = provider.clone();
                Self::Lazy(Arc::new(move || {
                    let builder = source.materialize()?;
                    Ok(AsyncBuilder::from_sync(Arc::unwrap_or_clone(builder)))
                }))
            }
        }
    }

    /// Materialise the builder for one build.
    ///
    /// # Errors
    ///
    /// Returns an error when a lazy or deferred builder cannot be produced.
    pub async fn materialize(&self) -> FactoryResult<Arc<AsyncBuilder>> {
        match self {
            Self::Fixed(builder) => Ok(Arc::clone(builder)),
            Self::Lazy(make) => make().map(Arc::new),
            Self::Deferred(make) => make().await.map(Arc::new),
        }
    }

    pub(crate) fn extended(&self, partial: AsyncBuilder) -> Self {
        match self {
            Self::Fixed(builder) => Self::Fixed(Arc::new(builder.extended(&partial))),
            Self::Lazy(_) | Self::Deferred(_) => {
                let base = self.clone();
                let layer = Arc::new(partial);
                Self::Deferred(Arc::new(move || {
                    let (provider, overlay) = (base.clone(), Arc::clone(&layer));
                    async move {
                        let mut next = Arc::unwrap_or_clone(provider.materialize().await?);
                        next.overlay((*overlay).clone());
                        Ok(next)
                    }
                    .boxed()
                }))
            }
        }
    }

    pub(crate) fn combined(&self, other: &Self) -> FactoryResult<Self> {
        match (self, other) {
            (Self::Fixed(left), Self::Fixed(right)) => Ok(Self::Fixed(Arc::new(left.union(right)?))),
            _ => {
                let (left, right) = (self.clone(), other.clone());
                Ok(Self::Deferred(Arc::new(move || {
                    let (first, second) = (left.clone(), right.clone());
                    async move {
                        first
                            .materialize()
                            .await?
                            .union(&*second.materialize().await?)
                    }
                    .boxed()
                })))
            }
        }
    }
}

impl fmt::Debug for AsyncBuilderProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(builder) => f.debug_tuple("Fixed").field(builder).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Resolve every non-derived field of `builder` for sequence number `seq`.
///
/// Fields are awaited one at a time in declaration order.
///
/// # Errors
///
/// Propagates the first generator or deferred-value failure.
pub async fn resolve_async(
    seq: SequenceNumber,
    builder: &AsyncBuilder,
) -> FactoryResult<ResolvedBase<AsyncDerivedValue>> {
    let mut value = Record::new();
    let mut derived = Vec::new();
    for (key, source) in builder.iter() {
        match source {
            AsyncFieldSource::Literal(literal) => {
                value.insert(key.to_owned(), literal.clone());
            }
            AsyncFieldSource::Sequence(generator) => {
                let generated = generator.generate(key, seq).await?;
                tracing::trace!(field = key, seq, "generated field");
                value.insert(key.to_owned(), generated);
            }
            AsyncFieldSource::Deferred(pending) => {
                value.insert(key.to_owned(), pending.resolve().await?);
            }
            AsyncFieldSource::Derived(derivation) => derived.push(PendingDerivation {
                key: key.to_owned(),
                derived: derivation.clone(),
            }),
        }
    }
    Ok(ResolvedBase { value, derived })
}
