//! Asynchronous factories that post-process each built object.

use std::fmt;
use std::sync::Arc;

use futures::future::{BoxFuture, try_join_all};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::factory::AsyncFactory;
use crate::FactoryResult;

type AsyncTransformFn<T, U> = dyn Fn(T) -> BoxFuture<'static, FactoryResult<U>> + Send + Sync;

/// An [`AsyncFactory`] paired with a (possibly asynchronous) function applied
/// to every object it builds.
pub struct AsyncTransformFactory<T, U> {
    inner: AsyncFactory<T>,
    transform: Arc<AsyncTransformFn<T, U>>,
}

impl<T, U> Clone for AsyncTransformFactory<T, U> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            transform: Arc::clone(&self.transform),
        }
    }
}

impl<T, U> fmt::Debug for AsyncTransformFactory<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncTransformFactory")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<T, U> AsyncTransformFactory<T, U> {
    pub(crate) fn new<F>(inner: AsyncFactory<T>, transform: F) -> Self
    where
        F: Fn(T) -> BoxFuture<'static, FactoryResult<U>> + Send + Sync + 'static,
    {
        Self {
            inner,
            transform: Arc::new(transform),
        }
    }

    /// The wrapped factory.
    #[must_use]
    pub const fn inner(&self) -> &AsyncFactory<T> {
        &self.inner
    }
}

impl<T: DeserializeOwned, U> AsyncTransformFactory<T, U> {
    /// Build one object and transform it.
    ///
    /// # Errors
    ///
    /// Returns build errors from the inner factory and
    /// [`crate::FactoryError::Transform`] when the transform fails.
    pub async fn build(&self) -> FactoryResult<U> {
        (self.transform)(self.inner.build().await?).await
    }

    /// Build one object with `partial` applied, then transform it.
    ///
    /// # Errors
    ///
    /// As [`AsyncTransformFactory::build`].
    pub async fn build_with(&self, partial: Value) -> FactoryResult<U> {
        (self.transform)(self.inner.build_with(partial).await?).await
    }

    /// Build `count` objects in sequence, then transform them concurrently.
    ///
    /// Results keep build order.
    ///
    /// # Errors
    ///
    /// As [`AsyncTransformFactory::build`].
    pub async fn build_list(&self, count: usize) -> FactoryResult<Vec<U>> {
        let built = self.inner.build_list(count).await?;
        try_join_all(built.into_iter().map(|item| (self.transform)(item))).await
    }

    /// Build `count` objects with `partial` applied, then transform them
    /// concurrently.
    ///
    /// # Errors
    ///
    /// As [`AsyncTransformFactory::build`].
    pub async fn build_list_with(&self, count: usize, partial: Value) -> FactoryResult<Vec<U>> {
        let built = self.inner.build_list_with(count, partial).await?;
        try_join_all(built.into_iter().map(|item| (self.transform)(item))).await
    }
}
