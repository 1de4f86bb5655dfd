//! Factories that post-process each built object.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::Factory;
use crate::{BoxedSourceError, FactoryError, FactoryResult};

type TransformFn<T, U> = dyn Fn(T) -> FactoryResult<U> + Send + Sync;

/// A [`Factory`] paired with a function applied to every object it builds.
///
/// The transform runs after derivations, so it sees the final object. The
/// inner factory's sequence counter is shared, not copied.
pub struct TransformFactory<T, U> {
    inner: Factory<T>,
    transform: Arc<TransformFn<T, U>>,
}

impl<T, U> Clone for TransformFactory<T, U> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            transform: Arc::clone(&self.transform),
        }
    }
}

impl<T, U> fmt::Debug for TransformFactory<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformFactory")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<T> Factory<T> {
    /// Wrap this factory so every built object passes through `func`.
    ///
    /// ```rust
    /// use fabrique::{Builder, make_factory, source::each};
    /// use serde_json::Value;
    ///
    /// let labels = make_factory::<Value>(Builder::new().field("id", each(|n| n)))
    ///     .transform(|item| format!("item-{}", item["id"]));
    /// assert_eq!(labels.build_list(2)?, vec!["item-0", "item-1"]);
    /// # Ok::<_, std::sync::Arc<fabrique::FactoryError>>(())
    /// ```
    #[must_use]
    pub fn transform<U, F>(&self, func: F) -> TransformFactory<T, U>
    where
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        TransformFactory {
            inner: self.clone(),
            transform: Arc::new(move |built| Ok(func(built))),
        }
    }

    /// Like [`Factory::transform`], for a transform that can fail.
    #[must_use]
    pub fn try_transform<U, E, F>(&self, func: F) -> TransformFactory<T, U>
    where
        E: Into<BoxedSourceError>,
        F: Fn(T) -> Result<U, E> + Send + Sync + 'static,
    {
        TransformFactory {
            inner: self.clone(),
            transform: Arc::new(move |built| func(built).map_err(FactoryError::transform)),
        }
    }
}

impl<T, U> TransformFactory<T, U> {
    /// The wrapped factory.
    #[must_use]
    pub const fn inner(&self) -> &Factory<T> {
        &self.inner
    }

    fn apply(&self, built: T) -> FactoryResult<U> {
        (self.transform)(built)
    }
}

impl<T: DeserializeOwned, U> TransformFactory<T, U> {
    /// Build one object and transform it.
    ///
    /// # Errors
    ///
    /// Returns build errors from the inner factory and
    /// [`FactoryError::Transform`] when the transform fails.
    pub fn build(&self) -> FactoryResult<U> {
        self.apply(self.inner.build()?)
    }

    /// Build one object with `partial` applied, then transform it.
    ///
    /// # Errors
    ///
    /// As [`TransformFactory::build`].
    pub fn build_with(&self, partial: Value) -> FactoryResult<U> {
        self.apply(self.inner.build_with(partial)?)
    }

    /// Build `count` objects, then transform each.
    ///
    /// # Errors
    ///
    /// As [`TransformFactory::build`].
    pub fn build_list(&self, count: usize) -> FactoryResult<Vec<U>> {
        self.inner
            .build_list(count)?
            .into_iter()
            .map(|built| self.apply(built))
            .collect()
    }

    /// Build `count` objects with `partial` applied, then transform each.
    ///
    /// # Errors
    ///
    /// As [`TransformFactory::build`].
    pub fn build_list_with(&self, count: usize, partial: Value) -> FactoryResult<Vec<U>> {
        self.inner
            .build_list_with(count, partial)?
            .into_iter()
            .map(|built| self.apply(built))
            .collect()
    }
}
