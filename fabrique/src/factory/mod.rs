//! The synchronous factory engine.
//!
//! A [`Factory`] owns a builder provider, a [`FactoryConfig`], and a private
//! [`SequenceCounter`]. Every top-level build captures the next sequence
//! number and advances the counter before anything else happens, so builds
//! triggered from inside a derivation observe a fresh number.
//!
//! # Example
//!
//! ```rust
//! use fabrique::{Builder, make_factory, source::each};
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! #[derive(Debug, Deserialize, PartialEq)]
//! struct Widget {
//!     name: String,
//!     id: u64,
//! }
//!
//! let widgets = make_factory::<Widget>(
//!     Builder::new().field("name", "Widget").field("id", each(|n| n)),
//! );
//! let first = widgets.build()?;
//! let renamed = widgets.build_with(json!({"name": "Gadget"}))?;
//! assert_eq!(first, Widget { name: "Widget".into(), id: 0 });
//! assert_eq!(renamed, Widget { name: "Gadget".into(), id: 1 });
//! # Ok::<_, std::sync::Arc<fabrique::FactoryError>>(())
//! ```

pub(crate) mod derivation;
pub(crate) mod engine;
mod transform;

use std::fmt;
use std::iter;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::builder::{Builder, BuilderProvider};
use crate::{FactoryConfig, FactoryResult, Record, SequenceCounter, SequenceNumber};

use engine::{Targets, decode, partial_record, run_protocol, validate_partial};

pub use transform::TransformFactory;

/// Builds objects of type `T` from a builder template.
///
/// Cloning a factory yields a second handle onto the same sequence counter.
/// Composition methods ([`Factory::extend`], [`Factory::combine`], the
/// derivation family) return a new factory with its own counter.
pub struct Factory<T> {
    provider: BuilderProvider,
    config: FactoryConfig,
    required: Arc<[String]>,
    counter: SequenceCounter,
    _output: PhantomData<fn() -> T>,
}

impl<T> Clone for Factory<T> {
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

impl<T> fmt::Debug for Factory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("provider", &self.provider)
            .field("config", &self.config)
            .field("required", &self.required)
            .field("next_sequence_number", &self.counter.peek())
            .finish()
    }
}

/// Create a factory with the default configuration.
#[must_use]
pub fn make_factory<T>(builder: Builder) -> Factory<T> {
    make_factory_with(builder, FactoryConfig::default())
}

/// Create a factory with an explicit configuration.
#[must_use]
pub fn make_factory_with<T>(builder: Builder, config: FactoryConfig) -> Factory<T> {
    Factory::from_provider(BuilderProvider::fixed(builder), config)
}

/// Create a factory whose `required` fields have no default and must be
/// supplied by every build.
///
/// ```rust
/// use fabrique::{Builder, FactoryConfig, FactoryError, make_factory_with_required};
/// use serde_json::{Value, json};
///
/// let records = make_factory_with_required::<Value, _, _>(
///     Builder::new().field("name", "hello"),
///     ["foreignId"],
///     FactoryConfig::default(),
/// );
/// assert!(matches!(
///     records.build().err().as_deref(),
///     Some(FactoryError::MissingRequiredField { .. })
/// ));
/// let built = records.build_with(json!({"foreignId": "fk1"}))?;
/// assert_eq!(built, json!({"name": "hello", "foreignId": "fk1"}));
/// # Ok::<_, std::sync::Arc<FactoryError>>(())
/// ```
#[must_use]
pub fn make_factory_with_required<T, I, K>(
    builder: Builder,
    required: I,
    config: FactoryConfig,
) -> Factory<T>
where
    I: IntoIterator<Item = K>,
    K: Into<String>,
{
    let mut factory = make_factory_with(builder, config);
    factory.required = required.into_iter().map(Into::into).collect();
    factory
}

impl<T> Factory<T> {
    /// Create a factory from a builder provider.
    #[must_use]
    pub fn from_provider(provider: BuilderProvider, config: FactoryConfig) -> Self {
        Self {
            provider,
            counter: SequenceCounter::starting_at(config.start()),
            config,
            required: Arc::from(Vec::new()),
            _output: PhantomData,
        }
    }

    /// Create a factory that constructs a fresh builder for every build.
    #[must_use]
    pub fn lazy<F>(make: F, config: FactoryConfig) -> Self
    where
        F: Fn() -> Builder + Send + Sync + 'static,
    {
        Self::from_provider(BuilderProvider::lazy(make), config)
    }

    /// A new factory over `provider` sharing this factory's configuration
    /// and required fields, with a fresh counter.
    fn derive_factory<U>(&self, provider: BuilderProvider, required: Arc<[String]>) -> Factory<U> {
        let mut factory = Factory::from_provider(provider, self.config);
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
    pub const fn provider(&self) -> &BuilderProvider {
        &self.provider
    }

    /// A snapshot of the builder a build would use right now.
    ///
    /// # Errors
    ///
    /// Returns an error when a lazily composed builder cannot be assembled.
    pub fn builder(&self) -> FactoryResult<Arc<Builder>> {
        self.provider.materialize()
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
    pub fn build_record(&self, partial: Option<Value>) -> FactoryResult<Record> {
        let layer = match partial {
            Some(value) => partial_record(value)?,
            None => None,
        };
        let seq = self.counter.capture();
        let builder = self.provider.materialize()?;
        validate_partial(&builder, &self.required, layer.as_ref())?;
        tracing::debug!(seq, fields = builder.len(), "building object");
        run_protocol(&builder, seq, layer, Targets::All)
    }

    /// A new factory whose builder is this one with `partial` overlaid.
    ///
    /// Each field in `partial` replaces the original source outright.
    #[must_use]
    pub fn extend(&self, partial: Builder) -> Self {
        self.derive_factory(self.provider.extended(partial), Arc::clone(&self.required))
    }

    /// A new factory building the union of both builders' fields.
    ///
    /// The result uses this factory's configuration and a fresh counter.
    /// The output type `O` is chosen by the caller, typically a struct holding
    /// the fields of both inputs.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FactoryError::OverlappingFields`] when both builders
    /// declare a field. For lazily constructed builders the check runs on
    /// every build instead.
    pub fn combine<U, O>(&self, other: &Factory<U>) -> FactoryResult<Factory<O>> {
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
}

impl<T: DeserializeOwned> Factory<T> {
    /// Build one object from the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when a required field is missing, a generator or
    /// derivation fails, or the record does not fit `T`.
    pub fn build(&self) -> FactoryResult<T> {
        decode(self.build_record(None)?)
    }

    /// Build one object, overlaying the sparse record `partial`.
    ///
    /// # Errors
    ///
    /// As [`Factory::build`], plus shape errors for the override.
    pub fn build_with(&self, partial: Value) -> FactoryResult<T> {
        decode(self.build_record(Some(partial))?)
    }

    /// Build `count` objects one after another.
    ///
    /// Numbers inside the list increase, but builds made concurrently on the
    /// same factory (or its clones) can leave gaps between them.
    ///
    /// # Errors
    ///
    /// Fails on the first object that fails to build.
    pub fn build_list(&self, count: usize) -> FactoryResult<Vec<T>> {
        (0..count).map(|_| self.build()).collect()
    }

    /// Build `count` objects one after another, applying `partial` to each.
    ///
    /// # Errors
    ///
    /// Fails on the first object that fails to build.
    pub fn build_list_with(&self, count: usize, partial: Value) -> FactoryResult<Vec<T>> {
        iter::repeat_n(partial, count)
            .map(|layer| self.build_with(layer))
            .collect()
    }
}
