//! Sequential pipelines threading one accumulating record through a chain of
//! stages.
//!
//! Every stage starts only after the previous one has finished, because a
//! stage's override may read keys written by earlier stages. Stages merge
//! their output into the accumulator shallowly: a key written twice keeps the
//! later value and a warning is logged.
//!
//! ```rust
//! use fabrique::Pipeline;
//! use fabrique::asynchronous::{AsyncBuilder, make_async_factory};
//! use fabrique::pipeline::StageOverride;
//! use fabrique::source::each;
//! use serde_json::{Value, json};
//!
//! # fn main() -> fabrique::FactoryResult<()> {
//! # futures::executor::block_on(async {
//! let people = make_async_factory::<Value>(
//!     AsyncBuilder::new()
//!         .field("id", each(|n| n))
//!         .field("name", "Someone")
//!         .field("parentId", Value::Null),
//! );
//! let family = Pipeline::start()
//!     .add_values(json!({"surname": "Smith"}))
//!     .add_factory(&people, "parent", json!({"name": "Dad"}))
//!     .add_factory(
//!         &people,
//!         "child",
//!         StageOverride::with(|acc| json!({"parentId": acc["parent"]["id"]})),
//!     )
//!     .await?;
//! assert_eq!(family["child"]["parentId"], family["parent"]["id"]);
//! # Ok(())
//! # })
//! # }
//! ```

mod stage;

use std::fmt;
use std::future::{Future, IntoFuture};

use futures::FutureExt;
use futures::future::{self, BoxFuture};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::asynchronous::AsyncTransformFactory;
use crate::merge::shallow_extend;
use crate::result_ext::SerializeFieldExt;
use crate::{BoxedSourceError, FactoryError, FactoryResult, FactoryResultExt, Record};

pub use stage::{BuildValue, StageOverride};

/// A chain of stages producing one composite record.
///
/// A pipeline is lazy: nothing runs until it is awaited.
#[must_use = "a pipeline does nothing until awaited"]
pub struct Pipeline {
    current: BoxFuture<'static, FactoryResult<Record>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").finish_non_exhaustive()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::start()
    }
}

/// Merge a stage's output into the accumulator, logging overwritten keys.
///
/// `null` adds nothing.
fn merge_stage(mut acc: Record, addition: Value) -> FactoryResult<Record> {
    let record = match addition {
        Value::Object(record) => record,
        Value::Null => return Ok(acc),
        other => return Err(FactoryError::not_a_record("pipeline values", &other)),
    };
    let overwritten = shallow_extend(&mut acc, record);
    if !overwritten.is_empty() {
        tracing::warn!(keys = ?overwritten, "pipeline stage overwrote existing keys");
    }
    Ok(acc)
}

impl Pipeline {
    /// A pipeline whose accumulator starts as an empty record.
    pub fn start() -> Self {
        Self {
            current: future::ready(Ok(Record::new())).boxed(),
        }
    }

    fn then<F, Fut>(self, stage: F) -> Self
    where
        F: FnOnce(Record) -> Fut + Send + 'static,
        Fut: Future<Output = FactoryResult<Record>> + Send + 'static,
    {
        let previous = self.current;
        Self {
            current: async move { stage(previous.await?).await }.boxed(),
        }
    }

    /// Merge a literal record into the accumulator.
    ///
    /// `null` leaves the accumulator unchanged; any other non-record value is
    /// rejected with [`FactoryError::NotARecord`].
    pub fn add_values(self, values: Value) -> Self {
        self.then(move |acc| future::ready(merge_stage(acc, values)))
    }

    /// Merge the record computed by `func` from the accumulator.
    pub fn add_values_with<V, F>(self, func: F) -> Self
    where
        V: Serialize,
        F: FnOnce(&Record) -> V + Send + 'static,
    {
        self.then(move |acc| {
            let computed = serde_json::to_value(func(&acc)).for_field("<values>");
            future::ready(computed.and_then(|values| merge_stage(acc, values)))
        })
    }

    /// Merge the record produced asynchronously by `func` from a snapshot of
    /// the accumulator.
    pub fn add_values_async<V, Fut, F>(self, func: F) -> Self
    where
        V: Serialize,
        Fut: Future<Output = V> + Send + 'static,
        F: FnOnce(Record) -> Fut + Send + 'static,
    {
        self.then(move |acc| async move {
            let produced = func(acc.clone()).await;
            merge_stage(acc, serde_json::to_value(produced).for_field("<values>")?)
        })
    }

    /// Like [`Pipeline::add_values_async`], for a computation that can fail.
    pub fn try_add_values_async<V, E, Fut, F>(self, func: F) -> Self
    where
        V: Serialize,
        E: Into<BoxedSourceError>,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        F: FnOnce(Record) -> Fut + Send + 'static,
    {
        self.then(move |acc| async move {
            let produced = func(acc.clone()).await.map_err(FactoryError::deferred)?;
            merge_stage(acc, serde_json::to_value(produced).for_field("<values>")?)
        })
    }

    /// Build one object with `factory` and store it under `key`.
    ///
    /// The override is resolved against the accumulator when the stage runs.
    pub fn add_factory<B>(
        self,
        factory: &B,
        key: impl Into<String>,
        partial: impl Into<StageOverride>,
    ) -> Self
    where
        B: BuildValue + Clone + 'static,
    {
        let stage_factory = factory.clone();
        self.add_factory_fn(move |layer| stage_factory.build_value(layer), key, partial)
    }

    /// Build one object with a transform factory and store the transformed
    /// value under `key`.
    pub fn add_tx_factory<T, U>(
        self,
        factory: &AsyncTransformFactory<T, U>,
        key: impl Into<String>,
        partial: impl Into<StageOverride>,
    ) -> Self
    where
        T: DeserializeOwned + Send + 'static,
        U: Serialize + Send + 'static,
    {
        self.add_factory(factory, key, partial)
    }

    /// Call `func` with the resolved override and store its output under
    /// `key`.
    pub fn add_factory_fn<V, Fut, F>(
        self,
        func: F,
        key: impl Into<String>,
        partial: impl Into<StageOverride>,
    ) -> Self
    where
        V: Serialize,
        Fut: Future<Output = FactoryResult<V>> + Send + 'static,
        F: FnOnce(Option<Value>) -> Fut + Send + 'static,
    {
        let (name, stage_override) = (key.into(), partial.into());
        self.then(move |acc| async move {
            let layer = stage_override.resolve(&acc).await?;
            let built = func(layer).await?;
            tracing::debug!(key = %name, "pipeline stage built value");
            let value = serde_json::to_value(built).for_field(&name)?;
            let mut addition = Record::new();
            addition.insert(name, value);
            merge_stage(acc, Value::Object(addition))
        })
    }

    /// Run every stage and deserialise the composite into `P`.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure, or [`FactoryError::Deserialize`] when
    /// the composite does not fit `P`.
    pub async fn finish<P: DeserializeOwned>(self) -> FactoryResult<P> {
        let composite = self.current.await?;
        serde_json::from_value(Value::Object(composite)).into_factory()
    }
}

impl IntoFuture for Pipeline {
    type Output = FactoryResult<Record>;
    type IntoFuture = BoxFuture<'static, FactoryResult<Record>>;

    fn into_future(self) -> Self::IntoFuture {
        self.current
    }
}
