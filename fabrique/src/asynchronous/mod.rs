//! The asynchronous engine.
//!
//! Semantics match the synchronous [`crate::Factory`]; any field may resolve
//! through a future. Generators, deferred values, and derivations are
//! awaited one at a time in declaration order, so a build never runs two of
//! its own sources concurrently.
//!
//! ```rust
//! use fabrique::asynchronous::{AsyncBuilder, deferred, make_async_factory};
//! use fabrique::source::each;
//! use serde_json::{Value, json};
//!
//! # fn main() -> fabrique::FactoryResult<()> {
//! # futures::executor::block_on(async {
//! let accounts = make_async_factory::<Value>(
//!     AsyncBuilder::new()
//!         .field("id", each(|n| n))
//!         .field("region", deferred(async { "eu-west" })),
//! )
//! .with_async_derivation("label", |account, _| async move {
//!     format!("{}-{}", account["region"].as_str().unwrap_or_default(), account["id"])
//! });
//! assert_eq!(
//!     accounts.build().await?,
//!     json!({"id": 0, "region": "eu-west", "label": "eu-west-0"})
//! );
//! # Ok(())
//! # })
//! # }
//! ```

mod builder;
mod engine;
mod factory;
mod source;
mod transform;

pub use builder::{AsyncBuilder, AsyncBuilderProvider, resolve_async};
pub use factory::{
    AsyncFactory, make_async_factory, make_async_factory_with, make_async_factory_with_required,
    make_factory_from_sync,
};
pub use source::{
    AsyncDerivedValue, AsyncFieldSource, AsyncSequenceGenerator, DeferredValue, async_derive,
    async_each, deferred, try_async_derive, try_async_each, try_deferred,
};
pub use transform::AsyncTransformFactory;
