//! Object factories for tests and fixtures.
//!
//! A [`Builder`] describes how each field of an object is produced: a
//! literal, a generator fed with a per-factory sequence number, or a value
//! derived from the rest of the object. A [`Factory`] turns the builder into
//! fully populated objects, applying sparse, recursively merged overrides
//! on request. Factories compose through [`Factory::extend`],
//! [`Factory::combine`], the derivation family, and [`Factory::transform`].
//!
//! The [`asynchronous`] module provides the same engine for sources that
//! resolve through futures, and [`Pipeline`] chains asynchronous factories
//! into one composite record.
//!
//! ```rust
//! use fabrique::{Builder, make_factory, source::each};
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! #[derive(Debug, Deserialize)]
//! struct User {
//!     id: u64,
//!     email: String,
//!     admin: bool,
//! }
//!
//! let users = make_factory::<User>(
//!     Builder::new()
//!         .field("id", each(|n| n))
//!         .field("email", each(|n| format!("user{n}@example.com")))
//!         .field("admin", false),
//! );
//! let admin = users.build_with(json!({"admin": true}))?;
//! assert_eq!(admin.email, "user0@example.com");
//! assert!(admin.admin);
//! # Ok::<_, std::sync::Arc<fabrique::FactoryError>>(())
//! ```

use std::sync::Arc;

mod error;
mod result_ext;

pub mod asynchronous;
pub mod builder;
pub mod config;
pub mod factory;
pub mod merge;
pub mod pipeline;
pub mod sequence;
pub mod source;

pub use asynchronous::{AsyncBuilder, AsyncFactory, AsyncTransformFactory, make_async_factory};
pub use builder::{Builder, BuilderProvider};
pub use config::FactoryConfig;
pub use error::{BoxedSourceError, FactoryError};
pub use factory::{
    Factory, TransformFactory, make_factory, make_factory_with, make_factory_with_required,
};
pub use merge::Record;
pub use pipeline::Pipeline;
pub use result_ext::FactoryResultExt;
pub use sequence::{SequenceCounter, SequenceNumber};

/// Result type used throughout the crate.
pub type FactoryResult<T> = Result<T, Arc<FactoryError>>;
