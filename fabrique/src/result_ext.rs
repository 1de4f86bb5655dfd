//! Extensions for mapping errors to `FactoryResult` concisely.
//!
//! These helpers reduce repetitive `.map_err(|e| Arc::new(e.into()))`
//! patterns when converting external error types into the crate's
//! `FactoryResult<T>` alias (`Result<T, Arc<FactoryError>>`).
//!
//! # Examples
//!
//! ```
//! use fabrique::{FactoryResult, FactoryResultExt};
//!
//! fn encode() -> FactoryResult<serde_json::Value> {
//!     serde_json::to_value(&42).into_factory()
//! }
//! # assert_eq!(encode().ok(), Some(serde_json::json!(42)));
//! ```

use std::sync::Arc;

use crate::{FactoryError, FactoryResult};

/// Generic extension for mapping any `Result<T, E>` with
/// `E: Into<FactoryError>` into a `FactoryResult<T>`.
pub trait FactoryResultExt<T, E> {
    /// Convert `Result<T, E>` into `FactoryResult<T>` using `Into<FactoryError>`.
    ///
    /// # Errors
    ///
    /// Propagates the original error after conversion into `Arc<FactoryError>`.
    fn into_factory(self) -> FactoryResult<T>;
}

impl<T, E> FactoryResultExt<T, E> for Result<T, E>
where
    E: Into<FactoryError>,
{
    fn into_factory(self) -> FactoryResult<T> {
        self.map_err(|e| Arc::new(e.into()))
    }
}

/// Extension attaching a field name to JSON serialisation failures.
pub(crate) trait SerializeFieldExt<T> {
    /// Map a `serde_json::Error` into [`FactoryError::Serialize`] for `field`.
    fn for_field(self, field: &str) -> FactoryResult<T>;
}

impl<T> SerializeFieldExt<T> for Result<T, serde_json::Error> {
    fn for_field(self, field: &str) -> FactoryResult<T> {
        self.map_err(|e| FactoryError::serialize(field, e))
    }
}
