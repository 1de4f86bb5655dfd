//! Error types produced while building objects from factories.

mod constructors;
mod conversions;
mod types;

pub use types::{BoxedSourceError, FactoryError};

#[cfg(test)]
mod tests;
