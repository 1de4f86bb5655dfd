//! Primary error enum for factory builds.

use thiserror::Error;

/// Boxed error returned by user-supplied generator, derivation, and
/// transform closures.
pub type BoxedSourceError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while constructing objects.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FactoryError {
    /// An override named a field the factory does not know about.
    #[error("unknown field '{field}' in override")]
    UnknownField {
        /// Name of the offending field.
        field: String,
    },

    /// A field declared as required at build time was not supplied.
    #[error("missing required field '{field}'")]
    MissingRequiredField {
        /// Name of the required field.
        field: String,
    },

    /// A value that must be a key-value record was something else.
    #[error("{context} must be a record, found {found}")]
    NotARecord {
        /// Where the value was supplied.
        context: &'static str,
        /// JSON kind of the value that was supplied instead.
        found: &'static str,
    },

    /// Two builders declared the same fields and cannot be combined.
    #[error("cannot combine builders with overlapping fields: {}", fields.join(", "))]
    OverlappingFields {
        /// Fields present in both builders.
        fields: Vec<String>,
    },

    /// A sequence generator failed.
    #[error("generator for field '{field}' failed: {source}")]
    Generator {
        /// Field the generator was producing.
        field: String,
        /// Error reported by the generator.
        #[source]
        source: BoxedSourceError,
    },

    /// A derived value failed.
    #[error("derivation of field '{field}' failed: {source}")]
    Derivation {
        /// Field the derivation was producing.
        field: String,
        /// Error reported by the derivation.
        #[source]
        source: BoxedSourceError,
    },

    /// A transform applied after building failed.
    #[error("transform failed: {source}")]
    Transform {
        /// Error reported by the transform.
        #[source]
        source: BoxedSourceError,
    },

    /// A deferred value or override provider failed.
    #[error("deferred value failed: {source}")]
    Deferred {
        /// Error reported by the deferred computation.
        #[source]
        source: BoxedSourceError,
    },

    /// A generated value could not be serialised into a record field.
    #[error("failed to serialise value for '{field}': {source}")]
    Serialize {
        /// Field being serialised.
        field: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The built record did not match the target type.
    #[error("built record does not match target type: {0}")]
    Deserialize(#[source] serde_json::Error),

    /// Failure loading factory configuration.
    #[error("failed to load factory configuration: {0}")]
    Config(#[from] Box<figment::Error>),
}
