//! Trait-based conversions between external error types and `FactoryError`.

use figment::Error as FigmentError;

use super::FactoryError;

/// Decoding failures surface when a built record does not fit the target
/// type, so they map onto [`FactoryError::Deserialize`].
impl From<serde_json::Error> for FactoryError {
    fn from(e: serde_json::Error) -> Self {
        Self::Deserialize(e)
    }
}

impl From<FigmentError> for FactoryError {
    fn from(e: FigmentError) -> Self {
        Self::Config(Box::new(e))
    }
}

impl From<FactoryError> for FigmentError {
    /// Allow using `?` in tests that return `figment::Error`.
    fn from(e: FactoryError) -> Self {
        match e {
            FactoryError::Config(fe) => *fe,
            other => Self::from(other.to_string()),
        }
    }
}
