//! Convenience constructors for `FactoryError`.

use std::sync::Arc;

use serde_json::Value;

use super::{BoxedSourceError, FactoryError};

impl FactoryError {
    /// Construct an [`FactoryError::UnknownField`] wrapped in [`Arc`].
    #[must_use]
    pub fn unknown_field(field: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::UnknownField {
            field: field.into(),
        })
    }

    /// Construct an [`FactoryError::MissingRequiredField`] wrapped in [`Arc`].
    #[must_use]
    pub fn missing_required(field: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::MissingRequiredField {
            field: field.into(),
        })
    }

    /// Construct an [`FactoryError::NotARecord`] describing `value`.
    #[must_use]
    pub fn not_a_record(context: &'static str, value: &Value) -> Arc<Self> {
        Arc::new(Self::NotARecord {
            context,
            found: json_kind(value),
        })
    }

    /// Construct an [`FactoryError::Generator`] for `field`.
    #[must_use]
    pub fn generator(field: impl Into<String>, source: impl Into<BoxedSourceError>) -> Arc<Self> {
        Arc::new(Self::Generator {
            field: field.into(),
            source: source.into(),
        })
    }

    /// Construct an [`FactoryError::Derivation`] for `field`.
    #[must_use]
    pub fn derivation(field: impl Into<String>, source: impl Into<BoxedSourceError>) -> Arc<Self> {
        Arc::new(Self::Derivation {
            field: field.into(),
            source: source.into(),
        })
    }

    /// Construct an [`FactoryError::Transform`].
    #[must_use]
    pub fn transform(source: impl Into<BoxedSourceError>) -> Arc<Self> {
        Arc::new(Self::Transform {
            source: source.into(),
        })
    }

    /// Construct an [`FactoryError::Deferred`].
    #[must_use]
    pub fn deferred(source: impl Into<BoxedSourceError>) -> Arc<Self> {
        Arc::new(Self::Deferred {
            source: source.into(),
        })
    }

    /// Construct an [`FactoryError::Serialize`] for `field`.
    #[must_use]
    pub fn serialize(field: impl Into<String>, source: serde_json::Error) -> Arc<Self> {
        Arc::new(Self::Serialize {
            field: field.into(),
            source,
        })
    }

    /// Returns the field name associated with this error, when there is one.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::UnknownField { field }
            | Self::MissingRequiredField { field }
            | Self::Generator { field, .. }
            | Self::Derivation { field, .. }
            | Self::Serialize { field, .. } => Some(field),
            _ => None,
        }
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a record",
    }
}
