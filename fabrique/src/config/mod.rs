//! Factory configuration and its layered loading.
//!
//! A [`FactoryConfig`] is usually written inline, but suites that share
//! numbering conventions can load one through Figment: serialised defaults,
//! then an optional TOML file, then prefixed environment variables.

use std::sync::Arc;

use camino::Utf8Path;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::{FactoryError, FactoryResult, SequenceNumber};

/// Options recognised by every factory.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct FactoryConfig {
    /// First sequence number handed out, and the target of
    /// `reset_sequence_number(None)`. Defaults to `0`.
    #[serde(
        alias = "startingSequenceNumber",
        skip_serializing_if = "Option::is_none"
    )]
    pub starting_sequence_number: Option<SequenceNumber>,
}

impl FactoryConfig {
    /// Configuration with every option unset.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            starting_sequence_number: None,
        }
    }

    /// Set the starting sequence number.
    #[must_use]
    pub const fn with_starting_sequence_number(mut self, start: SequenceNumber) -> Self {
        self.starting_sequence_number = Some(start);
        self
    }

    /// The effective starting sequence number.
    #[must_use]
    pub const fn start(&self) -> SequenceNumber {
        match self.starting_sequence_number {
            Some(start) => start,
            None => 0,
        }
    }

    /// Extract a configuration from an existing [`Figment`].
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::Config`] when extraction fails.
    pub fn from_figment(figment: &Figment) -> FactoryResult<Self> {
        figment
            .extract()
            .map_err(|e| Arc::new(FactoryError::from(e)))
    }

    /// Load configuration from defaults, an optional TOML file, and
    /// environment variables named `{env_prefix}STARTING_SEQUENCE_NUMBER`.
    ///
    /// Later layers win. A missing file is treated as empty.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::Config`] when a layer cannot be parsed.
    pub fn load(path: Option<&Utf8Path>, env_prefix: &str) -> FactoryResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = path {
            tracing::debug!(path = %file, "loading factory configuration file");
            figment = figment.merge(Toml::file(file.as_std_path()));
        }
        figment = figment.merge(Env::prefixed(env_prefix));
        Self::from_figment(&figment)
    }
}

#[cfg(test)]
mod tests;
