//! Configuration error types.

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// An environment variable was set but could not be parsed.
    #[error("failed to parse {name}='{value}': {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// A setting parsed but lies outside its allowed range.
    #[error("{name} out of range: {reason}")]
    OutOfRange { name: &'static str, reason: String },
}

impl ConfigError {
    /// Name of the offending setting (environment variable or field).
    pub fn name(&self) -> &'static str {
        match self {
            ConfigError::InvalidValue { name, .. } | ConfigError::OutOfRange { name, .. } => name,
        }
    }

    pub(crate) fn out_of_range(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::OutOfRange {
            name,
            reason: reason.into(),
        }
    }
}
