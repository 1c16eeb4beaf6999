//! Error types for configuration loading.
//!
//! # Design
//! - Constant messages; the offending key and value travel as fields.
//! - Reasons are short machine-readable tags so tests can match on them.

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting was absent or blank.
    #[error("missing configuration field")]
    MissingField {
        /// Environment key that was expected.
        field: &'static str,
    },
    /// A setting could not be parsed or was out of range.
    #[error("invalid configuration field")]
    InvalidField {
        /// Environment key that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// Two settings were individually valid but cannot be combined.
    #[error("conflicting configuration fields")]
    Conflict {
        /// Primary key involved in the conflict.
        field: &'static str,
        /// Machine-readable reason for the conflict.
        reason: &'static str,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: &'static str, value: &str) -> Self {
        Self::InvalidField {
            field,
            reason,
            value: Some(value.to_string()),
        }
    }
}
