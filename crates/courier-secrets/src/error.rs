//! # Design
//!
//! - Constant messages; the secret resource name travels as a field.
//! - Never carry secret material in an error.

use std::time::Duration;

use thiserror::Error;

/// Result alias for secret operations.
pub type SecretResult<T> = Result<T, SecretError>;

/// Errors produced while resolving secrets.
#[derive(Debug, Error)]
pub enum SecretError {
    /// The secret or version does not exist.
    #[error("secret not found")]
    NotFound {
        /// Secret resource name.
        name: String,
    },
    /// The payload checksum did not match, or no checksum was supplied.
    #[error("secret integrity check failed")]
    Integrity {
        /// Secret resource name.
        name: String,
        /// Checksum reported by the secret service.
        expected: Option<i64>,
        /// Checksum computed over the received payload.
        actual: i64,
    },
    /// The secret service could not be reached or refused the call.
    #[error("secret service unavailable")]
    Unavailable {
        /// Secret resource name.
        name: String,
        /// Static description of the failure.
        detail: &'static str,
        /// HTTP status when one was received.
        status: Option<u16>,
    },
    /// HTTP transport failures talking to the secret service or metadata server.
    #[error("secret transport failure")]
    Transport {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Secret resource name.
        name: String,
        /// Underlying HTTP error.
        source: reqwest::Error,
    },
    /// The secret call did not finish within its deadline.
    #[error("secret access timed out")]
    Timeout {
        /// Secret resource name.
        name: String,
        /// Deadline that elapsed.
        budget: Duration,
    },
    /// The payload could not be decoded.
    #[error("invalid secret payload")]
    InvalidPayload {
        /// Secret resource name.
        name: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
}

impl SecretError {
    /// Whether the failure is a reachability problem rather than a content problem.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable { .. } | Self::Transport { .. } | Self::Timeout { .. }
        )
    }

    /// Resource name the error refers to.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::NotFound { name }
            | Self::Integrity { name, .. }
            | Self::Unavailable { name, .. }
            | Self::Transport { name, .. }
            | Self::Timeout { name, .. }
            | Self::InvalidPayload { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_classification() {
        let timeout = SecretError::Timeout {
            name: "projects/p/secrets/s/versions/1".into(),
            budget: Duration::from_secs(1),
        };
        assert!(timeout.is_unavailable());
        assert_eq!(timeout.name(), "projects/p/secrets/s/versions/1");

        let integrity = SecretError::Integrity {
            name: "n".into(),
            expected: Some(1),
            actual: 2,
        };
        assert!(!integrity.is_unavailable());
        assert_eq!(integrity.to_string(), "secret integrity check failed");
    }
}
