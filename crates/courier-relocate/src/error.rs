//! # Design
//!
//! - Structured, constant-message errors for the relocation pipeline.
//! - Every failure carries the operation and object identity it occurred on.
//! - `ErrorKind` gives callers one classification across storage, transport, and input errors.

use std::io;
use std::time::Duration;

use courier_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

/// Result type for relocation operations.
pub type RelocateResult<T> = Result<T, RelocateError>;

/// Boxed client-library error carried by [`TransportError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure classification shared by every courier crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The object or secret does not exist.
    NotFound,
    /// A checksum did not match.
    Integrity,
    /// The remote rejected the credentials.
    Auth,
    /// The remote could not be reached.
    Connect,
    /// A create-only write found the destination present.
    PreconditionFailed,
    /// A deadline elapsed.
    Timeout,
    /// Any other I/O or protocol failure.
    Transport,
    /// Malformed event, name, or rule.
    InvalidInput,
}

impl ErrorKind {
    /// Stable label for logs and response bodies.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Integrity => "integrity",
            Self::Auth => "auth",
            Self::Connect => "connect",
            Self::PreconditionFailed => "precondition_failed",
            Self::Timeout => "timeout",
            Self::Transport => "transport",
            Self::InvalidInput => "invalid_input",
        }
    }
}

/// Errors raised by a remote session (SMB or SFTP client calls).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote refused the credentials.
    #[error("remote authentication failed")]
    Auth {
        /// `host:port` of the remote.
        endpoint: String,
        /// Underlying client error.
        source: BoxError,
    },
    /// The remote could not be reached or the share/subsystem could not be opened.
    #[error("remote connection failed")]
    Connect {
        /// `host:port` of the remote.
        endpoint: String,
        /// Underlying client error.
        source: BoxError,
    },
    /// A file or directory call failed on an open session.
    #[error("remote operation failed")]
    Operation {
        /// Session operation that failed.
        operation: &'static str,
        /// Remote path involved.
        path: String,
        /// Underlying client error.
        source: BoxError,
    },
}

impl TransportError {
    /// Build an [`TransportError::Operation`] from any client error.
    pub fn operation(
        operation: &'static str,
        path: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Operation {
            operation,
            path: path.into(),
            source: source.into(),
        }
    }

    /// Classification of this transport failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth { .. } => ErrorKind::Auth,
            Self::Connect { .. } => ErrorKind::Connect,
            Self::Operation { .. } => ErrorKind::Transport,
        }
    }
}

/// Errors produced by the relocation pipeline.
#[derive(Debug, Error)]
pub enum RelocateError {
    /// Object store failures while fetching, rewriting, or deleting.
    #[error("relocation storage failure")]
    Storage {
        /// Pipeline operation that triggered the failure.
        operation: &'static str,
        /// `bucket/name` of the object involved.
        object: String,
        /// Underlying storage error.
        source: StorageError,
    },
    /// Remote session failures while connecting or writing.
    #[error("relocation transport failure")]
    Transport {
        /// Pipeline operation that triggered the failure.
        operation: &'static str,
        /// `bucket/name` of the source object.
        object: String,
        /// Underlying transport error.
        source: TransportError,
    },
    /// A remote write did not finish within its deadline.
    #[error("relocation timed out")]
    Timeout {
        /// Pipeline operation that timed out.
        operation: &'static str,
        /// `bucket/name` of the source object.
        object: String,
        /// Deadline that elapsed.
        budget: Duration,
    },
    /// The invocation budget was spent before the step could start.
    #[error("relocation budget exhausted")]
    BudgetExhausted {
        /// Pipeline operation that could not start.
        operation: &'static str,
        /// `bucket/name` of the source object.
        object: String,
    },
    /// Reading through the transform chain failed.
    #[error("relocation transform failure")]
    Transform {
        /// `bucket/name` of the source object.
        object: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// A blocking transport task panicked or was cancelled.
    #[error("relocation task failed")]
    Join {
        /// Pipeline operation that spawned the task.
        operation: &'static str,
        /// `bucket/name` of the source object.
        object: String,
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
    /// A substitution rule was rejected.
    #[error("invalid transform rule")]
    InvalidRule {
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Input validation failures.
    #[error("relocation invalid input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl RelocateError {
    pub(crate) fn storage(
        operation: &'static str,
        object: impl ToString,
        source: StorageError,
    ) -> Self {
        Self::Storage {
            operation,
            object: object.to_string(),
            source,
        }
    }

    pub(crate) fn transport(
        operation: &'static str,
        object: impl ToString,
        source: TransportError,
    ) -> Self {
        Self::Transport {
            operation,
            object: object.to_string(),
            source,
        }
    }

    /// Classification of this failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Storage { source, .. } => match source {
                StorageError::NotFound { .. } => ErrorKind::NotFound,
                StorageError::PreconditionFailed { .. } => ErrorKind::PreconditionFailed,
                StorageError::Timeout { .. } => ErrorKind::Timeout,
                StorageError::InvalidRef { .. } | StorageError::UnknownBucket { .. } => {
                    ErrorKind::InvalidInput
                }
                StorageError::Transport { .. } | StorageError::Build { .. } => ErrorKind::Transport,
            },
            Self::Transport { source, .. } => source.kind(),
            Self::Timeout { .. } | Self::BudgetExhausted { .. } => ErrorKind::Timeout,
            Self::Transform { .. } | Self::Join { .. } => ErrorKind::Transport,
            Self::InvalidRule { .. } | Self::InvalidInput { .. } => ErrorKind::InvalidInput,
        }
    }

    /// Pipeline operation the failure occurred in, when recorded.
    #[must_use]
    pub const fn operation(&self) -> Option<&'static str> {
        match self {
            Self::Storage { operation, .. }
            | Self::Transport { operation, .. }
            | Self::Timeout { operation, .. }
            | Self::BudgetExhausted { operation, .. }
            | Self::Join { operation, .. } => Some(*operation),
            Self::Transform { .. } => Some("transform"),
            Self::InvalidRule { .. } | Self::InvalidInput { .. } => None,
        }
    }

    /// `bucket/name` of the object the failure refers to, when recorded.
    #[must_use]
    pub fn object(&self) -> Option<&str> {
        match self {
            Self::Storage { object, .. }
            | Self::Transport { object, .. }
            | Self::Timeout { object, .. }
            | Self::BudgetExhausted { object, .. }
            | Self::Transform { object, .. }
            | Self::Join { object, .. } => Some(object),
            Self::InvalidRule { .. } | Self::InvalidInput { .. } => None,
        }
    }
}
