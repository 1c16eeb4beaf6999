//! # Design
//!
//! - Constant messages; the object identity travels as a field.
//! - `object_store` errors are classified once here so callers match on variants.

use std::time::Duration;

use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors produced by object storage access.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A bucket or object name failed validation.
    #[error("invalid object reference")]
    InvalidRef {
        /// Field that failed validation.
        field: &'static str,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// No store handle is registered for the bucket.
    #[error("bucket is not registered")]
    UnknownBucket {
        /// Bucket named by the event.
        bucket: String,
    },
    /// The object does not exist.
    #[error("object not found")]
    NotFound {
        /// `bucket/name` of the object.
        object: String,
    },
    /// A conditional write found the destination already present.
    #[error("object precondition failed")]
    PreconditionFailed {
        /// `bucket/name` of the object.
        object: String,
    },
    /// The call did not finish before its deadline.
    #[error("object storage call timed out")]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
        /// `bucket/name` of the object.
        object: String,
        /// Deadline that elapsed.
        budget: Duration,
    },
    /// Any other failure reported by the store.
    #[error("object storage failure")]
    Transport {
        /// Operation that failed.
        operation: &'static str,
        /// `bucket/name` of the object.
        object: String,
        /// Underlying store error.
        #[source]
        source: object_store::Error,
    },
    /// A store handle could not be constructed at startup.
    #[error("object store construction failed")]
    Build {
        /// Bucket the handle was for.
        bucket: String,
        /// Underlying store error.
        #[source]
        source: object_store::Error,
    },
}

impl StorageError {
    /// Classify an `object_store` error for `operation` on `object`.
    pub(crate) fn from_store(
        operation: &'static str,
        object: String,
        source: object_store::Error,
    ) -> Self {
        match source {
            object_store::Error::NotFound { .. } => Self::NotFound { object },
            object_store::Error::AlreadyExists { .. }
            | object_store::Error::Precondition { .. } => Self::PreconditionFailed { object },
            source => Self::Transport {
                operation,
                object,
                source,
            },
        }
    }

    /// Whether the object was missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_are_classified() {
        let missing = StorageError::from_store(
            "get",
            "b/o".into(),
            object_store::Error::NotFound {
                path: "o".into(),
                source: "gone".into(),
            },
        );
        assert!(missing.is_not_found());

        let exists = StorageError::from_store(
            "put",
            "b/o".into(),
            object_store::Error::AlreadyExists {
                path: "o".into(),
                source: "exists".into(),
            },
        );
        assert!(matches!(exists, StorageError::PreconditionFailed { .. }));

        let generic = StorageError::from_store(
            "delete",
            "b/o".into(),
            object_store::Error::Generic {
                store: "test",
                source: "boom".into(),
            },
        );
        assert!(matches!(
            generic,
            StorageError::Transport {
                operation: "delete",
                ..
            }
        ));
        assert_eq!(generic.to_string(), "object storage failure");
    }
}
