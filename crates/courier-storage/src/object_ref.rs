//! Validated `(bucket, name)` object references.

use std::fmt;

use object_store::path::Path;

use crate::error::{StorageError, StorageResult};

/// Immutable reference to one object in one bucket.
///
/// Names may contain `/` and any reserved delimiter; they are never
/// reinterpreted beyond splitting into path segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageObjectRef {
    bucket: String,
    name: String,
}

impl StorageObjectRef {
    /// Build a reference, rejecting empty or malformed parts.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidRef`] for an empty bucket, an empty name,
    /// or a name that cannot be addressed as an object path.
    pub fn new(bucket: impl Into<String>, name: impl Into<String>) -> StorageResult<Self> {
        let bucket = bucket.into();
        let name = name.into();
        if bucket.trim().is_empty() {
            return Err(StorageError::InvalidRef {
                field: "bucket",
                reason: "empty",
            });
        }
        if bucket.contains('/') {
            return Err(StorageError::InvalidRef {
                field: "bucket",
                reason: "contains_separator",
            });
        }
        if name.is_empty() {
            return Err(StorageError::InvalidRef {
                field: "name",
                reason: "empty",
            });
        }
        let location = Path::parse(&name).map_err(|_| StorageError::InvalidRef {
            field: "name",
            reason: "unaddressable",
        })?;
        if location.as_ref().is_empty() {
            return Err(StorageError::InvalidRef {
                field: "name",
                reason: "empty",
            });
        }
        Ok(Self { bucket, name })
    }

    /// Bucket holding the object.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Full object name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reference to another object in the same bucket.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidRef`] when `name` is not a valid object name.
    pub fn sibling(&self, name: impl Into<String>) -> StorageResult<Self> {
        Self::new(self.bucket.clone(), name)
    }

    /// Object path as understood by the store handle.
    pub(crate) fn location(&self) -> StorageResult<Path> {
        Path::parse(&self.name).map_err(|_| StorageError::InvalidRef {
            field: "name",
            reason: "unaddressable",
        })
    }
}

impl fmt::Display for StorageObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.name)
    }
}
