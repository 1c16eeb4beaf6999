//! Per-bucket store handles registered at startup.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use object_store::ObjectStore;
use object_store::gcp::GoogleCloudStorageBuilder;
use tracing::info;

use crate::error::{StorageError, StorageResult};

/// Immutable map from bucket name to store handle.
#[derive(Clone, Default)]
pub struct BucketRegistry {
    stores: HashMap<String, Arc<dyn ObjectStore>>,
}

impl BucketRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `store` for `bucket`, replacing any earlier handle.
    #[must_use]
    pub fn with_store(mut self, bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        self.stores.insert(bucket.into(), store);
        self
    }

    /// Build Google Cloud Storage handles for every bucket, using credentials
    /// from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Build`] when a handle cannot be constructed.
    pub fn gcs<I, S>(buckets: I) -> StorageResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self::new();
        for bucket in buckets {
            let bucket = bucket.as_ref();
            let store = GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(bucket)
                .build()
                .map_err(|source| StorageError::Build {
                    bucket: bucket.to_string(),
                    source,
                })?;
            info!(bucket, "registered storage bucket");
            registry = registry.with_store(bucket, Arc::new(store));
        }
        Ok(registry)
    }

    /// Handle for `bucket`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnknownBucket`] when nothing is registered.
    pub fn get(&self, bucket: &str) -> StorageResult<Arc<dyn ObjectStore>> {
        self.stores
            .get(bucket)
            .cloned()
            .ok_or_else(|| StorageError::UnknownBucket {
                bucket: bucket.to_string(),
            })
    }

    /// Whether `bucket` is registered.
    #[must_use]
    pub fn contains(&self, bucket: &str) -> bool {
        self.stores.contains_key(bucket)
    }

    /// Registered bucket names, sorted.
    #[must_use]
    pub fn buckets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.stores.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for BucketRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketRegistry")
            .field("buckets", &self.buckets())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use object_store::memory::InMemory;

    use super::*;

    #[test]
    fn unknown_bucket_is_rejected() {
        let registry = BucketRegistry::new().with_store("exports", Arc::new(InMemory::new()));
        assert!(registry.contains("exports"));
        assert!(registry.get("exports").is_ok());
        assert!(matches!(
            registry.get("other"),
            Err(StorageError::UnknownBucket { bucket }) if bucket == "other"
        ));
    }

    #[test]
    fn buckets_are_listed_sorted() {
        let registry = BucketRegistry::new()
            .with_store("zeta", Arc::new(InMemory::new()))
            .with_store("alpha", Arc::new(InMemory::new()));
        assert_eq!(registry.buckets(), ["alpha", "zeta"]);
        assert_eq!(format!("{registry:?}"), r#"BucketRegistry { buckets: ["alpha", "zeta"] }"#);
    }
}
