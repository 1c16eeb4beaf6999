//! The `ObjectSource` capability and its `object_store` implementation.
//!
//! # Design
//! - Every call is bounded by a caller-supplied deadline.
//! - Reads are side-effect free; writes and deletes are single calls, never retried.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::{PutMode, PutOptions, PutPayload};
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::object_ref::StorageObjectRef;
use crate::registry::BucketRegistry;

/// Write precondition for [`ObjectSource::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Unconditional write; overwrites an existing object.
    None,
    /// Succeed only if no object with the name exists yet.
    DoesNotExist,
}

/// Read, write, and delete single objects.
#[async_trait]
pub trait ObjectSource: Send + Sync {
    /// Read the full content of `object`.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] when the object is gone,
    /// [`StorageError::Timeout`] when `deadline` elapses, otherwise a transport error.
    async fn fetch(&self, object: &StorageObjectRef, deadline: Duration) -> StorageResult<Bytes>;

    /// Write `payload` to `object` under `precondition`.
    ///
    /// # Errors
    ///
    /// [`StorageError::PreconditionFailed`] when the precondition does not hold.
    async fn put(
        &self,
        object: &StorageObjectRef,
        payload: Bytes,
        precondition: Precondition,
        deadline: Duration,
    ) -> StorageResult<()>;

    /// Delete `object`.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] when the store reports the object missing.
    async fn delete(&self, object: &StorageObjectRef, deadline: Duration) -> StorageResult<()>;
}

/// [`ObjectSource`] backed by the handles of a [`BucketRegistry`].
#[derive(Debug, Clone)]
pub struct StoreSource {
    registry: BucketRegistry,
}

impl StoreSource {
    /// Wrap a registry.
    #[must_use]
    pub const fn new(registry: BucketRegistry) -> Self {
        Self { registry }
    }

    /// Registry backing this source.
    #[must_use]
    pub const fn registry(&self) -> &BucketRegistry {
        &self.registry
    }
}

#[async_trait]
impl ObjectSource for StoreSource {
    async fn fetch(&self, object: &StorageObjectRef, deadline: Duration) -> StorageResult<Bytes> {
        let store = self.registry.get(object.bucket())?;
        let location = object.location()?;
        let bytes = bounded("get", object, deadline, async {
            store.get(&location).await?.bytes().await
        })
        .await?;
        debug!(object = %object, bytes = bytes.len(), "object fetched");
        Ok(bytes)
    }

    async fn put(
        &self,
        object: &StorageObjectRef,
        payload: Bytes,
        precondition: Precondition,
        deadline: Duration,
    ) -> StorageResult<()> {
        let store = self.registry.get(object.bucket())?;
        let location = object.location()?;
        let options = PutOptions {
            mode: match precondition {
                Precondition::None => PutMode::Overwrite,
                Precondition::DoesNotExist => PutMode::Create,
            },
            ..PutOptions::default()
        };
        let size = payload.len();
        bounded("put", object, deadline, async {
            store
                .put_opts(&location, PutPayload::from(payload), options)
                .await
        })
        .await?;
        debug!(object = %object, bytes = size, ?precondition, "object written");
        Ok(())
    }

    async fn delete(&self, object: &StorageObjectRef, deadline: Duration) -> StorageResult<()> {
        let store = self.registry.get(object.bucket())?;
        let location = object.location()?;
        bounded("delete", object, deadline, async {
            store.delete(&location).await
        })
        .await?;
        debug!(object = %object, "object deleted");
        Ok(())
    }
}

async fn bounded<T, F>(
    operation: &'static str,
    object: &StorageObjectRef,
    deadline: Duration,
    call: F,
) -> StorageResult<T>
where
    F: Future<Output = object_store::Result<T>> + Send,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(StorageError::from_store(
            operation,
            object.to_string(),
            source,
        )),
        Err(_) => Err(StorageError::Timeout {
            operation,
            object: object.to_string(),
            budget: deadline,
        }),
    }
}
