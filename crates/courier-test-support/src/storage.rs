//! Object sources for pipeline tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use courier_storage::{
    BucketRegistry, ObjectSource, Precondition, StorageError, StorageObjectRef, StorageResult,
    StoreSource,
};
use object_store::memory::InMemory;

/// Store source with one in-memory store per bucket.
#[must_use]
pub fn in_memory_source(buckets: &[&str]) -> StoreSource {
    let registry = buckets.iter().fold(BucketRegistry::new(), |registry, bucket| {
        registry.with_store(*bucket, Arc::new(InMemory::new()))
    });
    StoreSource::new(registry)
}

/// Put `body` at `bucket/name`, overwriting, and return its reference.
///
/// # Errors
///
/// Returns the storage error when the reference is invalid or the put fails.
pub async fn seed_object(
    source: &dyn ObjectSource,
    bucket: &str,
    name: &str,
    body: impl Into<Bytes>,
) -> StorageResult<StorageObjectRef> {
    let object = StorageObjectRef::new(bucket, name)?;
    source
        .put(&object, body.into(), Precondition::None, Duration::from_secs(5))
        .await?;
    Ok(object)
}

/// Wraps an [`ObjectSource`], counting calls and injecting failures.
pub struct CountingSource {
    inner: Arc<dyn ObjectSource>,
    fetches: AtomicUsize,
    puts: AtomicUsize,
    deletes: AtomicUsize,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
}

impl CountingSource {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn ObjectSource>) -> Self {
        Self {
            inner,
            fetches: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            fail_puts: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    /// Make every put time out without reaching the inner store.
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Make every delete time out without reaching the inner store.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Fetch attempts so far.
    #[must_use]
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Put attempts so far.
    #[must_use]
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Delete attempts so far.
    #[must_use]
    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Total calls of any kind.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.fetches() + self.puts() + self.deletes()
    }
}

#[async_trait]
impl ObjectSource for CountingSource {
    async fn fetch(&self, object: &StorageObjectRef, deadline: Duration) -> StorageResult<Bytes> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(object, deadline).await
    }

    async fn put(
        &self,
        object: &StorageObjectRef,
        payload: Bytes,
        precondition: Precondition,
        deadline: Duration,
    ) -> StorageResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(injected("put", object, deadline));
        }
        self.inner.put(object, payload, precondition, deadline).await
    }

    async fn delete(&self, object: &StorageObjectRef, deadline: Duration) -> StorageResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(injected("delete", object, deadline));
        }
        self.inner.delete(object, deadline).await
    }
}

fn injected(operation: &'static str, object: &StorageObjectRef, budget: Duration) -> StorageError {
    StorageError::Timeout {
        operation,
        object: object.to_string(),
        budget,
    }
}
