use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use courier_storage::{
    BucketRegistry, ObjectSource, Precondition, StorageError, StorageObjectRef, StoreSource,
};
use object_store::memory::InMemory;

#[tokio::test]
async fn concurrent_create_only_writes_admit_one_winner() -> anyhow::Result<()> {
    let source = Arc::new(StoreSource::new(
        BucketRegistry::new().with_store("landing", Arc::new(InMemory::new())),
    ));
    let object = StorageObjectRef::new("landing", "batch/out.csv")?;

    let mut handles = Vec::new();
    for writer in 0..8_u8 {
        let source = source.clone();
        let object = object.clone();
        handles.push(tokio::spawn(async move {
            source
                .put(
                    &object,
                    Bytes::from(vec![writer; 4]),
                    Precondition::DoesNotExist,
                    Duration::from_secs(5),
                )
                .await
        }));
    }

    let mut winners = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await? {
            Ok(()) => winners += 1,
            Err(StorageError::PreconditionFailed { .. }) => conflicts += 1,
            Err(other) => return Err(other.into()),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(conflicts, 7);

    let stored = source.fetch(&object, Duration::from_secs(5)).await?;
    assert_eq!(stored.len(), 4);
    assert!(stored.iter().all(|byte| *byte == stored[0]));
    Ok(())
}
